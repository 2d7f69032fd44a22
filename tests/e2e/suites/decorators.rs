//! 装饰器测试套件
//!
//! 验证完整链路上的日志与指标副作用。

use crate::setup::TestEnvironment;

#[cfg(test)]
mod side_effect_tests {
    use super::*;
    use taxonomy::{Query, Taxonomy, TaxonomyRepository};

    #[tokio::test]
    async fn test_one_record_and_one_sample_per_call() {
        let env = TestEnvironment::setup().await.unwrap();
        env.prepare_test_data().await.unwrap();

        env.repository.read(&env.ctx, &Query::new()).await.unwrap();

        let records = env.logs.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record["level"], "INFO");
        assert_eq!(record["method"], "select_with");
        assert_eq!(record["dest"], std::any::type_name::<Taxonomy>());
        assert_eq!(record["trace_id"], "e2e");
        assert_eq!(record["rows"], 4);
        assert_eq!(record["args"], "[-1, 0]");

        let output = env.render_metrics();
        assert!(output.contains(
            r#"sqlkit_sql_exec_count{query="SELECT id, name FROM taxonomy ORDER BY id LIMIT $1 OFFSET $2"} 1"#
        ));
        assert!(output.contains(
            r#"sqlkit_sql_exec_count{query="INSERT INTO taxonomy (id, name) VALUES ($1, $2)"} 4"#
        ));

        env.cleanup().await.unwrap();
    }

    #[tokio::test]
    async fn test_failures_take_the_error_branch() {
        let env = TestEnvironment::setup().await.unwrap();
        env.prepare_test_data().await.unwrap();

        // 主键冲突
        let duplicate = Query::new().with_taxonomy(crate::data::TestTaxonomies::animals());
        let err = env.repository.create(&env.ctx, &duplicate).await.unwrap_err();

        let records = env.logs.records_for("execute_with");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["level"], "ERROR");
        assert_eq!(records[0]["error_code"], err.code());
        assert_eq!(records[0]["message"], err.to_string());

        let output = env.render_metrics();
        assert!(output.contains(
            r#"sqlkit_sql_exec_errors{query="INSERT INTO taxonomy (id, name) VALUES ($1, $2)"} 1"#
        ));

        env.cleanup().await.unwrap();
    }
}

#[cfg(test)]
mod propagation_tests {
    use super::*;
    use sqlkit::{Context, Database, DbError};
    use std::time::Duration;
    use taxonomy::{Query, TaxonomyRepository};

    #[tokio::test]
    async fn test_expired_deadline_propagates_through_decorators() {
        let env = TestEnvironment::setup().await.unwrap();
        env.prepare_test_data().await.unwrap();

        let ctx = Context::background()
            .with_trace_id("late")
            .with_deadline(tokio::time::Instant::now());
        tokio::time::sleep(Duration::from_millis(5)).await;

        let err = env.repository.read(&ctx, &Query::new()).await.unwrap_err();
        assert!(matches!(err, DbError::DeadlineExceeded));

        let records = env.logs.records();
        assert_eq!(records[0]["error_code"], "DEADLINE_EXCEEDED");
        assert_eq!(records[0]["trace_id"], "late");

        env.cleanup().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_is_forwarded_once() {
        let env = TestEnvironment::setup().await.unwrap();
        env.prepare_test_data().await.unwrap();

        env.db.close().await.unwrap();
        assert_eq!(env.logs.records_for("close").len(), 1);

        let err = env.db.ping().await.unwrap_err();
        assert_eq!(err.code(), "DATABASE_ERROR");
    }
}
