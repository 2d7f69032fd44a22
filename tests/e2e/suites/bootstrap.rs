//! 启动组合测试套件
//!
//! 命令行参数 → 配置 → 装饰器组合。

use crate::setup::TestEnvironment;

#[cfg(test)]
mod flag_tests {
    use super::*;
    use clap::Parser;
    use taxonomy::cli::Cli;
    use taxonomy::{Query, TaxonomyRepository};
    use taxonomy_shared::config::AppConfig;

    async fn env_for(args: &[&str]) -> TestEnvironment {
        let cli = Cli::try_parse_from(args).unwrap();
        let mut config = AppConfig::default();
        cli.apply(&mut config);
        TestEnvironment::with_decorators(config.decorators).await.unwrap()
    }

    #[tokio::test]
    async fn test_no_flags_means_no_side_effects() {
        let env = env_for(&["taxonomy"]).await;
        env.prepare_test_data().await.unwrap();
        env.repository.read(&env.ctx, &Query::new()).await.unwrap();

        assert!(env.logs.records().is_empty());
        assert!(!env.render_metrics().contains("sqlkit_sql_exec_count{"));
        env.cleanup().await.unwrap();
    }

    #[tokio::test]
    async fn test_logging_flag_only() {
        let env = env_for(&["taxonomy", "--logging"]).await;
        env.prepare_test_data().await.unwrap();
        env.repository.read(&env.ctx, &Query::new()).await.unwrap();

        assert_eq!(env.logs.records().len(), 1);
        assert!(!env.render_metrics().contains("sqlkit_sql_exec_count{"));
        env.cleanup().await.unwrap();
    }

    #[tokio::test]
    async fn test_instrumenting_flag_only() {
        let env = env_for(&["taxonomy", "--instrumenting"]).await;
        env.prepare_test_data().await.unwrap();
        env.repository.read(&env.ctx, &Query::new()).await.unwrap();

        assert!(env.logs.records().is_empty());
        assert!(env.render_metrics().contains("sqlkit_sql_exec_count{"));
        env.cleanup().await.unwrap();
    }
}
