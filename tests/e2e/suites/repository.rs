//! 仓储测试套件
//!
//! 通过完整装饰器链路读写分类。

use crate::data::*;
use crate::setup::TestEnvironment;

#[cfg(test)]
mod read_tests {
    use super::*;
    use taxonomy::{Pagination, Query, Taxonomy, TaxonomyRepository};

    #[tokio::test]
    async fn test_read_all_unbounded() {
        let env = TestEnvironment::setup().await.unwrap();
        env.prepare_test_data().await.unwrap();

        let response = env.repository.read(&env.ctx, &Query::new()).await.unwrap();

        assert_eq!(response.results, TestTaxonomies::all());
        assert_eq!(response.pagination, Pagination { limit: 0, offset: 0, count: 4 });

        env.cleanup().await.unwrap();
    }

    #[tokio::test]
    async fn test_pages_cover_every_row_once() {
        let env = TestEnvironment::setup().await.unwrap();
        env.prepare_test_data().await.unwrap();

        let mut seen = Vec::new();
        for offset in (0..6).step_by(3) {
            let page = env
                .repository
                .read(&env.ctx, &Query::new().with_pagination(Pagination::new(3, offset)))
                .await
                .unwrap();
            assert_eq!(page.pagination.count as usize, page.results.len());
            seen.extend(page.results);
        }

        assert_eq!(seen, TestTaxonomies::all());
        env.cleanup().await.unwrap();
    }

    #[tokio::test]
    async fn test_read_by_name_and_by_id() {
        let env = TestEnvironment::setup().await.unwrap();
        env.prepare_test_data().await.unwrap();

        let birds = TestTaxonomies::birds();
        let by_name = env
            .repository
            .read(&env.ctx, &Query::new().with_taxonomy(Taxonomy::new("", birds.name.clone())))
            .await
            .unwrap();
        assert_eq!(by_name.results, vec![birds.clone()]);

        let by_id = env
            .repository
            .read(&env.ctx, &Query::new().with_taxonomy(Taxonomy::new(birds.id.clone(), "")))
            .await
            .unwrap();
        assert_eq!(by_id.results, vec![birds]);

        env.cleanup().await.unwrap();
    }
}

#[cfg(test)]
mod write_tests {
    use super::*;
    use sqlkit::DbError;
    use taxonomy::{Query, Taxonomy, TaxonomyRepository};

    #[tokio::test]
    async fn test_create_is_visible_to_read() {
        let env = TestEnvironment::setup().await.unwrap();
        env.prepare_test_data().await.unwrap();

        let insects = Taxonomy::new("tx-005", "insects");
        env.repository
            .create(&env.ctx, &Query::new().with_taxonomy(insects.clone()))
            .await
            .unwrap();

        let response = env.repository.read(&env.ctx, &Query::new()).await.unwrap();
        assert_eq!(response.pagination.count, 5);
        assert_eq!(response.results.last(), Some(&insects));

        env.cleanup().await.unwrap();
    }

    #[tokio::test]
    async fn test_update_and_delete_report_unimplemented() {
        let env = TestEnvironment::setup().await.unwrap();
        env.prepare_test_data().await.unwrap();

        let query = Query::new().with_taxonomy(TestTaxonomies::animals());
        assert!(matches!(
            env.repository.update(&env.ctx, &query).await,
            Err(DbError::Unimplemented(_))
        ));
        assert!(matches!(
            env.repository.delete(&env.ctx, &query).await,
            Err(DbError::Unimplemented(_))
        ));

        // 未触达数据库
        assert!(env.logs.records().is_empty());
        env.cleanup().await.unwrap();
    }
}
