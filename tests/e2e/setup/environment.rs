//! 测试环境管理
//!
//! 每个环境持有独立的内存数据库、日志捕获器和指标注册表。

use std::sync::Arc;

use anyhow::Result;
use sqlkit::{Context, LogSink, SharedDatabase, SqlMetrics, SqliteDatabase};
use taxonomy::{Query, SqlTaxonomyRepository, TaxonomyRepository, bootstrap};
use taxonomy_shared::config::DecoratorConfig;
use taxonomy_shared::test_utils::{LogCapture, test_database_config};

use crate::data::TestTaxonomies;

pub struct TestEnvironment {
    /// 未装饰的基础句柄
    pub base: SharedDatabase,
    /// 组合装饰器后的句柄
    pub db: SharedDatabase,
    pub repository: SqlTaxonomyRepository,
    pub logs: LogCapture,
    pub metrics: Arc<SqlMetrics>,
    pub ctx: Context,
}

impl TestEnvironment {
    /// 同时启用日志与指标装饰器
    pub async fn setup() -> Result<Self> {
        Self::with_decorators(DecoratorConfig {
            logging: true,
            instrumenting: true,
        })
        .await
    }

    pub async fn with_decorators(decorators: DecoratorConfig) -> Result<Self> {
        let base: SharedDatabase = Arc::new(SqliteDatabase::connect(&test_database_config()).await?);
        let logs = LogCapture::new();
        let metrics = Arc::new(SqlMetrics::prometheus()?);

        let db = bootstrap::compose(
            base.clone(),
            &decorators,
            LogSink::from_dispatch(logs.dispatch()),
            &metrics,
        );
        let repository = SqlTaxonomyRepository::builder()
            .with_database(db.clone())
            .build();

        Ok(Self {
            base,
            db,
            repository,
            logs,
            metrics,
            ctx: Context::background().with_trace_id("e2e"),
        })
    }

    /// 建表并写入预置数据，然后清空日志
    pub async fn prepare_test_data(&self) -> Result<()> {
        self.repository.ensure_schema(&self.ctx).await?;
        for taxonomy in TestTaxonomies::all() {
            self.repository
                .create(&self.ctx, &Query::new().with_taxonomy(taxonomy))
                .await?;
        }
        self.logs.clear();
        Ok(())
    }

    pub fn render_metrics(&self) -> String {
        self.metrics.render().unwrap_or_default()
    }

    pub async fn cleanup(self) -> Result<()> {
        self.base.close().await?;
        Ok(())
    }
}
