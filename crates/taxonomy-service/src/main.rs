//! 分类服务
//!
//! 加载配置、初始化可观测性、连接数据库并按开关组合装饰器，
//! 然后通过仓储执行一次读取。

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use sqlkit::{Context, Database, LogSink, SharedDatabase, SqlMetrics, SqliteDatabase};
use taxonomy::{SqlTaxonomyRepository, TaxonomyRepository, bootstrap, cli::Cli};
use taxonomy_shared::{config::AppConfig, observability};
use tokio::signal;
use tracing::info;

const SERVICE_NAME: &str = "taxonomy-service";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // 1. 加载配置，命令行参数覆盖
    let mut config = AppConfig::load(SERVICE_NAME).unwrap_or_else(|e| {
        tracing::warn!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });
    cli.apply(&mut config);

    // 2. 初始化可观测性
    let obs_config = config.observability.clone().with_service_name(&config.service_name);
    let guard = observability::init(&obs_config).await?;

    info!("Starting taxonomy-service...");
    info!(
        environment = %config.environment,
        logging = config.decorators.logging,
        instrumenting = config.decorators.instrumenting,
        "Configuration loaded"
    );

    // 3. SQL 指标复用服务级 recorder，未启用指标导出时使用独立注册表
    let metrics = Arc::new(match guard.metrics() {
        Some(handle) => SqlMetrics::new(handle.recorder()),
        None => SqlMetrics::prometheus()?,
    });

    // 4. 连接数据库并组合装饰器
    let base: SharedDatabase = Arc::new(SqliteDatabase::connect(&config.database).await?);
    let db = bootstrap::compose(base.clone(), &config.decorators, LogSink::current(), &metrics);

    let repository = SqlTaxonomyRepository::builder().with_database(db).build();
    let ctx = Context::background().with_trace_id(uuid::Uuid::new_v4().to_string());
    repository.ensure_schema(&ctx).await?;

    // 5. 读取
    let response = repository.read(&ctx, &cli.query()).await?;
    info!(
        count = response.pagination.count,
        limit = response.pagination.limit,
        offset = response.pagination.offset,
        "Taxonomy read complete"
    );
    for taxonomy in &response.results {
        info!(id = %taxonomy.id, name = %taxonomy.name, "Taxonomy");
    }

    if cli.serve {
        info!("Serving metrics until shutdown");
        shutdown_signal().await;
    }

    base.close().await?;
    info!("Service shutdown complete");
    Ok(())
}

/// 优雅关闭信号处理
///
/// 监听 Ctrl+C 和 SIGTERM 信号
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        }
    }
}
