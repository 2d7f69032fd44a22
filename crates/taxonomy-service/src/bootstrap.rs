//! 装饰器组合
//!
//! 按配置把日志与指标装饰器包裹在基础句柄外层。
//! 组合顺序决定可见性：先包日志、再包指标，指标装饰器位于最外层，
//! 其耗时包含日志装饰器写记录的时间。

use std::sync::Arc;

use sqlkit::{InstrumentedDatabase, LogSink, LoggingDatabase, SharedDatabase, SqlMetrics};
use taxonomy_shared::config::DecoratorConfig;
use tracing::info;

/// 按开关组合装饰器，返回最外层句柄
pub fn compose(
    base: SharedDatabase,
    decorators: &DecoratorConfig,
    sink: LogSink,
    metrics: &Arc<SqlMetrics>,
) -> SharedDatabase {
    let mut db = base;

    if decorators.logging {
        db = LoggingDatabase::builder().inner(db).sink(sink).build().into_shared();
        info!("Logging decorator enabled");
    }

    if decorators.instrumenting {
        db = InstrumentedDatabase::new(db, metrics.clone()).into_shared();
        info!("Instrumenting decorator enabled");
    }

    db
}
