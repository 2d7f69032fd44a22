//! SQL 指标注册表
//!
//! 显式构造、显式传递：多个装饰器共享同一个注册表时，
//! 同名同标签的序列累加到一起。不依赖进程全局 recorder。

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use metrics::{Counter, Histogram, Recorder, Unit};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use taxonomy_shared::observability::metrics::{DURATION_BUCKETS, DURATION_SUFFIX};

// ==================== 指标名称 ====================

pub const SQL_BEGIN: &str = "sqlkit_sql_begin";
pub const SQL_BEGIN_ERRORS: &str = "sqlkit_sql_begin_errors";
pub const SQL_BEGIN_DURATION: &str = "sqlkit_sql_begin_duration";

pub const SQL_EXEC_COUNT: &str = "sqlkit_sql_exec_count";
pub const SQL_EXEC_ERRORS: &str = "sqlkit_sql_exec_errors";
pub const SQL_EXEC_DURATION: &str = "sqlkit_sql_exec_duration";

/// 查询文本标签。每个不同的查询字面量都会产生独立序列，
/// 动态拼接的 SQL 会让序列数无限增长，应使用模板化查询。
pub const QUERY_LABEL: &str = "query";

/// 指标族
#[derive(Debug, Clone, Copy)]
pub(crate) enum Family<'q> {
    /// 开启事务，无标签
    Begin,
    /// 执行与查询，按查询文本打标签
    Exec(&'q str),
}

impl Family<'_> {
    fn names(self) -> (&'static str, &'static str, &'static str) {
        match self {
            Self::Begin => (SQL_BEGIN, SQL_BEGIN_ERRORS, SQL_BEGIN_DURATION),
            Self::Exec(_) => (SQL_EXEC_COUNT, SQL_EXEC_ERRORS, SQL_EXEC_DURATION),
        }
    }
}

/// SQL 指标注册表
#[derive(Clone)]
pub struct SqlMetrics {
    recorder: Arc<dyn Recorder + Send + Sync>,
    handle: Option<PrometheusHandle>,
}

impl SqlMetrics {
    /// 使用已有的 recorder（例如服务级 Prometheus recorder）
    pub fn new(recorder: Arc<dyn Recorder + Send + Sync>) -> Self {
        let metrics = Self {
            recorder,
            handle: None,
        };
        metrics.describe();
        metrics
    }

    /// 独立的 Prometheus 注册表，可通过 [`SqlMetrics::render`] 导出
    pub fn prometheus() -> Result<Self, BuildError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Suffix(DURATION_SUFFIX.to_string()), &DURATION_BUCKETS)?
            .build_recorder();
        let handle = recorder.handle();

        let mut metrics = Self::new(Arc::new(recorder));
        metrics.handle = Some(handle);
        Ok(metrics)
    }

    /// 渲染 Prometheus 文本格式；非 Prometheus 注册表返回 `None`
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }

    fn describe(&self) {
        metrics::with_local_recorder(self.recorder.as_ref(), || {
            metrics::describe_counter!(SQL_BEGIN, "Total number of transactions begun");
            metrics::describe_counter!(SQL_BEGIN_ERRORS, "Total number of failed transaction begins");
            metrics::describe_histogram!(
                SQL_BEGIN_DURATION,
                Unit::Seconds,
                "Time spent beginning transactions"
            );
            metrics::describe_counter!(SQL_EXEC_COUNT, "Total number of statements executed per query");
            metrics::describe_counter!(SQL_EXEC_ERRORS, "Total number of failed statements per query");
            metrics::describe_histogram!(
                SQL_EXEC_DURATION,
                Unit::Seconds,
                "Time spent executing statements per query"
            );
        });
    }

    fn counter(&self, name: &'static str, family: Family<'_>) -> Counter {
        metrics::with_local_recorder(self.recorder.as_ref(), || match family {
            Family::Begin => metrics::counter!(name),
            Family::Exec(query) => metrics::counter!(name, QUERY_LABEL => query.to_owned()),
        })
    }

    fn histogram(&self, name: &'static str, family: Family<'_>) -> Histogram {
        metrics::with_local_recorder(self.recorder.as_ref(), || match family {
            Family::Begin => metrics::histogram!(name),
            Family::Exec(query) => metrics::histogram!(name, QUERY_LABEL => query.to_owned()),
        })
    }

    pub(crate) fn record_call(&self, family: Family<'_>) {
        let (calls, _, _) = family.names();
        self.counter(calls, family).increment(1);
    }

    pub(crate) fn record_error(&self, family: Family<'_>) {
        let (_, errors, _) = family.names();
        self.counter(errors, family).increment(1);
    }

    pub(crate) fn start_timer(&self, family: Family<'_>) -> DurationGuard {
        let (_, _, duration) = family.names();
        DurationGuard {
            histogram: self.histogram(duration, family),
            start: Instant::now(),
        }
    }
}

impl fmt::Debug for SqlMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlMetrics")
            .field("prometheus", &self.handle.is_some())
            .finish_non_exhaustive()
    }
}

/// 耗时守卫，Drop 时记录一次耗时（秒）
///
/// 调用 panic 或 future 被丢弃时同样会记录。
pub(crate) struct DurationGuard {
    histogram: Histogram,
    start: Instant,
}

impl Drop for DurationGuard {
    fn drop(&mut self) {
        self.histogram.record(self.start.elapsed().as_secs_f64());
    }
}
