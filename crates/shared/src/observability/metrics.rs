//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! recorder 不安装为全局 recorder，而是显式传递给需要记录指标的组件；
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics::Recorder;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// 耗时类直方图的分桶（秒）
pub const DURATION_BUCKETS: [f64; 5] = [0.1, 0.2, 0.3, 0.5, 1.0];

/// 耗时类指标的统一后缀，用于匹配分桶配置
pub const DURATION_SUFFIX: &str = "_duration";

/// Metrics 资源守卫
///
/// 持有 recorder 与渲染句柄，Drop 时停止 HTTP 服务。
pub struct MetricsHandle {
    recorder: Arc<PrometheusRecorder>,
    handle: PrometheusHandle,
    server_handle: Option<tokio::task::JoinHandle<()>>,
}

impl MetricsHandle {
    /// 获取共享的 recorder，交给需要记录指标的组件
    pub fn recorder(&self) -> Arc<PrometheusRecorder> {
        self.recorder.clone()
    }

    /// 渲染当前指标快照（Prometheus 文本格式）
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl Drop for MetricsHandle {
    fn drop(&mut self) {
        if let Some(server) = self.server_handle.take() {
            server.abort();
        }
    }
}

/// 构建 Prometheus recorder
///
/// 所有以 `_duration` 结尾的直方图使用 [`DURATION_BUCKETS`] 分桶，
/// 其余直方图按 summary 渲染。
pub fn build_recorder() -> Result<PrometheusRecorder> {
    let recorder = PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Suffix(DURATION_SUFFIX.to_string()), &DURATION_BUCKETS)?
        .build_recorder();

    Ok(recorder)
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let recorder = Arc::new(build_recorder()?);
    let handle = recorder.handle();

    register_service_metrics(recorder.as_ref(), &config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle.clone()).await?;

    Ok(MetricsHandle {
        recorder,
        handle,
        server_handle: Some(server_handle),
    })
}

/// 注册服务级别指标并记录一次启动
pub fn register_service_metrics(recorder: &dyn Recorder, service_name: &str) {
    metrics::with_local_recorder(recorder, || {
        metrics::describe_counter!("service_starts_total", "Total number of service starts");
        metrics::counter!("service_starts_total", "service" => service_name.to_string())
            .increment(1);
    });
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_start_is_rendered() {
        let recorder = build_recorder().unwrap();
        register_service_metrics(&recorder, "taxonomy-service");

        let output = recorder.handle().render();
        assert!(output.contains("# HELP service_starts_total"));
        assert!(output.contains(r#"service_starts_total{service="taxonomy-service"} 1"#));
    }

    #[test]
    fn test_duration_histograms_use_buckets() {
        let recorder = build_recorder().unwrap();
        metrics::with_local_recorder(&recorder, || {
            metrics::histogram!("probe_duration").record(0.15);
        });

        let output = recorder.handle().render();
        assert!(output.contains(r#"probe_duration_bucket{le="0.2"} 1"#));
        assert!(output.contains("probe_duration_count 1"));
    }
}
