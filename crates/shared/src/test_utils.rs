//! 测试工具模块
//!
//! 提供集成测试所需的辅助函数：测试数据库配置、日志捕获 sink。
//! 用于简化测试代码编写，提高测试的可重复性和可维护性。

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::Dispatch;
use tracing_subscriber::fmt::MakeWriter;

use crate::config::DatabaseConfig;

// ==================== 测试配置辅助 ====================

/// 创建测试用数据库配置
///
/// 使用单连接的内存 SQLite：内存库与连接绑定，连接不回收、不过期，
/// 保证整个测试期间看到同一个库。可用 TEST_DATABASE_URL 覆盖。
pub fn test_database_config() -> DatabaseConfig {
    DatabaseConfig {
        url: std::env::var("TEST_DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string()),
        max_open_connections: 1,
        max_idle_connections: 1,
        connect_timeout_seconds: 5,
        idle_timeout_seconds: 0,
        max_lifetime_seconds: 0,
    }
}

// ==================== 日志捕获 ====================

/// 日志捕获器
///
/// 以 JSON（事件字段展平）格式把日志写入内存，测试中按行解析断言。
///
/// # Example
///
/// ```ignore
/// let capture = LogCapture::new();
/// let db = LoggingDatabase::builder()
///     .sink(LogSink::from_dispatch(capture.dispatch()))
///     .build();
/// db.ping().await?;
/// assert_eq!(capture.records().len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// 构建写入本捕获器的 dispatcher
    pub fn dispatch(&self) -> Dispatch {
        let subscriber = tracing_subscriber::fmt()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .with_writer(self.clone())
            .finish();

        Dispatch::new(subscriber)
    }

    /// 解析已捕获的全部日志记录
    pub fn records(&self) -> Vec<Value> {
        let buffer = self.buffer.lock();
        String::from_utf8_lossy(&buffer)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    /// 按 method 字段过滤日志记录
    pub fn records_for(&self, method: &str) -> Vec<Value> {
        self.records()
            .into_iter()
            .filter(|record| record["method"] == method)
            .collect()
    }

    /// 清空已捕获内容
    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

/// 单次写入句柄
pub struct CaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter {
            buffer: self.buffer.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_collects_json_records() {
        let capture = LogCapture::new();
        tracing::dispatcher::with_default(&capture.dispatch(), || {
            tracing::info!(method = "ping", "sql call");
            tracing::error!(method = "query", error_code = "DATABASE_ERROR", "boom");
        });

        let records = capture.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["level"], "INFO");
        assert_eq!(records[0]["method"], "ping");
        assert_eq!(records[1]["level"], "ERROR");
        assert_eq!(records[1]["error_code"], "DATABASE_ERROR");
        assert_eq!(records[1]["message"], "boom");
    }

    #[test]
    fn test_records_for_and_clear() {
        let capture = LogCapture::new();
        tracing::dispatcher::with_default(&capture.dispatch(), || {
            tracing::info!(method = "ping", "sql call");
            tracing::info!(method = "close", "sql call");
        });

        assert_eq!(capture.records_for("close").len(), 1);
        capture.clear();
        assert!(capture.records().is_empty());
    }

    #[test]
    fn test_database_config_is_single_connection() {
        let config = test_database_config();
        assert_eq!(config.max_open_connections, 1);
        assert_eq!(config.idle_timeout(), None);
    }
}
