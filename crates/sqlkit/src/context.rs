//! 调用上下文
//!
//! 随每次调用显式传递：可选的追踪 ID（日志装饰器读取）与可选的截止时间
//! （基础驱动执行）。装饰器原样向内层传递，不修改也不覆盖。

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    trace_id: Option<String>,
    deadline: Option<Instant>,
}

impl Context {
    /// 不带追踪 ID、不带截止时间的上下文
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// 从当前时刻起计算截止时间
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}
