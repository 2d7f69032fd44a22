//! 日志输出目标
//!
//! 日志装饰器把每条调用记录写入一个 tracing `Dispatch`，
//! 与进程全局 subscriber 相互独立。

use std::fmt;

use tracing::{Dispatch, Level};

/// 日志装饰器的输出目标
#[derive(Clone)]
pub struct LogSink {
    dispatch: Dispatch,
}

impl LogSink {
    /// 丢弃所有记录（默认）
    pub fn discard() -> Self {
        Self {
            dispatch: Dispatch::none(),
        }
    }

    /// 以 JSON 行写入标准输出
    pub fn stdout() -> Self {
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_target(true)
            .with_max_level(Level::INFO)
            .with_writer(std::io::stdout)
            .finish();

        Self::from_dispatch(Dispatch::new(subscriber))
    }

    /// 使用构造时生效的 dispatcher（通常是进程全局 subscriber）
    pub fn current() -> Self {
        Self::from_dispatch(tracing::dispatcher::get_default(Dispatch::clone))
    }

    pub fn from_dispatch(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }

    pub(crate) fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::discard()
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSink").finish_non_exhaustive()
    }
}
