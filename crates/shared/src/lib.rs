//! 共享库
//!
//! 包含所有服务共用的配置加载、可观测性初始化以及测试辅助代码。

pub mod config;
pub mod observability;
pub mod test_utils;
