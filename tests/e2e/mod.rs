//! 分类服务端到端测试
//!
//! 在内存 SQLite 上组装完整链路（仓储 → 装饰器 → 基础句柄），覆盖：
//! - 仓储读写与分页
//! - 装饰器透明性与副作用
//! - 命令行参数驱动的装饰器组合

pub mod data;
pub mod setup;
pub mod suites;

pub use setup::TestEnvironment;
