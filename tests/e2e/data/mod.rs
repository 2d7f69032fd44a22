//! 测试数据模块

mod fixtures;

pub use fixtures::*;
