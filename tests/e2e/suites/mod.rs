//! 测试套件模块

pub mod bootstrap;
pub mod decorators;
pub mod repository;
