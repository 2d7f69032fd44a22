//! 分类服务
//!
//! 在 [`sqlkit::Database`] 能力之上实现分类实体的仓储，
//! 并按配置为基础句柄组合日志与指标装饰器。
//!
//! ## 模块结构
//!
//! - `models`: 领域模型
//! - `repository`: 仓储接口与 SQL 实现
//! - `bootstrap`: 装饰器组合
//! - `cli`: 命令行参数

pub mod bootstrap;
pub mod cli;
pub mod models;
pub mod repository;

pub use models::Taxonomy;
pub use repository::{
    Pagination, Query, Response, SqlTaxonomyRepository, SqlTaxonomyRepositoryBuilder,
    TaxonomyRepository,
};
