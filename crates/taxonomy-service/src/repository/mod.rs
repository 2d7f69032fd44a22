//! 数据库仓储层

mod sql_repo;
mod traits;

pub use sql_repo::{SqlTaxonomyRepository, SqlTaxonomyRepositoryBuilder};
pub use traits::{Pagination, Query, Response, TaxonomyRepository};
