//! 仓储 Trait 定义
//!
//! 服务层依赖仓储抽象而非具体实现

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlkit::{Context, Result};

use crate::models::Taxonomy;

/// 分页参数
///
/// 请求中 `limit` 为 0 表示不限制条数；响应中 `count` 是实际返回的条数。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u64,
    pub offset: u64,
    pub count: u64,
}

impl Pagination {
    pub fn new(limit: u64, offset: u64) -> Self {
        Self {
            limit,
            offset,
            count: 0,
        }
    }
}

/// 仓储查询：分页 + 实体过滤条件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub pagination: Pagination,
    pub taxonomy: Taxonomy,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn with_taxonomy(mut self, taxonomy: Taxonomy) -> Self {
        self.taxonomy = taxonomy;
        self
    }
}

/// 仓储响应
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Response {
    pub pagination: Pagination,
    pub results: Vec<Taxonomy>,
}

impl Response {
    /// 回显请求的 limit/offset，`count` 取实际结果条数
    pub fn new(requested: Pagination, results: Vec<Taxonomy>) -> Self {
        Self {
            pagination: Pagination {
                count: results.len() as u64,
                ..requested
            },
            results,
        }
    }
}

/// 分类仓储接口
#[async_trait]
pub trait TaxonomyRepository: Send + Sync {
    async fn create(&self, ctx: &Context, query: &Query) -> Result<()>;
    async fn read(&self, ctx: &Context, query: &Query) -> Result<Response>;
    async fn update(&self, ctx: &Context, query: &Query) -> Result<()>;
    async fn delete(&self, ctx: &Context, query: &Query) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_count_follows_results() {
        let requested = Pagination {
            limit: 10,
            offset: 20,
            count: 99,
        };
        let response = Response::new(requested, vec![Taxonomy::new("a", "x")]);
        assert_eq!(response.pagination, Pagination { limit: 10, offset: 20, count: 1 });
    }
}
