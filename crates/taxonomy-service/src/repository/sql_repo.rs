//! 分类仓储的 SQL 实现
//!
//! 通过 [`Database`] 能力访问数据库，对其外层包裹了哪些装饰器无感知。
//! 仓储不包装错误：执行、查询和扫描错误原样返回。

use async_trait::async_trait;
use sqlkit::{
    Context, Database, DatabaseExt, DbError, LogSink, LoggingDatabase, NopDatabase, Result,
    SharedDatabase, Value,
};

use super::traits::{Query, Response, TaxonomyRepository};
use crate::models::Taxonomy;

const CREATE_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS taxonomy (id TEXT PRIMARY KEY, name TEXT NOT NULL)";

const CREATE_TAXONOMY: &str = "INSERT INTO taxonomy (id, name) VALUES ($1, $2)";

const READ_TAXONOMY_BY_ID: &str =
    "SELECT id, name FROM taxonomy WHERE id = $1 ORDER BY id LIMIT $2 OFFSET $3";

const READ_TAXONOMY_BY_NAME: &str =
    "SELECT id, name FROM taxonomy WHERE name = $1 ORDER BY id LIMIT $2 OFFSET $3";

const READ_TAXONOMY: &str = "SELECT id, name FROM taxonomy ORDER BY id LIMIT $1 OFFSET $2";

/// SQLite 中 `LIMIT -1` 表示不限制条数
const UNBOUNDED: i64 = -1;

/// 分类仓储
pub struct SqlTaxonomyRepository {
    db: SharedDatabase,
}

impl SqlTaxonomyRepository {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    pub fn builder() -> SqlTaxonomyRepositoryBuilder {
        SqlTaxonomyRepositoryBuilder::default()
    }

    pub fn database(&self) -> &SharedDatabase {
        &self.db
    }

    /// 建表（已存在时跳过）
    pub async fn ensure_schema(&self, ctx: &Context) -> Result<()> {
        self.db.execute_with(ctx, CREATE_SCHEMA, &[]).await?;
        Ok(())
    }
}

impl Default for SqlTaxonomyRepository {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// 按过滤条件选择查询语句：有 id 按 id，有 name 按 name，否则全部
fn read_statement(query: &Query) -> (&'static str, Vec<Value>) {
    let limit = match query.pagination.limit {
        0 => UNBOUNDED,
        limit => i64::try_from(limit).unwrap_or(i64::MAX),
    };
    let offset = i64::try_from(query.pagination.offset).unwrap_or(i64::MAX);

    let filter = &query.taxonomy;
    if !filter.id.is_empty() {
        (
            READ_TAXONOMY_BY_ID,
            vec![filter.id.as_str().into(), limit.into(), offset.into()],
        )
    } else if !filter.name.is_empty() {
        (
            READ_TAXONOMY_BY_NAME,
            vec![filter.name.as_str().into(), limit.into(), offset.into()],
        )
    } else {
        (READ_TAXONOMY, vec![limit.into(), offset.into()])
    }
}

#[async_trait]
impl TaxonomyRepository for SqlTaxonomyRepository {
    async fn create(&self, ctx: &Context, query: &Query) -> Result<()> {
        let taxonomy = &query.taxonomy;
        self.db
            .execute_with(
                ctx,
                CREATE_TAXONOMY,
                &[taxonomy.id.as_str().into(), taxonomy.name.as_str().into()],
            )
            .await?;
        Ok(())
    }

    async fn read(&self, ctx: &Context, query: &Query) -> Result<Response> {
        let (statement, args) = read_statement(query);
        let results: Vec<Taxonomy> = self.db.select_as(ctx, statement, &args).await?;
        Ok(Response::new(query.pagination, results))
    }

    async fn update(&self, _ctx: &Context, _query: &Query) -> Result<()> {
        Err(DbError::Unimplemented("taxonomy update"))
    }

    async fn delete(&self, _ctx: &Context, _query: &Query) -> Result<()> {
        Err(DbError::Unimplemented("taxonomy delete"))
    }
}

/// 仓储构建器
///
/// 未指定数据库时使用 [`NopDatabase`]；`with_logging` 在构建时为数据库包裹一层日志装饰器。
#[derive(Default)]
pub struct SqlTaxonomyRepositoryBuilder {
    db: Option<SharedDatabase>,
    logging: Option<LogSink>,
}

impl SqlTaxonomyRepositoryBuilder {
    pub fn with_database(mut self, db: SharedDatabase) -> Self {
        self.db = Some(db);
        self
    }

    pub fn with_logging(mut self, sink: LogSink) -> Self {
        self.logging = Some(sink);
        self
    }

    pub fn build(self) -> SqlTaxonomyRepository {
        let db = self.db.unwrap_or_else(NopDatabase::shared);
        let db = match self.logging {
            Some(sink) => LoggingDatabase::new(db, sink).into_shared(),
            None => db,
        };
        SqlTaxonomyRepository { db }
    }
}
