//! 指标装饰器
//!
//! 包装任意 [`Database`]，为事务开启与语句执行记录调用次数、错误次数和耗时：
//!
//! | 操作 | 指标族 | 标签 |
//! |------|--------|------|
//! | begin 系列 | `sqlkit_sql_begin*` | 无 |
//! | execute / query / named / row / get / select 系列 | `sqlkit_sql_exec*` | `query` |
//!
//! 调用次数在转发前累加，耗时由守卫在调用结束（包括 panic 或被取消）时记录，
//! 错误次数仅在内层返回 `Err` 时累加。预编译、取连接、ping、close、连接池调优、
//! 内省与绑定工具直接转发，不记录指标。

mod registry;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::bind::BindType;
use crate::capability::{Database, ExecResult, PoolStats, SharedDatabase};
use crate::connection::Connection;
use crate::context::Context;
use crate::error::Result;
use crate::nop::NopDatabase;
use crate::row::{Row, Rows};
use crate::statement::{NamedStatement, Statement};
use crate::transaction::{Transaction, TxOptions};
use crate::value::{NamedArgs, Value};

use registry::Family;
pub use registry::{
    QUERY_LABEL, SQL_BEGIN, SQL_BEGIN_DURATION, SQL_BEGIN_ERRORS, SQL_EXEC_COUNT,
    SQL_EXEC_DURATION, SQL_EXEC_ERRORS, SqlMetrics,
};

/// 指标装饰器
#[derive(Clone)]
pub struct InstrumentedDatabase {
    inner: SharedDatabase,
    metrics: Arc<SqlMetrics>,
}

impl InstrumentedDatabase {
    pub fn new(inner: SharedDatabase, metrics: Arc<SqlMetrics>) -> Self {
        Self { inner, metrics }
    }

    /// 未指定内层时使用 [`NopDatabase`]
    pub fn builder(metrics: Arc<SqlMetrics>) -> InstrumentedDatabaseBuilder {
        InstrumentedDatabaseBuilder {
            inner: None,
            metrics,
        }
    }

    pub fn inner(&self) -> &SharedDatabase {
        &self.inner
    }

    pub fn metrics(&self) -> &Arc<SqlMetrics> {
        &self.metrics
    }

    pub fn into_shared(self) -> SharedDatabase {
        Arc::new(self)
    }

    async fn observe<T, F>(&self, family: Family<'_>, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.metrics.record_call(family);
        let _timer = self.metrics.start_timer(family);

        let result = call.await;
        if result.is_err() {
            self.metrics.record_error(family);
        }
        result
    }

    async fn observe_infallible<T, F>(&self, family: Family<'_>, call: F) -> T
    where
        F: Future<Output = T>,
    {
        self.metrics.record_call(family);
        let _timer = self.metrics.start_timer(family);
        call.await
    }
}

impl std::fmt::Debug for InstrumentedDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentedDatabase")
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

pub struct InstrumentedDatabaseBuilder {
    inner: Option<SharedDatabase>,
    metrics: Arc<SqlMetrics>,
}

impl InstrumentedDatabaseBuilder {
    pub fn inner(mut self, inner: SharedDatabase) -> Self {
        self.inner = Some(inner);
        self
    }

    pub fn build(self) -> InstrumentedDatabase {
        InstrumentedDatabase {
            inner: self.inner.unwrap_or_else(NopDatabase::shared),
            metrics: self.metrics,
        }
    }
}

#[async_trait]
impl Database for InstrumentedDatabase {
    async fn begin(&self) -> Result<Transaction> {
        self.observe(Family::Begin, self.inner.begin()).await
    }

    async fn begin_with(&self, ctx: &Context, options: TxOptions) -> Result<Transaction> {
        self.observe(Family::Begin, self.inner.begin_with(ctx, options))
            .await
    }

    async fn must_begin(&self) -> Transaction {
        self.observe_infallible(Family::Begin, self.inner.must_begin())
            .await
    }

    async fn must_begin_with(&self, ctx: &Context, options: TxOptions) -> Transaction {
        self.observe_infallible(Family::Begin, self.inner.must_begin_with(ctx, options))
            .await
    }

    async fn execute(&self, query: &str, args: &[Value]) -> Result<ExecResult> {
        self.observe(Family::Exec(query), self.inner.execute(query, args))
            .await
    }

    async fn execute_with(
        &self,
        ctx: &Context,
        query: &str,
        args: &[Value],
    ) -> Result<ExecResult> {
        self.observe(Family::Exec(query), self.inner.execute_with(ctx, query, args))
            .await
    }

    async fn must_execute(&self, query: &str, args: &[Value]) -> ExecResult {
        self.observe_infallible(Family::Exec(query), self.inner.must_execute(query, args))
            .await
    }

    async fn must_execute_with(&self, ctx: &Context, query: &str, args: &[Value]) -> ExecResult {
        self.observe_infallible(
            Family::Exec(query),
            self.inner.must_execute_with(ctx, query, args),
        )
        .await
    }

    async fn named_execute(&self, query: &str, args: &NamedArgs) -> Result<ExecResult> {
        self.observe(Family::Exec(query), self.inner.named_execute(query, args))
            .await
    }

    async fn named_execute_with(
        &self,
        ctx: &Context,
        query: &str,
        args: &NamedArgs,
    ) -> Result<ExecResult> {
        self.observe(
            Family::Exec(query),
            self.inner.named_execute_with(ctx, query, args),
        )
        .await
    }

    async fn query(&self, query: &str, args: &[Value]) -> Result<Rows> {
        self.observe(Family::Exec(query), self.inner.query(query, args))
            .await
    }

    async fn query_with(&self, ctx: &Context, query: &str, args: &[Value]) -> Result<Rows> {
        self.observe(Family::Exec(query), self.inner.query_with(ctx, query, args))
            .await
    }

    async fn query_row(&self, query: &str, args: &[Value]) -> Result<Option<Row>> {
        self.observe(Family::Exec(query), self.inner.query_row(query, args))
            .await
    }

    async fn query_row_with(
        &self,
        ctx: &Context,
        query: &str,
        args: &[Value],
    ) -> Result<Option<Row>> {
        self.observe(Family::Exec(query), self.inner.query_row_with(ctx, query, args))
            .await
    }

    async fn named_query(&self, query: &str, args: &NamedArgs) -> Result<Rows> {
        self.observe(Family::Exec(query), self.inner.named_query(query, args))
            .await
    }

    async fn named_query_with(
        &self,
        ctx: &Context,
        query: &str,
        args: &NamedArgs,
    ) -> Result<Rows> {
        self.observe(
            Family::Exec(query),
            self.inner.named_query_with(ctx, query, args),
        )
        .await
    }

    async fn get(&self, dest: &str, query: &str, args: &[Value]) -> Result<Option<Row>> {
        self.observe(Family::Exec(query), self.inner.get(dest, query, args))
            .await
    }

    async fn get_with(
        &self,
        ctx: &Context,
        dest: &str,
        query: &str,
        args: &[Value],
    ) -> Result<Option<Row>> {
        self.observe(Family::Exec(query), self.inner.get_with(ctx, dest, query, args))
            .await
    }

    async fn select(&self, dest: &str, query: &str, args: &[Value]) -> Result<Rows> {
        self.observe(Family::Exec(query), self.inner.select(dest, query, args))
            .await
    }

    async fn select_with(
        &self,
        ctx: &Context,
        dest: &str,
        query: &str,
        args: &[Value],
    ) -> Result<Rows> {
        self.observe(
            Family::Exec(query),
            self.inner.select_with(ctx, dest, query, args),
        )
        .await
    }

    // ==================== 直接转发 ====================

    async fn conn(&self) -> Result<Connection> {
        self.inner.conn().await
    }

    async fn conn_with(&self, ctx: &Context) -> Result<Connection> {
        self.inner.conn_with(ctx).await
    }

    async fn prepare(&self, query: &str) -> Result<Statement> {
        self.inner.prepare(query).await
    }

    async fn prepare_with(&self, ctx: &Context, query: &str) -> Result<Statement> {
        self.inner.prepare_with(ctx, query).await
    }

    async fn prepare_named(&self, query: &str) -> Result<NamedStatement> {
        self.inner.prepare_named(query).await
    }

    async fn prepare_named_with(&self, ctx: &Context, query: &str) -> Result<NamedStatement> {
        self.inner.prepare_named_with(ctx, query).await
    }

    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }

    async fn ping_with(&self, ctx: &Context) -> Result<()> {
        self.inner.ping_with(ctx).await
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }

    fn set_max_idle_conns(&self, n: u32) {
        self.inner.set_max_idle_conns(n);
    }

    fn set_max_open_conns(&self, n: u32) {
        self.inner.set_max_open_conns(n);
    }

    fn set_conn_max_lifetime(&self, duration: Option<Duration>) {
        self.inner.set_conn_max_lifetime(duration);
    }

    fn set_conn_max_idle_time(&self, duration: Option<Duration>) {
        self.inner.set_conn_max_idle_time(duration);
    }

    fn driver_name(&self) -> &'static str {
        self.inner.driver_name()
    }

    fn bind_type(&self) -> BindType {
        self.inner.bind_type()
    }

    fn stats(&self) -> PoolStats {
        self.inner.stats()
    }

    fn bind_named(&self, query: &str, args: &NamedArgs) -> Result<(String, Vec<Value>)> {
        self.inner.bind_named(query, args)
    }

    fn rebind(&self, query: &str) -> String {
        self.inner.rebind(query)
    }
}
