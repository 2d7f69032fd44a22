//! No-op 实现
//!
//! 所有操作均为空操作：返回零值结果和 `Ok`，不产生任何可观察的副作用。
//! 作为装饰器和仓储在未接入真实句柄时的默认内层实现，
//! 保证"没有句柄"时安全地返回空数据，而不是空指针式的失败。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::bind::BindType;
use crate::capability::{Database, ExecResult, PoolStats, SharedDatabase};
use crate::connection::Connection;
use crate::context::Context;
use crate::error::Result;
use crate::row::{Row, Rows};
use crate::statement::{NamedStatement, Statement};
use crate::transaction::{Transaction, TxOptions};
use crate::value::{NamedArgs, Value};

#[derive(Debug, Clone, Copy, Default)]
pub struct NopDatabase;

impl NopDatabase {
    pub fn new() -> Self {
        Self
    }

    /// 以共享句柄形式返回
    pub fn shared() -> SharedDatabase {
        Arc::new(Self)
    }
}

#[async_trait]
impl Database for NopDatabase {
    async fn begin(&self) -> Result<Transaction> {
        Ok(Transaction::detached())
    }

    async fn begin_with(&self, _ctx: &Context, _options: TxOptions) -> Result<Transaction> {
        Ok(Transaction::detached())
    }

    // 没有真实资源可失败，must 版本退化为返回零值
    async fn must_begin(&self) -> Transaction {
        Transaction::detached()
    }

    async fn must_begin_with(&self, _ctx: &Context, _options: TxOptions) -> Transaction {
        Transaction::detached()
    }

    async fn execute(&self, _query: &str, _args: &[Value]) -> Result<ExecResult> {
        Ok(ExecResult::default())
    }

    async fn execute_with(
        &self,
        _ctx: &Context,
        _query: &str,
        _args: &[Value],
    ) -> Result<ExecResult> {
        Ok(ExecResult::default())
    }

    async fn must_execute(&self, _query: &str, _args: &[Value]) -> ExecResult {
        ExecResult::default()
    }

    async fn must_execute_with(&self, _ctx: &Context, _query: &str, _args: &[Value]) -> ExecResult {
        ExecResult::default()
    }

    async fn named_execute(&self, _query: &str, _args: &NamedArgs) -> Result<ExecResult> {
        Ok(ExecResult::default())
    }

    async fn named_execute_with(
        &self,
        _ctx: &Context,
        _query: &str,
        _args: &NamedArgs,
    ) -> Result<ExecResult> {
        Ok(ExecResult::default())
    }

    async fn query(&self, _query: &str, _args: &[Value]) -> Result<Rows> {
        Ok(Rows::default())
    }

    async fn query_with(&self, _ctx: &Context, _query: &str, _args: &[Value]) -> Result<Rows> {
        Ok(Rows::default())
    }

    async fn query_row(&self, _query: &str, _args: &[Value]) -> Result<Option<Row>> {
        Ok(None)
    }

    async fn query_row_with(
        &self,
        _ctx: &Context,
        _query: &str,
        _args: &[Value],
    ) -> Result<Option<Row>> {
        Ok(None)
    }

    async fn named_query(&self, _query: &str, _args: &NamedArgs) -> Result<Rows> {
        Ok(Rows::default())
    }

    async fn named_query_with(
        &self,
        _ctx: &Context,
        _query: &str,
        _args: &NamedArgs,
    ) -> Result<Rows> {
        Ok(Rows::default())
    }

    async fn get(&self, _dest: &str, _query: &str, _args: &[Value]) -> Result<Option<Row>> {
        Ok(None)
    }

    async fn get_with(
        &self,
        _ctx: &Context,
        _dest: &str,
        _query: &str,
        _args: &[Value],
    ) -> Result<Option<Row>> {
        Ok(None)
    }

    async fn select(&self, _dest: &str, _query: &str, _args: &[Value]) -> Result<Rows> {
        Ok(Rows::default())
    }

    async fn select_with(
        &self,
        _ctx: &Context,
        _dest: &str,
        _query: &str,
        _args: &[Value],
    ) -> Result<Rows> {
        Ok(Rows::default())
    }

    async fn prepare(&self, _query: &str) -> Result<Statement> {
        Ok(Statement::default())
    }

    async fn prepare_with(&self, _ctx: &Context, _query: &str) -> Result<Statement> {
        Ok(Statement::default())
    }

    async fn prepare_named(&self, _query: &str) -> Result<NamedStatement> {
        Ok(NamedStatement::default())
    }

    async fn prepare_named_with(&self, _ctx: &Context, _query: &str) -> Result<NamedStatement> {
        Ok(NamedStatement::default())
    }

    async fn conn(&self) -> Result<Connection> {
        Ok(Connection::detached())
    }

    async fn conn_with(&self, _ctx: &Context) -> Result<Connection> {
        Ok(Connection::detached())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn ping_with(&self, _ctx: &Context) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn set_max_idle_conns(&self, _n: u32) {}

    fn set_max_open_conns(&self, _n: u32) {}

    fn set_conn_max_lifetime(&self, _duration: Option<Duration>) {}

    fn set_conn_max_idle_time(&self, _duration: Option<Duration>) {}

    fn driver_name(&self) -> &'static str {
        ""
    }

    fn bind_type(&self) -> BindType {
        BindType::default()
    }

    fn stats(&self) -> PoolStats {
        PoolStats::default()
    }

    fn bind_named(&self, _query: &str, _args: &NamedArgs) -> Result<(String, Vec<Value>)> {
        Ok((String::new(), Vec::new()))
    }

    fn rebind(&self, _query: &str) -> String {
        String::new()
    }
}
