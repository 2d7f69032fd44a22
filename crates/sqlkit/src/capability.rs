//! 数据库能力契约
//!
//! `Database` 是基础驱动句柄、no-op 实现和所有装饰器共同实现的接口。
//! 装饰器持有一个 `Arc<dyn Database>` 作为内层实现，把每个调用原样转发，
//! 因此可以任意顺序、任意层数组合，对仓储和更外层的装饰器透明。
//!
//! ## 约定
//!
//! - 每个操作都有无上下文版本和 `*_with(&Context, ..)` 版本
//! - 单纯转发的实现必须原样返回内层的结果与错误
//! - `must_*` 版本在真实驱动中失败即 panic；no-op 实现返回零值

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::bind::BindType;
use crate::connection::Connection;
use crate::context::Context;
use crate::error::Result;
use crate::row::{Row, Rows};
use crate::statement::{NamedStatement, Statement};
use crate::transaction::{Transaction, TxOptions};
use crate::value::{NamedArgs, Value};

/// 语句执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecResult {
    pub rows_affected: u64,
    pub last_insert_id: Option<i64>,
}

/// 连接池统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// 最大打开连接数
    pub max_open_connections: u32,
    /// 当前打开连接数（使用中 + 空闲）
    pub open_connections: u32,
    pub in_use: u32,
    pub idle: u32,
    /// 配置的空闲连接数上限
    pub max_idle_connections: u32,
    pub max_lifetime: Option<Duration>,
    pub max_idle_time: Option<Duration>,
}

/// 共享的能力句柄
pub type SharedDatabase = Arc<dyn Database>;

/// 数据库能力
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait Database: Send + Sync {
    // ==================== 事务 ====================

    async fn begin(&self) -> Result<Transaction>;

    async fn begin_with(&self, ctx: &Context, options: TxOptions) -> Result<Transaction>;

    /// # Panics
    ///
    /// 真实驱动开启事务失败时 panic。
    async fn must_begin(&self) -> Transaction;

    /// # Panics
    ///
    /// 真实驱动开启事务失败时 panic。
    async fn must_begin_with(&self, ctx: &Context, options: TxOptions) -> Transaction;

    // ==================== 执行 ====================

    async fn execute(&self, query: &str, args: &[Value]) -> Result<ExecResult>;

    async fn execute_with(&self, ctx: &Context, query: &str, args: &[Value])
    -> Result<ExecResult>;

    /// # Panics
    ///
    /// 真实驱动执行失败时 panic。
    async fn must_execute(&self, query: &str, args: &[Value]) -> ExecResult;

    /// # Panics
    ///
    /// 真实驱动执行失败时 panic。
    async fn must_execute_with(&self, ctx: &Context, query: &str, args: &[Value]) -> ExecResult;

    async fn named_execute(&self, query: &str, args: &NamedArgs) -> Result<ExecResult>;

    async fn named_execute_with(
        &self,
        ctx: &Context,
        query: &str,
        args: &NamedArgs,
    ) -> Result<ExecResult>;

    // ==================== 查询 ====================

    async fn query(&self, query: &str, args: &[Value]) -> Result<Rows>;

    async fn query_with(&self, ctx: &Context, query: &str, args: &[Value]) -> Result<Rows>;

    /// 单行查询，没有结果时返回 `None`
    async fn query_row(&self, query: &str, args: &[Value]) -> Result<Option<Row>>;

    async fn query_row_with(
        &self,
        ctx: &Context,
        query: &str,
        args: &[Value],
    ) -> Result<Option<Row>>;

    async fn named_query(&self, query: &str, args: &NamedArgs) -> Result<Rows>;

    async fn named_query_with(&self, ctx: &Context, query: &str, args: &NamedArgs)
    -> Result<Rows>;

    // ==================== 按目标类型扫描 ====================
    //
    // `dest` 描述扫描目标（通常是 `std::any::type_name`），只用于观测，
    // 行到实体的转换由调用方完成，见 [`crate::DatabaseExt`]。

    /// 单行查询，没有结果时返回 `None`
    async fn get(&self, dest: &str, query: &str, args: &[Value]) -> Result<Option<Row>>;

    async fn get_with(
        &self,
        ctx: &Context,
        dest: &str,
        query: &str,
        args: &[Value],
    ) -> Result<Option<Row>>;

    async fn select(&self, dest: &str, query: &str, args: &[Value]) -> Result<Rows>;

    async fn select_with(
        &self,
        ctx: &Context,
        dest: &str,
        query: &str,
        args: &[Value],
    ) -> Result<Rows>;

    // ==================== 预编译语句 ====================

    async fn prepare(&self, query: &str) -> Result<Statement>;

    async fn prepare_with(&self, ctx: &Context, query: &str) -> Result<Statement>;

    async fn prepare_named(&self, query: &str) -> Result<NamedStatement>;

    async fn prepare_named_with(&self, ctx: &Context, query: &str) -> Result<NamedStatement>;

    // ==================== 连接 ====================

    /// 从连接池取出一个独占连接
    async fn conn(&self) -> Result<Connection>;

    async fn conn_with(&self, ctx: &Context) -> Result<Connection>;

    async fn ping(&self) -> Result<()>;

    async fn ping_with(&self, ctx: &Context) -> Result<()>;

    /// 关闭底层连接池，之后的操作返回错误
    async fn close(&self) -> Result<()>;

    // ==================== 连接池调优 ====================

    /// 空闲连接数上限，仅作为配置记录在 [`PoolStats`] 中；
    /// 空闲连接由 `set_conn_max_idle_time` 回收，不会因此常驻
    fn set_max_idle_conns(&self, n: u32);

    fn set_max_open_conns(&self, n: u32);

    /// `None` 表示连接不过期
    fn set_conn_max_lifetime(&self, duration: Option<Duration>);

    /// `None` 表示不回收空闲连接
    fn set_conn_max_idle_time(&self, duration: Option<Duration>);

    // ==================== 内省 ====================

    fn driver_name(&self) -> &'static str;

    fn bind_type(&self) -> BindType;

    fn stats(&self) -> PoolStats;

    // ==================== 绑定工具 ====================

    /// 把 `:name` 参数编译为驱动占位符，并按顺序取出参数值
    fn bind_named(&self, query: &str, args: &NamedArgs) -> Result<(String, Vec<Value>)>;

    /// 把 `?` 占位符改写为驱动的绑定风格
    fn rebind(&self, query: &str) -> String;
}
