//! SQLite 基础句柄
//!
//! 基于 sqlx 连接池实现 [`Database`]。行在离开驱动前被物化为 [`Row`]，
//! 上下文中的截止时间在这里执行（超时返回 [`DbError::DeadlineExceeded`]）。
//!
//! sqlx 的连接池参数在构造后不可修改，因此连接池调优会按新参数重建一个
//! 延迟连接的池并原子替换；已借出的连接和未结束的事务继续使用旧池。

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use parking_lot::Mutex;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteQueryResult,
    SqliteRow,
};
use sqlx::pool::PoolConnection;
use sqlx::{
    Column, Connection as SqlxConnection, Either, Executor, Row as SqlxRow, Sqlite,
    Statement as SqlxStatement, TypeInfo, ValueRef,
};
use taxonomy_shared::config::DatabaseConfig;
use tracing::{debug, info, instrument, warn};

use crate::bind::{self, BindType};
use crate::capability::{Database, ExecResult, PoolStats};
use crate::connection::{Connection, ConnectionDriver};
use crate::context::Context;
use crate::error::{DbError, Result};
use crate::row::{Row, Rows};
use crate::statement::{NamedStatement, Statement};
use crate::transaction::{IsolationLevel, Transaction, TransactionDriver, TxOptions};
use crate::value::{NamedArgs, Value};

pub const DRIVER_NAME: &str = "sqlite";

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// 连接池参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PoolTuning {
    /// 0 表示不限制
    max_open: u32,
    /// 只记录在统计中：sqlx 没有空闲上限，只有常驻下限（min_connections）
    max_idle: u32,
    acquire_timeout: Duration,
    max_lifetime: Option<Duration>,
    max_idle_time: Option<Duration>,
}

impl PoolTuning {
    fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            max_open: config.max_open_connections,
            max_idle: config.max_idle_connections,
            acquire_timeout: config.connect_timeout(),
            max_lifetime: config.max_lifetime(),
            max_idle_time: config.idle_timeout(),
        }
    }

    fn max_connections(&self) -> u32 {
        if self.max_open == 0 {
            u32::MAX
        } else {
            self.max_open
        }
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        let max_connections = self.max_connections();
        SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(self.acquire_timeout)
            .max_lifetime(self.max_lifetime)
            .idle_timeout(self.max_idle_time)
    }
}

/// SQLite 数据库句柄
pub struct SqliteDatabase {
    connect_options: SqliteConnectOptions,
    tuning: Mutex<PoolTuning>,
    pool: ArcSwap<SqlitePool>,
}

impl SqliteDatabase {
    /// 按配置建立连接池，并立即校验一个连接
    #[instrument(skip(config))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database...");

        let connect_options = SqliteConnectOptions::from_str(&config.url)?;
        let tuning = PoolTuning::from_config(config);
        let pool = tuning
            .pool_options()
            .connect_with(connect_options.clone())
            .await?;

        info!(
            max_open = tuning.max_open,
            max_idle = tuning.max_idle,
            "Database connection pool created"
        );

        Ok(Self {
            connect_options,
            tuning: Mutex::new(tuning),
            pool: ArcSwap::from_pointee(pool),
        })
    }

    /// 当前连接池
    pub fn pool(&self) -> Arc<SqlitePool> {
        self.pool.load_full()
    }

    fn retune(&self, update: impl FnOnce(&mut PoolTuning)) {
        let mut tuning = self.tuning.lock();
        let previous = *tuning;
        update(&mut tuning);

        if *tuning == previous || self.pool.load().is_closed() {
            return;
        }
        if tokio::runtime::Handle::try_current().is_err() {
            warn!("Pool tuning outside a Tokio runtime, new limits are not applied");
            return;
        }

        let pool = tuning
            .pool_options()
            .connect_lazy_with(self.connect_options.clone());
        self.pool.store(Arc::new(pool));

        debug!(
            max_open = tuning.max_open,
            max_idle = tuning.max_idle,
            max_lifetime = ?tuning.max_lifetime,
            max_idle_time = ?tuning.max_idle_time,
            "Database connection pool rebuilt"
        );
    }

    async fn run_begin(&self, options: TxOptions) -> Result<Transaction> {
        check_tx_options(options)?;
        let tx = self.pool.load_full().begin().await?;
        Ok(Transaction::new(options, Box::new(SqliteTransaction { tx })))
    }

    async fn run_execute(&self, query: &str, args: &[Value]) -> Result<ExecResult> {
        let pool = self.pool.load_full();
        let done = bind_values(sqlx::query(query), args)
            .execute(&*pool)
            .await?;
        Ok(exec_result(&done))
    }

    async fn run_query(&self, query: &str, args: &[Value]) -> Result<Rows> {
        let pool = self.pool.load_full();
        let rows = bind_values(sqlx::query(query), args)
            .fetch_all(&*pool)
            .await?;
        materialize(&rows)
    }

    async fn run_query_row(&self, query: &str, args: &[Value]) -> Result<Option<Row>> {
        let pool = self.pool.load_full();
        let row = bind_values(sqlx::query(query), args)
            .fetch_optional(&*pool)
            .await?;
        row.as_ref().map(materialize_one).transpose()
    }

    async fn run_prepare(&self, query: &str) -> Result<Statement> {
        let pool = self.pool.load_full();
        let prepared = (&*pool).prepare(query).await?;

        let parameters = match prepared.parameters() {
            Some(Either::Left(types)) => types.len(),
            Some(Either::Right(count)) => count,
            None => 0,
        };

        Ok(Statement {
            query: query.to_string(),
            parameters,
            columns: prepared
                .columns()
                .iter()
                .map(|column| column.name().to_string())
                .collect(),
        })
    }

    async fn run_prepare_named(&self, query: &str) -> Result<NamedStatement> {
        let (bound, names) = bind::compile_named(self.bind_type(), query);
        let statement = self.run_prepare(&bound).await?;
        Ok(NamedStatement {
            query: query.to_string(),
            names,
            statement,
        })
    }

    async fn run_acquire(&self) -> Result<Connection> {
        let conn = self.pool.load_full().acquire().await?;
        Ok(Connection::new(Box::new(PooledConnection { conn })))
    }

    async fn run_ping(&self) -> Result<()> {
        let pool = self.pool.load_full();
        let mut conn = pool.acquire().await?;
        conn.ping().await?;
        Ok(())
    }
}

impl std::fmt::Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDatabase")
            .field("tuning", &*self.tuning.lock())
            .finish_non_exhaustive()
    }
}

/// 在上下文截止时间内完成调用
async fn within<T, F>(ctx: &Context, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match ctx.deadline() {
        Some(deadline) => tokio::time::timeout_at(deadline, call)
            .await
            .map_err(|_| DbError::DeadlineExceeded)?,
        None => call.await,
    }
}

fn check_tx_options(options: TxOptions) -> Result<()> {
    // SQLite 事务总是可串行化的
    if !matches!(
        options.isolation,
        IsolationLevel::Default | IsolationLevel::Serializable
    ) {
        return Err(DbError::Unsupported {
            driver: DRIVER_NAME,
            feature: "isolation levels other than serializable",
        });
    }
    if options.read_only {
        return Err(DbError::Unsupported {
            driver: DRIVER_NAME,
            feature: "read-only transactions",
        });
    }
    Ok(())
}

fn bind_values<'q>(mut query: SqliteQuery<'q>, args: &'q [Value]) -> SqliteQuery<'q> {
    for arg in args {
        query = match arg {
            Value::Null => query.bind(None::<i64>),
            Value::Bool(v) => query.bind(*v),
            Value::Int(v) => query.bind(*v),
            Value::Float(v) => query.bind(*v),
            Value::Text(v) => query.bind(v.as_str()),
            Value::Bytes(v) => query.bind(v.as_slice()),
        };
    }
    query
}

fn exec_result(done: &SqliteQueryResult) -> ExecResult {
    ExecResult {
        rows_affected: done.rows_affected(),
        last_insert_id: Some(done.last_insert_rowid()),
    }
}

fn column_names(row: &SqliteRow) -> Arc<[String]> {
    row.columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect()
}

fn materialize(rows: &[SqliteRow]) -> Result<Rows> {
    let Some(first) = rows.first() else {
        return Ok(Rows::default());
    };
    let columns = column_names(first);

    rows.iter()
        .map(|row| Ok(Row::new(columns.clone(), decode_values(row)?)))
        .collect::<Result<Vec<_>>>()
        .map(Rows::new)
}

fn materialize_one(row: &SqliteRow) -> Result<Row> {
    Ok(Row::new(column_names(row), decode_values(row)?))
}

fn decode_values(row: &SqliteRow) -> Result<Vec<Value>> {
    (0..row.len()).map(|index| decode_value(row, index)).collect()
}

/// 按值的运行时存储类型解码
fn decode_value(row: &SqliteRow, index: usize) -> Result<Value> {
    let type_name = {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        raw.type_info().name().to_string()
    };

    let value = match type_name.as_str() {
        "INTEGER" => Value::Int(row.try_get_unchecked::<i64, _>(index)?),
        "BOOLEAN" => Value::Bool(row.try_get_unchecked::<bool, _>(index)?),
        "REAL" | "NUMERIC" => Value::Float(row.try_get_unchecked::<f64, _>(index)?),
        "BLOB" => Value::Bytes(row.try_get_unchecked::<Vec<u8>, _>(index)?),
        _ => Value::Text(row.try_get_unchecked::<String, _>(index)?),
    };
    Ok(value)
}

/// sqlx 事务后端
///
/// 未提交即被丢弃时 sqlx 自动回滚。
struct SqliteTransaction {
    tx: sqlx::Transaction<'static, Sqlite>,
}

#[async_trait]
impl TransactionDriver for SqliteTransaction {
    async fn execute(&mut self, query: &str, args: &[Value]) -> Result<ExecResult> {
        let done = bind_values(sqlx::query(query), args)
            .execute(&mut *self.tx)
            .await?;
        Ok(exec_result(&done))
    }

    async fn query(&mut self, query: &str, args: &[Value]) -> Result<Rows> {
        let rows = bind_values(sqlx::query(query), args)
            .fetch_all(&mut *self.tx)
            .await?;
        materialize(&rows)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// 连接池中的独占连接，丢弃时归还
struct PooledConnection {
    conn: PoolConnection<Sqlite>,
}

#[async_trait]
impl ConnectionDriver for PooledConnection {
    async fn execute(&mut self, query: &str, args: &[Value]) -> Result<ExecResult> {
        let done = bind_values(sqlx::query(query), args)
            .execute(&mut *self.conn)
            .await?;
        Ok(exec_result(&done))
    }

    async fn query(&mut self, query: &str, args: &[Value]) -> Result<Rows> {
        let rows = bind_values(sqlx::query(query), args)
            .fetch_all(&mut *self.conn)
            .await?;
        materialize(&rows)
    }

    async fn ping(&mut self) -> Result<()> {
        self.conn.ping().await?;
        Ok(())
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn begin(&self) -> Result<Transaction> {
        self.run_begin(TxOptions::default()).await
    }

    async fn begin_with(&self, ctx: &Context, options: TxOptions) -> Result<Transaction> {
        within(ctx, self.run_begin(options)).await
    }

    async fn must_begin(&self) -> Transaction {
        match self.begin().await {
            Ok(tx) => tx,
            Err(err) => panic!("sqlite: begin transaction failed: {err}"),
        }
    }

    async fn must_begin_with(&self, ctx: &Context, options: TxOptions) -> Transaction {
        match self.begin_with(ctx, options).await {
            Ok(tx) => tx,
            Err(err) => panic!("sqlite: begin transaction failed: {err}"),
        }
    }

    async fn execute(&self, query: &str, args: &[Value]) -> Result<ExecResult> {
        self.run_execute(query, args).await
    }

    async fn execute_with(
        &self,
        ctx: &Context,
        query: &str,
        args: &[Value],
    ) -> Result<ExecResult> {
        within(ctx, self.run_execute(query, args)).await
    }

    async fn must_execute(&self, query: &str, args: &[Value]) -> ExecResult {
        match self.execute(query, args).await {
            Ok(done) => done,
            Err(err) => panic!("sqlite: execute {query:?} failed: {err}"),
        }
    }

    async fn must_execute_with(&self, ctx: &Context, query: &str, args: &[Value]) -> ExecResult {
        match self.execute_with(ctx, query, args).await {
            Ok(done) => done,
            Err(err) => panic!("sqlite: execute {query:?} failed: {err}"),
        }
    }

    async fn named_execute(&self, query: &str, args: &NamedArgs) -> Result<ExecResult> {
        let (bound, values) = self.bind_named(query, args)?;
        self.run_execute(&bound, &values).await
    }

    async fn named_execute_with(
        &self,
        ctx: &Context,
        query: &str,
        args: &NamedArgs,
    ) -> Result<ExecResult> {
        let (bound, values) = self.bind_named(query, args)?;
        within(ctx, self.run_execute(&bound, &values)).await
    }

    async fn query(&self, query: &str, args: &[Value]) -> Result<Rows> {
        self.run_query(query, args).await
    }

    async fn query_with(&self, ctx: &Context, query: &str, args: &[Value]) -> Result<Rows> {
        within(ctx, self.run_query(query, args)).await
    }

    async fn query_row(&self, query: &str, args: &[Value]) -> Result<Option<Row>> {
        self.run_query_row(query, args).await
    }

    async fn query_row_with(
        &self,
        ctx: &Context,
        query: &str,
        args: &[Value],
    ) -> Result<Option<Row>> {
        within(ctx, self.run_query_row(query, args)).await
    }

    async fn named_query(&self, query: &str, args: &NamedArgs) -> Result<Rows> {
        let (bound, values) = self.bind_named(query, args)?;
        self.run_query(&bound, &values).await
    }

    async fn named_query_with(
        &self,
        ctx: &Context,
        query: &str,
        args: &NamedArgs,
    ) -> Result<Rows> {
        let (bound, values) = self.bind_named(query, args)?;
        within(ctx, self.run_query(&bound, &values)).await
    }

    async fn get(&self, _dest: &str, query: &str, args: &[Value]) -> Result<Option<Row>> {
        self.run_query_row(query, args).await
    }

    async fn get_with(
        &self,
        ctx: &Context,
        _dest: &str,
        query: &str,
        args: &[Value],
    ) -> Result<Option<Row>> {
        within(ctx, self.run_query_row(query, args)).await
    }

    async fn select(&self, _dest: &str, query: &str, args: &[Value]) -> Result<Rows> {
        self.run_query(query, args).await
    }

    async fn select_with(
        &self,
        ctx: &Context,
        _dest: &str,
        query: &str,
        args: &[Value],
    ) -> Result<Rows> {
        within(ctx, self.run_query(query, args)).await
    }

    async fn prepare(&self, query: &str) -> Result<Statement> {
        self.run_prepare(query).await
    }

    async fn prepare_with(&self, ctx: &Context, query: &str) -> Result<Statement> {
        within(ctx, self.run_prepare(query)).await
    }

    async fn prepare_named(&self, query: &str) -> Result<NamedStatement> {
        self.run_prepare_named(query).await
    }

    async fn prepare_named_with(&self, ctx: &Context, query: &str) -> Result<NamedStatement> {
        within(ctx, self.run_prepare_named(query)).await
    }

    async fn conn(&self) -> Result<Connection> {
        self.run_acquire().await
    }

    async fn conn_with(&self, ctx: &Context) -> Result<Connection> {
        within(ctx, self.run_acquire()).await
    }

    async fn ping(&self) -> Result<()> {
        self.run_ping().await
    }

    async fn ping_with(&self, ctx: &Context) -> Result<()> {
        within(ctx, self.run_ping()).await
    }

    async fn close(&self) -> Result<()> {
        self.pool.load_full().close().await;
        info!("Database connection pool closed");
        Ok(())
    }

    fn set_max_idle_conns(&self, n: u32) {
        self.retune(|tuning| tuning.max_idle = n);
    }

    fn set_max_open_conns(&self, n: u32) {
        self.retune(|tuning| {
            tuning.max_open = n;
            if n > 0 && tuning.max_idle > n {
                tuning.max_idle = n;
            }
        });
    }

    fn set_conn_max_lifetime(&self, duration: Option<Duration>) {
        self.retune(|tuning| tuning.max_lifetime = duration.filter(|d| !d.is_zero()));
    }

    fn set_conn_max_idle_time(&self, duration: Option<Duration>) {
        self.retune(|tuning| tuning.max_idle_time = duration.filter(|d| !d.is_zero()));
    }

    fn driver_name(&self) -> &'static str {
        DRIVER_NAME
    }

    fn bind_type(&self) -> BindType {
        BindType::Question
    }

    fn stats(&self) -> PoolStats {
        let tuning = *self.tuning.lock();
        let pool = self.pool.load();
        let open = pool.size();
        let idle = u32::try_from(pool.num_idle()).unwrap_or(u32::MAX);

        PoolStats {
            max_open_connections: tuning.max_open,
            open_connections: open,
            in_use: open.saturating_sub(idle),
            idle,
            max_idle_connections: tuning.max_idle,
            max_lifetime: tuning.max_lifetime,
            max_idle_time: tuning.max_idle_time,
        }
    }

    fn bind_named(&self, query: &str, args: &NamedArgs) -> Result<(String, Vec<Value>)> {
        bind::bind_named(self.bind_type(), query, args)
    }

    fn rebind(&self, query: &str) -> String {
        bind::rebind(self.bind_type(), query)
    }
}
