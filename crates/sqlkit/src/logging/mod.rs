//! 日志装饰器
//!
//! 包装任意 [`Database`]，每次调用恰好写一条结构化日志记录：
//!
//! - `component`、`method`、`elapsed_us`（微秒耗时）、`trace_id`（上下文中存在时）
//! - 与操作相关的字段：`query`、`args`、`result`、`rows`、`dest`、`transaction`、`conn` 等
//! - 失败时为 ERROR 级别，消息为错误描述，并附带 `error_code` 与 `error_cause`
//! - 成功时为 INFO 级别，消息为 `sql call`
//!
//! 内层的结果与错误原样返回。日志写入构造时指定的 [`LogSink`]，
//! 与进程全局 subscriber 无关。

mod fields;
mod sink;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::Level;

use crate::bind::BindType;
use crate::capability::{Database, ExecResult, PoolStats, SharedDatabase};
use crate::connection::Connection;
use crate::context::Context;
use crate::error::{DbError, Result};
use crate::nop::NopDatabase;
use crate::row::{Row, Rows};
use crate::statement::{NamedStatement, Statement};
use crate::transaction::{Transaction, TxOptions};
use crate::value::{NamedArgs, Value};

use fields::{COMPONENT, CallFields, LOG_TARGET};
pub use sink::LogSink;

macro_rules! sql_event {
    ($level:expr, $ctx:expr, $method:expr, $elapsed:expr, $fields:expr, $code:expr, $cause:expr, $message:expr) => {
        tracing::event!(
            target: LOG_TARGET,
            $level,
            component = COMPONENT,
            method = $method,
            elapsed_us = $elapsed,
            trace_id = $ctx.trace_id(),
            query = $fields.query,
            args = $fields.args.as_deref(),
            result = $fields.result.as_deref(),
            rows = $fields.rows,
            dest = $fields.dest,
            transaction = $fields.transaction.as_deref(),
            conn = $fields.conn.as_deref(),
            statement = $fields.statement.as_deref(),
            connections = $fields.connections,
            duration = $fields.duration.as_deref(),
            driver = $fields.driver,
            stats = $fields.stats.as_deref(),
            rebind = $fields.rebind.as_deref(),
            error_code = $code,
            error_cause = $cause,
            "{}",
            $message
        )
    };
}

/// 日志装饰器
#[derive(Clone)]
pub struct LoggingDatabase {
    inner: SharedDatabase,
    sink: LogSink,
}

impl LoggingDatabase {
    pub fn new(inner: SharedDatabase, sink: LogSink) -> Self {
        Self { inner, sink }
    }

    pub fn builder() -> LoggingDatabaseBuilder {
        LoggingDatabaseBuilder::default()
    }

    pub fn inner(&self) -> &SharedDatabase {
        &self.inner
    }

    pub fn into_shared(self) -> SharedDatabase {
        Arc::new(self)
    }

    fn log(
        &self,
        ctx: &Context,
        method: &'static str,
        start: Instant,
        error: Option<&DbError>,
        fields: CallFields<'_>,
    ) {
        let elapsed_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);

        tracing::dispatcher::with_default(self.sink.dispatch(), || match error {
            Some(err) => {
                let cause = err.root_cause();
                sql_event!(
                    Level::ERROR,
                    ctx,
                    method,
                    elapsed_us,
                    fields,
                    Some(err.code()),
                    Some(cause.as_str()),
                    err
                );
            }
            None => {
                sql_event!(
                    Level::INFO,
                    ctx,
                    method,
                    elapsed_us,
                    fields,
                    None::<&str>,
                    None::<&str>,
                    "sql call"
                );
            }
        });
    }

    fn log_result<T>(
        &self,
        ctx: &Context,
        method: &'static str,
        start: Instant,
        result: &Result<T>,
        fields: CallFields<'_>,
    ) {
        self.log(ctx, method, start, result.as_ref().err(), fields);
    }
}

impl std::fmt::Debug for LoggingDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingDatabase")
            .field("sink", &self.sink)
            .finish_non_exhaustive()
    }
}

/// 日志装饰器构建器
///
/// 未指定内层时使用 [`NopDatabase`]，未指定 sink 时丢弃所有记录。
#[derive(Default)]
pub struct LoggingDatabaseBuilder {
    inner: Option<SharedDatabase>,
    sink: Option<LogSink>,
}

impl LoggingDatabaseBuilder {
    pub fn inner(mut self, inner: SharedDatabase) -> Self {
        self.inner = Some(inner);
        self
    }

    pub fn sink(mut self, sink: LogSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> LoggingDatabase {
        LoggingDatabase {
            inner: self.inner.unwrap_or_else(NopDatabase::shared),
            sink: self.sink.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl Database for LoggingDatabase {
    async fn begin(&self) -> Result<Transaction> {
        let start = Instant::now();
        let result = self.inner.begin().await;
        self.log_result(
            &Context::background(),
            "begin",
            start,
            &result,
            CallFields::transaction(&result),
        );
        result
    }

    async fn begin_with(&self, ctx: &Context, options: TxOptions) -> Result<Transaction> {
        let start = Instant::now();
        let result = self.inner.begin_with(ctx, options).await;
        self.log_result(ctx, "begin_with", start, &result, CallFields::transaction(&result));
        result
    }

    async fn must_begin(&self) -> Transaction {
        let start = Instant::now();
        let tx = self.inner.must_begin().await;
        self.log(
            &Context::background(),
            "must_begin",
            start,
            None,
            CallFields::begun(&tx),
        );
        tx
    }

    async fn must_begin_with(&self, ctx: &Context, options: TxOptions) -> Transaction {
        let start = Instant::now();
        let tx = self.inner.must_begin_with(ctx, options).await;
        self.log(ctx, "must_begin_with", start, None, CallFields::begun(&tx));
        tx
    }

    async fn execute(&self, query: &str, args: &[Value]) -> Result<ExecResult> {
        let start = Instant::now();
        let result = self.inner.execute(query, args).await;
        self.log_result(
            &Context::background(),
            "execute",
            start,
            &result,
            CallFields::exec(query, args, result.as_ref().ok()),
        );
        result
    }

    async fn execute_with(
        &self,
        ctx: &Context,
        query: &str,
        args: &[Value],
    ) -> Result<ExecResult> {
        let start = Instant::now();
        let result = self.inner.execute_with(ctx, query, args).await;
        self.log_result(
            ctx,
            "execute_with",
            start,
            &result,
            CallFields::exec(query, args, result.as_ref().ok()),
        );
        result
    }

    async fn must_execute(&self, query: &str, args: &[Value]) -> ExecResult {
        let start = Instant::now();
        let result = self.inner.must_execute(query, args).await;
        self.log(
            &Context::background(),
            "must_execute",
            start,
            None,
            CallFields::exec(query, args, Some(&result)),
        );
        result
    }

    async fn must_execute_with(&self, ctx: &Context, query: &str, args: &[Value]) -> ExecResult {
        let start = Instant::now();
        let result = self.inner.must_execute_with(ctx, query, args).await;
        self.log(
            ctx,
            "must_execute_with",
            start,
            None,
            CallFields::exec(query, args, Some(&result)),
        );
        result
    }

    async fn named_execute(&self, query: &str, args: &NamedArgs) -> Result<ExecResult> {
        let start = Instant::now();
        let result = self.inner.named_execute(query, args).await;
        self.log_result(
            &Context::background(),
            "named_execute",
            start,
            &result,
            CallFields::named_exec(query, args, result.as_ref().ok()),
        );
        result
    }

    async fn named_execute_with(
        &self,
        ctx: &Context,
        query: &str,
        args: &NamedArgs,
    ) -> Result<ExecResult> {
        let start = Instant::now();
        let result = self.inner.named_execute_with(ctx, query, args).await;
        self.log_result(
            ctx,
            "named_execute_with",
            start,
            &result,
            CallFields::named_exec(query, args, result.as_ref().ok()),
        );
        result
    }

    async fn query(&self, query: &str, args: &[Value]) -> Result<Rows> {
        let start = Instant::now();
        let result = self.inner.query(query, args).await;
        self.log_result(
            &Context::background(),
            "query",
            start,
            &result,
            CallFields::rows(query, args, &result),
        );
        result
    }

    async fn query_with(&self, ctx: &Context, query: &str, args: &[Value]) -> Result<Rows> {
        let start = Instant::now();
        let result = self.inner.query_with(ctx, query, args).await;
        self.log_result(ctx, "query_with", start, &result, CallFields::rows(query, args, &result));
        result
    }

    async fn query_row(&self, query: &str, args: &[Value]) -> Result<Option<Row>> {
        let start = Instant::now();
        let result = self.inner.query_row(query, args).await;
        self.log_result(
            &Context::background(),
            "query_row",
            start,
            &result,
            CallFields::row(query, args, &result),
        );
        result
    }

    async fn query_row_with(
        &self,
        ctx: &Context,
        query: &str,
        args: &[Value],
    ) -> Result<Option<Row>> {
        let start = Instant::now();
        let result = self.inner.query_row_with(ctx, query, args).await;
        self.log_result(ctx, "query_row_with", start, &result, CallFields::row(query, args, &result));
        result
    }

    async fn named_query(&self, query: &str, args: &NamedArgs) -> Result<Rows> {
        let start = Instant::now();
        let result = self.inner.named_query(query, args).await;
        self.log_result(
            &Context::background(),
            "named_query",
            start,
            &result,
            CallFields::named_rows(query, args, &result),
        );
        result
    }

    async fn named_query_with(
        &self,
        ctx: &Context,
        query: &str,
        args: &NamedArgs,
    ) -> Result<Rows> {
        let start = Instant::now();
        let result = self.inner.named_query_with(ctx, query, args).await;
        self.log_result(
            ctx,
            "named_query_with",
            start,
            &result,
            CallFields::named_rows(query, args, &result),
        );
        result
    }

    async fn get(&self, dest: &str, query: &str, args: &[Value]) -> Result<Option<Row>> {
        let start = Instant::now();
        let result = self.inner.get(dest, query, args).await;
        self.log_result(
            &Context::background(),
            "get",
            start,
            &result,
            CallFields::get(dest, query, args, &result),
        );
        result
    }

    async fn get_with(
        &self,
        ctx: &Context,
        dest: &str,
        query: &str,
        args: &[Value],
    ) -> Result<Option<Row>> {
        let start = Instant::now();
        let result = self.inner.get_with(ctx, dest, query, args).await;
        self.log_result(
            ctx,
            "get_with",
            start,
            &result,
            CallFields::get(dest, query, args, &result),
        );
        result
    }

    async fn select(&self, dest: &str, query: &str, args: &[Value]) -> Result<Rows> {
        let start = Instant::now();
        let result = self.inner.select(dest, query, args).await;
        self.log_result(
            &Context::background(),
            "select",
            start,
            &result,
            CallFields::select(dest, query, args, &result),
        );
        result
    }

    async fn select_with(
        &self,
        ctx: &Context,
        dest: &str,
        query: &str,
        args: &[Value],
    ) -> Result<Rows> {
        let start = Instant::now();
        let result = self.inner.select_with(ctx, dest, query, args).await;
        self.log_result(
            ctx,
            "select_with",
            start,
            &result,
            CallFields::select(dest, query, args, &result),
        );
        result
    }

    async fn prepare(&self, query: &str) -> Result<Statement> {
        let start = Instant::now();
        let result = self.inner.prepare(query).await;
        self.log_result(
            &Context::background(),
            "prepare",
            start,
            &result,
            CallFields::statement(query, &result),
        );
        result
    }

    async fn prepare_with(&self, ctx: &Context, query: &str) -> Result<Statement> {
        let start = Instant::now();
        let result = self.inner.prepare_with(ctx, query).await;
        self.log_result(ctx, "prepare_with", start, &result, CallFields::statement(query, &result));
        result
    }

    async fn prepare_named(&self, query: &str) -> Result<NamedStatement> {
        let start = Instant::now();
        let result = self.inner.prepare_named(query).await;
        self.log_result(
            &Context::background(),
            "prepare_named",
            start,
            &result,
            CallFields::named_statement(query, &result),
        );
        result
    }

    async fn prepare_named_with(&self, ctx: &Context, query: &str) -> Result<NamedStatement> {
        let start = Instant::now();
        let result = self.inner.prepare_named_with(ctx, query).await;
        self.log_result(
            ctx,
            "prepare_named_with",
            start,
            &result,
            CallFields::named_statement(query, &result),
        );
        result
    }

    async fn conn(&self) -> Result<Connection> {
        let start = Instant::now();
        let result = self.inner.conn().await;
        self.log_result(
            &Context::background(),
            "conn",
            start,
            &result,
            CallFields::connection(&result),
        );
        result
    }

    async fn conn_with(&self, ctx: &Context) -> Result<Connection> {
        let start = Instant::now();
        let result = self.inner.conn_with(ctx).await;
        self.log_result(ctx, "conn_with", start, &result, CallFields::connection(&result));
        result
    }

    async fn ping(&self) -> Result<()> {
        let start = Instant::now();
        let result = self.inner.ping().await;
        self.log_result(&Context::background(), "ping", start, &result, CallFields::default());
        result
    }

    async fn ping_with(&self, ctx: &Context) -> Result<()> {
        let start = Instant::now();
        let result = self.inner.ping_with(ctx).await;
        self.log_result(ctx, "ping_with", start, &result, CallFields::default());
        result
    }

    async fn close(&self) -> Result<()> {
        let start = Instant::now();
        let result = self.inner.close().await;
        self.log_result(&Context::background(), "close", start, &result, CallFields::default());
        result
    }

    fn set_max_idle_conns(&self, n: u32) {
        let start = Instant::now();
        self.inner.set_max_idle_conns(n);
        self.log(
            &Context::background(),
            "set_max_idle_conns",
            start,
            None,
            CallFields::connections(n),
        );
    }

    fn set_max_open_conns(&self, n: u32) {
        let start = Instant::now();
        self.inner.set_max_open_conns(n);
        self.log(
            &Context::background(),
            "set_max_open_conns",
            start,
            None,
            CallFields::connections(n),
        );
    }

    fn set_conn_max_lifetime(&self, duration: Option<Duration>) {
        let start = Instant::now();
        self.inner.set_conn_max_lifetime(duration);
        self.log(
            &Context::background(),
            "set_conn_max_lifetime",
            start,
            None,
            CallFields::duration(duration),
        );
    }

    fn set_conn_max_idle_time(&self, duration: Option<Duration>) {
        let start = Instant::now();
        self.inner.set_conn_max_idle_time(duration);
        self.log(
            &Context::background(),
            "set_conn_max_idle_time",
            start,
            None,
            CallFields::duration(duration),
        );
    }

    fn driver_name(&self) -> &'static str {
        let start = Instant::now();
        let driver = self.inner.driver_name();
        self.log(
            &Context::background(),
            "driver_name",
            start,
            None,
            CallFields {
                driver: Some(driver),
                ..Default::default()
            },
        );
        driver
    }

    fn bind_type(&self) -> BindType {
        let start = Instant::now();
        let bind_type = self.inner.bind_type();
        self.log(
            &Context::background(),
            "bind_type",
            start,
            None,
            CallFields {
                result: Some(format!("{bind_type:?}")),
                ..Default::default()
            },
        );
        bind_type
    }

    fn stats(&self) -> PoolStats {
        let start = Instant::now();
        let stats = self.inner.stats();
        self.log(&Context::background(), "stats", start, None, CallFields::stats(&stats));
        stats
    }

    fn bind_named(&self, query: &str, args: &NamedArgs) -> Result<(String, Vec<Value>)> {
        let start = Instant::now();
        let result = self.inner.bind_named(query, args);
        self.log_result(
            &Context::background(),
            "bind_named",
            start,
            &result,
            CallFields {
                query: Some(query),
                args: Some(args.to_string()),
                rebind: result.as_ref().ok().map(|(bound, _)| bound.clone()),
                ..Default::default()
            },
        );
        result
    }

    fn rebind(&self, query: &str) -> String {
        let start = Instant::now();
        let rebound = self.inner.rebind(query);
        self.log(
            &Context::background(),
            "rebind",
            start,
            None,
            CallFields {
                query: Some(query),
                rebind: Some(rebound.clone()),
                ..Default::default()
            },
        );
        rebound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::MockDatabase;
    use taxonomy_shared::test_utils::LogCapture;

    fn capture_over(inner: SharedDatabase) -> (LoggingDatabase, LogCapture) {
        let capture = LogCapture::new();
        let db = LoggingDatabase::builder()
            .inner(inner)
            .sink(LogSink::from_dispatch(capture.dispatch()))
            .build();
        (db, capture)
    }

    #[tokio::test]
    async fn test_success_writes_one_info_record() {
        let (db, capture) = capture_over(NopDatabase::shared());
        let ctx = Context::background().with_trace_id("trace-42");

        let result = db
            .execute_with(&ctx, "INSERT INTO t VALUES ($1)", &[Value::from(7)])
            .await
            .unwrap();
        assert_eq!(result, ExecResult::default());

        let records = capture.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record["level"], "INFO");
        assert_eq!(record["target"], "sqlkit::logging");
        assert_eq!(record["message"], "sql call");
        assert_eq!(record["component"], "sqlkit");
        assert_eq!(record["method"], "execute_with");
        assert_eq!(record["trace_id"], "trace-42");
        assert_eq!(record["query"], "INSERT INTO t VALUES ($1)");
        assert_eq!(record["args"], "[7]");
        assert!(record["elapsed_us"].is_u64());
        assert!(record.get("error_code").is_none());
    }

    #[tokio::test]
    async fn test_error_writes_error_record_and_returns_error_unchanged() {
        let mut mock = MockDatabase::new();
        mock.expect_query()
            .times(1)
            .returning(|_, _| Err(DbError::Database(sqlx::Error::RowNotFound)));

        let (db, capture) = capture_over(Arc::new(mock));
        let err = db.query("SELECT * FROM t", &[]).await.unwrap_err();
        assert!(matches!(err, DbError::Database(sqlx::Error::RowNotFound)));

        let records = capture.records_for("query");
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record["level"], "ERROR");
        assert_eq!(record["message"], err.to_string());
        assert_eq!(record["error_code"], "DATABASE_ERROR");
        assert!(record["error_cause"].is_string());
        assert!(record.get("trace_id").is_none());
        assert!(record.get("rows").is_none());
    }

    #[tokio::test]
    async fn test_query_records_row_count() {
        let mut mock = MockDatabase::new();
        mock.expect_query_with().returning(|_, _, _| {
            Ok(vec![
                Row::from_pairs([("id", Value::from("a"))]),
                Row::from_pairs([("id", Value::from("b"))]),
            ]
            .into_iter()
            .collect())
        });

        let (db, capture) = capture_over(Arc::new(mock));
        let rows = db
            .query_with(&Context::background(), "SELECT id FROM t", &[])
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);

        let records = capture.records_for("query_with");
        assert_eq!(records[0]["rows"], 2);
    }

    #[tokio::test]
    async fn test_every_call_is_logged_once() {
        let (db, capture) = capture_over(NopDatabase::shared());
        let ctx = Context::background();

        db.begin().await.unwrap();
        db.begin_with(&ctx, TxOptions::default()).await.unwrap();
        db.must_begin().await;
        db.ping().await.unwrap();
        db.ping_with(&ctx).await.unwrap();
        db.prepare("SELECT 1").await.unwrap();
        db.close().await.unwrap();
        db.set_max_open_conns(4);
        db.set_conn_max_lifetime(Some(Duration::from_secs(60)));
        db.stats();
        db.driver_name();
        db.rebind("SELECT ?");

        let methods: Vec<String> = capture
            .records()
            .iter()
            .map(|record| record["method"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(
            methods,
            vec![
                "begin",
                "begin_with",
                "must_begin",
                "ping",
                "ping_with",
                "prepare",
                "close",
                "set_max_open_conns",
                "set_conn_max_lifetime",
                "stats",
                "driver_name",
                "rebind",
            ]
        );

        let tuning = capture.records_for("set_max_open_conns");
        assert_eq!(tuning[0]["connections"], 4);
        let begin = capture.records_for("begin");
        assert_eq!(begin[0]["transaction"], uuid::Uuid::nil().to_string());
    }

    #[tokio::test]
    async fn test_typed_scans_record_destination() {
        let mut mock = MockDatabase::new();
        mock.expect_select_with()
            .withf(|_, dest, _, _| dest == "taxonomy::Taxonomy")
            .times(1)
            .returning(|_, _, _, _| Ok(Rows::new(vec![Row::from_pairs([("id", Value::from("a"))])])));
        mock.expect_get()
            .times(1)
            .returning(|_, _, _| Ok(None));

        let (db, capture) = capture_over(Arc::new(mock));
        let ctx = Context::background().with_trace_id("scan-1");
        db.select_with(&ctx, "taxonomy::Taxonomy", "SELECT id FROM taxonomy", &[])
            .await
            .unwrap();
        db.get("i64", "SELECT count(*) FROM taxonomy", &[]).await.unwrap();

        let select = capture.records_for("select_with");
        assert_eq!(select.len(), 1);
        assert_eq!(select[0]["dest"], "taxonomy::Taxonomy");
        assert_eq!(select[0]["query"], "SELECT id FROM taxonomy");
        assert_eq!(select[0]["rows"], 1);
        assert_eq!(select[0]["trace_id"], "scan-1");

        let get = capture.records_for("get");
        assert_eq!(get[0]["dest"], "i64");
        assert_eq!(get[0]["rows"], 0);
    }

    #[tokio::test]
    async fn test_conn_records_connection_id() {
        let mut mock = MockDatabase::new();
        mock.expect_conn_with()
            .times(1)
            .returning(|_| Err(DbError::DeadlineExceeded));

        let (db, capture) = capture_over(Arc::new(mock));
        let err = db.conn_with(&Context::background()).await.unwrap_err();
        assert!(matches!(err, DbError::DeadlineExceeded));

        let failed = capture.records_for("conn_with");
        assert_eq!(failed[0]["level"], "ERROR");
        assert!(failed[0].get("conn").is_none());

        let (db, capture) = capture_over(NopDatabase::shared());
        let conn = db.conn().await.unwrap();
        let records = capture.records_for("conn");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["conn"], conn.id().to_string());
    }

    #[tokio::test]
    async fn test_close_returns_inner_result() {
        let mut mock = MockDatabase::new();
        mock.expect_close()
            .times(1)
            .returning(|| Err(DbError::Database(sqlx::Error::PoolClosed)));

        let (db, capture) = capture_over(Arc::new(mock));
        assert!(db.close().await.is_err());
        assert_eq!(capture.records_for("close")[0]["level"], "ERROR");
    }

    #[tokio::test]
    async fn test_default_sink_discards() {
        let capture = LogCapture::new();
        let db = LoggingDatabase::builder().build();

        tracing::dispatcher::with_default(&capture.dispatch(), || {
            db.set_max_idle_conns(1);
        });
        db.ping().await.unwrap();

        assert!(capture.records().is_empty());
    }
}
