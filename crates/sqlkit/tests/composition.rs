//! 装饰器组合集成测试

use std::sync::Arc;

use sqlkit::{
    Context, Database, DatabaseExt, DbError, FromRow, InstrumentedDatabase, LogSink,
    LoggingDatabase, NamedArgs, NopDatabase, Row, SharedDatabase, SqlMetrics, SqliteDatabase,
    TxOptions, Value,
};
use taxonomy_shared::test_utils::{LogCapture, test_database_config};

#[derive(Debug, PartialEq)]
struct Item {
    id: String,
    qty: i64,
}

impl FromRow for Item {
    fn from_row(row: &Row) -> sqlkit::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            qty: row.get("qty")?,
        })
    }
}

fn logging(inner: SharedDatabase, capture: &LogCapture) -> SharedDatabase {
    LoggingDatabase::builder()
        .inner(inner)
        .sink(LogSink::from_dispatch(capture.dispatch()))
        .build()
        .into_shared()
}

fn instrumented(inner: SharedDatabase, metrics: &Arc<SqlMetrics>) -> SharedDatabase {
    InstrumentedDatabase::builder(metrics.clone())
        .inner(inner)
        .build()
        .into_shared()
}

async fn sqlite_with_items() -> SharedDatabase {
    let db = SqliteDatabase::connect(&test_database_config()).await.unwrap();
    db.execute("CREATE TABLE items (id TEXT PRIMARY KEY, qty INTEGER NOT NULL)", &[])
        .await
        .unwrap();
    Arc::new(db)
}

#[tokio::test]
async fn test_logging_over_metrics_over_nop() {
    let capture = LogCapture::new();
    let metrics = Arc::new(SqlMetrics::prometheus().unwrap());
    let db = logging(instrumented(NopDatabase::shared(), &metrics), &capture);

    let result = db
        .execute("INSERT INTO t VALUES ($1)", &[Value::from(42)])
        .await
        .unwrap();
    assert_eq!(result, Default::default());

    let output = metrics.render().unwrap();
    assert!(output.contains(r#"sqlkit_sql_exec_count{query="INSERT INTO t VALUES ($1)"} 1"#));
    assert!(output.contains(r#"sqlkit_sql_exec_duration_count{query="INSERT INTO t VALUES ($1)"} 1"#));
    let sum_line = output
        .lines()
        .find(|line| line.starts_with("sqlkit_sql_exec_duration_sum{"))
        .unwrap();
    let sum: f64 = sum_line.rsplit(' ').next().unwrap().parse().unwrap();
    assert!(sum >= 0.0);

    let records = capture.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["method"], "execute");
    assert_eq!(records[0]["query"], "INSERT INTO t VALUES ($1)");
    assert_eq!(records[0]["args"], "[42]");
}

#[tokio::test]
async fn test_decorated_sqlite_is_transparent() {
    let plain = sqlite_with_items().await;

    let capture = LogCapture::new();
    let metrics = Arc::new(SqlMetrics::prometheus().unwrap());
    let decorated = instrumented(
        logging(instrumented(sqlite_with_items().await, &metrics), &capture),
        &metrics,
    );

    let ctx = Context::background().with_trace_id("compose-1");
    let insert = "INSERT INTO items (id, qty) VALUES ($1, $2)";

    for db in [&plain, &decorated] {
        let done = db
            .execute_with(&ctx, insert, &[Value::from("a"), Value::from(1)])
            .await
            .unwrap();
        assert_eq!(done.rows_affected, 1);
        db.named_execute_with(
            &ctx,
            "INSERT INTO items (id, qty) VALUES (:id, :qty)",
            &NamedArgs::new().with("id", "b").with("qty", 2),
        )
        .await
        .unwrap();
    }

    let select = "SELECT id, qty FROM items ORDER BY id";
    let expected: Vec<Item> = plain.select_as(&ctx, select, &[]).await.unwrap();
    let actual: Vec<Item> = decorated.select_as(&ctx, select, &[]).await.unwrap();
    assert_eq!(expected, actual);
    assert_eq!(actual.len(), 2);

    // 相同的错误原样穿透
    let plain_err = plain.execute_with(&ctx, insert, &[Value::from("a"), Value::from(9)]).await;
    let decorated_err = decorated
        .execute_with(&ctx, insert, &[Value::from("a"), Value::from(9)])
        .await;
    assert_eq!(
        plain_err.unwrap_err().to_string(),
        decorated_err.unwrap_err().to_string()
    );

    assert_eq!(plain.driver_name(), decorated.driver_name());
    assert_eq!(plain.bind_type(), decorated.bind_type());
    assert_eq!(plain.rebind("SELECT ?"), decorated.rebind("SELECT ?"));

    // 两层指标装饰器共享注册表，每次调用计两次
    let output = metrics.render().unwrap();
    assert!(output.contains(
        r#"sqlkit_sql_exec_count{query="INSERT INTO items (id, qty) VALUES ($1, $2)"} 4"#
    ));
    assert!(output.contains(
        r#"sqlkit_sql_exec_errors{query="INSERT INTO items (id, qty) VALUES ($1, $2)"} 2"#
    ));

    let errors: Vec<_> = capture
        .records_for("execute_with")
        .into_iter()
        .filter(|r| r["level"] == "ERROR")
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["error_code"], "DATABASE_ERROR");
    assert_eq!(errors[0]["trace_id"], "compose-1");
}

#[tokio::test]
async fn test_transactions_through_decorators() {
    let capture = LogCapture::new();
    let metrics = Arc::new(SqlMetrics::prometheus().unwrap());
    let db = logging(instrumented(sqlite_with_items().await, &metrics), &capture);

    let mut tx = db
        .begin_with(&Context::background(), TxOptions::default())
        .await
        .unwrap();
    tx.execute("INSERT INTO items (id, qty) VALUES (?, ?)", &[Value::from("x"), Value::from(5)])
        .await
        .unwrap();
    let tx_id = tx.id().to_string();
    tx.commit().await.unwrap();

    let item: Option<Item> = db
        .get_as(&Context::background(), "SELECT id, qty FROM items WHERE id = ?", &[Value::from("x")])
        .await
        .unwrap();
    assert_eq!(item, Some(Item { id: "x".into(), qty: 5 }));

    let begin = capture.records_for("begin_with");
    assert_eq!(begin[0]["transaction"], tx_id);
    assert!(metrics.render().unwrap().contains("sqlkit_sql_begin 1"));

    let read_only = TxOptions {
        read_only: true,
        ..Default::default()
    };
    let err = db
        .begin_with(&Context::background(), read_only)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Unsupported { .. }));
    assert!(metrics.render().unwrap().contains("sqlkit_sql_begin_errors 1"));
}
