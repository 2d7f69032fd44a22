//! SQL 数据库能力与装饰器
//!
//! - [`Database`]：基础句柄、no-op 实现与装饰器共同实现的能力契约
//! - [`NopDatabase`]：不产生任何副作用的默认内层实现
//! - [`LoggingDatabase`]：每次调用写一条结构化日志
//! - [`InstrumentedDatabase`]：按查询记录调用次数、错误次数与耗时
//! - [`SqliteDatabase`]：基于 sqlx 连接池的 SQLite 句柄
//!
//! 装饰器持有 `Arc<dyn Database>`，可以任意顺序、任意层数组合：
//!
//! ```ignore
//! let metrics = Arc::new(SqlMetrics::prometheus()?);
//! let db = LoggingDatabase::builder()
//!     .inner(InstrumentedDatabase::new(base, metrics).into_shared())
//!     .sink(LogSink::current())
//!     .build();
//! ```

pub mod bind;
pub mod capability;
pub mod connection;
pub mod context;
pub mod error;
pub mod ext;
pub mod instrumenting;
pub mod logging;
pub mod nop;
pub mod row;
pub mod sqlite;
pub mod statement;
pub mod transaction;
pub mod value;

pub use bind::BindType;
#[cfg(any(test, feature = "mock"))]
pub use capability::MockDatabase;
pub use capability::{Database, ExecResult, PoolStats, SharedDatabase};
pub use connection::{Connection, ConnectionDriver};
pub use context::Context;
pub use error::{DbError, Result};
pub use ext::DatabaseExt;
pub use instrumenting::{InstrumentedDatabase, SqlMetrics};
pub use logging::{LogSink, LoggingDatabase};
pub use nop::NopDatabase;
pub use row::{FromRow, Row, Rows};
pub use sqlite::SqliteDatabase;
pub use statement::{NamedStatement, Statement};
pub use transaction::{IsolationLevel, Transaction, TxOptions};
pub use value::{FromValue, NamedArgs, Value};
