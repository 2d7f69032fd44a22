//! 统一错误处理模块
//!
//! 定义数据库访问层的错误类型，使用 thiserror 提供良好的错误信息。
//! 装饰器只观察错误（记录日志、计数），从不转换、重试或吞掉错误。

use thiserror::Error;

/// 数据库访问错误
#[derive(Debug, Error)]
pub enum DbError {
    // ==================== 驱动错误 ====================
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("{feature} is not supported by the {driver} driver")]
    Unsupported {
        driver: &'static str,
        feature: &'static str,
    },

    // ==================== 绑定错误 ====================
    #[error("missing named argument: {name}")]
    MissingNamedArgument { name: String },

    // ==================== 扫描错误 ====================
    #[error("column not found: {column}")]
    ColumnNotFound { column: String },

    #[error("cannot decode column {column}: expected {expected}, found {found}")]
    Decode {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    // ==================== 通用错误 ====================
    #[error("operation not implemented: {0}")]
    Unimplemented(&'static str),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, DbError>;

impl DbError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE_ERROR",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::Unsupported { .. } => "UNSUPPORTED",
            Self::MissingNamedArgument { .. } => "MISSING_NAMED_ARGUMENT",
            Self::ColumnNotFound { .. } => "COLUMN_NOT_FOUND",
            Self::Decode { .. } => "DECODE_ERROR",
            Self::Unimplemented(_) => "UNIMPLEMENTED",
        }
    }

    /// 错误链最底层的原因
    ///
    /// 沿 `source()` 一直向下展开；没有下层原因时返回自身的描述。
    pub fn root_cause(&self) -> String {
        let mut current: &dyn std::error::Error = self;
        while let Some(source) = current.source() {
            current = source;
        }
        current.to_string()
    }
}
