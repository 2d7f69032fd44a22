//! 预编译语句描述

use std::fmt;

/// 预编译语句
///
/// 由驱动校验后返回：原始查询、参数个数、结果列名。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statement {
    pub query: String,
    pub parameters: usize,
    pub columns: Vec<String>,
}

/// 命名参数预编译语句
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedStatement {
    /// 含 `:name` 的原始查询
    pub query: String,
    /// 编译后的参数名（按占位符顺序）
    pub names: Vec<String>,
    /// 编译为位置参数后的语句
    pub statement: Statement,
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} params)", self.query, self.parameters)
    }
}

impl fmt::Display for NamedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.query, self.statement)
    }
}
