//! 调用记录字段

use std::time::Duration;

use crate::capability::{ExecResult, PoolStats};
use crate::connection::Connection;
use crate::error::Result;
use crate::row::{Row, Rows};
use crate::statement::{NamedStatement, Statement};
use crate::transaction::Transaction;
use crate::value::{ArgList, NamedArgs, Value};

pub(crate) const LOG_TARGET: &str = "sqlkit::logging";
pub(crate) const COMPONENT: &str = "sqlkit";

/// 单次调用的可选字段，未设置的字段不会出现在记录中
#[derive(Debug, Default)]
pub(crate) struct CallFields<'a> {
    pub query: Option<&'a str>,
    pub args: Option<String>,
    pub result: Option<String>,
    pub rows: Option<usize>,
    /// 扫描目标类型
    pub dest: Option<&'a str>,
    pub transaction: Option<String>,
    pub conn: Option<String>,
    pub statement: Option<String>,
    pub connections: Option<u32>,
    pub duration: Option<String>,
    pub driver: Option<&'a str>,
    pub stats: Option<String>,
    pub rebind: Option<String>,
}

impl<'a> CallFields<'a> {
    pub fn transaction(result: &Result<Transaction>) -> Self {
        Self {
            transaction: result.as_ref().ok().map(|tx| tx.id().to_string()),
            ..Default::default()
        }
    }

    pub fn begun(tx: &Transaction) -> Self {
        Self {
            transaction: Some(tx.id().to_string()),
            ..Default::default()
        }
    }

    pub fn exec(query: &'a str, args: &[Value], result: Option<&ExecResult>) -> Self {
        Self {
            query: Some(query),
            args: Some(ArgList(args).to_string()),
            result: result.map(|r| format!("{r:?}")),
            ..Default::default()
        }
    }

    pub fn named_exec(query: &'a str, args: &NamedArgs, result: Option<&ExecResult>) -> Self {
        Self {
            query: Some(query),
            args: Some(args.to_string()),
            result: result.map(|r| format!("{r:?}")),
            ..Default::default()
        }
    }

    pub fn rows(query: &'a str, args: &[Value], result: &Result<Rows>) -> Self {
        Self {
            query: Some(query),
            args: Some(ArgList(args).to_string()),
            rows: result.as_ref().ok().map(Rows::len),
            ..Default::default()
        }
    }

    pub fn named_rows(query: &'a str, args: &NamedArgs, result: &Result<Rows>) -> Self {
        Self {
            query: Some(query),
            args: Some(args.to_string()),
            rows: result.as_ref().ok().map(Rows::len),
            ..Default::default()
        }
    }

    pub fn row(query: &'a str, args: &[Value], result: &Result<Option<Row>>) -> Self {
        Self {
            query: Some(query),
            args: Some(ArgList(args).to_string()),
            rows: result.as_ref().ok().map(|row| usize::from(row.is_some())),
            ..Default::default()
        }
    }

    pub fn get(dest: &'a str, query: &'a str, args: &[Value], result: &Result<Option<Row>>) -> Self {
        Self {
            dest: Some(dest),
            ..Self::row(query, args, result)
        }
    }

    pub fn select(dest: &'a str, query: &'a str, args: &[Value], result: &Result<Rows>) -> Self {
        Self {
            dest: Some(dest),
            ..Self::rows(query, args, result)
        }
    }

    pub fn connection(result: &Result<Connection>) -> Self {
        Self {
            conn: result.as_ref().ok().map(|conn| conn.id().to_string()),
            ..Default::default()
        }
    }

    pub fn statement(query: &'a str, result: &Result<Statement>) -> Self {
        Self {
            query: Some(query),
            statement: result.as_ref().ok().map(Statement::to_string),
            ..Default::default()
        }
    }

    pub fn named_statement(query: &'a str, result: &Result<NamedStatement>) -> Self {
        Self {
            query: Some(query),
            statement: result.as_ref().ok().map(NamedStatement::to_string),
            ..Default::default()
        }
    }

    pub fn connections(n: u32) -> Self {
        Self {
            connections: Some(n),
            ..Default::default()
        }
    }

    pub fn duration(duration: Option<Duration>) -> Self {
        Self {
            duration: Some(format!("{duration:?}")),
            ..Default::default()
        }
    }

    pub fn stats(stats: &PoolStats) -> Self {
        Self {
            connections: Some(stats.open_connections),
            stats: Some(format!("{stats:?}")),
            ..Default::default()
        }
    }
}
