//! 事务句柄
//!
//! `Transaction` 由能力的 begin 系列操作返回。具体驱动通过
//! [`TransactionDriver`] 提供后端；没有后端的事务为"分离"状态（零值），
//! 所有操作均为空操作，供 no-op 实现返回。

use std::fmt;

use async_trait::async_trait;
use uuid::Uuid;

use crate::capability::ExecResult;
use crate::error::Result;
use crate::row::Rows;
use crate::value::Value;

/// 隔离级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// 使用驱动默认级别
    #[default]
    Default,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// 事务选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxOptions {
    pub isolation: IsolationLevel,
    pub read_only: bool,
}

/// 事务后端
#[async_trait]
pub trait TransactionDriver: Send {
    async fn execute(&mut self, query: &str, args: &[Value]) -> Result<ExecResult>;

    async fn query(&mut self, query: &str, args: &[Value]) -> Result<Rows>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// 事务句柄
///
/// 未提交即被丢弃时，由后端负责回滚。
pub struct Transaction {
    id: Uuid,
    options: TxOptions,
    driver: Option<Box<dyn TransactionDriver>>,
}

impl Transaction {
    pub fn new(options: TxOptions, driver: Box<dyn TransactionDriver>) -> Self {
        Self {
            id: Uuid::now_v7(),
            options,
            driver: Some(driver),
        }
    }

    /// 零值事务：nil ID，无后端
    pub fn detached() -> Self {
        Self {
            id: Uuid::nil(),
            options: TxOptions::default(),
            driver: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn options(&self) -> TxOptions {
        self.options
    }

    pub fn is_detached(&self) -> bool {
        self.driver.is_none()
    }

    pub async fn execute(&mut self, query: &str, args: &[Value]) -> Result<ExecResult> {
        match self.driver.as_mut() {
            Some(driver) => driver.execute(query, args).await,
            None => Ok(ExecResult::default()),
        }
    }

    pub async fn query(&mut self, query: &str, args: &[Value]) -> Result<Rows> {
        match self.driver.as_mut() {
            Some(driver) => driver.query(query, args).await,
            None => Ok(Rows::default()),
        }
    }

    pub async fn commit(mut self) -> Result<()> {
        match self.driver.take() {
            Some(driver) => driver.commit().await,
            None => Ok(()),
        }
    }

    pub async fn rollback(mut self) -> Result<()> {
        match self.driver.take() {
            Some(driver) => driver.rollback().await,
            None => Ok(()),
        }
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::detached()
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("options", &self.options)
            .field("detached", &self.is_detached())
            .finish()
    }
}
