//! 独占连接句柄
//!
//! `Connection` 由能力的 conn 系列操作返回，在句柄存活期间独占连接池中的一个连接，
//! 丢弃或 [`Connection::close`] 时归还。没有后端的连接为"分离"状态（零值），
//! 所有操作均为空操作，供 no-op 实现返回。

use std::fmt;

use async_trait::async_trait;
use uuid::Uuid;

use crate::capability::ExecResult;
use crate::error::Result;
use crate::row::Rows;
use crate::value::Value;

/// 连接后端
#[async_trait]
pub trait ConnectionDriver: Send {
    async fn execute(&mut self, query: &str, args: &[Value]) -> Result<ExecResult>;

    async fn query(&mut self, query: &str, args: &[Value]) -> Result<Rows>;

    async fn ping(&mut self) -> Result<()>;
}

pub struct Connection {
    id: Uuid,
    driver: Option<Box<dyn ConnectionDriver>>,
}

impl Connection {
    pub fn new(driver: Box<dyn ConnectionDriver>) -> Self {
        Self {
            id: Uuid::now_v7(),
            driver: Some(driver),
        }
    }

    /// 零值连接：nil ID，无后端
    pub fn detached() -> Self {
        Self {
            id: Uuid::nil(),
            driver: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
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

    pub async fn ping(&mut self) -> Result<()> {
        match self.driver.as_mut() {
            Some(driver) => driver.ping().await,
            None => Ok(()),
        }
    }

    /// 归还连接
    pub fn close(self) {
        drop(self);
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::detached()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("detached", &self.is_detached())
            .finish()
    }
}
