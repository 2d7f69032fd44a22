//! 类型化扫描扩展

use std::any::type_name;

use async_trait::async_trait;

use crate::capability::Database;
use crate::context::Context;
use crate::error::Result;
use crate::row::FromRow;
use crate::value::Value;

/// 在 `get_with` / `select_with` 之上提供按实体扫描的便捷方法，
/// 目标类型名作为 `dest` 传给能力，供装饰器记录
#[async_trait]
pub trait DatabaseExt: Database {
    /// 单行扫描，没有结果时返回 `None`
    async fn get_as<T>(&self, ctx: &Context, query: &str, args: &[Value]) -> Result<Option<T>>
    where
        T: FromRow + Send,
    {
        self.get_with(ctx, type_name::<T>(), query, args)
            .await?
            .as_ref()
            .map(T::from_row)
            .transpose()
    }

    /// 多行扫描，任意一行扫描失败时丢弃全部结果并返回错误
    async fn select_as<T>(&self, ctx: &Context, query: &str, args: &[Value]) -> Result<Vec<T>>
    where
        T: FromRow + Send,
    {
        self.select_with(ctx, type_name::<T>(), query, args)
            .await?
            .scan()
    }
}

impl<D: Database + ?Sized> DatabaseExt for D {}
