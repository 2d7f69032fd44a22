//! 命令行参数
//!
//! 开关参数只能开启装饰器，未指定时沿用配置文件与环境变量中的值。

use clap::Parser;
use taxonomy_shared::config::AppConfig;

use crate::models::Taxonomy;
use crate::repository::{Pagination, Query};

/// 分类服务命令行
#[derive(Parser, Debug)]
#[command(name = "taxonomy")]
#[command(version, about = "分类仓储服务")]
pub struct Cli {
    /// 启用日志装饰器
    #[arg(long)]
    pub logging: bool,

    /// 启用指标装饰器
    #[arg(long)]
    pub instrumenting: bool,

    /// 数据库 URL，覆盖配置文件
    #[arg(long)]
    pub database_url: Option<String>,

    /// 按 ID 读取
    #[arg(long)]
    pub id: Option<String>,

    /// 按名称读取
    #[arg(long)]
    pub name: Option<String>,

    /// 最多返回条数（0 表示不限制）
    #[arg(long, default_value_t = 0)]
    pub limit: u64,

    #[arg(long, default_value_t = 0)]
    pub offset: u64,

    /// 读取完成后继续提供 /metrics，直到收到关闭信号
    #[arg(long)]
    pub serve: bool,
}

impl Cli {
    /// 把命令行覆盖项合并进配置
    pub fn apply(&self, config: &mut AppConfig) {
        config.decorators.logging |= self.logging;
        config.decorators.instrumenting |= self.instrumenting;
        if let Some(url) = &self.database_url {
            config.database.url = url.clone();
        }
    }

    /// 由过滤参数构造仓储查询
    pub fn query(&self) -> Query {
        Query::new()
            .with_pagination(Pagination::new(self.limit, self.offset))
            .with_taxonomy(Taxonomy::new(
                self.id.clone().unwrap_or_default(),
                self.name.clone().unwrap_or_default(),
            ))
    }
}
