//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 数据库配置
///
/// 连接池参数对应 `Database` 能力中的调优接口，启动时作为初始值使用。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_open_connections: u32,
    pub max_idle_connections: u32,
    pub connect_timeout_seconds: u64,
    /// 0 表示不回收空闲连接
    pub idle_timeout_seconds: u64,
    /// 0 表示连接不过期
    pub max_lifetime_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://taxonomy.db?mode=rwc".to_string(),
            max_open_connections: 10,
            max_idle_connections: 2,
            connect_timeout_seconds: 30,
            idle_timeout_seconds: 600,
            max_lifetime_seconds: 1800,
        }
    }
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_seconds > 0).then(|| Duration::from_secs(self.idle_timeout_seconds))
    }

    pub fn max_lifetime(&self) -> Option<Duration> {
        (self.max_lifetime_seconds > 0).then(|| Duration::from_secs(self.max_lifetime_seconds))
    }
}

/// 装饰器开关
///
/// 决定仓储使用的数据库句柄外层包裹哪些装饰器，命令行参数可覆盖。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DecoratorConfig {
    /// 是否启用日志装饰器
    pub logging: bool,
    /// 是否启用指标装饰器
    pub instrumenting: bool,
}

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub service_name: String,
    pub log_level: String,
    /// 是否输出 JSON 格式日志（否则为人类可读格式）
    pub json_logs: bool,
    pub metrics_enabled: bool,
    pub metrics_port: u16,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown-service".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
            metrics_port: 9090,
        }
    }
}

impl ObservabilityConfig {
    /// 注入服务名（服务名以 AppConfig 为准）
    pub fn with_service_name(mut self, service_name: &str) -> Self {
        self.service_name = service_name.to_string();
        self
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub database: DatabaseConfig,
    pub decorators: DecoratorConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（TAXONOMY_ 前缀，双下划线分隔层级，如 TAXONOMY_DATABASE__URL -> database.url）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("TAXONOMY_ENV").unwrap_or_else(|_| "development".to_string());

        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(Path::new(&config_dir).join("default.toml")).required(false))
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", env))).required(false),
            )
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", service_name)))
                    .required(false),
            )
            // 字段名本身含下划线（max_open_connections），层级分隔符使用双下划线
            .add_source(
                Environment::with_prefix("TAXONOMY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}
