//! 配置管理模块
//!
//! 支持多层配置文件加载、环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// 服务配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// 是否输出 JSON 格式日志，否则为人类可读格式
    pub json_logs: bool,
    pub metrics_enabled: bool,
    pub metrics_port: u16,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
            metrics_port: 9090,
        }
    }
}

/// 规则配置
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// 启动时加载的规则文件（JSON 数组），只读
    pub seed_file: Option<PathBuf>,
}

/// 跨域配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// 允许的来源，包含 "*" 时允许任意来源
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

impl CorsConfig {
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}

/// 未设置 `MANIFEST_ENV` 时的运行环境
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub server: ServerConfig,
    pub observability: ObservabilityConfig,
    pub rules: RulesConfig,
    pub cors: CorsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: String::new(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
            rules: RulesConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl AppConfig {
    /// 不读取配置文件的默认配置，环境取自 `MANIFEST_ENV`
    ///
    /// 配置加载失败时作为回退使用。
    pub fn for_service(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            environment: Self::current_environment(),
            ..Default::default()
        }
    }

    fn current_environment() -> String {
        std::env::var("MANIFEST_ENV").unwrap_or_else(|_| DEFAULT_ENVIRONMENT.to_string())
    }

    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（MANIFEST_ 前缀，如 MANIFEST_SERVER__PORT -> server.port）
    /// 5. 服务特定端口环境变量（如 MANIFEST_SERVICE_PORT）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let env = Self::current_environment();
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        Self::load_from(service_name, &env, Path::new(&config_dir))
    }

    /// 从指定目录加载配置
    pub fn load_from(service_name: &str, env: &str, config_dir: &Path) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", env))).required(false))
            .add_source(
                File::from(config_dir.join(format!("{}.toml", service_name))).required(false),
            )
            // 双下划线分隔层级，单下划线保留在字段名中（MANIFEST_OBSERVABILITY__LOG_LEVEL）
            .add_source(
                Environment::with_prefix("MANIFEST")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins"),
            );

        let mut config: Self = builder.build()?.try_deserialize()?;

        if let Some(port) = Self::get_service_port_from_env(service_name) {
            config.server.port = port;
        }

        Ok(config)
    }

    /// 从环境变量获取服务特定端口
    ///
    /// - manifest-service -> MANIFEST_SERVICE_PORT
    /// - 其他服务名转换为大写下划线格式 + _PORT
    fn get_service_port_from_env(service_name: &str) -> Option<u16> {
        std::env::var(Self::service_port_var(service_name))
            .ok()
            .and_then(|v| v.parse().ok())
    }

    fn service_port_var(service_name: &str) -> String {
        format!("{}_PORT", service_name.to_uppercase().replace('-', "_"))
    }

    /// 获取服务地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
