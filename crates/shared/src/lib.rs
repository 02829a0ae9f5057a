//! 共享库
//!
//! 包含服务共用的配置加载与可观测性基础设施（日志、指标、HTTP 中间件）。

pub mod config;
pub mod observability;

use std::path::PathBuf;

/// 加载 `.env` 文件中的环境变量（文件不存在时忽略）
///
/// 需在 [`config::AppConfig::load`] 之前调用，此时日志尚未初始化，
/// 由调用方在日志就绪后记录返回的文件路径。
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}
