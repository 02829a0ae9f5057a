//! 统一可观测性模块
//!
//! 提供日志与 Prometheus 指标的统一初始化。

pub mod metrics;
pub mod middleware;
pub mod tracing;

use crate::config::ObservabilityConfig;
use ::tracing::info;
use anyhow::Result;

/// 可观测性资源守卫
///
/// 持有指标服务器的生命周期，drop 时停止导出。
pub struct ObservabilityGuard {
    metrics_handle: Option<metrics::MetricsHandle>,
}

impl ObservabilityGuard {
    /// 创建一个空的 Guard（用于测试或禁用可观测性时）
    pub fn empty() -> Self {
        Self {
            metrics_handle: None,
        }
    }

    pub fn metrics_enabled(&self) -> bool {
        self.metrics_handle.is_some()
    }
}

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.metrics_handle.take() {
            handle.shutdown();
        }
        info!("Shutting down observability...");
    }
}

/// 统一初始化可观测性
///
/// 初始化顺序：
/// 1. Tracing（日志）
/// 2. Metrics（Prometheus 指标，`metrics_enabled = false` 时跳过）
///
/// # Example
///
/// ```ignore
/// use manifest_shared::{config::AppConfig, observability};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = AppConfig::load("manifest-service")?;
///     let _guard = observability::init(&config.service_name, &config.observability).await?;
///     Ok(())
/// }
/// ```
pub async fn init(service_name: &str, config: &ObservabilityConfig) -> Result<ObservabilityGuard> {
    tracing::init(config)?;

    info!(
        service = %service_name,
        metrics_enabled = config.metrics_enabled,
        metrics_port = config.metrics_port,
        "Observability initialized"
    );

    let metrics_handle = if config.metrics_enabled {
        Some(metrics::init(service_name, config.metrics_port).await?)
    } else {
        None
    };

    Ok(ObservabilityGuard { metrics_handle })
}
