//! 设施清单规则服务
//!
//! 提供规则管理与清单评估的 REST API。

use manifest_service::{AppState, SERVICE_NAME, routes, seed};
use manifest_shared::{
    config::AppConfig,
    load_dotenv,
    observability::{self, metrics},
};
use rule_engine::RuleEngine;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv_path = load_dotenv();

    let config = AppConfig::load(SERVICE_NAME).unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::for_service(SERVICE_NAME)
    });

    let _guard = observability::init(&config.service_name, &config.observability).await?;

    if let Some(path) = dotenv_path {
        info!("Loaded environment from {}", path.display());
    }

    info!(
        environment = %config.environment,
        "Starting {} on {}",
        config.service_name,
        config.server_addr()
    );

    let engine = RuleEngine::new();
    match &config.rules.seed_file {
        Some(path) => {
            // 规则文件格式错误时拒绝启动
            let count = seed::load_seed_file(&engine, path)?;
            info!("Loaded {} rules from {}", count, path.display());
        }
        None => info!("No seed file configured, starting with empty rule set"),
    }
    metrics::set_rules_loaded(engine.len());

    if config.is_production() && config.cors.allows_any_origin() {
        warn!("cors.allowed_origins 包含 \"*\"，生产环境请设置为具体域名");
    }

    let app = routes::app(AppState::new(engine), &config.cors);

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

/// 监听关闭信号
///
/// 收到 Ctrl+C 或 SIGTERM 后返回，触发 axum 的优雅关闭流程。
/// 信号处理器注册失败时对应分支永不完成。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("注册 Ctrl+C 处理器失败: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("注册 SIGTERM 处理器失败: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
