//! 路由配置模块
//!
//! 定义 REST API 端点与中间件栈

use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use manifest_shared::{config::CorsConfig, observability::middleware as obs_middleware};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::{handlers, state::AppState};

/// 构建规则管理与评估路由
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/rules",
            get(handlers::rule::list_rules).post(handlers::rule::create_rule),
        )
        .route(
            "/rules/{id}",
            get(handlers::rule::get_rule)
                .put(handlers::rule::update_rule)
                .delete(handlers::rule::delete_rule),
        )
        .route("/evaluate", post(handlers::evaluate::evaluate))
        .route("/health", get(handlers::health::health_check))
}

/// 构建完整应用：路由 + 中间件 + 状态
pub fn app(state: AppState, cors: &CorsConfig) -> Router {
    api_routes()
        .layer(middleware::from_fn(obs_middleware::security_headers))
        .layer(cors_layer(cors))
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}

/// 根据配置构建 CORS 层
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    if config.allows_any_origin() {
        info!("CORS allowed_origins: * (all origins)");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.trim().parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("忽略无效的 CORS 来源: {}", origin);
                None
            }
        })
        .collect();
    info!("CORS allowed_origins: {:?}", config.allowed_origins);

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
