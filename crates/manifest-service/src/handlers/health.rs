//! 健康检查

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::{SERVICE_NAME, state::AppState};

/// 存活探针
///
/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "rules": state.engine.len()
    }))
}
