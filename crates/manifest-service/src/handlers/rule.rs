//! 规则管理 API 处理器
//!
//! 实现清单规则的增删改查。规则按写入顺序参与评估，更新不改变位置。

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use manifest_shared::observability::metrics;
use serde_json::Value;
use tracing::info;
use validator::Validate;

use crate::{
    dto::{ApiResponse, CreatedResponse, DeletedResponse, RuleDto, RuleRequest},
    error::{ApiError, Result},
    state::AppState,
};

/// 记录变更结果指标
fn record_mutation<T>(operation: &str, state: &AppState, result: &Result<T>) {
    let status = match result {
        Ok(_) => "success",
        Err(e) => e.error_code(),
    };
    metrics::record_rule_mutation(operation, status);
    metrics::set_rules_loaded(state.engine.len());
}

/// 创建规则
///
/// POST /rules
pub async fn create_rule(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedResponse>>)> {
    let result = create(&state, payload);
    record_mutation("add", &state, &result);

    let id = result?;
    info!(rule_id = %id, "规则已创建");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(
            CreatedResponse { id },
            "规则已添加",
        )),
    ))
}

fn create(
    state: &AppState,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<String> {
    let Json(body) = payload?;
    let req = RuleRequest::parse(&body)?;
    req.validate()?;
    Ok(state.engine.add_rule(req.definition)?)
}

/// 按评估顺序列出所有规则
///
/// GET /rules
pub async fn list_rules(State(state): State<AppState>) -> Json<ApiResponse<Vec<RuleDto>>> {
    let rules = state
        .engine
        .list_rules()
        .into_iter()
        .map(RuleDto::from)
        .collect();
    Json(ApiResponse::success(rules))
}

/// 获取规则详情
///
/// GET /rules/{id}
pub async fn get_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<RuleDto>>> {
    let rule = state
        .engine
        .get_rule(&id)
        .ok_or(ApiError::RuleNotFound(id))?;
    Ok(Json(ApiResponse::success(rule.into())))
}

/// 替换规则内容，保留 ID 和评估位置
///
/// PUT /rules/{id}
pub async fn update_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApiResponse<RuleDto>>> {
    let result = update(&state, &id, payload);
    record_mutation("update", &state, &result);

    let rule = result?;
    info!(rule_id = %id, "规则已更新");
    Ok(Json(ApiResponse::success_with_message(rule, "规则已更新")))
}

fn update(
    state: &AppState,
    id: &str,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<RuleDto> {
    // 未知 ID 优先返回 404，不关心请求体内容
    if !state.engine.contains(id) {
        return Err(ApiError::RuleNotFound(id.to_string()));
    }

    let Json(body) = payload?;
    let req = RuleRequest::parse(&body)?;
    req.validate()?;
    state.engine.update_rule(id, req.definition)?;

    state
        .engine
        .get_rule(id)
        .map(RuleDto::from)
        .ok_or_else(|| ApiError::RuleNotFound(id.to_string()))
}

/// 删除规则
///
/// DELETE /rules/{id}
pub async fn delete_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DeletedResponse>>> {
    let result = state.engine.delete_rule(&id).map_err(ApiError::from);
    record_mutation("delete", &state, &result);
    result?;

    Ok(Json(ApiResponse::success_with_message(
        DeletedResponse { id, deleted: true },
        "规则已删除",
    )))
}
