//! 清单评估 API 处理器

use std::time::Instant;

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};
use manifest_shared::observability::metrics;
use rule_engine::{EvaluationOutcome, FactSet};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    dto::{ApiResponse, EvaluateQuery, EvaluateResponse},
    error::{ApiError, Result},
    state::AppState,
};

/// 根据事实集评估出清单
///
/// POST /evaluate
///
/// 请求体即事实集，如 `{ "facilityId": "F1" }`。命中时返回第一条匹配规则的清单，
/// 无规则命中时返回 404 `NO_MATCH`，规则评估失败时返回 500。
pub async fn evaluate(
    State(state): State<AppState>,
    Query(query): Query<EvaluateQuery>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApiResponse<EvaluateResponse>>> {
    let Json(body) = payload?;
    let facts = FactSet::from_value(body)?;

    let start = Instant::now();
    let result = run(&state, &facts, query.trace);
    let elapsed = start.elapsed().as_secs_f64();

    let outcome_label = match &result {
        Ok(_) => "matched",
        Err(ApiError::NoMatch) => "no_match",
        Err(_) => "error",
    };
    metrics::record_rule_evaluation(outcome_label, elapsed);

    match &result {
        Ok(resp) => debug!(rule_id = %resp.rule_id, facts = facts.len(), "清单命中"),
        Err(ApiError::NoMatch) => debug!(facts = facts.len(), "无规则命中"),
        Err(e) => warn!(error = %e, "清单评估失败"),
    }

    Ok(Json(ApiResponse::success(result?)))
}

fn run(state: &AppState, facts: &FactSet, trace: bool) -> Result<EvaluateResponse> {
    if trace {
        let report = state.engine.evaluate_with_trace(facts)?;
        match &report.outcome {
            EvaluationOutcome::Matched(m) => {
                Ok(EvaluateResponse::from(m.clone()).with_report(&report))
            }
            EvaluationOutcome::NoMatch => Err(ApiError::NoMatch),
        }
    } else {
        match state.engine.evaluate(facts)? {
            EvaluationOutcome::Matched(m) => Ok(m.into()),
            EvaluationOutcome::NoMatch => Err(ApiError::NoMatch),
        }
    }
}
