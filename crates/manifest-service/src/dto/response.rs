//! 响应 DTO 定义
//!
//! 所有 REST API 的响应体结构

use chrono::{DateTime, Utc};
use rule_engine::{Condition, EvaluationReport, Rule, RuleEvent, RuleMatch};
use serde::Serialize;
use serde_json::Value;

/// API 统一响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: Some(data),
        }
    }

    /// 创建成功响应（自定义消息）
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: message.into(),
            data: Some(data),
        }
    }

    /// 创建错误响应
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            code: code.into(),
            message: message.into(),
            data: None,
        }
    }
}

/// 创建成功响应
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

/// 删除成功响应
#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub id: String,
    pub deleted: bool,
}

/// 规则响应 DTO
///
/// `conditions` 与 `event` 保持规则写入时的 JSON 格式，可直接再次提交。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDto {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub conditions: Condition,
    pub event: RuleEvent,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Rule> for RuleDto {
    fn from(rule: Rule) -> Self {
        Self {
            id: rule.id,
            name: rule.name,
            conditions: rule.conditions,
            event: rule.event,
            created_at: rule.created_at,
            updated_at: rule.updated_at,
        }
    }
}

/// 评估命中响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
    pub manifest: Value,
    pub rule_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_evaluated: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<String>>,
}

impl From<RuleMatch> for EvaluateResponse {
    fn from(m: RuleMatch) -> Self {
        Self {
            manifest: m.manifest,
            rule_id: m.rule_id,
            rule_name: m.rule_name,
            event_type: m.event_type,
            rules_evaluated: None,
            trace: None,
        }
    }
}

impl EvaluateResponse {
    /// 附加追踪报告中的统计与追踪信息
    pub fn with_report(mut self, report: &EvaluationReport) -> Self {
        self.rules_evaluated = Some(report.rules_evaluated);
        self.trace = Some(report.evaluation_trace.clone());
        self
    }
}
