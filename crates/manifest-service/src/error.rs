//! 服务错误类型定义
//!
//! 规则引擎错误到 HTTP 状态码与错误码的映射

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rule_engine::RuleError;

use crate::dto::ApiResponse;

/// 服务错误类型
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("规则无效: {0}")]
    InvalidRule(String),
    #[error("规则不存在: {0}")]
    RuleNotFound(String),
    #[error("没有匹配的清单")]
    NoMatch,
    #[error("事实集无效: {0}")]
    InvalidFacts(String),
    /// 规则引用了未实现的操作符，评估中止
    #[error("{0}")]
    UnsupportedOperator(String),

    #[error("参数验证失败: {0}")]
    Validation(String),
    #[error("请求格式错误: {0}")]
    BadRequest(String),
}

impl ApiError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRule(_)
            | Self::InvalidFacts(_)
            | Self::Validation(_)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RuleNotFound(_) | Self::NoMatch => StatusCode::NOT_FOUND,
            Self::UnsupportedOperator(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRule(_) => "INVALID_RULE",
            Self::RuleNotFound(_) => "RULE_NOT_FOUND",
            Self::NoMatch => "NO_MATCH",
            Self::InvalidFacts(_) => "INVALID_FACTS",
            Self::UnsupportedOperator(_) => "UNSUPPORTED_OPERATOR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::BadRequest(_) => "BAD_REQUEST",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let Self::UnsupportedOperator(e) = &self {
            tracing::error!(error = %e, "规则评估失败");
        }
        let message = self.to_string();

        let body = ApiResponse::<()>::error(self.error_code(), message);
        (status, axum::Json(body)).into_response()
    }
}

impl From<RuleError> for ApiError {
    fn from(err: RuleError) -> Self {
        match err {
            RuleError::InvalidRule(msg) => Self::InvalidRule(msg),
            RuleError::RuleNotFound(id) => Self::RuleNotFound(id),
            RuleError::InvalidFacts(msg) => Self::InvalidFacts(msg),
            RuleError::JsonError(e) => Self::BadRequest(e.to_string()),
            e @ RuleError::UnsupportedOperator { .. } => Self::UnsupportedOperator(e.to_string()),
        }
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 请求体不是合法 JSON 时转换为统一的错误响应
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, ApiError>;
