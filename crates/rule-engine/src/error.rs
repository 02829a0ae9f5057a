//! 规则引擎错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    /// 规则结构不合法，在写入时拒绝，永远不会进入规则集
    #[error("无效的规则: {0}")]
    InvalidRule(String),

    #[error("规则未找到: {0}")]
    RuleNotFound(String),

    /// 评估时遇到未实现的操作符
    #[error("不支持的操作符: '{operator}' (位置 {path}{})", rule_suffix(.rule_id))]
    UnsupportedOperator {
        operator: String,
        path: String,
        rule_id: Option<String>,
    },

    #[error("无效的事实集: {0}")]
    InvalidFacts(String),

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

fn rule_suffix(rule_id: &Option<String>) -> String {
    match rule_id {
        Some(id) => format!(", 规则 {}", id),
        None => String::new(),
    }
}

impl RuleError {
    /// 为评估错误补充所属规则 ID，其他错误原样返回
    pub fn in_rule(self, id: &str) -> Self {
        match self {
            Self::UnsupportedOperator {
                operator,
                path,
                rule_id: None,
            } => Self::UnsupportedOperator {
                operator,
                path,
                rule_id: Some(id.to_string()),
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;
