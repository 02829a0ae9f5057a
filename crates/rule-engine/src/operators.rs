//! 规则操作符定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 比较操作符
///
/// 名称与 json-rules-engine 规则格式保持一致（camelCase）。
/// 未识别的名称保存在 `Unsupported` 中：写入时视为合法结构，评估时报错，
/// 避免拼写错误的规则被静默当作不匹配。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    // 通用比较
    Equal,
    NotEqual,

    // 数值比较
    LessThan,
    LessThanInclusive,
    GreaterThan,
    GreaterThanInclusive,

    // 成员检查
    In,
    NotIn,
    Contains,
    DoesNotContain,

    Unsupported(String),
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Equal => "equal",
            Self::NotEqual => "notEqual",
            Self::LessThan => "lessThan",
            Self::LessThanInclusive => "lessThanInclusive",
            Self::GreaterThan => "greaterThan",
            Self::GreaterThanInclusive => "greaterThanInclusive",
            Self::In => "in",
            Self::NotIn => "notIn",
            Self::Contains => "contains",
            Self::DoesNotContain => "doesNotContain",
            Self::Unsupported(name) => name,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }
}

impl From<&str> for Operator {
    fn from(name: &str) -> Self {
        match name {
            "equal" => Self::Equal,
            "notEqual" => Self::NotEqual,
            "lessThan" => Self::LessThan,
            "lessThanInclusive" => Self::LessThanInclusive,
            "greaterThan" => Self::GreaterThan,
            "greaterThanInclusive" => Self::GreaterThanInclusive,
            "in" => Self::In,
            "notIn" => Self::NotIn,
            "contains" => Self::Contains,
            "doesNotContain" => Self::DoesNotContain,
            other => Self::Unsupported(other.to_string()),
        }
    }
}

impl From<String> for Operator {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        match op {
            Operator::Unsupported(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 逻辑组合子
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// 合取
    All,
    /// 析取
    Any,
    /// 取反（单个子条件）
    Not,
}

impl Combinator {
    pub const KEYS: [&'static str; 3] = ["all", "any", "not"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Any => "any",
            Self::Not => "not",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "all" => Some(Self::All),
            "any" => Some(Self::Any),
            "not" => Some(Self::Not),
            _ => None,
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
