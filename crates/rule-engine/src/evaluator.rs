//! 条件评估器
//!
//! 实现各比较操作符的语义。事实缺失时任何比较都不成立；
//! 数值比较两侧都必须能转换为数字，否则条件不成立。
//! 两个整数之间的比较是精确的，不经过 f64。

use crate::error::{Result, RuleError};
use crate::operators::Operator;
use serde_json::{Number, Value};
use std::cmp::Ordering;

/// 条件评估器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 评估条件
    ///
    /// # Arguments
    /// * `fact_value` - 从事实集中解析出的值，`None` 表示事实不存在
    /// * `operator` - 操作符
    /// * `expected_value` - 规则中定义的比较值
    pub fn evaluate(
        fact_value: Option<&Value>,
        operator: &Operator,
        expected_value: &Value,
    ) -> Result<bool> {
        if let Operator::Unsupported(name) = operator {
            return Err(RuleError::UnsupportedOperator {
                operator: name.clone(),
                path: "condition".to_string(),
                rule_id: None,
            });
        }

        // 缺失的事实永远不满足比较，包括取反类操作符
        let Some(fact_value) = fact_value else {
            return Ok(false);
        };

        let matched = match operator {
            Operator::Equal => Self::strict_eq(fact_value, expected_value),
            Operator::NotEqual => !Self::strict_eq(fact_value, expected_value),
            Operator::LessThan => Self::compare(fact_value, expected_value, Ordering::is_lt),
            Operator::LessThanInclusive => {
                Self::compare(fact_value, expected_value, Ordering::is_le)
            }
            Operator::GreaterThan => Self::compare(fact_value, expected_value, Ordering::is_gt),
            Operator::GreaterThanInclusive => {
                Self::compare(fact_value, expected_value, Ordering::is_ge)
            }
            Operator::In => Self::in_list(fact_value, expected_value),
            Operator::NotIn => !Self::in_list(fact_value, expected_value),
            Operator::Contains => Self::contains(fact_value, expected_value),
            Operator::DoesNotContain => !Self::contains(fact_value, expected_value),
            Operator::Unsupported(_) => false,
        };

        Ok(matched)
    }

    /// 严格相等：类型和值都必须相同
    ///
    /// 两个数字按数值比较，`1` 与 `1.0` 相等；`"1"` 与 `1` 不相等。
    fn strict_eq(fact: &Value, expected: &Value) -> bool {
        match (fact, expected) {
            (Value::Number(a), Value::Number(b)) => Self::number_eq(a, b),
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Self::strict_eq(x, y))
            }
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|w| Self::strict_eq(v, w)))
            }
            _ => fact == expected,
        }
    }

    /// 数字相等：两侧都是整数时精确比较，否则按 f64 比较
    fn number_eq(a: &Number, b: &Number) -> bool {
        match (Self::as_integer(a), Self::as_integer(b)) {
            (Some(a), Some(b)) => a == b,
            _ => a.as_f64() == b.as_f64(),
        }
    }

    /// 数值比较，任一侧无法转换为数字时返回 false
    fn compare<F>(fact: &Value, expected: &Value, cmp: F) -> bool
    where
        F: Fn(Ordering) -> bool,
    {
        let integers = match (fact, expected) {
            (Value::Number(a), Value::Number(b)) => Self::as_integer(a).zip(Self::as_integer(b)),
            _ => None,
        };
        if let Some((a, b)) = integers {
            return cmp(a.cmp(&b));
        }

        match (Self::as_f64(fact), Self::as_f64(expected)) {
            (Some(a), Some(b)) => a.partial_cmp(&b).is_some_and(cmp),
            _ => false,
        }
    }

    /// 整数（i64 或 u64）无损转换为 i128，浮点数返回 None
    fn as_integer(n: &Number) -> Option<i128> {
        n.as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
    }

    /// 列表成员检查 (in)，比较值必须是数组
    fn in_list(fact: &Value, expected: &Value) -> bool {
        match expected {
            Value::Array(items) => items.iter().any(|item| Self::strict_eq(fact, item)),
            _ => false,
        }
    }

    /// 数组包含检查 (contains)，事实值必须是数组
    fn contains(fact: &Value, expected: &Value) -> bool {
        match fact {
            Value::Array(items) => items.iter().any(|item| Self::strict_eq(item, expected)),
            _ => false,
        }
    }

    /// 尝试将 Value 转换为 f64
    fn as_f64(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }
}
