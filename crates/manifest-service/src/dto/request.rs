//! 请求 DTO 定义

use rule_engine::{RuleCompiler, RuleDefinition};
use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

/// 新增或替换规则的请求体
///
/// 请求体先经规则编译器解析（结构错误为 `InvalidRule`），
/// 再对外层字段做长度等约束校验。
#[derive(Debug, Validate)]
pub struct RuleRequest {
    #[validate(length(min = 1, max = 128, message = "规则名称长度必须在1-128个字符之间"))]
    pub name: Option<String>,
    pub definition: RuleDefinition,
}

impl RuleRequest {
    /// 解析规则请求体
    pub fn parse(body: &Value) -> rule_engine::Result<Self> {
        let definition = RuleCompiler::compile(body)?;
        Ok(Self {
            name: definition.name.clone(),
            definition,
        })
    }
}

/// 评估接口查询参数
#[derive(Debug, Default, Deserialize)]
pub struct EvaluateQuery {
    /// 是否返回条件评估追踪
    #[serde(default)]
    pub trace: bool,
}
