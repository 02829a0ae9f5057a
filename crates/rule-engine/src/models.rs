//! 规则引擎领域模型

use crate::compiler::RuleCompiler;
use crate::error::{Result, RuleError};
use crate::operators::{Combinator, Operator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// 条件节点（比较或逻辑组）
///
/// 序列化格式与 json-rules-engine 一致：逻辑组为 `{"all": [...]}`、
/// `{"any": [...]}` 或 `{"not": {...}}`，比较为 `{"fact", "operator", "value"}`。
/// 反序列化统一经过 [`RuleCompiler::parse_condition`]，结构错误在入库前被拒绝。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Condition {
    Comparison(Comparison),
    Group(LogicalGroup),
}

impl Condition {
    pub fn all(children: Vec<Condition>) -> Self {
        Self::Group(LogicalGroup::All(children))
    }

    pub fn any(children: Vec<Condition>) -> Self {
        Self::Group(LogicalGroup::Any(children))
    }

    pub fn not(child: Condition) -> Self {
        Self::Group(LogicalGroup::Not(Box::new(child)))
    }

    pub fn fact(
        fact: impl Into<String>,
        operator: impl Into<Operator>,
        value: impl Into<Value>,
    ) -> Self {
        Self::Comparison(Comparison::new(fact, operator, value))
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        RuleCompiler::parse_condition(&raw).map_err(serde::de::Error::custom)
    }
}

/// 比较条件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub fact: String,
    pub operator: Operator,
    pub value: Value,
    /// 事实值内部的路径，如 `$.address.city`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Comparison {
    pub fn new(
        fact: impl Into<String>,
        operator: impl Into<Operator>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            fact: fact.into(),
            operator: operator.into(),
            value: value.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// 逻辑组
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalGroup {
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
}

impl LogicalGroup {
    pub fn combinator(&self) -> Combinator {
        match self {
            Self::All(_) => Combinator::All,
            Self::Any(_) => Combinator::Any,
            Self::Not(_) => Combinator::Not,
        }
    }

    pub fn children(&self) -> &[Condition] {
        match self {
            Self::All(children) | Self::Any(children) => children,
            Self::Not(child) => std::slice::from_ref(child.as_ref()),
        }
    }
}

/// 规则命中后触发的事件，`params.manifest` 即返回给调用方的清单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEvent {
    #[serde(rename = "type", default = "default_event_type")]
    pub event_type: String,
    pub params: EventParams,
}

fn default_event_type() -> String {
    "manifest".to_string()
}

impl RuleEvent {
    pub fn manifest(manifest: impl Into<Value>) -> Self {
        Self {
            event_type: default_event_type(),
            params: EventParams {
                manifest: manifest.into(),
                extra: Map::new(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventParams {
    pub manifest: Value,
    /// 其余参数原样保留
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 规则定义：新增或更新规则时的输入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(alias = "condition")]
    pub conditions: Condition,
    pub event: RuleEvent,
}

impl RuleDefinition {
    pub fn new(conditions: Condition, manifest: impl Into<Value>) -> Self {
        Self {
            name: None,
            conditions,
            event: RuleEvent::manifest(manifest),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// 规则
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub conditions: Condition,
    pub event: RuleEvent,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Rule {
    /// 以新生成的 ID 创建规则
    pub fn new(definition: RuleDefinition) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: definition.name,
            conditions: definition.conditions,
            event: definition.event,
            created_at: now,
            updated_at: now,
        }
    }

    /// 替换条件与事件，保留 ID 和创建时间
    pub fn replace(&mut self, definition: RuleDefinition) {
        self.name = definition.name;
        self.conditions = definition.conditions;
        self.event = definition.event;
        self.updated_at = Utc::now();
    }

    pub fn manifest(&self) -> &Value {
        &self.event.params.manifest
    }
}

/// 事实集 - 每次评估时由调用方提供
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactSet {
    facts: Map<String, Value>,
}

impl FactSet {
    pub fn new(facts: Map<String, Value>) -> Self {
        Self { facts }
    }

    /// 从 JSON 值创建，必须是对象
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(facts) => Ok(Self { facts }),
            other => Err(RuleError::InvalidFacts(format!(
                "事实集必须是 JSON 对象, 实际为 {}",
                json_type_name(&other)
            ))),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.facts.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.facts.get(name)
    }

    /// 解析事实值，可选地沿路径深入（支持 `$.a.b`、`a.b`、数组下标 `items.0`）
    pub fn resolve(&self, name: &str, path: Option<&str>) -> Option<&Value> {
        let value = self.facts.get(name)?;
        match path {
            Some(path) => select_path(value, path),
            None => Some(value),
        }
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

fn select_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let trimmed = path.strip_prefix('$').unwrap_or(path);
    let trimmed = trimmed.strip_prefix('.').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Some(value);
    }

    let mut current = value;
    for part in trimmed.split('.') {
        match current {
            Value::Object(map) => {
                current = map.get(part)?;
            }
            Value::Array(arr) => {
                let index: usize = part.parse().ok()?;
                current = arr.get(index)?;
            }
            _ => return None,
        }
    }

    Some(current)
}

/// 获取 JSON 值的类型名称
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 单条规则的评估结果
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    pub matched: bool,
    pub rule_id: String,
    pub rule_name: Option<String>,
    pub matched_conditions: Vec<String>,
    pub evaluation_trace: Vec<String>,
}

impl EvaluationResult {
    pub fn new(rule_id: String, rule_name: Option<String>) -> Self {
        Self {
            matched: false,
            rule_id,
            rule_name,
            matched_conditions: Vec::new(),
            evaluation_trace: Vec::new(),
        }
    }
}

/// 命中的规则及其清单
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleMatch {
    pub rule_id: String,
    pub rule_name: Option<String>,
    pub event_type: String,
    pub manifest: Value,
}

/// 规则集评估的最终结果：命中清单或明确的未命中
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationOutcome {
    Matched(RuleMatch),
    NoMatch,
}

impl EvaluationOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched(_))
    }

    pub fn manifest(&self) -> Option<&Value> {
        match self {
            Self::Matched(m) => Some(&m.manifest),
            Self::NoMatch => None,
        }
    }
}

/// 带追踪信息的规则集评估报告
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub outcome: EvaluationOutcome,
    pub rules_evaluated: usize,
    pub evaluation_trace: Vec<String>,
    pub evaluation_time_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_serialization() {
        let rule = Rule::new(
            RuleDefinition::new(
                Condition::all(vec![
                    Condition::fact("facilityId", Operator::Equal, "F1"),
                    Condition::fact("capacity", Operator::GreaterThanInclusive, 500),
                ]),
                json!({"items": ["pallet", "crate"]}),
            )
            .with_name("f1_manifest"),
        );

        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(value["conditions"]["all"][0]["fact"], json!("facilityId"));
        assert_eq!(value["conditions"]["all"][1]["operator"], json!("greaterThanInclusive"));
        assert_eq!(value["event"]["type"], json!("manifest"));
        assert_eq!(value["event"]["params"]["manifest"]["items"][1], json!("crate"));

        let parsed: Rule = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, rule);
    }

    #[test]
    fn test_rule_deserialization() {
        let json = r#"
        {
            "id": "rule-001",
            "name": "cold_storage",
            "conditions": {
                "any": [
                    { "fact": "type", "operator": "equal", "value": "cold" },
                    {
                        "not": { "fact": "temperature", "operator": "greaterThan", "value": 4 }
                    }
                ]
            },
            "event": {
                "type": "manifest",
                "params": { "manifest": "Cold-Manifest", "priority": "high" }
            }
        }
        "#;

        let rule: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.id, "rule-001");
        assert_eq!(rule.name.as_deref(), Some("cold_storage"));
        assert_eq!(rule.manifest(), &json!("Cold-Manifest"));
        assert_eq!(rule.event.params.extra.get("priority"), Some(&json!("high")));

        match &rule.conditions {
            Condition::Group(LogicalGroup::Any(children)) => {
                assert_eq!(children.len(), 2);
                assert!(matches!(children[1], Condition::Group(LogicalGroup::Not(_))));
            }
            other => panic!("unexpected condition: {:?}", other),
        }
    }

    #[test]
    fn test_definition_accepts_condition_alias() {
        let def: RuleDefinition = serde_json::from_value(json!({
            "condition": { "all": [] },
            "event": { "params": { "manifest": "Default-Manifest" } }
        }))
        .unwrap();

        assert_eq!(def.conditions, Condition::all(vec![]));
        assert_eq!(def.event.event_type, "manifest");
    }

    #[test]
    fn test_fact_set_resolution() {
        let facts = FactSet::from_value(json!({
            "facilityId": "F1",
            "address": {
                "city": "Oslo",
                "docks": [{"id": "D1"}, {"id": "D2"}]
            },
            "active": true
        }))
        .unwrap();

        assert_eq!(facts.resolve("facilityId", None), Some(&json!("F1")));
        assert_eq!(facts.resolve("address", Some("$.city")), Some(&json!("Oslo")));
        assert_eq!(facts.resolve("address", Some("city")), Some(&json!("Oslo")));
        assert_eq!(facts.resolve("address", Some("$.docks.1.id")), Some(&json!("D2")));
        assert_eq!(facts.resolve("address", Some("$")), facts.get("address"));
        assert_eq!(facts.resolve("address", Some("$.zip")), None);
        assert_eq!(facts.resolve("active", Some("$.x")), None);
        assert_eq!(facts.resolve("nonexistent", None), None);
    }

    #[test]
    fn test_fact_set_must_be_object() {
        let err = FactSet::from_value(json!(["F1"])).unwrap_err();
        assert!(matches!(err, RuleError::InvalidFacts(_)));

        let err = FactSet::from_json("not json").unwrap_err();
        assert!(matches!(err, RuleError::JsonError(_)));
    }

    #[test]
    fn test_replace_preserves_identity() {
        let mut rule = Rule::new(RuleDefinition::new(Condition::all(vec![]), "M1"));
        let id = rule.id.clone();
        let created_at = rule.created_at;

        rule.replace(RuleDefinition::new(Condition::any(vec![]), "M2"));

        assert_eq!(rule.id, id);
        assert_eq!(rule.created_at, created_at);
        assert_eq!(rule.manifest(), &json!("M2"));
        assert!(rule.updated_at >= created_at);
    }
}
