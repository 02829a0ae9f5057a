//! 规则编译器
//!
//! 将 JSON 规则解析为类型化的条件树，并在入库前完成结构校验。
//! 结构不合法的规则在这里以 `InvalidRule` 拒绝，评估阶段只需处理合法的树。

use crate::error::{Result, RuleError};
use crate::models::{json_type_name, Comparison, Condition, LogicalGroup, RuleDefinition, RuleEvent};
use crate::operators::{Combinator, Operator};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// 规则编译器
pub struct RuleCompiler;

impl RuleCompiler {
    /// 从 JSON 字符串解析规则定义
    pub fn compile_from_json(json: &str) -> Result<RuleDefinition> {
        let value: Value = serde_json::from_str(json)?;
        Self::compile(&value)
    }

    /// 解析规则定义
    ///
    /// 接受 `conditions`（json-rules-engine 格式）或 `condition` 作为根条件，
    /// `event.params.manifest` 必须存在（允许为 null）。
    pub fn compile(value: &Value) -> Result<RuleDefinition> {
        let obj = value
            .as_object()
            .ok_or_else(|| invalid("rule", format!("规则必须是 JSON 对象, 实际为 {}", json_type_name(value))))?;

        let name = match obj.get("name") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                return Err(invalid(
                    "rule.name",
                    format!("必须是字符串, 实际为 {}", json_type_name(other)),
                ));
            }
        };

        let root = match (obj.get("conditions"), obj.get("condition")) {
            (Some(_), Some(_)) => {
                return Err(invalid("rule", "conditions 与 condition 不能同时出现"));
            }
            (Some(root), None) | (None, Some(root)) => root,
            (None, None) => return Err(invalid("rule", "缺少根条件 conditions")),
        };
        let conditions = Self::parse_node(root, "root")?;

        let event = Self::parse_event(obj.get("event"))?;

        let definition = RuleDefinition {
            name,
            conditions,
            event,
        };
        Self::validate(&definition)?;
        Ok(definition)
    }

    /// 解析单个条件树
    pub fn parse_condition(value: &Value) -> Result<Condition> {
        Self::parse_node(value, "root")
    }

    /// 校验类型化的规则定义
    ///
    /// 通过代码直接构造的条件不经过 JSON 解析，这里补齐同样的约束。
    pub fn validate(definition: &RuleDefinition) -> Result<()> {
        if matches!(&definition.name, Some(name) if name.trim().is_empty()) {
            return Err(invalid("rule.name", "规则名称不能为空字符串"));
        }

        Self::validate_node(&definition.conditions, "root")
    }

    /// 提取条件树中引用的所有事实名称
    pub fn extract_facts(condition: &Condition) -> BTreeSet<String> {
        let mut facts = BTreeSet::new();
        Self::collect_facts(condition, &mut facts);
        facts
    }

    fn collect_facts(condition: &Condition, facts: &mut BTreeSet<String>) {
        match condition {
            Condition::Comparison(cmp) => {
                facts.insert(cmp.fact.clone());
            }
            Condition::Group(group) => {
                for child in group.children() {
                    Self::collect_facts(child, facts);
                }
            }
        }
    }

    fn parse_node(value: &Value, path: &str) -> Result<Condition> {
        let obj = value.as_object().ok_or_else(|| {
            invalid(path, format!("条件必须是 JSON 对象, 实际为 {}", json_type_name(value)))
        })?;

        let combinators: Vec<(Combinator, &Value)> = Combinator::KEYS
            .iter()
            .filter_map(|key| Some((Combinator::from_key(key)?, obj.get(*key)?)))
            .collect();

        match combinators.as_slice() {
            [] => Self::parse_comparison(obj, path).map(Condition::Comparison),
            [(combinator, children)] => {
                if obj.contains_key("fact") {
                    return Err(invalid(
                        path,
                        format!("逻辑组 '{}' 不能同时包含 fact", combinator),
                    ));
                }
                Self::parse_group(*combinator, children, path).map(Condition::Group)
            }
            _ => {
                let keys: Vec<&str> = combinators.iter().map(|(c, _)| c.as_str()).collect();
                Err(invalid(
                    path,
                    format!("一个节点只能有一个逻辑组合子, 实际包含 {}", keys.join("/")),
                ))
            }
        }
    }

    fn parse_group(combinator: Combinator, value: &Value, path: &str) -> Result<LogicalGroup> {
        match combinator {
            Combinator::All | Combinator::Any => {
                let items = value.as_array().ok_or_else(|| {
                    invalid(
                        path,
                        format!(
                            "'{}' 必须是条件数组, 实际为 {}",
                            combinator,
                            json_type_name(value)
                        ),
                    )
                })?;

                let children = items
                    .iter()
                    .enumerate()
                    .map(|(i, child)| {
                        Self::parse_node(child, &format!("{}.{}[{}]", path, combinator, i))
                    })
                    .collect::<Result<Vec<_>>>()?;

                Ok(if combinator == Combinator::All {
                    LogicalGroup::All(children)
                } else {
                    LogicalGroup::Any(children)
                })
            }
            Combinator::Not => {
                let child = Self::parse_node(value, &format!("{}.not", path))?;
                Ok(LogicalGroup::Not(Box::new(child)))
            }
        }
    }

    fn parse_comparison(obj: &Map<String, Value>, path: &str) -> Result<Comparison> {
        if !obj.contains_key("fact") && !obj.contains_key("operator") {
            return Err(invalid(
                path,
                "缺少逻辑组合子 (all/any/not) 或比较条件 (fact/operator)",
            ));
        }

        let fact = required_string(obj, "fact", path)?;
        let operator = required_string(obj, "operator", path)?;
        let value = obj
            .get("value")
            .cloned()
            .ok_or_else(|| invalid(path, "比较条件缺少 value"))?;

        let fact_path = match obj.get("path") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                return Err(invalid(
                    path,
                    format!("path 必须是字符串, 实际为 {}", json_type_name(other)),
                ));
            }
        };

        Ok(Comparison {
            fact,
            operator: Operator::from(operator),
            value,
            path: fact_path,
        })
    }

    fn parse_event(value: Option<&Value>) -> Result<RuleEvent> {
        let event = value.ok_or_else(|| invalid("rule", "缺少 event"))?;
        let obj = event.as_object().ok_or_else(|| {
            invalid("rule.event", format!("必须是 JSON 对象, 实际为 {}", json_type_name(event)))
        })?;

        let params = obj
            .get("params")
            .and_then(Value::as_object)
            .ok_or_else(|| invalid("rule.event", "缺少 params 对象"))?;

        if !params.contains_key("manifest") {
            return Err(invalid("rule.event.params", "缺少 manifest"));
        }

        serde_json::from_value(event.clone())
            .map_err(|e| invalid("rule.event", e.to_string()))
    }

    fn validate_node(node: &Condition, path: &str) -> Result<()> {
        match node {
            Condition::Comparison(cmp) => {
                if cmp.fact.trim().is_empty() {
                    return Err(invalid(path, "fact 不能为空"));
                }
                if cmp.operator.as_str().is_empty() {
                    return Err(invalid(path, "operator 不能为空"));
                }
                Ok(())
            }
            Condition::Group(group) => {
                let combinator = group.combinator();
                match group {
                    LogicalGroup::Not(child) => {
                        Self::validate_node(child, &format!("{}.not", path))
                    }
                    LogicalGroup::All(children) | LogicalGroup::Any(children) => {
                        for (i, child) in children.iter().enumerate() {
                            Self::validate_node(
                                child,
                                &format!("{}.{}[{}]", path, combinator, i),
                            )?;
                        }
                        Ok(())
                    }
                }
            }
        }
    }
}

fn required_string(obj: &Map<String, Value>, key: &str, path: &str) -> Result<String> {
    match obj.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(invalid(path, format!("{} 不能为空", key))),
        Some(other) => Err(invalid(
            path,
            format!("{} 必须是字符串, 实际为 {}", key, json_type_name(other)),
        )),
        None => Err(invalid(path, format!("比较条件缺少 {}", key))),
    }
}

fn invalid(path: &str, message: impl AsRef<str>) -> RuleError {
    RuleError::InvalidRule(format!("{}: {}", path, message.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile_err(value: Value) -> String {
        match RuleCompiler::compile(&value) {
            Err(RuleError::InvalidRule(msg)) => msg,
            other => panic!("expected InvalidRule, got {:?}", other),
        }
    }

    #[test]
    fn test_compile_nested_rule() {
        let def = RuleCompiler::compile(&json!({
            "name": "f1",
            "conditions": {
                "all": [
                    { "fact": "facilityId", "operator": "equal", "value": "F1" },
                    {
                        "any": [
                            { "fact": "type", "operator": "in", "value": ["cold", "frozen"] },
                            { "not": { "fact": "temperature", "operator": "greaterThan", "value": 4 } }
                        ]
                    }
                ]
            },
            "event": { "type": "manifest", "params": { "manifest": "M1" } }
        }))
        .unwrap();

        assert_eq!(def.name.as_deref(), Some("f1"));
        assert_eq!(def.event.params.manifest, json!("M1"));
        let facts = RuleCompiler::extract_facts(&def.conditions);
        assert_eq!(
            facts.into_iter().collect::<Vec<_>>(),
            vec!["facilityId", "temperature", "type"]
        );
    }

    #[test]
    fn test_compile_from_json_text() {
        let def = RuleCompiler::compile_from_json(
            r#"{ "condition": { "any": [] }, "event": { "params": { "manifest": null } } }"#,
        )
        .unwrap();
        assert_eq!(def.conditions, Condition::any(vec![]));
        assert_eq!(def.event.params.manifest, Value::Null);

        let err = RuleCompiler::compile_from_json("{ not json").unwrap_err();
        assert!(matches!(err, RuleError::JsonError(_)));
    }

    #[test]
    fn test_empty_groups_are_accepted() {
        let cond = RuleCompiler::parse_condition(&json!({ "all": [] })).unwrap();
        assert_eq!(cond, Condition::all(vec![]));
    }

    #[test]
    fn test_unknown_operator_is_accepted() {
        let cond = RuleCompiler::parse_condition(
            &json!({ "fact": "name", "operator": "regexMatches", "value": "^F" }),
        )
        .unwrap();

        match cond {
            Condition::Comparison(cmp) => {
                assert_eq!(cmp.operator, Operator::Unsupported("regexMatches".to_string()));
            }
            other => panic!("unexpected condition: {:?}", other),
        }
    }

    #[test]
    fn test_missing_combinator() {
        let msg = compile_err(json!({
            "conditions": { "children": [] },
            "event": { "params": { "manifest": "M" } }
        }));
        assert!(msg.starts_with("root:"), "{}", msg);
        assert!(msg.contains("缺少逻辑组合子"), "{}", msg);
    }

    #[test]
    fn test_comparison_missing_fields() {
        let msg = compile_err(json!({
            "conditions": { "all": [ { "operator": "equal", "value": "F1" } ] },
            "event": { "params": { "manifest": "M" } }
        }));
        assert!(msg.starts_with("root.all[0]:"), "{}", msg);
        assert!(msg.contains("fact"), "{}", msg);

        let msg = compile_err(json!({
            "conditions": { "any": [ { "fact": "facilityId", "value": "F1" } ] },
            "event": { "params": { "manifest": "M" } }
        }));
        assert!(msg.starts_with("root.any[0]:"), "{}", msg);
        assert!(msg.contains("operator"), "{}", msg);

        let msg = compile_err(json!({
            "conditions": { "fact": "facilityId", "operator": "equal" },
            "event": { "params": { "manifest": "M" } }
        }));
        assert!(msg.contains("value"), "{}", msg);
    }

    #[test]
    fn test_wrong_types() {
        let msg = compile_err(json!({
            "conditions": { "all": { "fact": "a", "operator": "equal", "value": 1 } },
            "event": { "params": { "manifest": "M" } }
        }));
        assert!(msg.contains("条件数组"), "{}", msg);

        let msg = compile_err(json!({
            "conditions": { "fact": 42, "operator": "equal", "value": 1 },
            "event": { "params": { "manifest": "M" } }
        }));
        assert!(msg.contains("fact 必须是字符串"), "{}", msg);

        let msg = compile_err(json!({
            "conditions": { "all": [ "facilityId" ] },
            "event": { "params": { "manifest": "M" } }
        }));
        assert!(msg.starts_with("root.all[0]:"), "{}", msg);
    }

    #[test]
    fn test_ambiguous_nodes() {
        let msg = compile_err(json!({
            "conditions": { "all": [], "any": [] },
            "event": { "params": { "manifest": "M" } }
        }));
        assert!(msg.contains("all/any"), "{}", msg);

        let msg = compile_err(json!({
            "conditions": { "all": [], "fact": "x", "operator": "equal", "value": 1 },
            "event": { "params": { "manifest": "M" } }
        }));
        assert!(msg.contains("不能同时包含 fact"), "{}", msg);
    }

    #[test]
    fn test_event_validation() {
        let msg = compile_err(json!({ "conditions": { "all": [] } }));
        assert!(msg.contains("缺少 event"), "{}", msg);

        let msg = compile_err(json!({ "conditions": { "all": [] }, "event": { "params": {} } }));
        assert!(msg.contains("manifest"), "{}", msg);

        let msg = compile_err(json!({ "conditions": { "all": [] }, "event": { "type": "x" } }));
        assert!(msg.contains("params"), "{}", msg);
    }

    #[test]
    fn test_validate_typed_definition() {
        let def = RuleDefinition::new(
            Condition::all(vec![Condition::fact("  ", Operator::Equal, "F1")]),
            "M1",
        );
        let err = RuleCompiler::validate(&def).unwrap_err();
        assert!(matches!(err, RuleError::InvalidRule(msg) if msg.starts_with("root.all[0]")));

        let def = RuleDefinition::new(Condition::all(vec![]), "M1").with_name("");
        assert!(RuleCompiler::validate(&def).is_err());
    }
}
