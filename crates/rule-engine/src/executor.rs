//! 规则执行器
//!
//! 递归遍历条件树并短路求值，可选记录评估追踪信息。

use crate::error::{Result, RuleError};
use crate::evaluator::ConditionEvaluator;
use crate::models::{Comparison, Condition, EvaluationResult, FactSet, LogicalGroup, Rule};

/// 规则执行器
#[derive(Debug, Clone, Copy)]
pub struct RuleExecutor {
    /// 是否记录详细评估追踪
    trace_enabled: bool,
}

impl RuleExecutor {
    pub fn new() -> Self {
        Self {
            trace_enabled: false,
        }
    }

    /// 启用评估追踪
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    pub fn trace_enabled(&self) -> bool {
        self.trace_enabled
    }

    /// 评估单个条件树
    pub fn evaluate(&self, condition: &Condition, facts: &FactSet) -> Result<bool> {
        let mut result = EvaluationResult::new(String::new(), None);
        self.evaluate_node(condition, facts, &mut result, "root")
    }

    /// 执行规则评估
    ///
    /// 评估失败时错误中会带上规则 ID，便于定位有问题的规则。
    pub fn execute(&self, rule: &Rule, facts: &FactSet) -> Result<EvaluationResult> {
        let mut result = EvaluationResult::new(rule.id.clone(), rule.name.clone());

        let matched = self
            .evaluate_node(&rule.conditions, facts, &mut result, "root")
            .map_err(|e| e.in_rule(&rule.id))?;

        result.matched = matched;
        Ok(result)
    }

    /// 递归评估条件节点
    fn evaluate_node(
        &self,
        node: &Condition,
        facts: &FactSet,
        result: &mut EvaluationResult,
        path: &str,
    ) -> Result<bool> {
        match node {
            Condition::Comparison(cmp) => self.evaluate_comparison(cmp, facts, result, path),
            Condition::Group(group) => self.evaluate_group(group, facts, result, path),
        }
    }

    /// 评估比较节点
    fn evaluate_comparison(
        &self,
        cmp: &Comparison,
        facts: &FactSet,
        result: &mut EvaluationResult,
        path: &str,
    ) -> Result<bool> {
        if !cmp.operator.is_supported() {
            return Err(RuleError::UnsupportedOperator {
                operator: cmp.operator.to_string(),
                path: path.to_string(),
                rule_id: None,
            });
        }

        let fact_value = facts.resolve(&cmp.fact, cmp.path.as_deref());

        let matched = ConditionEvaluator::evaluate(fact_value, &cmp.operator, &cmp.value)?;

        if self.trace_enabled {
            let fact_label = match &cmp.path {
                Some(p) => format!("{}{}", cmp.fact, p.trim_start_matches('$')),
                None => cmp.fact.clone(),
            };
            let outcome = match (fact_value, matched) {
                (None, _) => "FACT_MISSING",
                (Some(_), true) => "MATCHED",
                (Some(_), false) => "NOT_MATCHED",
            };
            result.evaluation_trace.push(format!(
                "{}: {} {} {} => {}",
                path, fact_label, cmp.operator, cmp.value, outcome
            ));
        }

        if matched {
            result
                .matched_conditions
                .push(format!("{}: {} {} {}", path, cmp.fact, cmp.operator, cmp.value));
        }

        Ok(matched)
    }

    /// 评估逻辑组节点（短路求值）
    fn evaluate_group(
        &self,
        group: &LogicalGroup,
        facts: &FactSet,
        result: &mut EvaluationResult,
        path: &str,
    ) -> Result<bool> {
        let combinator = group.combinator();

        if self.trace_enabled {
            result.evaluation_trace.push(format!(
                "{}: 开始评估 {} 组 (共 {} 个子节点)",
                path,
                combinator,
                group.children().len()
            ));
        }

        match group {
            LogicalGroup::All(children) => {
                // all: 遇到 false 立即返回，空组为真
                for (i, child) in children.iter().enumerate() {
                    let child_path = format!("{}.all[{}]", path, i);
                    if !self.evaluate_node(child, facts, result, &child_path)? {
                        self.trace(result, || format!("{}: all 短路 - 子节点 {} 不匹配", path, i));
                        return Ok(false);
                    }
                }

                self.trace(result, || format!("{}: all 组全部匹配", path));
                Ok(true)
            }
            LogicalGroup::Any(children) => {
                // any: 遇到 true 立即返回，空组为假
                for (i, child) in children.iter().enumerate() {
                    let child_path = format!("{}.any[{}]", path, i);
                    if self.evaluate_node(child, facts, result, &child_path)? {
                        self.trace(result, || format!("{}: any 短路 - 子节点 {} 匹配", path, i));
                        return Ok(true);
                    }
                }

                self.trace(result, || format!("{}: any 组无匹配", path));
                Ok(false)
            }
            LogicalGroup::Not(child) => {
                let child_path = format!("{}.not", path);
                let matched = !self.evaluate_node(child, facts, result, &child_path)?;
                self.trace(result, || format!("{}: not 取反 => {}", path, matched));
                Ok(matched)
            }
        }
    }

    fn trace<F>(&self, result: &mut EvaluationResult, line: F)
    where
        F: FnOnce() -> String,
    {
        if self.trace_enabled {
            result.evaluation_trace.push(line());
        }
    }
}

impl Default for RuleExecutor {
    fn default() -> Self {
        Self::new()
    }
}
