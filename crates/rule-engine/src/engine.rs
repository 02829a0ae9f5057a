//! 规则引擎
//!
//! 按插入顺序保存规则，评估时返回第一条命中规则的清单（first-match-wins）。
//! 规则集由读写锁保护：评估全程持有读锁，更新对进行中的评估原子可见。

use crate::compiler::RuleCompiler;
use crate::error::{Result, RuleError};
use crate::executor::RuleExecutor;
use crate::models::{
    EvaluationOutcome, EvaluationReport, FactSet, Rule, RuleDefinition, RuleMatch,
};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// 规则引擎
///
/// 克隆得到的是同一规则集的句柄。
#[derive(Clone, Default)]
pub struct RuleEngine {
    rules: Arc<RwLock<Vec<Rule>>>,
}

impl RuleEngine {
    /// 创建空的规则引擎
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取当前规则数量
    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    /// 追加规则到评估顺序末尾，返回新生成的规则 ID
    #[instrument(skip(self, definition), fields(rule_name = ?definition.name))]
    pub fn add_rule(&self, definition: RuleDefinition) -> Result<String> {
        RuleCompiler::validate(&definition)?;

        let rule = Rule::new(definition);
        let rule_id = rule.id.clone();
        self.rules.write().push(rule);

        info!(rule_id = %rule_id, "规则已添加");
        Ok(rule_id)
    }

    /// 从 JSON 规则定义追加规则
    pub fn add_rule_json(&self, value: &Value) -> Result<String> {
        let definition = RuleCompiler::compile(value)?;
        self.add_rule(definition)
    }

    /// 原地替换规则的条件和清单，保留 ID 与评估位置
    #[instrument(skip(self, definition))]
    pub fn update_rule(&self, rule_id: &str, definition: RuleDefinition) -> Result<()> {
        RuleCompiler::validate(&definition)?;

        let mut rules = self.rules.write();
        match rules.iter_mut().find(|r| r.id == rule_id) {
            Some(rule) => {
                rule.replace(definition);
                info!("规则已更新: {}", rule_id);
                Ok(())
            }
            None => {
                warn!("更新不存在的规则: {}", rule_id);
                Err(RuleError::RuleNotFound(rule_id.to_string()))
            }
        }
    }

    pub fn update_rule_json(&self, rule_id: &str, value: &Value) -> Result<()> {
        let definition = RuleCompiler::compile(value)?;
        self.update_rule(rule_id, definition)
    }

    /// 删除规则
    #[instrument(skip(self))]
    pub fn delete_rule(&self, rule_id: &str) -> Result<()> {
        let mut rules = self.rules.write();
        match rules.iter().position(|r| r.id == rule_id) {
            Some(index) => {
                rules.remove(index);
                info!("规则已删除: {}", rule_id);
                Ok(())
            }
            None => {
                warn!("删除不存在的规则: {}", rule_id);
                Err(RuleError::RuleNotFound(rule_id.to_string()))
            }
        }
    }

    /// 获取规则
    pub fn get_rule(&self, rule_id: &str) -> Option<Rule> {
        self.rules.read().iter().find(|r| r.id == rule_id).cloned()
    }

    /// 检查规则是否存在
    pub fn contains(&self, rule_id: &str) -> bool {
        self.rules.read().iter().any(|r| r.id == rule_id)
    }

    /// 按评估顺序返回所有规则
    pub fn list_rules(&self) -> Vec<Rule> {
        self.rules.read().clone()
    }

    /// 批量加载规则
    ///
    /// 全部校验通过后才一次性追加，任一规则不合法则整批拒绝。
    #[instrument(skip(self, definitions), fields(count = definitions.len()))]
    pub fn load_batch(&self, definitions: Vec<RuleDefinition>) -> Result<Vec<String>> {
        for (i, definition) in definitions.iter().enumerate() {
            RuleCompiler::validate(definition).map_err(|e| match e {
                RuleError::InvalidRule(msg) => RuleError::InvalidRule(format!("[{}] {}", i, msg)),
                other => other,
            })?;
        }

        let new_rules: Vec<Rule> = definitions.into_iter().map(Rule::new).collect();
        let ids: Vec<String> = new_rules.iter().map(|r| r.id.clone()).collect();
        self.rules.write().extend(new_rules);

        info!("批量加载完成: {} 条规则", ids.len());
        Ok(ids)
    }

    /// 清空所有规则
    #[instrument(skip(self))]
    pub fn clear(&self) {
        let mut rules = self.rules.write();
        let count = rules.len();
        rules.clear();
        info!("已清空 {} 条规则", count);
    }

    /// 评估事实集，返回第一条命中规则的清单
    ///
    /// 未命中是正常结果 `NoMatch`；评估出错时立即中止并返回错误，不会跳到下一条规则。
    pub fn evaluate(&self, facts: &FactSet) -> Result<EvaluationOutcome> {
        self.run(facts, RuleExecutor::new()).map(|report| report.outcome)
    }

    /// 评估并记录每个条件节点的追踪信息
    pub fn evaluate_with_trace(&self, facts: &FactSet) -> Result<EvaluationReport> {
        self.run(facts, RuleExecutor::new().with_trace())
    }

    fn run(&self, facts: &FactSet, executor: RuleExecutor) -> Result<EvaluationReport> {
        let start = Instant::now();
        let mut trace = Vec::new();
        let mut rules_evaluated = 0;

        // 读锁覆盖整个遍历过程
        let rules = self.rules.read();
        let mut outcome = EvaluationOutcome::NoMatch;

        for rule in rules.iter() {
            rules_evaluated += 1;
            let result = executor.execute(rule, facts).inspect_err(|e| {
                warn!(rule_id = %rule.id, error = %e, "规则评估失败");
            })?;

            if executor.trace_enabled() {
                trace.push(format!(
                    "rule {}: {}",
                    rule.id,
                    if result.matched { "MATCHED" } else { "NOT_MATCHED" }
                ));
                trace.extend(result.evaluation_trace);
            }

            if result.matched {
                outcome = EvaluationOutcome::Matched(RuleMatch {
                    rule_id: rule.id.clone(),
                    rule_name: rule.name.clone(),
                    event_type: rule.event.event_type.clone(),
                    manifest: rule.manifest().clone(),
                });
                break;
            }
        }
        drop(rules);

        let evaluation_time_us = start.elapsed().as_micros() as u64;
        match &outcome {
            EvaluationOutcome::Matched(m) => {
                debug!(rule_id = %m.rule_id, rules_evaluated, evaluation_time_us, "规则命中");
            }
            EvaluationOutcome::NoMatch => {
                debug!(rules_evaluated, evaluation_time_us, "无规则命中");
            }
        }

        Ok(EvaluationReport {
            outcome,
            rules_evaluated,
            evaluation_trace: trace,
            evaluation_time_us,
        })
    }

    /// 获取规则统计信息
    pub fn stats(&self) -> RuleEngineStats {
        let rules = self.rules.read();
        let rules_count = rules.len();

        let mut distinct = BTreeSet::new();
        let mut total_facts = 0;
        for rule in rules.iter() {
            let facts = RuleCompiler::extract_facts(&rule.conditions);
            total_facts += facts.len();
            distinct.extend(facts);
        }

        RuleEngineStats {
            rules_count,
            total_facts,
            distinct_facts: distinct.into_iter().collect(),
            avg_facts_per_rule: if rules_count > 0 {
                total_facts as f64 / rules_count as f64
            } else {
                0.0
            },
        }
    }
}

/// 规则引擎统计信息
#[derive(Debug, Clone, serde::Serialize)]
pub struct RuleEngineStats {
    /// 规则总数
    pub rules_count: usize,
    /// 每条规则引用的事实数之和
    pub total_facts: usize,
    /// 所有规则引用的事实名称（去重）
    pub distinct_facts: Vec<String>,
    /// 平均每条规则引用的事实数
    pub avg_facts_per_rule: f64,
}
