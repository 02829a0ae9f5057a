//! 设施清单规则引擎
//!
//! 根据调用方提供的事实集选出设施清单：
//! - JSON 规则定义（json-rules-engine 格式）解析与校验
//! - all/any/not 条件树的短路求值
//! - 按插入顺序评估，第一条命中规则胜出
//! - 线程安全的规则增删改查

pub mod compiler;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod models;
pub mod operators;

pub use compiler::RuleCompiler;
pub use engine::{RuleEngine, RuleEngineStats};
pub use error::{Result, RuleError};
pub use evaluator::ConditionEvaluator;
pub use executor::RuleExecutor;
pub use models::{
    Comparison, Condition, EvaluationOutcome, EvaluationReport, EvaluationResult, EventParams,
    FactSet, LogicalGroup, Rule, RuleDefinition, RuleEvent, RuleMatch,
};
pub use operators::{Combinator, Operator};

/// 对单个条件树求值
pub fn evaluate(condition: &Condition, facts: &FactSet) -> Result<bool> {
    RuleExecutor::new().evaluate(condition, facts)
}
