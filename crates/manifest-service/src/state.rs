//! 应用状态定义

use rule_engine::RuleEngine;

/// Axum 应用共享状态
///
/// `RuleEngine` 内部以 Arc 共享规则集，克隆开销很小
#[derive(Clone, Default)]
pub struct AppState {
    pub engine: RuleEngine,
}

impl AppState {
    pub fn new(engine: RuleEngine) -> Self {
        Self { engine }
    }
}
