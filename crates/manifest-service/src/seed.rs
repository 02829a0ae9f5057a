//! 启动时加载规则文件
//!
//! 规则文件是规则定义的 JSON 数组，格式与 `POST /rules` 请求体相同。
//! 文件只读，运行期的规则变更不会写回。

use std::path::Path;

use anyhow::{Context, Result, bail};
use manifest_shared::observability::metrics;
use rule_engine::{RuleCompiler, RuleDefinition, RuleEngine};
use serde_json::Value;
use tracing::{info, warn};

/// 从规则文件批量加载规则
///
/// 文件不存在时记录警告并返回 0；文件内容不合法时整批拒绝并返回错误。
/// 加载结果计入 `rule_mutations_total{operation="seed"}`，成功后更新 `rules_loaded`。
pub fn load_seed_file(engine: &RuleEngine, path: &Path) -> Result<usize> {
    if !path.exists() {
        warn!(path = %path.display(), "规则文件不存在，以空规则集启动");
        return Ok(0);
    }

    let result = read_seed_file(path).and_then(|definitions| Ok(engine.load_batch(definitions)?));

    match result {
        Ok(ids) => {
            metrics::record_rule_mutation("seed", "success");
            metrics::set_rules_loaded(engine.len());
            info!(path = %path.display(), count = ids.len(), "规则文件加载完成");
            Ok(ids.len())
        }
        Err(e) => {
            metrics::record_rule_mutation("seed", "error");
            Err(e)
        }
    }
}

fn read_seed_file(path: &Path) -> Result<Vec<RuleDefinition>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("读取规则文件失败: {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("规则文件不是合法的 JSON: {}", path.display()))?;

    let Value::Array(items) = value else {
        bail!("规则文件必须是规则定义数组: {}", path.display());
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            RuleCompiler::compile(item).with_context(|| format!("规则文件第 {} 条规则无效", i))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use rule_engine::FactSet;
    use serde_json::json;
    use std::path::PathBuf;

    fn write_seed(content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("manifest-seed-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_seed_file() {
        let path = write_seed(
            &json!([
                {
                    "name": "cold",
                    "conditions": { "any": [ { "fact": "type", "operator": "equal", "value": "cold" } ] },
                    "event": { "type": "manifest", "params": { "manifest": "Cold-Manifest" } }
                },
                {
                    "conditions": { "all": [] },
                    "event": { "params": { "manifest": "Default-Manifest" } }
                }
            ])
            .to_string(),
        );
        let engine = RuleEngine::new();

        let count = load_seed_file(&engine, &path).unwrap();

        assert_eq!(count, 2);
        let outcome = engine.evaluate(&FactSet::default().with("type", "warm")).unwrap();
        assert_eq!(outcome.manifest(), Some(&json!("Default-Manifest")));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_seed_load_updates_metrics() {
        let path = write_seed(
            &json!([
                { "conditions": { "all": [] }, "event": { "params": { "manifest": "A" } } },
                { "conditions": { "any": [] }, "event": { "params": { "manifest": "B" } } }
            ])
            .to_string(),
        );
        let engine = RuleEngine::new();
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        let count = ::metrics::with_local_recorder(&recorder, || load_seed_file(&engine, &path))
            .unwrap();

        assert_eq!(count, 2);
        let rendered = handle.render();
        let gauge = rendered
            .lines()
            .find_map(|l| l.strip_prefix("rules_loaded "))
            .and_then(|v| v.trim().parse::<f64>().ok());
        assert_eq!(gauge, Some(2.0), "{}", rendered);
        assert!(
            rendered
                .lines()
                .any(|l| l.starts_with("rule_mutations_total")
                    && l.contains(r#"operation="seed""#)
                    && l.contains(r#"status="success""#)),
            "{}",
            rendered
        );
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_invalid_seed_file_records_error() {
        let path = write_seed("[ 42 ]");
        let engine = RuleEngine::new();
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        let result = ::metrics::with_local_recorder(&recorder, || load_seed_file(&engine, &path));

        assert!(result.is_err());
        let rendered = handle.render();
        assert!(rendered.contains(r#"status="error""#), "{}", rendered);
        assert!(!rendered.contains("rules_loaded"), "{}", rendered);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_seed_file_is_ignored() {
        let engine = RuleEngine::new();
        let path = std::env::temp_dir().join("manifest-seed-does-not-exist.json");

        assert_eq!(load_seed_file(&engine, &path).unwrap(), 0);
        assert!(engine.is_empty());
    }

    #[test]
    fn test_invalid_seed_file_loads_nothing() {
        let path = write_seed(
            &json!([
                { "conditions": { "all": [] }, "event": { "params": { "manifest": "ok" } } },
                { "conditions": { "all": [ { "fact": "type" } ] }, "event": { "params": { "manifest": "bad" } } }
            ])
            .to_string(),
        );
        let engine = RuleEngine::new();

        let err = load_seed_file(&engine, &path).unwrap_err();

        assert!(format!("{:#}", err).contains("第 1 条"));
        assert!(engine.is_empty());
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_seed_file_must_be_array() {
        let path = write_seed(r#"{ "conditions": { "all": [] } }"#);
        let engine = RuleEngine::new();

        assert!(load_seed_file(&engine, &path).is_err());
        std::fs::remove_file(path).unwrap();
    }
}
