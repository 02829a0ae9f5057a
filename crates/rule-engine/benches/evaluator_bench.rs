//! 规则评估性能基准测试
//!
//! 覆盖单个操作符、条件树遍历以及整个规则集的 first-match 评估。

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rule_engine::{
    Condition, ConditionEvaluator, FactSet, Operator, RuleDefinition, RuleEngine,
};
use serde_json::json;
use std::hint::black_box;

fn create_facts() -> FactSet {
    FactSet::from_value(json!({
        "facilityId": "F500",
        "type": "cold",
        "capacity": 1800,
        "certifications": ["haccp", "brc", "iso22000"],
        "address": { "country": "NO", "city": "Oslo" }
    }))
    .unwrap()
}

/// 单个操作符基准
fn bench_operators(c: &mut Criterion) {
    let mut group = c.benchmark_group("operators");

    let number = json!(1800);
    let text = json!("cold");
    let list = json!(["haccp", "brc", "iso22000"]);

    group.bench_function("equal", |b| {
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(Some(&text)),
                black_box(&Operator::Equal),
                black_box(&json!("cold")),
            )
        })
    });

    group.bench_function("greater_than", |b| {
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(Some(&number)),
                black_box(&Operator::GreaterThan),
                black_box(&json!(1000)),
            )
        })
    });

    group.bench_function("greater_than_numeric_string", |b| {
        let fact = json!("1800");
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(Some(&fact)),
                black_box(&Operator::GreaterThan),
                black_box(&json!(1000)),
            )
        })
    });

    group.bench_function("contains", |b| {
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(Some(&list)),
                black_box(&Operator::Contains),
                black_box(&json!("iso22000")),
            )
        })
    });

    group.bench_function("missing_fact", |b| {
        b.iter(|| {
            ConditionEvaluator::evaluate(
                black_box(None),
                black_box(&Operator::NotEqual),
                black_box(&json!("cold")),
            )
        })
    });

    group.finish();
}

/// in 操作符随列表长度的扩展性
fn bench_in_operator_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("in_operator_scaling");
    let fact = json!("F-last");

    for size in [10, 100, 1000].iter() {
        let mut items: Vec<String> = (0..*size).map(|i| format!("F-{}", i)).collect();
        items.push("F-last".to_string());
        let expected = json!(items);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                ConditionEvaluator::evaluate(
                    black_box(Some(&fact)),
                    black_box(&Operator::In),
                    black_box(&expected),
                )
            })
        });
    }

    group.finish();
}

/// 嵌套条件树遍历
fn bench_condition_tree(c: &mut Criterion) {
    let facts = create_facts();
    let tree = Condition::all(vec![
        Condition::fact("type", Operator::Equal, "cold"),
        Condition::any(vec![
            Condition::fact("capacity", Operator::LessThan, 500),
            Condition::fact("certifications", Operator::Contains, "brc"),
        ]),
        Condition::not(Condition::fact("facilityId", Operator::In, json!(["F1", "F2"]))),
    ]);

    c.bench_function("condition_tree", |b| {
        b.iter(|| rule_engine::evaluate(black_box(&tree), black_box(&facts)))
    });
}

/// 规则集 first-match 评估随规则数量的扩展性
fn bench_rule_set_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("rule_set_scaling");
    let facts = create_facts();

    for size in [10, 100, 1000].iter() {
        let engine = RuleEngine::new();
        let definitions = (0..*size)
            .map(|i| {
                RuleDefinition::new(
                    Condition::all(vec![Condition::fact(
                        "facilityId",
                        Operator::Equal,
                        format!("F{}", i),
                    )]),
                    format!("M{}", i),
                )
            })
            .collect();
        engine.load_batch(definitions).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| engine.evaluate(black_box(&facts)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_operators,
    bench_in_operator_scaling,
    bench_condition_tree,
    bench_rule_set_scaling,
);

criterion_main!(benches);
