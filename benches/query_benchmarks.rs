use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rolegate::{filter_attributes, AccessControl, Action, ActionKey, Grant, Possession, Query};
use serde_json::{json, Value};
use tokio::runtime::Runtime;

/// Builds a linear inheritance chain role0 -> role1 -> ... of the given
/// depth, with the grant sitting on the deepest role.
fn chained_engine(depth: usize) -> AccessControl {
    let mut ac = AccessControl::new();
    ac.grant(
        format!("role{}", depth),
        Grant::new("document", ActionKey::new(Action::Read, Possession::Any))
            .with_attributes(["*", "!secret"]),
    );
    for level in (0..depth).rev() {
        ac.extend_role(
            &[format!("role{}", level)],
            &[format!("role{}", level + 1)],
            None,
        )
        .unwrap();
    }
    ac
}

fn bench_permission_by_depth(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();

    let mut group = c.benchmark_group("permission_by_inheritance_depth");
    for depth in [0usize, 2, 5, 10] {
        let ac = chained_engine(depth);
        let query = Query::role("role0").resource("document").action(Action::Read);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &query, |b, query| {
            b.iter(|| runtime.block_on(ac.permission(black_box(query))).unwrap());
        });
    }
    group.finish();
}

fn bench_conditional_permission(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let mut ac = AccessControl::new();
    ac.set_grants(json!({
        "analyst": {
            "grants": [
                {
                    "resource": "report",
                    "action": "read:any",
                    "condition": {
                        "AND": [
                            {"EQUALS": {"path": "context.department", "value": "finance"}},
                            {"GREATER_THAN": {"path": "context.level", "value": 3}}
                        ]
                    }
                }
            ]
        }
    }))
    .unwrap();

    let query = Query::role("analyst")
        .resource("report")
        .action(Action::Read)
        .context(json!({"department": "finance", "level": 5}));

    c.bench_function("permission_with_condition", |b| {
        b.iter(|| runtime.block_on(ac.permission(black_box(&query))).unwrap());
    });
}

fn wide_record(fields: usize) -> Value {
    let mut object = serde_json::Map::new();
    for i in 0..fields {
        object.insert(format!("field{}", i), json!({"nested": i, "flag": true}));
    }
    Value::Object(object)
}

fn bench_filter_attributes(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_attributes");

    for fields in [8usize, 64, 256] {
        let record = wide_record(fields);
        let patterns = ["*", "!field0.*", "field0.nested", "!field1"];
        group.bench_with_input(BenchmarkId::from_parameter(fields), &record, |b, record| {
            b.iter(|| filter_attributes(black_box(record), black_box(&patterns)));
        });
    }
    group.finish();
}

fn bench_allowed_accessors(c: &mut Criterion) {
    let ac = chained_engine(5);
    let query = Query::role("role0").resource("document");

    c.bench_function("allowed_attributes", |b| {
        b.iter(|| ac.allowed_attributes(black_box(&query)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_permission_by_depth,
    bench_conditional_permission,
    bench_filter_attributes,
    bench_allowed_accessors
);
criterion_main!(benches);
