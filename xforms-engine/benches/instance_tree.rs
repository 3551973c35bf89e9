//! Benchmarks for tree construction, repeat edits and reactive recomputation.
//!
//! Run with: cargo bench -p xforms-engine

use std::hint::black_box;
use std::rc::Rc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use xforms_engine::definition::{BindDefinition, BodyElement, ControlText, NodeDefinition, RootDefinition};
use xforms_engine::{initialize_form, FormDefinition, InitializeFormOptions, Root, ValueType};

#[path = "../tests/common/xpath.rs"]
#[allow(dead_code)]
mod xpath;

use xpath::TestEvaluator;

fn input(name: &str) -> NodeDefinition {
    NodeDefinition::leaf(name).with_body(BodyElement::Input(ControlText::default()))
}

/// A household survey with `members` repeat instances.
fn survey(members: usize) -> FormDefinition {
    let member = vec![
        input("name").with_bind(BindDefinition::default().with_required("true()")),
        input("age").with_bind(
            BindDefinition::default()
                .with_type(ValueType::Int)
                .with_constraint(". >= 0"),
        ),
        input("occupation").with_bind(BindDefinition::default().with_relevant("../age >= 16")),
    ];
    FormDefinition::new(
        "Household",
        RootDefinition::new(
            "data",
            vec![
                input("household_id"),
                NodeDefinition::repeat("member", member).with_initial_instances(members),
                NodeDefinition::leaf("member_count")
                    .with_bind(BindDefinition::default().with_calculate("count(/data/member)")),
            ],
        ),
    )
}

fn build(members: usize) -> Root {
    initialize_form(
        survey(members),
        Rc::new(TestEvaluator::new()),
        InitializeFormOptions::default(),
    )
    .expect("form initializes")
}

fn bench_initialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("instance_tree/initialize");

    for members in [1, 10, 100] {
        let definition = Rc::new(survey(members));
        group.bench_with_input(BenchmarkId::from_parameter(members), &definition, |b, definition| {
            b.iter(|| {
                let root = initialize_form(
                    Rc::clone(definition),
                    Rc::new(TestEvaluator::new()),
                    InitializeFormOptions::default(),
                )
                .expect("form initializes");
                black_box(root.instance_xml())
            })
        });
    }

    group.finish();
}

fn bench_repeat_edits(c: &mut Criterion) {
    let mut group = c.benchmark_group("instance_tree/repeat");

    for members in [10, 100] {
        let root = build(members);
        let range = root.find_node("/data/member").expect("range exists");
        group.bench_function(BenchmarkId::new("add_remove_front", members), |b| {
            b.iter(|| {
                range.add_instances(None, 1).expect("add");
                range.remove_instances(0, 1).expect("remove");
                black_box(range.count())
            })
        });
    }

    group.finish();
}

fn bench_value_propagation(c: &mut Criterion) {
    let mut group = c.benchmark_group("instance_tree/set_value");

    for members in [10, 100] {
        let root = build(members);
        let age = root.find_node("/data/member[1]/age").expect("age exists");
        let mut next = 0i64;
        group.bench_function(BenchmarkId::new("age_then_validate", members), |b| {
            b.iter(|| {
                next = (next + 7) % 40;
                age.set_value(next).expect("writable");
                black_box(root.validation_state().violations().len())
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_initialize,
    bench_repeat_edits,
    bench_value_propagation
);
criterion_main!(benches);
