//! Benchmarks for search and factory invocation.
//!
//! Measures:
//! - Cold search: a fresh session resolving a deeply nested goal
//! - Warm lookup: the same goal against a session that already has it
//! - Invocation: building values from a compiled factory

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use horn_resolver::{value, CatalogBuilder, RuleCatalog, Resolver, RuleSet, RuleSpec, TypeTerm, TypeVar};
use std::sync::Arc;

/// `Int`, `Unit` and a generic `Pair<a, b>` that sums its inputs.
fn catalog() -> Arc<RuleCatalog> {
    let a = TypeVar::new("a");
    let b = TypeVar::new("b");
    let rules = RuleSet::new("bench")
        .rule(RuleSpec::new("int", TypeTerm::con("Int"), |_| Ok(value(1u64))))
        .rule(RuleSpec::new("unit", TypeTerm::con("Unit"), |_| Ok(value(0u64))))
        .rule(
            RuleSpec::new(
                "pair",
                TypeTerm::app("Pair", vec![a.term(), b.term()]),
                |inputs| Ok(value(*inputs.get::<u64>(0)? + *inputs.get::<u64>(1)?)),
            )
            .requires(a.term())
            .requires(b.term()),
        );

    Arc::new(CatalogBuilder::new().provider(&rules).build().expect("ok"))
}

/// The nested pair encoding of a record with `fields` fields.
fn record(fields: usize) -> TypeTerm {
    let mut term = TypeTerm::con("Unit");
    for _ in 0..fields {
        term = TypeTerm::app("Pair", vec![TypeTerm::con("Int"), term]);
    }
    term
}

fn bench_cold_search(c: &mut Criterion) {
    let catalog = catalog();
    let mut group = c.benchmark_group("cold_search");

    for fields in [4usize, 16, 64].iter() {
        let goal = record(*fields);
        group.bench_with_input(BenchmarkId::from_parameter(fields), &goal, |b, goal| {
            b.iter(|| {
                let resolver = Resolver::new(catalog.clone());
                black_box(resolver.compile(goal).expect("ok"))
            })
        });
    }

    group.finish();
}

fn bench_warm_lookup(c: &mut Criterion) {
    let resolver = Resolver::new(catalog());
    let goal = record(16);
    resolver.compile(&goal).expect("ok");

    c.bench_function("warm_lookup", |b| {
        b.iter(|| black_box(resolver.compile(&goal).expect("ok")))
    });
}

fn bench_invoke(c: &mut Criterion) {
    let resolver = Resolver::new(catalog());
    let factory = resolver.compile(&record(16)).expect("ok");

    c.bench_function("invoke_16_fields", |b| {
        b.iter(|| black_box(factory.invoke_as::<u64>().expect("ok")))
    });
}

criterion_group!(benches, bench_cold_search, bench_warm_lookup, bench_invoke);
criterion_main!(benches);
