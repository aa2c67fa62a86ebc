//! Benchmarks for closure propagation and list mutation.
//!
//! Run with: cargo bench -p trellis-reactive --bench propagation_bench

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use trellis_reactive::{Closure, Dependency, Mutable, MutableList, Value, formula};

// =============================================================================
// Fan-out: one write, many dependents
// =============================================================================

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("propagation/fan_out");

    for &width in &[1usize, 16, 256] {
        let source = Mutable::new(Value::from(0));
        for _ in 0..width {
            let s = source.clone();
            source.add_closure(Closure::deferred(move || Ok(s.get())));
        }
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, _| {
            let mut n = 0i64;
            b.iter(|| {
                n += 1;
                source.set(black_box(Value::from(n))).ok();
            })
        });
    }

    group.finish();
}

// =============================================================================
// Depth: a chain of formulas
// =============================================================================

fn bench_formula_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("propagation/chain");

    for &depth in &[1usize, 8, 64] {
        let source = Mutable::new(Value::from(0));
        let mut tail = source.clone();
        let mut keep = Vec::with_capacity(depth);
        for _ in 0..depth {
            let prev = tail.clone();
            let Ok(next) = formula(&[Dependency::from(prev.clone())], move || {
                Ok(Value::from(prev.get().as_i64().unwrap_or_default() + 1))
            }) else {
                continue;
            };
            keep.push(next.clone());
            tail = next;
        }
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            let mut n = 0i64;
            b.iter(|| {
                n += 1;
                source.set(Value::from(n)).ok();
                black_box(tail.get())
            })
        });
        drop(keep);
    }

    group.finish();
}

// =============================================================================
// List insertion with renumbering
// =============================================================================

fn bench_list_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("list/insert_front");

    for &len in &[16usize, 256, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            b.iter_batched(
                || MutableList::new((0..len).map(Value::from)),
                |list| {
                    list.insert_at(0, Value::from(-1)).ok();
                    black_box(list.len())
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fan_out, bench_formula_chain, bench_list_insert);
criterion_main!(benches);
