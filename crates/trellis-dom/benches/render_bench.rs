//! Benchmarks for server-side rendering and list-driven DOM updates.
//!
//! Run with: cargo bench -p trellis-dom --bench render_bench

use std::hint::black_box;
use std::rc::Rc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use trellis_core::{ElementKind, PropertyKind, RenderConfig, Result};
use trellis_dom::{Node, Parent, PropertyValue, RenderSession, VirtualDocument, ssr};
use trellis_reactive::{ListItem, MutableList, Value};

fn text_item(parent: &Parent, item: &ListItem) -> Result<Node> {
    let node = Node::create(parent, ElementKind::Text)?;
    let value = item.item.clone();
    node.set_property(
        PropertyKind::StringValue,
        PropertyValue::computed(vec![value.clone()], move || Ok(value.get_value())),
        &Value::Null,
    )?;
    node.set_property(PropertyKind::Padding, "4px", &Value::Null)?;
    Ok(node)
}

fn values(n: usize) -> Vec<Value> {
    (0..n).map(|i| Value::from(format!("item {i}"))).collect()
}

// =============================================================================
// SSR: build and serialize a page
// =============================================================================

fn bench_ssr(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/ssr");

    for &rows in &[10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, &rows| {
            b.iter(|| {
                let list = MutableList::new(values(rows));
                let page = ssr(RenderConfig::default(), |root| {
                    let column = root.child(ElementKind::Column)?;
                    column.for_each(&list, text_item)?;
                    Ok(())
                });
                black_box(page.map(|p| p.to_html().len()).unwrap_or_default())
            })
        });
    }

    group.finish();
}

// =============================================================================
// Live: list mutations against a mounted loop
// =============================================================================

fn bench_list_updates(c: &mut Criterion) {
    let mut group = c.benchmark_group("render/list_updates");

    for &rows in &[10usize, 100, 1000] {
        let doc = Rc::new(VirtualDocument::interactive());
        let Ok(session) = RenderSession::new(RenderConfig::default(), doc) else {
            continue;
        };
        let list = MutableList::new(values(rows));
        if session.root().for_each(&list, text_item).is_err() {
            continue;
        }
        group.bench_with_input(BenchmarkId::new("push_pop", rows), &rows, |b, _| {
            b.iter(|| {
                list.push(black_box(Value::from("tail"))).ok();
                list.pop().ok();
            })
        });
        group.bench_with_input(BenchmarkId::new("set_middle", rows), &rows, |b, &rows| {
            let mut n = 0i64;
            b.iter(|| {
                n += 1;
                list.set(rows / 2, Value::from(n)).ok();
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_ssr, bench_list_updates);
criterion_main!(benches);
