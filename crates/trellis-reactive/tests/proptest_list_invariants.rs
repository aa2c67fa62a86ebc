//! Property-based invariant tests for observable lists and propagation.
//!
//! 1. Every entry's index cell equals its position after any sequence of
//!    insert/delete/push/pop.
//! 2. Item order matches a plain `Vec` model driven by the same operations.
//! 3. A dependent of the list runs exactly once per successful mutation.
//! 4. A formula always reflects the latest write to its source.
//! 5. A closure that writes back into its own dependency fails with
//!    `PropagationDepthExceeded` instead of overflowing the stack.

use std::cell::Cell;
use std::rc::Rc;

use proptest::prelude::*;
use trellis_core::Error;
use trellis_reactive::{Closure, Dependency, Mutable, MutableList, Value, formula, scoped_limit};

// ── Strategies ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Insert(usize, i64),
    Delete(usize),
    Push(i64),
    Pop,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..12, any::<i64>()).prop_map(|(i, v)| Op::Insert(i, v)),
        (0usize..12).prop_map(Op::Delete),
        any::<i64>().prop_map(Op::Push),
        Just(Op::Pop),
    ]
}

/// Apply `op` to both the list and the model. Out-of-range ops must fail on
/// the list and leave the model alone.
fn apply(list: &MutableList, model: &mut Vec<i64>, op: &Op) -> bool {
    match *op {
        Op::Insert(i, v) if i <= model.len() => {
            list.insert_at(i, Value::from(v)).unwrap();
            model.insert(i, v);
            true
        }
        Op::Insert(i, v) => {
            assert!(list.insert_at(i, Value::from(v)).is_err());
            false
        }
        Op::Delete(i) if i < model.len() => {
            list.delete_at(i).unwrap();
            model.remove(i);
            true
        }
        Op::Delete(i) => {
            assert!(matches!(list.delete_at(i), Err(Error::IndexOutOfRange { .. })));
            false
        }
        Op::Push(v) => {
            list.push(Value::from(v)).unwrap();
            model.push(v);
            true
        }
        Op::Pop if !model.is_empty() => {
            list.pop().unwrap();
            model.pop();
            true
        }
        Op::Pop => {
            assert!(list.pop().is_err());
            false
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1-3. Index invariant, model agreement, notification count
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn index_cells_track_positions(
        initial in proptest::collection::vec(any::<i64>(), 0..8),
        ops in proptest::collection::vec(op_strategy(), 0..40),
    ) {
        let list = MutableList::new(initial.iter().copied().map(Value::from));
        let mut model = initial.clone();
        let hits = Rc::new(Cell::new(0usize));
        let h = Rc::clone(&hits);
        list.add_closure(Closure::deferred(move || {
            h.set(h.get() + 1);
            Ok(Value::Null)
        }));

        let mut expected_hits = 0;
        for op in &ops {
            if apply(&list, &mut model, op) {
                expected_hits += 1;
            }
            for (i, entry) in list.items().iter().enumerate() {
                prop_assert_eq!(entry.index.get().as_i64(), Some(i as i64));
            }
            let values: Vec<i64> = list.to_values().iter().filter_map(Value::as_i64).collect();
            prop_assert_eq!(&values, &model);
        }
        prop_assert_eq!(hits.get(), expected_hits);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Formula freshness
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn formula_reflects_last_write(writes in proptest::collection::vec(-1000i64..1000, 1..20)) {
        let source = Mutable::new(Value::from(0));
        let src = source.clone();
        let tripled = formula(&[Dependency::from(source.clone())], move || {
            Ok(Value::from(src.get().as_i64().unwrap_or_default() * 3))
        })
        .unwrap();
        for w in &writes {
            source.set(Value::from(*w)).unwrap();
            prop_assert_eq!(tripled.get().as_i64(), Some(w * 3));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Cycle guard
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn write_back_cycle_fails_fast() {
    let _limit = scoped_limit(32);
    let cell = Mutable::new(Value::from(0));
    let c = cell.clone();
    cell.add_closure(Closure::deferred(move || {
        let next = c.get().as_i64().unwrap_or_default() + 1;
        c.set(Value::from(next))?;
        Ok(Value::Null)
    }));
    let err = cell.set(Value::from(1)).unwrap_err();
    assert!(matches!(err, Error::PropagationDepthExceeded { limit: 32 }));
    assert_eq!(trellis_reactive::guard::depth(), 0);
}
