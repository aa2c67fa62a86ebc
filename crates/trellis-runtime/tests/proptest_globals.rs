//! Property-based tests for the global registry.
//!
//! 1. Writing a dotted path and reading it back returns the written value,
//!    and the shared field cell sees the same value.
//! 2. Writes to unregistered paths never fail and never register anything.
//! 3. List operations through the registry agree with a plain `Vec` model.

use proptest::prelude::*;
use serde_json::json;
use trellis_core::Error;
use trellis_reactive::Value;
use trellis_runtime::Globals;

// ── Strategies ────────────────────────────────────────────────────────────

fn field_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("user.name"), Just("user.address.city"), Just("count")]
}

fn registry() -> Globals {
    Globals::from_json(json!({
        "count": 0,
        "user": {"name": "", "address": {"city": ""}},
        "items": [],
    }))
    .unwrap()
}

#[derive(Debug, Clone)]
enum ListOp {
    Append(i64),
    InsertAt(usize, i64),
    DeleteAt(usize),
    Pop,
    Clear,
}

fn list_op_strategy() -> impl Strategy<Value = ListOp> {
    prop_oneof![
        4 => any::<i64>().prop_map(ListOp::Append),
        3 => (0usize..8, any::<i64>()).prop_map(|(i, v)| ListOp::InsertAt(i, v)),
        3 => (0usize..8).prop_map(ListOp::DeleteAt),
        1 => Just(ListOp::Pop),
        1 => Just(ListOp::Clear),
    ]
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Dotted-path round trip
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn dotted_writes_read_back(writes in proptest::collection::vec((field_strategy(), "[a-z]{0,6}"), 1..20)) {
        let globals = registry();
        for (path, text) in &writes {
            let cell = globals.lookup(path).unwrap();
            globals.set_value(path, Value::from(text.as_str())).unwrap();
            prop_assert_eq!(globals.get_value(path), Some(Value::from(text.as_str())));
            prop_assert_eq!(cell.resolve(), Value::from(text.as_str()));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Unknown paths are soft
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn unknown_paths_are_ignored(name in "[a-z]{1,8}", field in "[a-z]{1,8}") {
        prop_assume!(!["count", "user", "items"].contains(&name.as_str()));
        let globals = registry();
        let path = format!("{name}.{field}");
        prop_assert!(globals.set_value(&path, Value::from(1)).is_ok());
        prop_assert!(globals.get_value(&path).is_none());
        prop_assert!(!globals.contains(&name));
        let strict_is_unknown = matches!(globals.lookup(&path), Err(Error::UnknownVariable { .. }));
        prop_assert!(strict_is_unknown);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. List operations
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn list_ops_match_model(ops in proptest::collection::vec(list_op_strategy(), 0..40)) {
        let globals = registry();
        let mut model: Vec<i64> = Vec::new();
        for op in &ops {
            match *op {
                ListOp::Append(v) => {
                    globals.append("items", Value::from(v)).unwrap();
                    model.push(v);
                }
                ListOp::InsertAt(i, v) => {
                    let result = globals.insert_at("items", i, Value::from(v));
                    if i <= model.len() {
                        prop_assert!(result.is_ok());
                        model.insert(i, v);
                    } else {
                        prop_assert!(result.is_err());
                    }
                }
                ListOp::DeleteAt(i) => {
                    let result = globals.delete_at("items", i);
                    if i < model.len() {
                        prop_assert!(result.is_ok());
                        model.remove(i);
                    } else {
                        let out_of_range = matches!(result, Err(Error::IndexOutOfRange { .. }));
                        prop_assert!(out_of_range);
                    }
                }
                ListOp::Pop => {
                    let result = globals.pop("items");
                    prop_assert_eq!(result.is_ok(), model.pop().is_some());
                }
                ListOp::Clear => {
                    globals.clear_all("items").unwrap();
                    model.clear();
                }
            }
            let values: Vec<i64> = globals
                .list("items")
                .unwrap()
                .to_values()
                .iter()
                .filter_map(Value::as_i64)
                .collect();
            prop_assert_eq!(&values, &model);
        }
    }
}
