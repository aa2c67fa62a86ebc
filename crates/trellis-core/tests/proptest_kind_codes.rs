//! Property-based tests for the numeric kind codes.
//!
//! 1. Every known property code decodes to the kind whose `code()` it is.
//! 2. Any other i32 is rejected with `UnknownPropertyKind` carrying the code.
//! 3. Element and event codes round-trip through `from_code`, and codes
//!    outside their tables are rejected.

use proptest::prelude::*;
use trellis_core::{ElementKind, Error, EventKind, PropertyKind};

// ── Strategies ────────────────────────────────────────────────────────────

fn known_property() -> impl Strategy<Value = PropertyKind> {
    proptest::sample::select(PropertyKind::ALL.to_vec())
}

fn unknown_property_code() -> impl Strategy<Value = i32> {
    any::<i32>().prop_filter("code is in the table", |code| {
        PropertyKind::ALL.iter().all(|kind| kind.code() != *code)
    })
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Known property codes round-trip
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn property_codes_round_trip(kind in known_property()) {
        let decoded = PropertyKind::try_from(kind.code());
        prop_assert!(matches!(decoded, Ok(k) if k == kind));
    }
}

#[test]
fn every_property_code_round_trips() {
    for kind in PropertyKind::ALL {
        assert_eq!(PropertyKind::try_from(kind.code()).ok(), Some(*kind));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Unknown property codes are rejected
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn unknown_property_codes_fail(code in unknown_property_code()) {
        let rejected = matches!(
            PropertyKind::try_from(code),
            Err(Error::UnknownPropertyKind(c)) if c == code
        );
        prop_assert!(rejected);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Element and event codes
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn element_codes_round_trip(code in 0i32..19, tag in "[a-z]{1,8}-[a-z]{1,8}") {
        let kind = ElementKind::from_code(code, Some(&tag)).unwrap();
        prop_assert_eq!(kind.code(), code);
    }

    #[test]
    fn element_codes_outside_table_fail(code in any::<i32>().prop_filter("in table", |c| !(0..19).contains(c))) {
        let rejected = matches!(ElementKind::from_code(code, None), Err(Error::UnknownElementKind(c)) if c == code);
        prop_assert!(rejected);
    }

    #[test]
    fn event_codes_round_trip(code in 0i32..10, keys in proptest::collection::vec("[a-z]{1,5}", 0..3)) {
        let kind = EventKind::from_code(code, keys).unwrap();
        prop_assert_eq!(kind.code(), code);
    }

    #[test]
    fn event_codes_outside_table_fail(code in any::<i32>().prop_filter("in table", |c| !(0..10).contains(c))) {
        let rejected = matches!(EventKind::from_code(code, Vec::new()), Err(Error::UnknownEventKind(c)) if c == code);
        prop_assert!(rejected);
    }
}
