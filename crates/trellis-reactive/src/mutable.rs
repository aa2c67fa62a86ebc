#![forbid(unsafe_code)]

//! Observable value cell.
//!
//! # Invariants
//!
//! 1. `set()` notifies every dependent, in attachment order, even when the
//!    new value equals the old one.
//! 2. When the held value is itself a [`Mutable`], a forwarding closure on
//!    that inner mutable re-notifies this one. The forwarding closure is
//!    removed before any new value is installed.
//! 3. Writing into a cell that holds a list replaces the list's contents in
//!    place, so watchers of that list stay attached.
//! 4. Closures a cell owns on other observables (its nested forwarder and,
//!    for a [`formula`](crate::formula) result, its recompute hooks) are
//!    detached when the last handle to the cell is dropped.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use trellis_core::Result;

use crate::closure::Closure;
use crate::dependency::Subscription;
use crate::dependents::{ClosureHandle, Dependents, NodeId};
use crate::value::Value;

struct MutableInner {
    value: RefCell<Value>,
    dependents: RefCell<Dependents>,
    /// Inner mutable we forward from, and the handle of the forwarding closure.
    nested: RefCell<Option<(Mutable, ClosureHandle)>>,
    /// Hooks on the observables this cell is computed from.
    upstream: RefCell<Vec<Subscription>>,
}

impl Drop for MutableInner {
    fn drop(&mut self) {
        if let Some((inner, handle)) = self.nested.get_mut().take() {
            inner.remove_closure(handle);
        }
    }
}

/// An observable cell.
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use trellis_reactive::{Closure, Mutable, Value};
///
/// let count = Mutable::new(Value::from(1));
/// let seen = Rc::new(Cell::new(0));
/// let (c, s) = (count.clone(), Rc::clone(&seen));
/// count.add_closure(Closure::deferred(move || {
///     s.set(c.get().as_i64().unwrap_or_default());
///     Ok(Value::Null)
/// }));
/// count.set(Value::from(5)).unwrap();
/// assert_eq!(seen.get(), 5);
/// ```
#[derive(Clone)]
pub struct Mutable {
    inner: Rc<MutableInner>,
}

impl fmt::Debug for Mutable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.value.try_borrow() {
            Ok(value) => f
                .debug_struct("Mutable")
                .field("value", &*value)
                .field("dependents", &self.dependent_count())
                .finish(),
            Err(_) => f.write_str("Mutable(<borrowed>)"),
        }
    }
}

impl Default for Mutable {
    fn default() -> Self {
        Self::new(Value::Null)
    }
}

impl Mutable {
    #[must_use]
    pub fn new(value: Value) -> Self {
        let mutable = Self {
            inner: Rc::new(MutableInner {
                value: RefCell::new(value),
                dependents: RefCell::new(Dependents::default()),
                nested: RefCell::new(None),
                upstream: RefCell::new(Vec::new()),
            }),
        };
        mutable.link_nested();
        mutable
    }

    /// Currently held value. Nested observables come back as handles.
    #[must_use]
    pub fn get(&self) -> Value {
        self.inner.value.borrow().clone()
    }

    /// Look up `key` inside the held record, list or mutable.
    ///
    /// Returns `None` when the held value is not a container or has no such
    /// key. List keys are decimal indices.
    #[must_use]
    pub fn get_key(&self, key: &str) -> Option<Value> {
        match self.get() {
            Value::Record(record) => record.get(key).map(Value::Mutable),
            Value::List(list) => {
                let index = key.parse::<usize>().ok()?;
                list.get(index).ok().map(|item| item.item.to_value())
            }
            Value::Mutable(inner) => inner.get_key(key),
            _ => None,
        }
    }

    /// Install `value` and notify every dependent.
    pub fn set(&self, value: Value) -> Result<()> {
        self.set_without_update(value)?;
        self.notify()
    }

    /// Install `value` without notifying this cell's dependents. Callers
    /// that batch several writes follow up with [`notify`](Self::notify).
    ///
    /// A cell holding a list is the exception: the list's contents are
    /// replaced through [`MutableList::set_all`](crate::MutableList::set_all),
    /// which rebuilds its watchers and runs the list's own dependents.
    pub fn set_without_update(&self, value: Value) -> Result<()> {
        self.unlink_nested();
        let current_list = match &*self.inner.value.borrow() {
            Value::List(list) => Some(list.clone()),
            _ => None,
        };
        match current_list {
            Some(list) => {
                let value = match value {
                    Value::Mutable(m) => m.get(),
                    other => other,
                };
                list.set_all(value)?;
            }
            None => *self.inner.value.borrow_mut() = value,
        }
        self.link_nested();
        Ok(())
    }

    /// Run every dependent closure in attachment order.
    pub fn notify(&self) -> Result<()> {
        let closures = self.inner.dependents.borrow().snapshot();
        for closure in closures {
            closure.update()?;
        }
        Ok(())
    }

    pub fn add_closure(&self, closure: Closure) -> ClosureHandle {
        self.inner.dependents.borrow_mut().add(closure)
    }

    pub fn remove_closure(&self, handle: ClosureHandle) {
        let _removed = self.inner.dependents.borrow_mut().remove(handle);
    }

    /// Drop every closure bound to `node`.
    pub fn unlink_node(&self, node: NodeId) -> usize {
        let removed = self.inner.dependents.borrow_mut().unlink_node(node);
        removed.len()
    }

    #[must_use]
    pub fn dependent_count(&self) -> usize {
        self.inner.dependents.borrow().len()
    }

    #[must_use]
    pub fn has_dependents_for(&self, node: NodeId) -> bool {
        self.inner.dependents.borrow().has_node(node)
    }

    /// New independent cell holding a deep copy of the current value.
    #[must_use]
    pub fn get_clone(&self) -> Self {
        Self::new(self.get().deep_clone())
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakMutable {
        WeakMutable {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Keep `subscription` alive for as long as this cell exists.
    pub(crate) fn hold_upstream(&self, subscription: Subscription) {
        self.inner.upstream.borrow_mut().push(subscription);
    }

    fn unlink_nested(&self) {
        let nested = self.inner.nested.borrow_mut().take();
        if let Some((inner, handle)) = nested {
            inner.remove_closure(handle);
        }
    }

    fn link_nested(&self) {
        let Value::Mutable(inner) = self.get() else {
            return;
        };
        if inner.ptr_eq(self) {
            tracing::warn!("mutable cannot hold itself; ignoring nested link");
            return;
        }
        let weak = self.downgrade();
        let forward = Closure::deferred(move || {
            if let Some(outer) = weak.upgrade() {
                outer.notify()?;
            }
            Ok(Value::Null)
        });
        let handle = inner.add_closure(forward);
        *self.inner.nested.borrow_mut() = Some((inner, handle));
    }
}

/// Non-owning [`Mutable`] handle.
#[derive(Clone)]
pub struct WeakMutable {
    inner: Weak<MutableInner>,
}

impl WeakMutable {
    #[must_use]
    pub fn upgrade(&self) -> Option<Mutable> {
        self.inner.upgrade().map(|inner| Mutable { inner })
    }
}

impl fmt::Debug for WeakMutable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakMutable")
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::list::MutableList;

    fn counter(m: &Mutable) -> Rc<Cell<u32>> {
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        m.add_closure(Closure::deferred(move || {
            h.set(h.get() + 1);
            Ok(Value::Null)
        }));
        hits
    }

    // -----------------------------------------------------------------------
    // Notification
    // -----------------------------------------------------------------------

    #[test]
    fn equal_writes_still_notify() {
        let m = Mutable::new(Value::from(1));
        let hits = counter(&m);
        m.set(Value::from(1)).unwrap();
        m.set(Value::from(1)).unwrap();
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn set_without_update_is_silent() {
        let m = Mutable::new(Value::from(1));
        let hits = counter(&m);
        m.set_without_update(Value::from(2)).unwrap();
        assert_eq!(hits.get(), 0);
        assert_eq!(m.get(), Value::from(2));
        m.notify().unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn set_without_update_on_list_cell_runs_list_dependents() {
        let list = MutableList::new([Value::from(1)]);
        let m = Mutable::new(Value::List(list.clone()));
        let cell_hits = counter(&m);
        let list_hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&list_hits);
        list.add_closure(Closure::deferred(move || {
            h.set(h.get() + 1);
            Ok(Value::Null)
        }));
        m.set_without_update(Value::List(MutableList::new([Value::from(2)])))
            .unwrap();
        assert_eq!(cell_hits.get(), 0);
        assert_eq!(list_hits.get(), 1);
    }

    #[test]
    fn closures_run_in_attachment_order() {
        let m = Mutable::new(Value::Null);
        let log = Rc::new(RefCell::new(Vec::new()));
        for i in 0..4 {
            let l = Rc::clone(&log);
            m.add_closure(Closure::deferred(move || {
                l.borrow_mut().push(i);
                Ok(Value::Null)
            }));
        }
        m.set(Value::from(1)).unwrap();
        assert_eq!(*log.borrow(), vec![0, 1, 2, 3]);
    }

    // -----------------------------------------------------------------------
    // Nested mutables
    // -----------------------------------------------------------------------

    #[test]
    fn nested_mutable_forwards_notifications() {
        let inner = Mutable::new(Value::from("a"));
        let outer = Mutable::new(Value::Mutable(inner.clone()));
        let hits = counter(&outer);
        inner.set(Value::from("b")).unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(outer.get().resolve(), Value::from("b"));
    }

    #[test]
    fn replacing_nested_mutable_detaches_old_link() {
        let first = Mutable::new(Value::from(1));
        let second = Mutable::new(Value::from(2));
        let outer = Mutable::new(Value::Mutable(first.clone()));
        assert_eq!(first.dependent_count(), 1);
        outer.set(Value::Mutable(second.clone())).unwrap();
        assert_eq!(first.dependent_count(), 0);
        assert_eq!(second.dependent_count(), 1);

        let hits = counter(&outer);
        first.set(Value::from(10)).unwrap();
        assert_eq!(hits.get(), 0);
        second.set(Value::from(20)).unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn dropping_outer_detaches_nested_forwarder() {
        let inner = Mutable::new(Value::from(1));
        let outer = Mutable::new(Value::Mutable(inner.clone()));
        assert_eq!(inner.dependent_count(), 1);
        drop(outer);
        assert_eq!(inner.dependent_count(), 0);
    }

    #[test]
    fn writing_into_list_cell_keeps_list_identity() {
        let list = MutableList::new([Value::from(1)]);
        let m = Mutable::new(Value::List(list.clone()));
        m.set(Value::List(MutableList::new([Value::from(4), Value::from(5)])))
            .unwrap();
        let Value::List(held) = m.get() else {
            panic!("expected list");
        };
        assert!(held.ptr_eq(&list));
        assert_eq!(list.len(), 2);
    }

    // -----------------------------------------------------------------------
    // Unlinking and cloning
    // -----------------------------------------------------------------------

    #[test]
    fn unlink_node_and_remove_by_handle() {
        let m = Mutable::new(Value::Null);
        m.add_closure(Closure::deferred(|| Ok(Value::Null)).owned_by(NodeId(4)));
        let h = m.add_closure(Closure::deferred(|| Ok(Value::Null)));
        assert!(m.has_dependents_for(NodeId(4)));
        assert_eq!(m.unlink_node(NodeId(4)), 1);
        m.remove_closure(h);
        assert_eq!(m.dependent_count(), 0);
    }

    #[test]
    fn get_clone_does_not_alias() {
        let m = Mutable::new(Value::from_json(serde_json::json!({"x": 1})));
        let copy = m.get_clone();
        copy.get().as_record().unwrap().set("x", Value::from(2)).unwrap();
        assert_eq!(m.get().field("x"), Some(Value::from(1)));
    }

    #[test]
    fn get_key_delegates_to_containers() {
        let m = Mutable::new(Value::from_json(serde_json::json!({"name": "n"})));
        assert_eq!(m.get_key("name").map(|v| v.resolve()), Some(Value::from("n")));
        assert_eq!(m.get_key("missing"), None);
        assert_eq!(Mutable::new(Value::from(1)).get_key("x"), None);
    }
}
