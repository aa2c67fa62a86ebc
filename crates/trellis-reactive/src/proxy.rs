#![forbid(unsafe_code)]

//! Derived observables.
//!
//! A [`Proxy`] stands for whichever observable its differentiator picks
//! (for example the `dark` or `light` field of a colour depending on the
//! theme). [`formula`] builds a [`Mutable`] that is recomputed whenever one
//! of its dependencies changes.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use trellis_core::Result;

use crate::closure::Closure;
use crate::dependency::Dependency;
use crate::dependents::{ClosureHandle, Dependents, NodeId};
use crate::mutable::Mutable;
use crate::value::Value;

struct ProxyInner {
    differentiator: Box<dyn Fn() -> Dependency>,
    cached: RefCell<Value>,
    dependents: RefCell<Dependents>,
    /// Closures this proxy attached to its targets.
    links: RefCell<Vec<(Dependency, ClosureHandle)>>,
}

impl Drop for ProxyInner {
    fn drop(&mut self) {
        for (target, handle) in self.links.get_mut().drain(..) {
            target.remove_closure(handle);
        }
    }
}

#[derive(Clone)]
pub struct Proxy {
    inner: Rc<ProxyInner>,
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("cached", &*self.inner.cached.borrow())
            .field("dependents", &self.dependent_count())
            .finish()
    }
}

impl Proxy {
    /// Build a proxy that re-reads `differentiator` whenever any of
    /// `targets` changes, then notifies its own dependents.
    pub fn new(targets: &[Dependency], differentiator: impl Fn() -> Dependency + 'static) -> Self {
        let cached = differentiator().get_value();
        let proxy = Self {
            inner: Rc::new(ProxyInner {
                differentiator: Box::new(differentiator),
                cached: RefCell::new(cached),
                dependents: RefCell::new(Dependents::default()),
                links: RefCell::new(Vec::new()),
            }),
        };
        let mut links = Vec::with_capacity(targets.len());
        for target in targets {
            let weak = Rc::downgrade(&proxy.inner);
            let handle = target.add_closure(Closure::deferred(move || {
                if let Some(inner) = weak.upgrade() {
                    let proxy = Proxy { inner };
                    proxy.refresh();
                    proxy.notify()?;
                }
                Ok(Value::Null)
            }));
            links.push((target.clone(), handle));
        }
        *proxy.inner.links.borrow_mut() = links;
        proxy
    }

    #[must_use]
    pub fn get(&self) -> Value {
        self.inner.cached.borrow().clone()
    }

    /// Write to whichever observable the differentiator currently picks.
    pub fn set(&self, value: Value) -> Result<()> {
        (self.inner.differentiator)().set(value)
    }

    fn refresh(&self) {
        let value = (self.inner.differentiator)().get_value();
        *self.inner.cached.borrow_mut() = value;
    }

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

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// A [`Mutable`] holding `func()`, recomputed whenever a dependency changes.
///
/// The dependencies only hold the result weakly. The recompute hooks are
/// owned by the returned mutable and detach from every dependency once the
/// last handle to it is dropped.
pub fn formula(
    deps: &[Dependency],
    func: impl Fn() -> Result<Value> + 'static,
) -> Result<Mutable> {
    let closure = Closure::new(func)?;
    let mutable = Mutable::new(closure.get());
    for dep in deps {
        let closure = closure.clone();
        let weak = mutable.downgrade();
        let subscription = dep.subscribe(Closure::deferred(move || {
            if let Some(result) = weak.upgrade() {
                closure.update()?;
                result.set(closure.get())?;
            }
            Ok(Value::Null)
        }));
        mutable.hold_upstream(subscription);
    }
    Ok(mutable)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::record::RecordInstance;

    #[test]
    fn formula_recomputes_synchronously() {
        let v = Mutable::new(Value::from(1));
        let src = v.clone();
        let doubled = formula(&[Dependency::from(v.clone())], move || {
            Ok(Value::from(src.get().as_i64().unwrap_or_default() * 2))
        })
        .unwrap();
        assert_eq!(doubled.get(), Value::from(2));
        v.set(Value::from(5)).unwrap();
        assert_eq!(doubled.get(), Value::from(10));
    }

    #[test]
    fn formula_chain_propagates_transitively() {
        let v = Mutable::new(Value::from(1));
        let src = v.clone();
        let plus_one = formula(&[Dependency::from(v.clone())], move || {
            Ok(Value::from(src.get().as_i64().unwrap_or_default() + 1))
        })
        .unwrap();
        let mid = plus_one.clone();
        let times_ten = formula(&[Dependency::from(plus_one.clone())], move || {
            Ok(Value::from(mid.get().as_i64().unwrap_or_default() * 10))
        })
        .unwrap();
        v.set(Value::from(4)).unwrap();
        assert_eq!(times_ten.get(), Value::from(50));
    }

    #[test]
    fn dropped_formulas_leave_no_dependents() {
        let source = Mutable::new(Value::from(1));
        for _ in 0..100 {
            let src = source.clone();
            let derived = formula(&[Dependency::from(source.clone())], move || {
                Ok(Value::from(src.get().as_i64().unwrap_or_default() + 1))
            })
            .unwrap();
            assert_eq!(source.dependent_count(), 1);
            drop(derived);
        }
        source.set(Value::from(2)).unwrap();
        assert_eq!(source.dependent_count(), 0);
    }

    #[test]
    fn unlinking_last_owner_of_formula_detaches_cleanly() {
        let source = Mutable::new(Value::from(1));
        let src = source.clone();
        let derived = formula(&[Dependency::from(source.clone())], move || Ok(src.get()))
            .unwrap();
        source.add_closure(
            Closure::deferred(move || Ok(derived.get())).owned_by(NodeId(7)),
        );
        assert_eq!(source.dependent_count(), 2);
        assert_eq!(source.unlink_node(NodeId(7)), 1);
        assert_eq!(source.dependent_count(), 0);
    }

    #[test]
    fn proxy_follows_differentiator() {
        let dark = Mutable::new(Value::from(false));
        let colors = RecordInstance::new([("light", Value::from("#fff")), ("dark", Value::from("#000"))]);
        let (d, c) = (dark.clone(), colors.clone());
        let proxy = Proxy::new(
            &[Dependency::from(dark.clone()), Dependency::from(colors.clone())],
            move || {
                let field = if d.get().is_truthy() { "dark" } else { "light" };
                Dependency::Value(c.get(field).unwrap_or_default())
            },
        );
        assert_eq!(proxy.get(), Value::from("#fff"));

        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        proxy.add_closure(Closure::deferred(move || {
            h.set(h.get() + 1);
            Ok(Value::Null)
        }));
        dark.set(Value::from(true)).unwrap();
        assert_eq!(proxy.get(), Value::from("#000"));
        assert_eq!(hits.get(), 1);

        proxy.set(Value::from("#111")).unwrap();
        assert_eq!(colors.get("dark").unwrap().get(), Value::from("#111"));
    }

    #[test]
    fn dropping_proxy_unlinks_targets() {
        let target = Mutable::new(Value::from(1));
        let t = target.clone();
        let proxy = Proxy::new(&[Dependency::from(target.clone())], move || {
            Dependency::Value(t.clone())
        });
        assert_eq!(target.dependent_count(), 1);
        drop(proxy);
        assert_eq!(target.dependent_count(), 0);
    }
}
