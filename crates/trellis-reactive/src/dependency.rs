#![forbid(unsafe_code)]

//! The closed set of things a closure can depend on.

use trellis_core::{Error, Result};

use crate::closure::Closure;
use crate::dependents::{ClosureHandle, NodeId};
use crate::list::MutableList;
use crate::mutable::Mutable;
use crate::proxy::Proxy;
use crate::record::RecordInstance;
use crate::value::Value;

/// An observable of any shape.
#[derive(Clone, Debug)]
pub enum Dependency {
    Value(Mutable),
    List(MutableList),
    Record(RecordInstance),
    Proxy(Proxy),
}

impl Dependency {
    /// Use observables as they are and wrap anything else in a new
    /// [`Mutable`].
    #[must_use]
    pub fn wrap(value: Value) -> Self {
        match value {
            Value::Mutable(m) => Self::Value(m),
            Value::List(l) => Self::List(l),
            Value::Record(r) => Self::Record(r),
            other => Self::Value(Mutable::new(other)),
        }
    }

    /// The observable as a [`Value`] handle.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Value(m) => Value::Mutable(m.clone()),
            Self::List(l) => Value::List(l.clone()),
            Self::Record(r) => Value::Record(r.clone()),
            Self::Proxy(p) => p.get(),
        }
    }

    /// The value this observable currently stands for.
    #[must_use]
    pub fn get_value(&self) -> Value {
        match self {
            Self::Value(m) => m.get(),
            Self::List(l) => Value::List(l.clone()),
            Self::Record(r) => Value::Record(r.clone()),
            Self::Proxy(p) => p.get(),
        }
    }

    /// Write through to the observable.
    pub fn set(&self, value: Value) -> Result<()> {
        match self {
            Self::Value(m) => m.set(value),
            Self::List(l) => l.set_all(value),
            Self::Record(r) => r.set_all(&value),
            Self::Proxy(p) => p.set(value),
        }
    }

    pub fn add_closure(&self, closure: Closure) -> ClosureHandle {
        match self {
            Self::Value(m) => m.add_closure(closure),
            Self::List(l) => l.add_closure(closure),
            Self::Record(r) => r.add_closure(closure),
            Self::Proxy(p) => p.add_closure(closure),
        }
    }

    pub fn remove_closure(&self, handle: ClosureHandle) {
        match self {
            Self::Value(m) => m.remove_closure(handle),
            Self::List(l) => l.remove_closure(handle),
            Self::Record(r) => r.remove_closure(handle),
            Self::Proxy(p) => p.remove_closure(handle),
        }
    }

    pub fn unlink_node(&self, node: NodeId) -> usize {
        match self {
            Self::Value(m) => m.unlink_node(node),
            Self::List(l) => l.unlink_node(node),
            Self::Record(r) => r.unlink_node(node),
            Self::Proxy(p) => p.unlink_node(node),
        }
    }

    #[must_use]
    pub fn has_dependents_for(&self, node: NodeId) -> bool {
        match self {
            Self::Value(m) => m.has_dependents_for(node),
            Self::List(l) => l.has_dependents_for(node),
            Self::Record(r) => r.has_dependents_for(node),
            Self::Proxy(p) => p.has_dependents_for(node),
        }
    }

    #[must_use]
    pub fn dependent_count(&self) -> usize {
        match self {
            Self::Value(m) => m.dependent_count(),
            Self::List(l) => l.dependent_count(),
            Self::Record(r) => r.dependent_count(),
            Self::Proxy(p) => p.dependent_count(),
        }
    }

    /// Independent deep copy. A proxy copies the value it currently
    /// stands for into a fresh [`Mutable`].
    #[must_use]
    pub fn get_clone(&self) -> Self {
        match self {
            Self::Value(m) => Self::Value(m.get_clone()),
            Self::List(l) => Self::List(l.get_clone()),
            Self::Record(r) => Self::Record(r.get_clone()),
            Self::Proxy(p) => Self::Value(Mutable::new(p.get().deep_clone())),
        }
    }

    /// Attach `closure` and return a guard that detaches it on drop.
    pub fn subscribe(&self, closure: Closure) -> Subscription {
        let handle = self.add_closure(closure);
        Subscription {
            dependency: self.clone(),
            handle: Some(handle),
        }
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => a.ptr_eq(b),
            (Self::List(a), Self::List(b)) => a.ptr_eq(b),
            (Self::Record(a), Self::Record(b)) => a.ptr_eq(b),
            (Self::Proxy(a), Self::Proxy(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl TryFrom<Value> for Dependency {
    type Error = Error;

    /// Only observable values convert; plain values are a mismatch.
    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Mutable(m) => Ok(Self::Value(m)),
            Value::List(l) => Ok(Self::List(l)),
            Value::Record(r) => Ok(Self::Record(r)),
            other => Err(Error::mismatch("observable", other.type_name())),
        }
    }
}

impl From<Mutable> for Dependency {
    fn from(m: Mutable) -> Self {
        Self::Value(m)
    }
}

impl From<MutableList> for Dependency {
    fn from(l: MutableList) -> Self {
        Self::List(l)
    }
}

impl From<RecordInstance> for Dependency {
    fn from(r: RecordInstance) -> Self {
        Self::Record(r)
    }
}

impl From<Proxy> for Dependency {
    fn from(p: Proxy) -> Self {
        Self::Proxy(p)
    }
}

/// RAII guard for one attached closure. Dropping it (or calling
/// [`cancel`](Self::cancel)) detaches the closure.
#[derive(Debug)]
#[must_use = "dropping a Subscription detaches its closure immediately"]
pub struct Subscription {
    dependency: Dependency,
    handle: Option<ClosureHandle>,
}

impl Subscription {
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.dependency.remove_closure(handle);
        }
    }

    #[must_use]
    pub fn dependency(&self) -> &Dependency {
        &self.dependency
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
