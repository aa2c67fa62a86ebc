#![forbid(unsafe_code)]

//! Reactive closures: a recompute function, its last result, and an
//! optional binding that pushes the result into a node property.
//!
//! # Invariants
//!
//! 1. [`Closure::update`] always recomputes; there is no skip-if-unchanged.
//! 2. A closure bound to a target that is gone or no longer live does
//!    nothing on update, so a stale closure still reachable from a
//!    notification snapshot cannot touch a destroyed node.
//! 3. Every update runs inside a [`DepthGuard`].
//!
//! # Failure Modes
//!
//! - **Formula error**: the cached value keeps its previous result and the
//!   error is returned to the writer that triggered the update.
//! - **Write-back cycle**: fails with `PropagationDepthExceeded` once the
//!   nesting passes the thread's limit.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use trellis_core::{PropertyKind, Result};

use crate::dependents::NodeId;
use crate::guard::DepthGuard;
use crate::value::Value;

/// Something a closure can push values into: a builder node.
pub trait BoundTarget {
    /// False once the target has been destroyed.
    fn is_live(&self) -> bool;

    /// Apply `value` as `kind` without creating further bindings.
    fn apply_property(&self, kind: PropertyKind, value: &Value, inherited: &Value) -> Result<()>;
}

struct Binding {
    node: NodeId,
    target: Option<Weak<dyn BoundTarget>>,
    property: Option<PropertyKind>,
    inherited: Value,
}

struct ClosureInner {
    formula: Box<dyn Fn() -> Result<Value>>,
    cached: RefCell<Value>,
    binding: RefCell<Option<Binding>>,
}

/// A bound reactive computation.
///
/// Cloning shares the same closure; dependents compare closures by identity.
#[derive(Clone)]
pub struct Closure {
    inner: Rc<ClosureInner>,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let binding = self.inner.binding.borrow();
        f.debug_struct("Closure")
            .field("cached", &*self.inner.cached.borrow())
            .field("node", &binding.as_ref().map(|b| b.node))
            .field("property", &binding.as_ref().and_then(|b| b.property))
            .finish()
    }
}

impl Closure {
    /// Create a closure and run `formula` once to seed the cached value.
    pub fn new(formula: impl Fn() -> Result<Value> + 'static) -> Result<Self> {
        let closure = Self::deferred(formula);
        let value = (closure.inner.formula)()?;
        *closure.inner.cached.borrow_mut() = value;
        Ok(closure)
    }

    /// Create a closure without running it. The cached value starts `Null`.
    pub fn deferred(formula: impl Fn() -> Result<Value> + 'static) -> Self {
        Self {
            inner: Rc::new(ClosureInner {
                formula: Box::new(formula),
                cached: RefCell::new(Value::Null),
                binding: RefCell::new(None),
            }),
        }
    }

    /// Tag the closure with the node that owns it, so unlinking that node
    /// removes it. Nothing is applied on update beyond running the formula.
    #[must_use]
    pub fn owned_by(self, node: NodeId) -> Self {
        *self.inner.binding.borrow_mut() = Some(Binding {
            node,
            target: None,
            property: None,
            inherited: Value::Null,
        });
        self
    }

    /// Like [`owned_by`](Self::owned_by), but updates are skipped once
    /// `target` is no longer live. Used by closures whose formula performs
    /// its own side effect on the node.
    #[must_use]
    pub fn attached_to(self, target: Weak<dyn BoundTarget>, node: NodeId) -> Self {
        *self.inner.binding.borrow_mut() = Some(Binding {
            node,
            target: Some(target),
            property: None,
            inherited: Value::Null,
        });
        self
    }

    /// Bind the closure to `kind` on `target` and apply the cached value once.
    pub fn bind(
        self,
        target: Weak<dyn BoundTarget>,
        node: NodeId,
        kind: PropertyKind,
        inherited: Value,
    ) -> Result<Self> {
        *self.inner.binding.borrow_mut() = Some(Binding {
            node,
            target: Some(target),
            property: Some(kind),
            inherited,
        });
        self.apply()?;
        Ok(self)
    }

    /// Last computed value.
    #[must_use]
    pub fn get(&self) -> Value {
        self.inner.cached.borrow().clone()
    }

    /// Node this closure is bound to, if any.
    #[must_use]
    pub fn node(&self) -> Option<NodeId> {
        self.inner.binding.borrow().as_ref().map(|b| b.node)
    }

    #[must_use]
    pub fn property(&self) -> Option<PropertyKind> {
        self.inner.binding.borrow().as_ref().and_then(|b| b.property)
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Recompute and, if bound to a property, re-apply.
    pub fn update(&self) -> Result<()> {
        if !self.target_live() {
            return Ok(());
        }
        let _depth = DepthGuard::enter()?;
        tracing::trace!(node = ?self.node(), property = ?self.property(), "closure update");
        let value = (self.inner.formula)()?;
        *self.inner.cached.borrow_mut() = value;
        self.apply()
    }

    fn target_live(&self) -> bool {
        match self.inner.binding.borrow().as_ref() {
            Some(Binding {
                target: Some(target),
                ..
            }) => target.upgrade().is_some_and(|t| t.is_live()),
            _ => true,
        }
    }

    fn apply(&self) -> Result<()> {
        let (target, kind, inherited) = {
            let binding = self.inner.binding.borrow();
            let Some(Binding {
                target: Some(target),
                property: Some(kind),
                inherited,
                ..
            }) = binding.as_ref()
            else {
                return Ok(());
            };
            let Some(target) = target.upgrade() else {
                return Ok(());
            };
            (target, *kind, inherited.clone())
        };
        if !target.is_live() {
            return Ok(());
        }
        let value = self.get();
        target.apply_property(kind, &value, &inherited)
    }
}
