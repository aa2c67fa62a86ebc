#![forbid(unsafe_code)]

//! Reactive state for trellis.
//!
//! - [`Mutable`]: an observable cell holding any [`Value`].
//! - [`MutableList`]: an ordered list of observable items, each paired with
//!   an observable index, kept in sync with its [`ListWatcher`]s.
//! - [`RecordInstance`]: named fields, each a [`Mutable`].
//! - [`Closure`]: a recompute function with a cached result and an optional
//!   binding to a node property.
//! - [`Proxy`] and [`formula`]: derived observables over other observables.
//!
//! # Architecture
//!
//! Everything is single-threaded and synchronous. Handles are `Rc`-backed
//! and cheap to clone; cloning shares state. Every observable keeps its
//! dependent closures in attachment order and can drop all closures bound to
//! a node in one call ([`Dependency::unlink_node`]), or one closure by the
//! [`ClosureHandle`] returned when it was attached.
//!
//! # Invariants
//!
//! 1. `set()` notifies every dependent, in attachment order, before it
//!    returns. Equal writes still notify.
//! 2. After any structural list mutation, `list.get(i)?.index.get()` is `i`
//!    for every item, before watchers or dependents run.
//! 3. Nested closure updates deeper than the propagation limit fail with
//!    [`Error::PropagationDepthExceeded`](trellis_core::Error) instead of
//!    overflowing the stack.

pub mod closure;
pub mod dependency;
pub mod dependents;
pub mod guard;
pub mod list;
pub mod mutable;
pub mod proxy;
pub mod record;
pub mod value;

pub use closure::{BoundTarget, Closure};
pub use dependency::{Dependency, Subscription};
pub use dependents::{ClosureHandle, NodeId};
pub use guard::{DepthGuard, LimitScope, propagation_limit, scoped_limit};
pub use list::{ListItem, ListWatcher, MutableList};
pub use mutable::{Mutable, WeakMutable};
pub use proxy::{Proxy, formula};
pub use record::RecordInstance;
pub use value::Value;
