#![forbid(unsafe_code)]

//! Ordered dependent-closure storage shared by every observable.
//!
//! Closures are keyed by a monotonically increasing sequence number, so
//! iteration order is attachment order and removal by [`ClosureHandle`] is
//! `O(log n)`. A side index maps node ids to the sequence numbers of the
//! closures bound to that node, so unlinking a destroyed node touches only
//! its own closures.
//!
//! Removal hands the closures back to the caller, so they are dropped only
//! after the owning `RefCell` borrow ends. Dropping a closure can drop the
//! last handle to an observable whose teardown detaches from this store.

use std::collections::BTreeMap;

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::closure::Closure;

/// Identity of a builder node, used to unlink its closures on teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable handle to one attached closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClosureHandle(u64);

#[derive(Default)]
pub(crate) struct Dependents {
    next: u64,
    closures: BTreeMap<u64, Closure>,
    by_node: AHashMap<NodeId, SmallVec<[u64; 4]>>,
}

impl Dependents {
    /// Attach `closure`. The node index uses the closure's binding at
    /// attachment time.
    pub(crate) fn add(&mut self, closure: Closure) -> ClosureHandle {
        let seq = self.next;
        self.next += 1;
        if let Some(node) = closure.node() {
            self.by_node.entry(node).or_default().push(seq);
        }
        self.closures.insert(seq, closure);
        ClosureHandle(seq)
    }

    pub(crate) fn remove(&mut self, handle: ClosureHandle) -> Option<Closure> {
        let closure = self.closures.remove(&handle.0)?;
        if let Some(node) = closure.node()
            && let Some(seqs) = self.by_node.get_mut(&node)
        {
            seqs.retain(|s| *s != handle.0);
            if seqs.is_empty() {
                self.by_node.remove(&node);
            }
        }
        Some(closure)
    }

    /// Detach every closure bound to `node` and return them.
    pub(crate) fn unlink_node(&mut self, node: NodeId) -> Vec<Closure> {
        let Some(seqs) = self.by_node.remove(&node) else {
            return Vec::new();
        };
        seqs.iter()
            .filter_map(|seq| self.closures.remove(seq))
            .collect()
    }

    /// Clone out the closures in attachment order so callers can run them
    /// without holding a borrow.
    pub(crate) fn snapshot(&self) -> Vec<Closure> {
        self.closures.values().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.closures.len()
    }

    pub(crate) fn has_node(&self, node: NodeId) -> bool {
        self.by_node.contains_key(&node)
    }
}
