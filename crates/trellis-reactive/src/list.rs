#![forbid(unsafe_code)]

//! Observable list.
//!
//! Each entry pairs an observable item with an observable index. Structural
//! mutations renumber the trailing indices first, then tell every watcher
//! exactly which position changed, then notify the list's own dependents.
//!
//! # Invariants
//!
//! 1. After `insert_at`, `delete_at`, `push`, `pop`, `set_all` and
//!    `clear_all`, `items()[i].index.get()` is `i` for every `i`.
//! 2. Watchers hear about a mutation before list dependents do.
//! 3. Watchers that were dropped or whose rendered subtree is no longer
//!    attached are pruned before each structural mutation; detached ones
//!    tear down their nodes first.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use trellis_core::{Error, Result};

use crate::closure::Closure;
use crate::dependency::Dependency;
use crate::dependents::{ClosureHandle, Dependents, NodeId};
use crate::mutable::Mutable;
use crate::value::Value;

/// One list entry.
#[derive(Clone, Debug)]
pub struct ListItem {
    pub item: Dependency,
    /// Always equal to the entry's current position.
    pub index: Mutable,
}

impl ListItem {
    fn new(value: Value, index: usize) -> Self {
        Self {
            item: Dependency::wrap(value),
            index: Mutable::new(Value::from(index)),
        }
    }
}

/// A renderer kept structurally in sync with a list (a for-loop).
pub trait ListWatcher {
    /// False once the watcher's anchor has been removed from the tree.
    fn is_attached(&self) -> bool;
    /// Build the subtree for the item now at `index`.
    fn create_node(&self, index: usize) -> Result<()>;
    /// Tear down the subtree that was at `index`.
    fn delete_node(&self, index: usize) -> Result<()>;
    /// Tear everything down and rebuild from the list's current items.
    fn create_all_nodes(&self) -> Result<()>;
    /// Tear everything down.
    fn delete_all_nodes(&self) -> Result<()>;
}

struct ListInner {
    items: RefCell<Vec<ListItem>>,
    watchers: RefCell<Vec<Weak<dyn ListWatcher>>>,
    dependents: RefCell<Dependents>,
}

/// An observable list.
#[derive(Clone)]
pub struct MutableList {
    inner: Rc<ListInner>,
}

impl fmt::Debug for MutableList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.items.try_borrow() {
            Ok(items) => f
                .debug_struct("MutableList")
                .field("len", &items.len())
                .field("watchers", &self.inner.watchers.borrow().len())
                .finish(),
            Err(_) => f.write_str("MutableList(<borrowed>)"),
        }
    }
}

impl Default for MutableList {
    fn default() -> Self {
        Self::new(std::iter::empty())
    }
}

impl MutableList {
    pub fn new(values: impl IntoIterator<Item = Value>) -> Self {
        let items = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| ListItem::new(v, i))
            .collect();
        Self {
            inner: Rc::new(ListInner {
                items: RefCell::new(items),
                watchers: RefCell::new(Vec::new()),
                dependents: RefCell::new(Dependents::default()),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.items.borrow().is_empty()
    }

    /// Entry at `index`.
    pub fn get(&self, index: usize) -> Result<ListItem> {
        let items = self.inner.items.borrow();
        items.get(index).cloned().ok_or(Error::IndexOutOfRange {
            index,
            len: items.len(),
        })
    }

    /// All entries, in order.
    #[must_use]
    pub fn items(&self) -> Vec<ListItem> {
        self.inner.items.borrow().clone()
    }

    /// Resolved item values, in order.
    #[must_use]
    pub fn to_values(&self) -> Vec<Value> {
        self.items()
            .iter()
            .map(|entry| entry.item.get_value().resolve())
            .collect()
    }

    /// Whether any item's resolved value equals `value`.
    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        let needle = value.resolve();
        self.to_values().iter().any(|v| *v == needle)
    }

    /// New list holding deep copies of every item.
    #[must_use]
    pub fn get_clone(&self) -> Self {
        Self::new(self.items().iter().map(|entry| entry.item.get_clone().to_value()))
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Replace the whole contents.
    ///
    /// A list value contributes its items (each gets a fresh index cell), a
    /// `Null` empties the list and any other value becomes a single item.
    /// Every watcher rebuilds from scratch.
    pub fn set_all(&self, value: Value) -> Result<()> {
        let items: Vec<ListItem> = match value.resolve() {
            Value::Null => Vec::new(),
            Value::List(other) if other.ptr_eq(self) => self.items(),
            Value::List(other) => other
                .items()
                .into_iter()
                .enumerate()
                .map(|(i, entry)| ListItem {
                    item: entry.item,
                    index: Mutable::new(Value::from(i)),
                })
                .collect(),
            _ => vec![ListItem::new(value, 0)],
        };
        tracing::debug!(len = items.len(), "list set_all");
        *self.inner.items.borrow_mut() = items;
        self.delete_empty_watchers()?;
        for watcher in self.live_watchers() {
            watcher.create_all_nodes()?;
        }
        self.notify()
    }

    /// Replace the item at `index`. Writing a value deeply equal to the
    /// current one does nothing.
    pub fn set(&self, index: usize, value: Value) -> Result<()> {
        let entry = self.get(index)?;
        if entry.item.get_value() == value {
            return Ok(());
        }
        entry.item.set(value)?;
        self.notify()
    }

    pub fn insert_at(&self, index: usize, value: Value) -> Result<()> {
        let trailing: Vec<Mutable> = {
            let mut items = self.inner.items.borrow_mut();
            if index > items.len() {
                return Err(Error::IndexOutOfRange {
                    index,
                    len: items.len(),
                });
            }
            items.insert(index, ListItem::new(value, index));
            items[index + 1..].iter().map(|e| e.index.clone()).collect()
        };
        renumber(&trailing, index + 1)?;
        tracing::debug!(index, len = self.len(), "list insert");
        self.delete_empty_watchers()?;
        for watcher in self.live_watchers() {
            watcher.create_node(index)?;
        }
        self.notify()
    }

    pub fn delete_at(&self, index: usize) -> Result<()> {
        let trailing: Vec<Mutable> = {
            let mut items = self.inner.items.borrow_mut();
            if index >= items.len() {
                return Err(Error::IndexOutOfRange {
                    index,
                    len: items.len(),
                });
            }
            items.remove(index);
            items[index..].iter().map(|e| e.index.clone()).collect()
        };
        renumber(&trailing, index)?;
        tracing::debug!(index, len = self.len(), "list delete");
        self.delete_empty_watchers()?;
        for watcher in self.live_watchers() {
            watcher.delete_node(index)?;
        }
        self.notify()
    }

    pub fn push(&self, value: Value) -> Result<()> {
        self.insert_at(self.len(), value)
    }

    /// Remove the last item. Fails on an empty list.
    pub fn pop(&self) -> Result<()> {
        match self.len() {
            0 => Err(Error::IndexOutOfRange { index: 0, len: 0 }),
            len => self.delete_at(len - 1),
        }
    }

    pub fn clear_all(&self) -> Result<()> {
        self.inner.items.borrow_mut().clear();
        tracing::debug!("list clear");
        self.delete_empty_watchers()?;
        for watcher in self.live_watchers() {
            watcher.delete_all_nodes()?;
        }
        self.notify()
    }

    // -----------------------------------------------------------------------
    // Watchers and dependents
    // -----------------------------------------------------------------------

    pub fn add_watcher(&self, watcher: Weak<dyn ListWatcher>) {
        self.inner.watchers.borrow_mut().push(watcher);
    }

    #[must_use]
    pub fn watcher_count(&self) -> usize {
        self.inner.watchers.borrow().len()
    }

    /// Drop watchers that are gone, tearing down the nodes of those that are
    /// still alive but no longer attached to the tree.
    pub fn delete_empty_watchers(&self) -> Result<()> {
        let mut detached = Vec::new();
        self.inner.watchers.borrow_mut().retain(|weak| match weak.upgrade() {
            Some(w) if w.is_attached() => true,
            Some(w) => {
                detached.push(w);
                false
            }
            None => false,
        });
        for watcher in detached {
            watcher.delete_all_nodes()?;
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

    pub fn notify(&self) -> Result<()> {
        let closures = self.inner.dependents.borrow().snapshot();
        for closure in closures {
            closure.update()?;
        }
        Ok(())
    }

    fn live_watchers(&self) -> Vec<Rc<dyn ListWatcher>> {
        self.inner
            .watchers
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }
}

fn renumber(indices: &[Mutable], start: usize) -> Result<()> {
    for (offset, index) in indices.iter().enumerate() {
        index.set(Value::from(start + offset))?;
    }
    Ok(())
}
