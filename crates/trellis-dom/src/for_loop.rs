#![forbid(unsafe_code)]

//! List rendering.
//!
//! A [`ForLoop`] watches a [`MutableList`] and keeps one subtree per item,
//! in list order, after an anchor marker. Inserts and deletes touch exactly
//! one subtree; replacing the whole list rebuilds everything.
//!
//! # Invariants
//!
//! 1. `nodes[i]` was built for the item now at position `i`.
//! 2. The rendered subtrees appear in the document in list order, directly
//!    after the anchor.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use trellis_core::{ElementKind, Error, Result};
use trellis_reactive::{ListItem, ListWatcher, MutableList};

use crate::node::{Block, Node, Parent, WeakNode};
use crate::target::DomId;

type ItemBuilder = Box<dyn Fn(&Parent, &ListItem) -> Result<Node>>;

/// Subtrees rendered for each item of a list.
pub struct ForLoop {
    host: WeakNode,
    anchor: Node,
    list: MutableList,
    builder: ItemBuilder,
    nodes: RefCell<Vec<Node>>,
    torn_down: Cell<bool>,
}

impl fmt::Debug for ForLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForLoop")
            .field("anchor", &self.anchor.dom())
            .field("nodes", &self.nodes.borrow().len())
            .field("torn_down", &self.torn_down.get())
            .finish()
    }
}

impl ForLoop {
    #[must_use]
    pub fn anchor(&self) -> &Node {
        &self.anchor
    }

    /// Rendered item roots, in list order.
    #[must_use]
    pub fn nodes(&self) -> Vec<Node> {
        self.nodes.borrow().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    /// Stop rendering, destroy every item subtree and remove the anchor.
    pub fn destroy(&self) {
        self.teardown(true);
        self.anchor.destroy();
    }

    /// Where the subtree for position `index` starts.
    fn insertion_point(&self, index: usize) -> DomId {
        let nodes = self.nodes.borrow();
        index
            .checked_sub(1)
            .and_then(|prev| nodes.get(prev))
            .and_then(Node::tail)
            .unwrap_or_else(|| self.anchor.dom())
    }
}

impl ListWatcher for ForLoop {
    fn is_attached(&self) -> bool {
        !self.torn_down.get() && !self.anchor.is_destroyed() && self.host.upgrade().is_some()
    }

    fn create_node(&self, index: usize) -> Result<()> {
        let Some(host) = self.host.upgrade() else {
            return Ok(());
        };
        let len = self.nodes.borrow().len();
        if index > len {
            return Err(Error::IndexOutOfRange { index, len });
        }
        let item = self.list.get(index)?;
        let parent = Parent::After {
            host,
            after: self.insertion_point(index),
        };
        let node = (self.builder)(&parent, &item)?;
        self.nodes.borrow_mut().insert(index, node);
        tracing::trace!(anchor = %self.anchor.dom(), index, "loop item created");
        Ok(())
    }

    fn delete_node(&self, index: usize) -> Result<()> {
        let node = {
            let mut nodes = self.nodes.borrow_mut();
            if index >= nodes.len() {
                return Err(Error::IndexOutOfRange {
                    index,
                    len: nodes.len(),
                });
            }
            nodes.remove(index)
        };
        node.destroy();
        tracing::trace!(anchor = %self.anchor.dom(), index, "loop item deleted");
        Ok(())
    }

    fn create_all_nodes(&self) -> Result<()> {
        self.delete_all_nodes()?;
        for index in 0..self.list.len() {
            self.create_node(index)?;
        }
        Ok(())
    }

    fn delete_all_nodes(&self) -> Result<()> {
        let nodes = std::mem::take(&mut *self.nodes.borrow_mut());
        for node in nodes {
            node.destroy();
        }
        Ok(())
    }
}

impl Block for ForLoop {
    fn tail(&self) -> Option<DomId> {
        let last = self.nodes.borrow().iter().rev().find_map(Node::tail);
        last.or_else(|| (!self.anchor.is_destroyed()).then(|| self.anchor.dom()))
    }

    fn teardown(&self, remove_dom: bool) {
        if self.torn_down.replace(true) {
            return;
        }
        let nodes = std::mem::take(&mut *self.nodes.borrow_mut());
        for node in nodes {
            node.destroy_with(remove_dom);
        }
    }
}

impl Node {
    /// Render `builder` once per item of `list` under this node, and keep
    /// the rendered subtrees in step with the list.
    pub fn for_each(
        &self,
        list: &MutableList,
        builder: impl Fn(&Parent, &ListItem) -> Result<Node> + 'static,
    ) -> Result<Rc<ForLoop>> {
        self.ensure_live()?;
        let anchor = self.child(ElementKind::Comment)?;
        let block = Rc::new(ForLoop {
            host: self.downgrade(),
            anchor,
            list: list.clone(),
            builder: Box::new(builder),
            nodes: RefCell::new(Vec::new()),
            torn_down: Cell::new(false),
        });
        for index in 0..list.len() {
            block.create_node(index)?;
        }
        let watcher: Rc<dyn ListWatcher> = block.clone();
        list.add_watcher(Rc::downgrade(&watcher));
        self.push_block(block.clone());
        Ok(block)
    }
}
