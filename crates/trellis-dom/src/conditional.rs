#![forbid(unsafe_code)]

//! Conditional mount.
//!
//! A [`Conditional`] keeps a marker in the tree and rebuilds the subtree
//! after it whenever a dependency changes: the old subtree is destroyed and,
//! if the condition holds, a fresh one is built. Nothing is diffed.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use trellis_core::{ElementKind, Result};
use trellis_reactive::{Closure, Dependency, Subscription, Value};

use crate::node::{Block, Node, Parent, WeakNode};
use crate::target::DomId;

type Condition = Box<dyn Fn() -> Result<bool>>;
type Builder = Box<dyn Fn(&Parent) -> Result<Node>>;

/// A subtree mounted while a condition holds.
pub struct Conditional {
    this: Weak<Conditional>,
    host: WeakNode,
    marker: Node,
    condition: Condition,
    builder: Builder,
    mounted: RefCell<Option<Node>>,
    deps: Vec<Dependency>,
    subscriptions: RefCell<Vec<Subscription>>,
    torn_down: Cell<bool>,
}

impl fmt::Debug for Conditional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conditional")
            .field("marker", &self.marker.dom())
            .field("mounted", &self.mounted.borrow().as_ref().map(Node::dom))
            .field("torn_down", &self.torn_down.get())
            .finish()
    }
}

impl Conditional {
    /// The marker the subtree is mounted after.
    #[must_use]
    pub fn marker(&self) -> &Node {
        &self.marker
    }

    /// The currently mounted subtree, if the condition held last time.
    #[must_use]
    pub fn mounted(&self) -> Option<Node> {
        self.mounted.borrow().clone()
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted.borrow().is_some()
    }

    /// Re-evaluate the condition and rebuild.
    pub fn refresh(&self) -> Result<()> {
        if self.torn_down.get() {
            return Ok(());
        }
        let Some(host) = self.host.upgrade() else {
            return Ok(());
        };
        let show = (self.condition)()?;
        let previous = self.mounted.borrow_mut().take();
        if let Some(previous) = previous {
            previous.destroy();
        }
        if show {
            let parent = Parent::After {
                host,
                after: self.marker.dom(),
            };
            let node = (self.builder)(&parent)?;
            *self.mounted.borrow_mut() = Some(node);
        }
        tracing::trace!(marker = %self.marker.dom(), show, "conditional refreshed");
        Ok(())
    }

    /// Stop listening, destroy the subtree and remove the marker.
    pub fn destroy(&self) {
        self.teardown(true);
        self.marker.destroy();
    }
}

impl Block for Conditional {
    fn tail(&self) -> Option<DomId> {
        self.mounted
            .borrow()
            .as_ref()
            .and_then(Node::tail)
            .or_else(|| (!self.marker.is_destroyed()).then(|| self.marker.dom()))
    }

    fn teardown(&self, remove_dom: bool) {
        if self.torn_down.replace(true) {
            return;
        }
        self.subscriptions.borrow_mut().clear();
        for dep in &self.deps {
            dep.unlink_node(self.marker.id());
        }
        let mounted = self.mounted.borrow_mut().take();
        if let Some(node) = mounted {
            node.destroy_with(remove_dom);
        }
    }
}

impl Node {
    /// Mount `builder`'s subtree after a marker under this node while
    /// `condition` holds, re-evaluating whenever any of `deps` changes.
    pub fn conditional(
        &self,
        deps: Vec<Dependency>,
        condition: impl Fn() -> Result<bool> + 'static,
        builder: impl Fn(&Parent) -> Result<Node> + 'static,
    ) -> Result<Rc<Conditional>> {
        self.ensure_live()?;
        let marker = self.child(ElementKind::Comment)?;
        let block = Rc::new_cyclic(|this| Conditional {
            this: this.clone(),
            host: self.downgrade(),
            marker,
            condition: Box::new(condition),
            builder: Box::new(builder),
            mounted: RefCell::new(None),
            deps,
            subscriptions: RefCell::new(Vec::new()),
            torn_down: Cell::new(false),
        });

        let weak = block.this.clone();
        let closure = Closure::new(move || {
            if let Some(block) = weak.upgrade() {
                block.refresh()?;
            }
            Ok(Value::Null)
        })?
        .owned_by(block.marker.id());
        let subscriptions = block
            .deps
            .iter()
            .map(|d| d.subscribe(closure.clone()))
            .collect();
        *block.subscriptions.borrow_mut() = subscriptions;
        self.push_block(block.clone());
        Ok(block)
    }
}
