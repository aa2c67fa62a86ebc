#![forbid(unsafe_code)]

//! The node builder.
//!
//! A [`Node`] wraps one element (or marker) in the session's target and
//! remembers everything it must undo on [`Node::destroy`]: child builders,
//! conditional and list blocks mounted under it, and every observable it
//! subscribed to.
//!
//! # Lifecycle
//!
//! `Created → Live → Destroyed`. Property writes that arrive through a
//! reactive binding after destruction are ignored; direct builder calls on a
//! destroyed node return [`Error::NodeDestroyed`]. `destroy()` is
//! idempotent.
//!
//! # Markers
//!
//! `Comment` and `Wrapper` kinds render as a marker. Children of a marker are
//! inserted as siblings after it, each after the previous child's last
//! rendered node, so a wrapper expands in place into several siblings.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use trellis_core::{ElementKind, Error, EventKind, PropertyKind, Result};
use trellis_reactive::{
    BoundTarget, Closure, Dependency, Mutable, MutableList, NodeId, RecordInstance, Subscription,
    Value,
};

use crate::dispatch;
use crate::session::RenderSession;
use crate::style;
use crate::target::{DomId, Listener, RenderTarget};

/// Formula of a computed property.
pub type Formula = Rc<dyn Fn() -> Result<Value>>;

/// A value for [`Node::set_property`].
#[derive(Clone)]
pub enum PropertyValue {
    /// Applied once.
    Static(Value),
    /// Re-applied whenever the observable is written.
    Observable(Mutable),
    List(MutableList),
    Record(RecordInstance),
    /// Recomputed from `formula` whenever any of `deps` changes.
    Computed { deps: Vec<Dependency>, formula: Formula },
}

impl PropertyValue {
    pub fn computed(deps: Vec<Dependency>, formula: impl Fn() -> Result<Value> + 'static) -> Self {
        Self::Computed {
            deps,
            formula: Rc::new(formula),
        }
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(v) => f.debug_tuple("Static").field(v).finish(),
            Self::Observable(m) => f.debug_tuple("Observable").field(m).finish(),
            Self::List(l) => f.debug_tuple("List").field(l).finish(),
            Self::Record(r) => f.debug_tuple("Record").field(r).finish(),
            Self::Computed { deps, .. } => f
                .debug_struct("Computed")
                .field("deps", &deps.len())
                .finish_non_exhaustive(),
        }
    }
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Mutable(m) => Self::Observable(m),
            Value::List(l) => Self::List(l),
            Value::Record(r) => Self::Record(r),
            other => Self::Static(other),
        }
    }
}

impl From<Mutable> for PropertyValue {
    fn from(m: Mutable) -> Self {
        Self::Observable(m)
    }
}

impl From<MutableList> for PropertyValue {
    fn from(l: MutableList) -> Self {
        Self::List(l)
    }
}

impl From<RecordInstance> for PropertyValue {
    fn from(r: RecordInstance) -> Self {
        Self::Record(r)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::Static(Value::from(s))
    }
}

/// A child builder passed through the `Children` property as
/// [`Value::Opaque`].
pub struct Component {
    build: Box<dyn Fn(&Parent, &Value) -> Result<Node>>,
}

impl Component {
    pub fn new(build: impl Fn(&Parent, &Value) -> Result<Node> + 'static) -> Self {
        Self {
            build: Box::new(build),
        }
    }

    /// Wrap as a property value.
    pub fn into_value(self) -> Value {
        Value::opaque(self)
    }

    pub fn build(&self, parent: &Parent, inherited: &Value) -> Result<Node> {
        (self.build)(parent, inherited)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Component")
    }
}

/// Where a new node goes.
#[derive(Clone, Debug)]
pub enum Parent {
    /// Under `host`, after its existing children. The host owns the node.
    Node(Node),
    /// Directly after `after`, a rendered node of `host`. The caller owns
    /// the node.
    After { host: Node, after: DomId },
}

impl Parent {
    #[must_use]
    pub fn host(&self) -> &Node {
        match self {
            Self::Node(host) | Self::After { host, .. } => host,
        }
    }
}

impl From<&Node> for Parent {
    fn from(node: &Node) -> Self {
        Self::Node(node.clone())
    }
}

impl From<Node> for Parent {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

/// A structural block mounted under a node: a conditional or a list.
pub trait Block {
    /// Last rendered node of the block, if it rendered anything.
    fn tail(&self) -> Option<DomId>;
    /// Destroy everything the block mounted and stop listening.
    fn teardown(&self, remove_dom: bool);
}

#[derive(Clone)]
enum Entry {
    Child(Node),
    Block(Rc<dyn Block>),
}

impl Entry {
    fn tail(&self) -> Option<DomId> {
        match self {
            Self::Child(node) => node.tail(),
            Self::Block(block) => block.tail(),
        }
    }
}

/// Which subscriptions a property write replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Slot {
    /// The closure that re-applies a reactive property value.
    Binding(PropertyKind),
    /// Closures over the fields of a composite value (colours, shadows,
    /// theme-dependent sources).
    Composite(PropertyKind),
}

#[derive(Debug, Default)]
pub(crate) struct Extra {
    /// Classes written by the `Classes` property.
    pub classes: Vec<String>,
    pub code_theme: Option<String>,
    pub code_language: Option<String>,
}

pub(crate) struct NodeInner {
    this: Weak<NodeInner>,
    id: NodeId,
    kind: ElementKind,
    session: Rc<RenderSession>,
    dom: Cell<DomId>,
    /// Anchor wrapped around a linked image in a live page.
    outer: Cell<Option<DomId>>,
    entries: RefCell<Vec<Entry>>,
    property_children: RefCell<Vec<Node>>,
    dependencies: RefCell<Vec<Dependency>>,
    slots: RefCell<AHashMap<Slot, Vec<Subscription>>>,
    raw_inner: RefCell<Value>,
    extra: RefCell<Extra>,
    has_click: Cell<bool>,
    destroyed: Cell<bool>,
    is_root: bool,
}

impl BoundTarget for NodeInner {
    fn is_live(&self) -> bool {
        !self.destroyed.get()
    }

    fn apply_property(&self, kind: PropertyKind, value: &Value, inherited: &Value) -> Result<()> {
        match self.this.upgrade() {
            Some(inner) => dispatch::apply(&Node { inner }, kind, value, inherited),
            None => Ok(()),
        }
    }
}

/// A builder node. Cloning shares the node.
#[derive(Clone)]
pub struct Node {
    pub(crate) inner: Rc<NodeInner>,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("dom", &self.inner.dom.get())
            .field("destroyed", &self.inner.destroyed.get())
            .finish()
    }
}

/// Weak handle that only upgrades while the node is live.
#[derive(Clone)]
pub struct WeakNode(Weak<NodeInner>);

impl WeakNode {
    #[must_use]
    pub fn upgrade(&self) -> Option<Node> {
        self.0
            .upgrade()
            .filter(|inner| !inner.destroyed.get())
            .map(|inner| Node { inner })
    }
}

impl Node {
    fn new(session: Rc<RenderSession>, kind: ElementKind, dom: DomId, is_root: bool) -> Self {
        let id = session.next_node_id();
        let inner = Rc::new_cyclic(|this| NodeInner {
            this: this.clone(),
            id,
            kind,
            session,
            dom: Cell::new(dom),
            outer: Cell::new(None),
            entries: RefCell::new(Vec::new()),
            property_children: RefCell::new(Vec::new()),
            dependencies: RefCell::new(Vec::new()),
            slots: RefCell::new(AHashMap::new()),
            raw_inner: RefCell::new(Value::Null),
            extra: RefCell::new(Extra::default()),
            has_click: Cell::new(false),
            destroyed: Cell::new(false),
            is_root,
        });
        Self { inner }
    }

    pub(crate) fn root(session: Rc<RenderSession>) -> Self {
        let body = session.target().body();
        Self::new(session, ElementKind::ContainerElement, body, true)
    }

    /// Create a node of `kind` at `parent`.
    pub fn create(parent: &Parent, kind: ElementKind) -> Result<Node> {
        let host = parent.host();
        host.ensure_live()?;
        let session = Rc::clone(&host.inner.session);
        let target = Rc::clone(session.target());
        let dom = match kind.tag_name() {
            Some(tag) => target.create_element(tag),
            None => target.create_marker(),
        };
        for class in kind.default_classes() {
            target.add_class(dom, class);
        }
        for (name, value) in kind.default_attributes() {
            target.set_attribute(dom, name, *value);
        }
        match parent {
            Parent::Node(host) if host.is_marker() => match host.tail() {
                Some(tail) => target.insert_after(tail, dom),
                None => tracing::warn!(host = host.id().0, "marker host has no position"),
            },
            Parent::Node(host) => target.append_child(host.dom(), dom),
            Parent::After { after, .. } => target.insert_after(*after, dom),
        }

        let node = Node::new(session, kind, dom, false);
        if let Parent::Node(host) = parent {
            host.inner
                .entries
                .borrow_mut()
                .push(Entry::Child(node.clone()));
        }
        if node.inner.kind == ElementKind::Code {
            Node::create(&Parent::from(&node), ElementKind::CodeChild)?;
        }
        tracing::trace!(node = node.id().0, kind = ?node.kind(), %dom, "node created");
        Ok(node)
    }

    /// Create a node of `kind` under `self`.
    pub fn child(&self, kind: ElementKind) -> Result<Node> {
        Node::create(&Parent::from(self), kind)
    }

    // -- accessors ------------------------------------------------------------

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    #[must_use]
    pub fn kind(&self) -> &ElementKind {
        &self.inner.kind
    }

    #[must_use]
    pub fn session(&self) -> &Rc<RenderSession> {
        &self.inner.session
    }

    #[must_use]
    pub fn target(&self) -> &Rc<dyn RenderTarget> {
        self.inner.session.target()
    }

    /// The node's own element or marker.
    #[must_use]
    pub fn dom(&self) -> DomId {
        self.inner.dom.get()
    }

    /// The outermost rendered node: the anchor around a linked image, or
    /// the node itself.
    #[must_use]
    pub fn outer_dom(&self) -> DomId {
        self.inner.outer.get().unwrap_or_else(|| self.dom())
    }

    pub(crate) fn set_dom(&self, dom: DomId) {
        self.inner.dom.set(dom);
    }

    pub(crate) fn set_outer(&self, outer: DomId) {
        self.inner.outer.set(Some(outer));
    }

    #[must_use]
    pub fn is_marker(&self) -> bool {
        self.inner.kind.is_marker()
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakNode {
        WeakNode(Rc::downgrade(&self.inner))
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Child builders created under this node, in creation order.
    #[must_use]
    pub fn children(&self) -> Vec<Node> {
        self.inner
            .entries
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Entry::Child(n) => Some(n.clone()),
                Entry::Block(_) => None,
            })
            .collect()
    }

    /// Serialized markup of this node.
    #[must_use]
    pub fn to_html(&self) -> String {
        self.target().outer_html(self.outer_dom())
    }

    pub(crate) fn raw_inner(&self) -> Value {
        self.inner.raw_inner.borrow().clone()
    }

    pub(crate) fn set_raw_inner(&self, value: Value) {
        *self.inner.raw_inner.borrow_mut() = value;
    }

    pub(crate) fn extra(&self) -> std::cell::RefMut<'_, Extra> {
        self.inner.extra.borrow_mut()
    }

    /// The generated `code` child of a `Code` node.
    pub(crate) fn code_child(&self) -> Option<Node> {
        self.children()
            .into_iter()
            .find(|c| c.kind() == &ElementKind::CodeChild)
    }

    pub(crate) fn ensure_live(&self) -> Result<()> {
        if self.is_destroyed() {
            return Err(Error::NodeDestroyed);
        }
        Ok(())
    }

    pub(crate) fn bound_target(&self) -> Weak<dyn BoundTarget> {
        let weak: Weak<dyn BoundTarget> = Rc::downgrade(&self.inner) as Weak<dyn BoundTarget>;
        weak
    }

    /// Last rendered node of this node's subtree, in document order.
    pub(crate) fn tail(&self) -> Option<DomId> {
        if self.is_destroyed() {
            return None;
        }
        if !self.is_marker() {
            return Some(self.outer_dom());
        }
        let entries = self.inner.entries.borrow().clone();
        entries
            .iter()
            .rev()
            .find_map(Entry::tail)
            .or(Some(self.dom()))
    }

    pub(crate) fn push_block(&self, block: Rc<dyn Block>) {
        self.inner.entries.borrow_mut().push(Entry::Block(block));
    }

    // -- subscriptions ---------------------------------------------------------

    /// Replace the subscriptions held in `slot` and remember `deps` for
    /// teardown.
    pub(crate) fn replace_slot(&self, slot: Slot, subscriptions: Vec<Subscription>, deps: Vec<Dependency>) {
        let previous = self.inner.slots.borrow_mut().insert(slot, subscriptions);
        drop(previous);
        self.remember(deps);
    }

    pub(crate) fn clear_slot(&self, slot: Slot) {
        let previous = self.inner.slots.borrow_mut().remove(&slot);
        drop(previous);
    }

    fn remember(&self, deps: Vec<Dependency>) {
        let mut known = self.inner.dependencies.borrow_mut();
        for dep in deps {
            if !known.iter().any(|k| k.ptr_eq(&dep)) {
                known.push(dep);
            }
        }
    }

    /// Whether `dep` still holds a closure belonging to this node.
    #[must_use]
    pub fn is_subscribed_to(&self, dep: &Dependency) -> bool {
        dep.has_dependents_for(self.id())
    }

    // -- properties --------------------------------------------------------------

    /// Set a property from a static value, an observable or a computed
    /// descriptor. Reactive values keep the property in sync until the node
    /// is destroyed or the property is set again.
    pub fn set_property(
        &self,
        kind: PropertyKind,
        value: impl Into<PropertyValue>,
        inherited: &Value,
    ) -> Result<()> {
        self.ensure_live()?;
        self.clear_slot(Slot::Binding(kind));
        match value.into() {
            PropertyValue::Static(value) => dispatch::apply(self, kind, &value, inherited),
            PropertyValue::Observable(m) => {
                let source = m.clone();
                self.bind(kind, vec![Dependency::from(m)], inherited, move || Ok(source.get()))
            }
            PropertyValue::List(l) => {
                let source = l.clone();
                self.bind(kind, vec![Dependency::from(l)], inherited, move || {
                    Ok(Value::List(source.clone()))
                })
            }
            PropertyValue::Record(r) => {
                let source = r.clone();
                self.bind(kind, vec![Dependency::from(r)], inherited, move || {
                    Ok(Value::Record(source.clone()))
                })
            }
            PropertyValue::Computed { deps, formula } => {
                self.bind(kind, deps, inherited, move || formula())
            }
        }
    }

    /// Apply `value` once, without any binding.
    pub fn set_static_property(&self, kind: PropertyKind, value: &Value, inherited: &Value) -> Result<()> {
        self.ensure_live()?;
        dispatch::apply(self, kind, value, inherited)
    }

    /// [`set_property`](Self::set_property) by numeric code. Unknown codes
    /// fail with [`Error::UnknownPropertyKind`].
    pub fn set_property_code(&self, code: i32, value: impl Into<PropertyValue>, inherited: &Value) -> Result<()> {
        let kind = PropertyKind::try_from(code)?;
        self.set_property(kind, value, inherited)
    }

    fn bind(
        &self,
        kind: PropertyKind,
        deps: Vec<Dependency>,
        inherited: &Value,
        formula: impl Fn() -> Result<Value> + 'static,
    ) -> Result<()> {
        let closure = Closure::new(formula)?.bind(self.bound_target(), self.id(), kind, inherited.clone())?;
        let subscriptions = deps.iter().map(|d| d.subscribe(closure.clone())).collect();
        tracing::trace!(node = self.id().0, ?kind, deps = deps.len(), "property bound");
        self.replace_slot(Slot::Binding(kind), subscriptions, deps);
        Ok(())
    }

    /// Set a raw attribute. `None` writes a bare attribute.
    pub fn set_attribute(&self, name: &str, value: Option<&str>) -> Result<()> {
        self.ensure_live()?;
        self.target().set_attribute(self.dom(), name, value);
        Ok(())
    }

    /// Build `components` under this node, replacing children built by a
    /// previous `Children` write.
    pub(crate) fn mount_components(&self, components: &[Value], inherited: &Value) -> Result<()> {
        let previous = std::mem::take(&mut *self.inner.property_children.borrow_mut());
        for child in &previous {
            child.destroy();
        }
        self.inner.entries.borrow_mut().retain(|e| match e {
            Entry::Child(n) => !previous.iter().any(|p| p.ptr_eq(n)),
            Entry::Block(_) => true,
        });

        let parent = Parent::from(self);
        let mut built = Vec::with_capacity(components.len());
        for value in components {
            if value.is_null() {
                continue;
            }
            let component = value
                .downcast::<Component>()
                .ok_or_else(|| Error::mismatch("component", value.type_name()))?;
            built.push(component.build(&parent, inherited)?);
        }
        *self.inner.property_children.borrow_mut() = built;
        Ok(())
    }

    // -- events ------------------------------------------------------------------

    /// Attach `handler` to `event`. Click handlers on one node all run, in
    /// registration order; the first one also sets `cursor: pointer`.
    pub fn add_event_handler(&self, event: EventKind, handler: Listener) -> Result<()> {
        self.ensure_live()?;
        tracing::trace!(node = self.id().0, ?event, "event handler added");
        match event {
            EventKind::ClickOutside | EventKind::GlobalKey(_) | EventKind::GlobalKeySeq(_) => {
                self.session().register_global(self.downgrade(), event, handler);
                return Ok(());
            }
            EventKind::Click if !self.inner.has_click.replace(true) => {
                style::attach_css(self, "cursor", Some("pointer".into()), false);
            }
            _ => {}
        }
        let weak = self.downgrade();
        let listener: Listener = Rc::new(move || match weak.upgrade() {
            Some(_) => handler(),
            None => Ok(()),
        });
        self.target().add_listener(self.dom(), &event, listener);
        Ok(())
    }

    // -- teardown ----------------------------------------------------------------

    /// Destroy the node and everything under it: unsubscribe from every
    /// observable and remove the rendered nodes.
    pub fn destroy(&self) {
        self.destroy_with(true);
    }

    pub(crate) fn destroy_with(&self, remove_dom: bool) {
        let inner = &self.inner;
        if inner.destroyed.replace(true) {
            return;
        }
        // Children of an element leave the page with it; children of a
        // marker are siblings and must be removed one by one.
        let cascade = remove_dom && (self.is_marker() || inner.is_root);
        let entries = std::mem::take(&mut *inner.entries.borrow_mut());
        for entry in entries {
            match entry {
                Entry::Child(child) => child.destroy_with(cascade),
                Entry::Block(block) => block.teardown(cascade),
            }
        }
        inner.property_children.borrow_mut().clear();

        let slots = std::mem::take(&mut *inner.slots.borrow_mut());
        drop(slots);
        let deps = std::mem::take(&mut *inner.dependencies.borrow_mut());
        let mut unlinked = 0;
        for dep in &deps {
            unlinked += dep.unlink_node(inner.id);
        }

        if remove_dom && !inner.is_root {
            let target = self.target();
            if let Some(outer) = inner.outer.get() {
                target.remove(outer);
            }
            target.remove(self.dom());
        }
        self.session().prune_global_handlers();
        tracing::trace!(node = inner.id.0, deps = deps.len(), unlinked, "node destroyed");
    }
}
