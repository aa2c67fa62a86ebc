#![forbid(unsafe_code)]

//! In-memory document used for string rendering and tests.
//!
//! Nodes live in an arena indexed by [`DomId`]; the body is always id 1 and
//! every created node takes the next id, which is also the `data-id` it
//! serializes with. Removed nodes keep their arena slot but lose their
//! subtree links and listeners, so handlers of torn-down nodes are freed.
//!
//! Serialization follows the shape
//! `<tag data-id="N" id="…" attr="…" class="…" style="p:v;q:w">inner children</tag>`,
//! with markers rendered as `<!--trellis-->`. Attribute, class and style
//! values are HTML-escaped; inner HTML is written as is.

use std::cell::RefCell;
use std::fmt;
use std::fmt::Write as _;

use indexmap::IndexMap;
use smallvec::SmallVec;
use trellis_core::{EventKind, Result};
use v_htmlescape::escape;

use crate::target::{DomId, Listener, RenderMode, RenderTarget};

const BODY: DomId = DomId(1);

/// Serialized form of a marker node.
pub const MARKER_HTML: &str = "<!--trellis-->";

struct VNode {
    /// `None` for markers.
    tag: Option<String>,
    parent: Option<DomId>,
    children: Vec<DomId>,
    attributes: IndexMap<String, Option<String>>,
    classes: Vec<String>,
    styles: IndexMap<String, String>,
    inner_html: String,
    listeners: SmallVec<[(EventKind, Listener); 2]>,
}

impl VNode {
    fn new(tag: Option<String>) -> Self {
        Self {
            tag,
            parent: None,
            children: Vec::new(),
            attributes: IndexMap::new(),
            classes: Vec::new(),
            styles: IndexMap::new(),
            inner_html: String::new(),
            listeners: SmallVec::new(),
        }
    }
}

/// A [`RenderTarget`] that keeps the whole document in memory.
pub struct VirtualDocument {
    mode: RenderMode,
    nodes: RefCell<Vec<VNode>>,
    styles: RefCell<String>,
}

impl fmt::Debug for VirtualDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualDocument")
            .field("mode", &self.mode)
            .field("nodes", &self.node_count())
            .finish()
    }
}

impl Default for VirtualDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualDocument {
    /// A document for string rendering.
    #[must_use]
    pub fn new() -> Self {
        Self::with_mode(RenderMode::ServerSide)
    }

    /// A document that behaves like a live page: inline styles, appended
    /// rules and dispatchable listeners.
    #[must_use]
    pub fn interactive() -> Self {
        Self::with_mode(RenderMode::Interactive)
    }

    fn with_mode(mode: RenderMode) -> Self {
        Self {
            mode,
            nodes: RefCell::new(vec![VNode::new(Some("body".to_owned()))]),
            styles: RefCell::new(String::new()),
        }
    }

    /// Number of nodes ever created, the body included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.borrow().len()
    }

    /// Listeners registered directly on `node`.
    #[must_use]
    pub fn listener_count(&self, node: DomId) -> usize {
        self.with_node(node, |n| n.listeners.len())
    }

    /// Serialized body.
    #[must_use]
    pub fn to_html(&self) -> String {
        self.outer_html(BODY)
    }

    /// Rules appended or installed so far.
    #[must_use]
    pub fn stylesheet(&self) -> String {
        self.styles.borrow().clone()
    }

    /// Run the listeners registered on `node` for `event`, in registration
    /// order. Stops at the first failing listener.
    pub fn dispatch_event(&self, node: DomId, event: &EventKind) -> Result<()> {
        let listeners: Vec<Listener> = self.with_node(node, |n| {
            n.listeners
                .iter()
                .filter(|(kind, _)| kind.code() == event.code())
                .map(|(_, l)| l.clone())
                .collect()
        });
        tracing::trace!(%node, count = listeners.len(), "dispatch event");
        for listener in listeners {
            listener()?;
        }
        Ok(())
    }

    /// Inline style string as serialized: `p:v;q:w`.
    #[must_use]
    pub fn style_attribute(&self, node: DomId) -> String {
        self.with_node(node, |n| {
            n.styles
                .iter()
                .map(|(p, v)| format!("{p}:{v}"))
                .collect::<Vec<_>>()
                .join(";")
        })
    }

    fn index(id: DomId) -> usize {
        usize::try_from(id.0.saturating_sub(1)).unwrap_or(usize::MAX)
    }

    fn with_node<R: Default>(&self, id: DomId, f: impl FnOnce(&VNode) -> R) -> R {
        match self.nodes.borrow().get(Self::index(id)) {
            Some(node) => f(node),
            None => {
                tracing::warn!(%id, "unknown virtual node");
                R::default()
            }
        }
    }

    fn with_node_mut(&self, id: DomId, f: impl FnOnce(&mut VNode)) {
        match self.nodes.borrow_mut().get_mut(Self::index(id)) {
            Some(node) => f(node),
            None => tracing::warn!(%id, "unknown virtual node"),
        }
    }

    fn push(&self, node: VNode) -> DomId {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(node);
        DomId(nodes.len() as u64)
    }

    fn detach(nodes: &mut [VNode], id: DomId) {
        let Some(parent) = nodes.get_mut(Self::index(id)).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(p) = nodes.get_mut(Self::index(parent)) {
            p.children.retain(|c| *c != id);
        }
    }

    /// Unlink the subtree under `id` and hand back its listeners, to be
    /// dropped once the arena borrow ends.
    fn release(nodes: &mut [VNode], id: DomId) -> Vec<Listener> {
        let mut released = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(n) = nodes.get_mut(Self::index(current)) else {
                continue;
            };
            if current != id {
                n.parent = None;
            }
            released.extend(n.listeners.drain(..).map(|(_, l)| l));
            stack.extend(std::mem::take(&mut n.children));
        }
        released
    }

    fn write_node(&self, nodes: &[VNode], id: DomId, out: &mut String) {
        let Some(node) = nodes.get(Self::index(id)) else {
            return;
        };
        let Some(tag) = node.tag.as_deref() else {
            out.push_str(MARKER_HTML);
            return;
        };
        let _ = write!(out, "<{tag} data-id=\"{}\"", id.0);
        if let Some(Some(html_id)) = node.attributes.get("id") {
            let _ = write!(out, " id=\"{}\"", escape(html_id));
        }
        for (name, value) in node.attributes.iter().filter(|(name, _)| *name != "id") {
            match value {
                Some(v) if !v.is_empty() => {
                    let _ = write!(out, " {name}=\"{}\"", escape(v));
                }
                _ => {
                    let _ = write!(out, " {name}");
                }
            }
        }
        if !node.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", escape(&node.classes.join(" ")));
        }
        if !node.styles.is_empty() {
            let styles = node
                .styles
                .iter()
                .map(|(p, v)| format!("{p}:{v}"))
                .collect::<Vec<_>>()
                .join(";");
            let _ = write!(out, " style=\"{}\"", escape(&styles));
        }
        out.push('>');
        out.push_str(&node.inner_html);
        for child in &node.children {
            self.write_node(nodes, *child, out);
        }
        let _ = write!(out, "</{tag}>");
    }
}

impl RenderTarget for VirtualDocument {
    fn mode(&self) -> RenderMode {
        self.mode
    }

    fn body(&self) -> DomId {
        BODY
    }

    fn create_element(&self, tag: &str) -> DomId {
        self.push(VNode::new(Some(tag.to_ascii_lowercase())))
    }

    fn create_marker(&self) -> DomId {
        self.push(VNode::new(None))
    }

    fn append_child(&self, parent: DomId, child: DomId) {
        let mut nodes = self.nodes.borrow_mut();
        if Self::index(parent) >= nodes.len() || Self::index(child) >= nodes.len() {
            tracing::warn!(%parent, %child, "append to unknown virtual node");
            return;
        }
        Self::detach(&mut nodes, child);
        nodes[Self::index(parent)].children.push(child);
        nodes[Self::index(child)].parent = Some(parent);
    }

    fn insert_after(&self, reference: DomId, node: DomId) {
        let mut nodes = self.nodes.borrow_mut();
        if Self::index(node) >= nodes.len() {
            tracing::warn!(%node, "insert of unknown virtual node");
            return;
        }
        Self::detach(&mut nodes, node);
        let Some(parent) = nodes.get(Self::index(reference)).and_then(|n| n.parent) else {
            tracing::warn!(%reference, %node, "insert after a detached node");
            return;
        };
        let siblings = &mut nodes[Self::index(parent)].children;
        let at = siblings
            .iter()
            .position(|c| *c == reference)
            .map_or(siblings.len(), |p| p + 1);
        siblings.insert(at, node);
        nodes[Self::index(node)].parent = Some(parent);
    }

    fn remove(&self, node: DomId) {
        let released = {
            let mut nodes = self.nodes.borrow_mut();
            Self::detach(&mut nodes, node);
            Self::release(&mut nodes, node)
        };
        tracing::trace!(%node, listeners = released.len(), "removed");
    }

    fn parent_of(&self, node: DomId) -> Option<DomId> {
        self.with_node(node, |n| n.parent)
    }

    fn children_of(&self, node: DomId) -> Vec<DomId> {
        self.with_node(node, |n| n.children.clone())
    }

    fn find_by_html_id(&self, id: &str) -> Option<DomId> {
        let nodes = self.nodes.borrow();
        let mut stack = vec![BODY];
        while let Some(current) = stack.pop() {
            let node = nodes.get(Self::index(current))?;
            if matches!(node.attributes.get("id"), Some(Some(v)) if v == id) {
                return Some(current);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    fn tag_name(&self, node: DomId) -> Option<String> {
        self.with_node(node, |n| n.tag.clone())
    }

    fn retag(&self, node: DomId, tag: &str) {
        self.with_node_mut(node, |n| {
            if n.tag.is_some() {
                n.tag = Some(tag.to_ascii_lowercase());
            }
        });
    }

    fn set_attribute(&self, node: DomId, name: &str, value: Option<&str>) {
        self.with_node_mut(node, |n| {
            n.attributes.insert(name.to_owned(), value.map(str::to_owned));
        });
    }

    fn remove_attribute(&self, node: DomId, name: &str) {
        self.with_node_mut(node, |n| {
            n.attributes.shift_remove(name);
        });
    }

    fn attribute(&self, node: DomId, name: &str) -> Option<Option<String>> {
        self.with_node(node, |n| n.attributes.get(name).cloned())
    }

    fn add_class(&self, node: DomId, class: &str) {
        self.with_node_mut(node, |n| {
            if !n.classes.iter().any(|c| c == class) {
                n.classes.push(class.to_owned());
            }
        });
    }

    fn remove_class(&self, node: DomId, class: &str) {
        self.with_node_mut(node, |n| n.classes.retain(|c| c != class));
    }

    fn class_list(&self, node: DomId) -> Vec<String> {
        self.with_node(node, |n| n.classes.clone())
    }

    fn set_style(&self, node: DomId, property: &str, value: &str) {
        self.with_node_mut(node, |n| {
            n.styles.insert(property.to_owned(), value.to_owned());
        });
    }

    fn remove_style(&self, node: DomId, property: &str) {
        self.with_node_mut(node, |n| {
            n.styles.shift_remove(property);
        });
    }

    fn style(&self, node: DomId, property: &str) -> Option<String> {
        self.with_node(node, |n| n.styles.get(property).cloned())
    }

    fn set_inner_html(&self, node: DomId, html: &str) {
        self.with_node_mut(node, |n| html.clone_into(&mut n.inner_html));
    }

    fn inner_html(&self, node: DomId) -> String {
        self.with_node(node, |n| n.inner_html.clone())
    }

    fn add_listener(&self, node: DomId, event: &EventKind, listener: Listener) {
        self.with_node_mut(node, |n| n.listeners.push((event.clone(), listener)));
    }

    fn append_style_rule(&self, rule: &str) {
        let mut styles = self.styles.borrow_mut();
        styles.push_str(rule);
        styles.push('\n');
    }

    fn replace_styles(&self, sheet: &str) {
        sheet.clone_into(&mut self.styles.borrow_mut());
    }

    fn swap_body_children(&self, staging: DomId) {
        let mut nodes = self.nodes.borrow_mut();
        let Some(moved) = nodes
            .get_mut(Self::index(staging))
            .map(|n| std::mem::take(&mut n.children))
        else {
            return;
        };
        let old = std::mem::replace(&mut nodes[Self::index(BODY)].children, moved.clone());
        for id in old {
            if let Some(n) = nodes.get_mut(Self::index(id)) {
                n.parent = None;
            }
        }
        for id in moved {
            if let Some(n) = nodes.get_mut(Self::index(id)) {
                n.parent = Some(BODY);
            }
        }
    }

    fn outer_html(&self, node: DomId) -> String {
        let nodes = self.nodes.borrow();
        let mut out = String::new();
        self.write_node(&nodes, node, &mut out);
        out
    }
}
