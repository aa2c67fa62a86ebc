#![forbid(unsafe_code)]

//! The document a render session writes into.
//!
//! [`RenderTarget`] is the capability the node builder talks to. A session
//! holds exactly one target for its whole lifetime, so the builder never
//! branches on "server or browser" per call: [`VirtualDocument`] serves
//! string rendering and tests, `LiveDomTarget` (wasm32 only) drives the
//! browser DOM.
//!
//! Nodes are addressed by [`DomId`] handles. A handle stays valid for the
//! lifetime of the target, including across [`RenderTarget::retag`].
//!
//! [`VirtualDocument`]: crate::virtual_dom::VirtualDocument

use std::fmt;
use std::rc::Rc;

use trellis_core::{EventKind, Result};

use crate::session::HeadState;

/// Handle to one node inside a [`RenderTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomId(pub u64);

impl fmt::Display for DomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dom#{}", self.0)
    }
}

/// How mutations reach the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// The tree is live: style rules are appended as they are created and
    /// unregistered values are written as inline styles.
    Interactive,
    /// The tree is serialized once: every style goes through a class.
    ServerSide,
}

/// An event callback stored by the target.
pub type Listener = Rc<dyn Fn() -> Result<()>>;

/// The subset of a document the builder needs.
///
/// Implementations log host failures themselves; none of the mutators
/// report errors back to the builder.
pub trait RenderTarget {
    fn mode(&self) -> RenderMode;

    /// The page body.
    fn body(&self) -> DomId;

    fn create_element(&self, tag: &str) -> DomId;

    /// A placeholder node that renders nothing visible.
    fn create_marker(&self) -> DomId;

    /// Move `child` to the end of `parent`'s children.
    fn append_child(&self, parent: DomId, child: DomId);

    /// Move `node` to directly after `reference` under `reference`'s parent.
    fn insert_after(&self, reference: DomId, node: DomId);

    /// Detach `node` from its parent.
    fn remove(&self, node: DomId);

    fn parent_of(&self, node: DomId) -> Option<DomId>;

    fn children_of(&self, node: DomId) -> Vec<DomId>;

    /// The attached node whose `id` attribute is `id`.
    fn find_by_html_id(&self, id: &str) -> Option<DomId>;

    /// Lowercase tag name; `None` for markers.
    fn tag_name(&self, node: DomId) -> Option<String>;

    /// Change the element's tag, keeping children, classes, attributes,
    /// inline styles and listeners. The handle stays the same.
    fn retag(&self, node: DomId, tag: &str);

    /// Set an attribute. `None` writes a bare attribute (`checked`).
    fn set_attribute(&self, node: DomId, name: &str, value: Option<&str>);

    fn remove_attribute(&self, node: DomId, name: &str);

    /// `Some(None)` for a bare attribute, `None` when absent.
    fn attribute(&self, node: DomId, name: &str) -> Option<Option<String>>;

    fn add_class(&self, node: DomId, class: &str);

    fn remove_class(&self, node: DomId, class: &str);

    fn class_list(&self, node: DomId) -> Vec<String>;

    fn set_style(&self, node: DomId, property: &str, value: &str);

    fn remove_style(&self, node: DomId, property: &str);

    fn style(&self, node: DomId, property: &str) -> Option<String>;

    fn set_inner_html(&self, node: DomId, html: &str);

    fn inner_html(&self, node: DomId) -> String;

    /// Register `listener` for `event`. Listeners for one event run in
    /// registration order.
    fn add_listener(&self, node: DomId, event: &EventKind, listener: Listener);

    /// Append one rule to the page stylesheet.
    fn append_style_rule(&self, rule: &str);

    /// Replace the whole page stylesheet.
    fn replace_styles(&self, sheet: &str);

    /// Replace the body's children with the children of `staging`, leaving
    /// `staging` empty.
    fn swap_body_children(&self, staging: DomId);

    /// Mirror the session's head state (title, meta tags, favicon, external
    /// assets) into the page. String targets read the head from the session
    /// instead and ignore this.
    fn sync_head(&self, _head: &HeadState) {}

    /// Serialized markup of `node` and its subtree.
    fn outer_html(&self, node: DomId) -> String;
}

/// Whether `ancestor` is `node` or one of its ancestors.
pub fn contains(target: &dyn RenderTarget, ancestor: DomId, node: DomId) -> bool {
    let mut current = Some(node);
    while let Some(id) = current {
        if id == ancestor {
            return true;
        }
        current = target.parent_of(id);
    }
    false
}

/// Every descendant of `root` (excluding `root`) whose tag is `tag`, in
/// document order.
pub fn descendants_with_tag(target: &dyn RenderTarget, root: DomId, tag: &str) -> Vec<DomId> {
    let mut found = Vec::new();
    let mut stack: Vec<DomId> = target.children_of(root).into_iter().rev().collect();
    while let Some(id) = stack.pop() {
        if target.tag_name(id).as_deref() == Some(tag) {
            found.push(id);
        }
        stack.extend(target.children_of(id).into_iter().rev());
    }
    found
}
