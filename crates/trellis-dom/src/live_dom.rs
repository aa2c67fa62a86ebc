#![forbid(unsafe_code)]

//! [`RenderTarget`] over the browser DOM (wasm32 only).
//!
//! Nodes live in an arena indexed by [`DomId`]. Retagging creates a new
//! element, moves children and attributes over, re-registers listeners and
//! stores the new element under the old handle.
//!
//! Host failures are logged at `warn!` and otherwise ignored.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use trellis_core::{Error, EventKind, Result};
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use web_sys::{Document, Element, Event, HtmlElement, KeyboardEvent, Node};

use crate::session::{HeadState, MetaKey, RenderSession};
use crate::target::{DomId, Listener, RenderMode, RenderTarget};
use crate::virtual_dom::MARKER_HTML;

type DomCallback = Closure<dyn FnMut(Event)>;

const STYLE_ID: &str = "styles";

fn warn_on_err<T>(result: std::result::Result<T, JsValue>, what: &'static str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(?err, what, "dom call failed");
            None
        }
    }
}

fn dom_event(kind: &EventKind) -> Option<&'static str> {
    Some(match kind {
        EventKind::Click => "click",
        EventKind::MouseEnter => "mouseenter",
        EventKind::MouseLeave => "mouseleave",
        EventKind::Input => "input",
        EventKind::Change => "change",
        EventKind::Blur => "blur",
        EventKind::Focus => "focus",
        EventKind::ClickOutside | EventKind::GlobalKey(_) | EventKind::GlobalKeySeq(_) => {
            return None;
        }
    })
}

/// The page the application runs in.
pub struct LiveDomTarget {
    document: Document,
    nodes: RefCell<Vec<Node>>,
    listeners: RefCell<AHashMap<DomId, Vec<(&'static str, DomCallback)>>>,
    globals: RefCell<Vec<(&'static str, DomCallback)>>,
}

impl fmt::Debug for LiveDomTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveDomTarget")
            .field("nodes", &self.nodes.borrow().len())
            .finish_non_exhaustive()
    }
}

impl LiveDomTarget {
    /// Target the current window's document.
    pub fn new() -> Result<Self> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| Error::Host("no document".to_owned()))?;
        let body = document
            .body()
            .ok_or_else(|| Error::Host("document has no body".to_owned()))?;
        let body: Node = body.unchecked_into();
        Ok(Self {
            document,
            nodes: RefCell::new(vec![body]),
            listeners: RefCell::new(AHashMap::new()),
            globals: RefCell::new(Vec::new()),
        })
    }

    fn node(&self, id: DomId) -> Option<Node> {
        usize::try_from(id.0)
            .ok()
            .and_then(|i| self.nodes.borrow().get(i).cloned())
    }

    fn element(&self, id: DomId) -> Option<Element> {
        self.node(id).and_then(|n| n.dyn_into::<Element>().ok())
    }

    fn html_element(&self, id: DomId) -> Option<HtmlElement> {
        self.node(id).and_then(|n| n.dyn_into::<HtmlElement>().ok())
    }

    fn register(&self, node: Node) -> DomId {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(node);
        DomId(nodes.len() as u64 - 1)
    }

    /// Handle of a node created by this target.
    fn lookup(&self, node: &Node) -> Option<DomId> {
        self.nodes
            .borrow()
            .iter()
            .position(|n| n.is_same_node(Some(node)))
            .map(|i| DomId(i as u64))
    }

    /// Handle of `node` or its closest known ancestor.
    fn lookup_ancestor(&self, node: Node) -> Option<DomId> {
        let mut current = Some(node);
        while let Some(node) = current {
            if let Some(id) = self.lookup(&node) {
                return Some(id);
            }
            current = node.parent_node();
        }
        None
    }

    fn style_element(&self) -> Option<Element> {
        if let Some(existing) = self.document.get_element_by_id(STYLE_ID) {
            return Some(existing);
        }
        let style = warn_on_err(self.document.create_element("style"), "create style")?;
        warn_on_err(style.set_attribute("id", STYLE_ID), "style id");
        let head = self.document.head()?;
        warn_on_err(head.append_child(&style), "append style");
        Some(style)
    }

    fn listen(&self, element: &Node, event: &'static str, callback: &DomCallback) {
        warn_on_err(
            element.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref()),
            "add listener",
        );
    }

    /// `<meta>` or `<link>` in the head matching `selector`, created with
    /// `attrs` when missing.
    fn head_element(&self, tag: &str, selector: &str, attrs: &[(&str, &str)]) -> Option<Element> {
        if let Some(found) = warn_on_err(self.document.query_selector(selector), "query head").flatten() {
            return Some(found);
        }
        let element = warn_on_err(self.document.create_element(tag), "create head element")?;
        for (name, value) in attrs {
            warn_on_err(element.set_attribute(name, value), "head attribute");
        }
        let head = self.document.head()?;
        warn_on_err(head.append_child(&element), "append head element");
        Some(element)
    }
}

impl RenderTarget for LiveDomTarget {
    fn mode(&self) -> RenderMode {
        RenderMode::Interactive
    }

    fn body(&self) -> DomId {
        DomId(0)
    }

    fn create_element(&self, tag: &str) -> DomId {
        match self.document.create_element(tag) {
            Ok(element) => self.register(element.unchecked_into()),
            Err(err) => {
                tracing::warn!(?err, tag, "create element failed");
                self.register(self.document.create_comment("invalid").unchecked_into())
            }
        }
    }

    fn create_marker(&self) -> DomId {
        self.register(self.document.create_comment("trellis").unchecked_into())
    }

    fn append_child(&self, parent: DomId, child: DomId) {
        if let (Some(parent), Some(child)) = (self.node(parent), self.node(child)) {
            warn_on_err(parent.append_child(&child), "append child");
        }
    }

    fn insert_after(&self, reference: DomId, node: DomId) {
        let (Some(reference), Some(node)) = (self.node(reference), self.node(node)) else {
            return;
        };
        match reference.parent_node() {
            Some(parent) => {
                let next = reference.next_sibling();
                warn_on_err(parent.insert_before(&node, next.as_ref()), "insert after");
            }
            None => tracing::warn!("insert_after reference is detached"),
        }
    }

    fn remove(&self, node: DomId) {
        if let Some(node) = self.node(node)
            && let Some(parent) = node.parent_node()
        {
            warn_on_err(parent.remove_child(&node), "remove child");
        }
    }

    fn parent_of(&self, node: DomId) -> Option<DomId> {
        let parent = self.node(node)?.parent_node()?;
        self.lookup(&parent)
    }

    fn children_of(&self, node: DomId) -> Vec<DomId> {
        let Some(node) = self.node(node) else {
            return Vec::new();
        };
        let list = node.child_nodes();
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|child| self.lookup(&child))
            .collect()
    }

    fn find_by_html_id(&self, id: &str) -> Option<DomId> {
        let element = self.document.get_element_by_id(id)?;
        self.lookup(&element.unchecked_into())
    }

    fn tag_name(&self, node: DomId) -> Option<String> {
        self.element(node).map(|e| e.tag_name().to_lowercase())
    }

    fn retag(&self, node: DomId, tag: &str) {
        let Some(old) = self.element(node) else {
            return;
        };
        if old.tag_name().eq_ignore_ascii_case(tag) {
            return;
        }
        let Some(new) = warn_on_err(self.document.create_element(tag), "retag") else {
            return;
        };
        for name in old.get_attribute_names().iter().filter_map(|n| n.as_string()) {
            if let Some(value) = old.get_attribute(&name) {
                warn_on_err(new.set_attribute(&name, &value), "copy attribute");
            }
        }
        while let Some(child) = old.first_child() {
            warn_on_err(new.append_child(&child), "move child");
        }
        if old.parent_node().is_some() {
            warn_on_err(old.replace_with_with_node_1(&new), "replace element");
        }
        if let Some(callbacks) = self.listeners.borrow().get(&node) {
            for (event, callback) in callbacks {
                self.listen(&new, event, callback);
            }
        }
        if let Ok(index) = usize::try_from(node.0)
            && let Some(slot) = self.nodes.borrow_mut().get_mut(index)
        {
            *slot = new.unchecked_into();
        }
    }

    fn set_attribute(&self, node: DomId, name: &str, value: Option<&str>) {
        if let Some(element) = self.element(node) {
            warn_on_err(element.set_attribute(name, value.unwrap_or("")), "set attribute");
        }
    }

    fn remove_attribute(&self, node: DomId, name: &str) {
        if let Some(element) = self.element(node) {
            warn_on_err(element.remove_attribute(name), "remove attribute");
        }
    }

    fn attribute(&self, node: DomId, name: &str) -> Option<Option<String>> {
        let value = self.element(node)?.get_attribute(name)?;
        Some((!value.is_empty()).then_some(value))
    }

    fn add_class(&self, node: DomId, class: &str) {
        if let Some(element) = self.element(node) {
            warn_on_err(element.class_list().add_1(class), "add class");
        }
    }

    fn remove_class(&self, node: DomId, class: &str) {
        if let Some(element) = self.element(node) {
            warn_on_err(element.class_list().remove_1(class), "remove class");
        }
    }

    fn class_list(&self, node: DomId) -> Vec<String> {
        let Some(element) = self.element(node) else {
            return Vec::new();
        };
        let list = element.class_list();
        (0..list.length()).filter_map(|i| list.item(i)).collect()
    }

    fn set_style(&self, node: DomId, property: &str, value: &str) {
        if let Some(element) = self.html_element(node) {
            warn_on_err(element.style().set_property(property, value), "set style");
        }
    }

    fn remove_style(&self, node: DomId, property: &str) {
        if let Some(element) = self.html_element(node) {
            warn_on_err(element.style().remove_property(property), "remove style");
        }
    }

    fn style(&self, node: DomId, property: &str) -> Option<String> {
        let element = self.html_element(node)?;
        warn_on_err(element.style().get_property_value(property), "read style")
            .filter(|v| !v.is_empty())
    }

    fn set_inner_html(&self, node: DomId, html: &str) {
        if let Some(element) = self.element(node) {
            element.set_inner_html(html);
        }
    }

    fn inner_html(&self, node: DomId) -> String {
        self.element(node).map(|e| e.inner_html()).unwrap_or_default()
    }

    fn add_listener(&self, node: DomId, event: &EventKind, listener: Listener) {
        let (Some(name), Some(element)) = (dom_event(event), self.node(node)) else {
            return;
        };
        let callback: DomCallback = Closure::new(move |_event: Event| {
            if let Err(err) = listener() {
                tracing::error!(%err, event = name, "event handler failed");
            }
        });
        self.listen(&element, name, &callback);
        self.listeners
            .borrow_mut()
            .entry(node)
            .or_default()
            .push((name, callback));
    }

    fn append_style_rule(&self, rule: &str) {
        if let Some(style) = self.style_element() {
            let sheet = style.text_content().unwrap_or_default();
            style.set_text_content(Some(&format!("{sheet}{rule}\n")));
        }
    }

    fn replace_styles(&self, sheet: &str) {
        if let Some(style) = self.style_element() {
            style.set_text_content(Some(sheet));
        }
    }

    fn swap_body_children(&self, staging: DomId) {
        let (Some(body), Some(staging)) = (self.node(self.body()), self.node(staging)) else {
            return;
        };
        while let Some(child) = body.first_child() {
            warn_on_err(body.remove_child(&child), "clear body");
        }
        while let Some(child) = staging.first_child() {
            warn_on_err(body.append_child(&child), "move staged child");
        }
    }

    fn sync_head(&self, head: &HeadState) {
        if let Some(title) = &head.title {
            self.document.set_title(title);
        }
        for (key, content) in &head.metas {
            let (attr, name) = match key {
                MetaKey::Name(n) => ("name", n),
                MetaKey::Property(p) => ("property", p),
            };
            let selector = format!("meta[{attr}=\"{name}\"]");
            if let Some(meta) = self.head_element("meta", &selector, &[(attr, name)]) {
                warn_on_err(meta.set_attribute("content", content), "meta content");
            }
        }
        if let Some(icon) = &head.favicon
            && let Some(link) = self.head_element("link", "link[rel=\"shortcut icon\"]", &[("rel", "shortcut icon")])
        {
            warn_on_err(link.set_attribute("href", icon), "favicon");
        }
        for href in &head.css {
            let selector = format!("link[rel=\"stylesheet\"][href=\"{href}\"]");
            self.head_element("link", &selector, &[("rel", "stylesheet"), ("href", href)]);
        }
        for src in &head.js {
            let selector = format!("script[src=\"{src}\"]");
            self.head_element("script", &selector, &[("src", src)]);
        }
    }

    fn outer_html(&self, node: DomId) -> String {
        match self.element(node) {
            Some(element) => element.outer_html(),
            None => MARKER_HTML.to_owned(),
        }
    }
}

/// Feed document clicks and key presses into `session`'s click-outside and
/// global-key handlers.
pub fn install_global_listeners(session: &Rc<RenderSession>, target: &Rc<LiveDomTarget>) {
    let document: Node = target.document.clone().unchecked_into();

    let weak_session: Weak<RenderSession> = Rc::downgrade(session);
    let weak_target: Weak<LiveDomTarget> = Rc::downgrade(target);
    let click: DomCallback = Closure::new(move |event: Event| {
        let (Some(session), Some(target)) = (weak_session.upgrade(), weak_target.upgrade()) else {
            return;
        };
        let Some(clicked) = event.target().and_then(|t| t.dyn_into::<Node>().ok()) else {
            return;
        };
        let id = target.lookup_ancestor(clicked).unwrap_or_else(|| target.body());
        if let Err(err) = session.click(id) {
            tracing::error!(%err, "click handler failed");
        }
    });

    let weak_session: Weak<RenderSession> = Rc::downgrade(session);
    let key_down: DomCallback = Closure::new(move |event: Event| {
        let (Some(session), Some(key)) = (
            weak_session.upgrade(),
            event.dyn_ref::<KeyboardEvent>().map(KeyboardEvent::key),
        ) else {
            return;
        };
        if let Err(err) = session.key_down(&key) {
            tracing::error!(%err, %key, "key handler failed");
        }
    });

    let weak_session: Weak<RenderSession> = Rc::downgrade(session);
    let key_up: DomCallback = Closure::new(move |event: Event| {
        if let (Some(session), Some(key)) = (
            weak_session.upgrade(),
            event.dyn_ref::<KeyboardEvent>().map(KeyboardEvent::key),
        ) {
            session.key_up(&key);
        }
    });

    let mut globals = target.globals.borrow_mut();
    for (name, callback) in [("click", click), ("keydown", key_down), ("keyup", key_up)] {
        target.listen(&document, name, &callback);
        globals.push((name, callback));
    }
}
