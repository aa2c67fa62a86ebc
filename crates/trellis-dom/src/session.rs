#![forbid(unsafe_code)]

//! Per-render context.
//!
//! A [`RenderSession`] owns everything that would otherwise be ambient page
//! state: the deduplicated style-class registry, the document head, the
//! session-wide event registries and the `dark_mode` / `device`
//! observables. Two sessions never share any of it, so several pages can be
//! rendered on one thread one after the other, or interleaved.
//!
//! The session also installs its propagation limit for the current thread
//! and restores the previous one when dropped.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};
use indexmap::{IndexMap, IndexSet};
use trellis_core::css::{CssValue, format_rule, short_name};
use trellis_core::{EventKind, RenderConfig, Result};
use trellis_reactive::{Closure, Dependency, LimitScope, Mutable, NodeId, Subscription, Value, scoped_limit};
use v_htmlescape::escape;

use crate::node::{Node, WeakNode};
use crate::target::{DomId, Listener, RenderMode, RenderTarget, contains};

// ---------------------------------------------------------------------------
// ClassRegistry
// ---------------------------------------------------------------------------

/// Generated style classes and the rules behind them.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    prefix: String,
    numbers: AHashMap<String, usize>,
    next: usize,
    rules: IndexMap<String, (String, CssValue)>,
}

impl ClassRegistry {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Class name for `property: value`. Equal pairs always get the same
    /// name; the counter only advances for new pairs.
    pub fn class_name(&mut self, property: &str, value: &CssValue) -> String {
        let short = short_name(property);
        let key = format!("{short}-{}", value.cache_key());
        let n = match self.numbers.get(&key) {
            Some(n) => *n,
            None => {
                self.next += 1;
                self.numbers.insert(key, self.next);
                self.next
            }
        };
        format!("{}{short}-{n}", self.prefix)
    }

    /// Record the rule for `selector`. Returns `true` when the stylesheet
    /// needs the rule emitted: the selector is new, or its value changed.
    pub fn register(&mut self, selector: &str, property: &str, value: &CssValue) -> bool {
        match self.rules.get(selector) {
            Some((p, v)) if p == property && v == value => false,
            _ => {
                self.rules
                    .insert(selector.to_owned(), (property.to_owned(), value.clone()));
                true
            }
        }
    }

    #[must_use]
    pub fn contains(&self, selector: &str) -> bool {
        self.rules.contains_key(selector)
    }

    /// Formatted rule for `selector`.
    #[must_use]
    pub fn rule(&self, selector: &str) -> Option<String> {
        self.rules
            .get(selector)
            .map(|(property, value)| format_rule(selector, property, value))
    }

    /// Every rule in registration order.
    #[must_use]
    pub fn rules(&self) -> Vec<String> {
        self.rules
            .iter()
            .map(|(selector, (property, value))| format_rule(selector, property, value))
            .collect()
    }

    /// Rules joined one per line.
    #[must_use]
    pub fn stylesheet(&self) -> String {
        let mut sheet = self.rules().join("\n");
        if !sheet.is_empty() {
            sheet.push('\n');
        }
        sheet
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ---------------------------------------------------------------------------
// HeadState
// ---------------------------------------------------------------------------

/// How a meta tag is keyed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetaKey {
    /// `<meta name="…">`
    Name(String),
    /// `<meta property="…">` (Open Graph)
    Property(String),
}

impl MetaKey {
    #[must_use]
    pub fn name(name: &str) -> Self {
        Self::Name(name.to_owned())
    }

    #[must_use]
    pub fn property(property: &str) -> Self {
        Self::Property(property.to_owned())
    }
}

/// Document head contents collected during a render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadState {
    pub title: Option<String>,
    pub metas: IndexMap<MetaKey, String>,
    pub favicon: Option<String>,
    pub css: IndexSet<String>,
    pub js: IndexSet<String>,
}

impl HeadState {
    /// Set or (with `None`) remove one meta tag.
    pub fn set_meta(&mut self, key: MetaKey, content: Option<String>) {
        match content {
            Some(content) => {
                self.metas.insert(key, content);
            }
            None => {
                self.metas.shift_remove(&key);
            }
        }
    }

    #[must_use]
    pub fn meta(&self, key: &MetaKey) -> Option<&str> {
        self.metas.get(key).map(String::as_str)
    }

    /// Head markup, one element per line.
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut lines = Vec::new();
        if let Some(title) = &self.title {
            lines.push(format!("<title>{}</title>", escape(title)));
        }
        for (key, content) in &self.metas {
            let (attr, name) = match key {
                MetaKey::Name(n) => ("name", n),
                MetaKey::Property(p) => ("property", p),
            };
            lines.push(format!(
                "<meta {attr}=\"{}\" content=\"{}\">",
                escape(name),
                escape(content)
            ));
        }
        if let Some(icon) = &self.favicon {
            lines.push(format!("<link rel=\"shortcut icon\" href=\"{}\">", escape(icon)));
        }
        for href in &self.css {
            lines.push(format!("<link rel=\"stylesheet\" href=\"{}\">", escape(href)));
        }
        for src in &self.js {
            lines.push(format!("<script src=\"{}\"></script>", escape(src)));
        }
        lines.join("\n")
    }
}

// ---------------------------------------------------------------------------
// Global events
// ---------------------------------------------------------------------------

struct GlobalHandler {
    node: WeakNode,
    event: EventKind,
    listener: Listener,
}

#[derive(Default)]
struct GlobalEvents {
    handlers: Vec<GlobalHandler>,
    held: AHashSet<String>,
    buffer: Vec<String>,
}

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Desktop,
    Mobile,
}

impl Device {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
        }
    }

    /// Device for a viewport `width` under `config`'s breakpoint.
    #[must_use]
    pub fn for_width(config: &RenderConfig, width: u32) -> Self {
        if config.is_mobile_width(width) {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }
}

// ---------------------------------------------------------------------------
// RenderSession
// ---------------------------------------------------------------------------

/// Everything one render pass shares. Always handled as `Rc<RenderSession>`.
pub struct RenderSession {
    config: RenderConfig,
    target: Rc<dyn RenderTarget>,
    classes: RefCell<ClassRegistry>,
    head: RefCell<HeadState>,
    dark_mode: Mutable,
    device: Mutable,
    buffering: Cell<bool>,
    events: RefCell<GlobalEvents>,
    next_node: Cell<u64>,
    subscriptions: RefCell<Vec<Subscription>>,
    _limit: LimitScope,
}

impl fmt::Debug for RenderSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderSession")
            .field("mode", &self.mode())
            .field("dark_mode", &self.is_dark_mode())
            .field("device", &self.device())
            .field("classes", &self.classes.borrow().len())
            .finish_non_exhaustive()
    }
}

impl RenderSession {
    /// Create a session writing into `target`.
    pub fn new(config: RenderConfig, target: Rc<dyn RenderTarget>) -> Result<Rc<Self>> {
        let limit = scoped_limit(config.propagation_limit);
        let session = Rc::new(Self {
            classes: RefCell::new(ClassRegistry::new(config.class_prefix.clone())),
            head: RefCell::new(HeadState::default()),
            dark_mode: Mutable::new(Value::from(config.dark_mode)),
            device: Mutable::new(Value::from(Device::Desktop.as_str())),
            buffering: Cell::new(false),
            events: RefCell::new(GlobalEvents::default()),
            next_node: Cell::new(0),
            subscriptions: RefCell::new(Vec::new()),
            _limit: limit,
            config,
            target,
        });
        session.track_body_class(session.dark_mode.clone(), "dark", |v| v.is_truthy())?;
        session.track_body_class(session.device.clone(), "mobile", |v| {
            v.as_string().as_deref() == Some(Device::Mobile.as_str())
        })?;
        tracing::debug!(mode = ?session.mode(), "render session created");
        Ok(session)
    }

    /// Keep `class` on the body while `test(source)` holds.
    fn track_body_class(
        &self,
        source: Mutable,
        class: &'static str,
        test: fn(&Value) -> bool,
    ) -> Result<()> {
        let weak = source.downgrade();
        let target = Rc::clone(&self.target);
        let closure = Closure::new(move || {
            let Some(source) = weak.upgrade() else {
                return Ok(Value::Null);
            };
            let body = target.body();
            if test(&source.get()) {
                target.add_class(body, class);
            } else {
                target.remove_class(body, class);
            }
            Ok(Value::Null)
        })?;
        self.subscriptions
            .borrow_mut()
            .push(Dependency::from(source).subscribe(closure));
        Ok(())
    }

    /// The body as a builder node. The session does not keep it alive.
    #[must_use]
    pub fn root(self: &Rc<Self>) -> Node {
        Node::root(Rc::clone(self))
    }

    #[must_use]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    #[must_use]
    pub fn target(&self) -> &Rc<dyn RenderTarget> {
        &self.target
    }

    #[must_use]
    pub fn mode(&self) -> RenderMode {
        self.target.mode()
    }

    #[must_use]
    pub fn is_server_side(&self) -> bool {
        self.mode() == RenderMode::ServerSide
    }

    #[must_use]
    pub fn is_buffering(&self) -> bool {
        self.buffering.get()
    }

    /// Mutations go straight into the live page: interactive and not
    /// double buffering.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.is_server_side() && !self.is_buffering()
    }

    /// Enter buffered mode until the returned scope drops.
    #[must_use]
    pub fn buffering(&self) -> BufferingScope<'_> {
        let previous = self.buffering.replace(true);
        BufferingScope {
            session: self,
            previous,
        }
    }

    pub(crate) fn next_node_id(&self) -> NodeId {
        let id = self.next_node.get() + 1;
        self.next_node.set(id);
        NodeId(id)
    }

    // -- theme and device ---------------------------------------------------

    /// The `dark_mode` observable (boolean).
    #[must_use]
    pub fn dark_mode(&self) -> &Mutable {
        &self.dark_mode
    }

    #[must_use]
    pub fn is_dark_mode(&self) -> bool {
        self.dark_mode.get().is_truthy()
    }

    pub fn set_dark_mode(&self, dark: bool) -> Result<()> {
        tracing::debug!(dark, "set dark mode");
        self.dark_mode.set(Value::from(dark))
    }

    /// The `device` observable (`"desktop"` or `"mobile"`).
    #[must_use]
    pub fn device_observable(&self) -> &Mutable {
        &self.device
    }

    #[must_use]
    pub fn device(&self) -> Device {
        match self.device.get().as_string().as_deref() {
            Some("mobile") => Device::Mobile,
            _ => Device::Desktop,
        }
    }

    pub fn set_device(&self, device: Device) -> Result<()> {
        tracing::debug!(device = device.as_str(), "set device");
        self.device.set(Value::from(device.as_str()))
    }

    // -- classes ------------------------------------------------------------

    #[must_use]
    pub fn class_prefix(&self) -> String {
        self.classes.borrow().prefix().to_owned()
    }

    pub fn class_name(&self, property: &str, value: &CssValue) -> String {
        self.classes.borrow_mut().class_name(property, value)
    }

    #[must_use]
    pub fn has_rule(&self, selector: &str) -> bool {
        self.classes.borrow().contains(selector)
    }

    /// Register a rule; when mutations are live and the rule is new or
    /// changed it is appended to the page stylesheet as well.
    pub fn register_rule(&self, selector: &str, property: &str, value: &CssValue) {
        let emitted = self.classes.borrow_mut().register(selector, property, value);
        if emitted && self.is_live() {
            self.target
                .append_style_rule(&format_rule(selector, property, value));
        }
    }

    /// Snapshot of the class registry.
    #[must_use]
    pub fn classes(&self) -> ClassRegistry {
        self.classes.borrow().clone()
    }

    // -- head ---------------------------------------------------------------

    #[must_use]
    pub fn head(&self) -> HeadState {
        self.head.borrow().clone()
    }

    /// Mutate the head state and mirror it into a live page.
    pub fn update_head(&self, f: impl FnOnce(&mut HeadState)) {
        f(&mut self.head.borrow_mut());
        if self.mode() == RenderMode::Interactive {
            self.target.sync_head(&self.head.borrow());
        }
    }

    /// Register an external stylesheet once per session.
    pub fn add_external_css(&self, href: &str) {
        if !self.head.borrow().css.contains(href) {
            self.update_head(|head| {
                head.css.insert(href.to_owned());
            });
        }
    }

    /// Register an external script once per session.
    pub fn add_external_js(&self, src: &str) {
        if !self.head.borrow().js.contains(src) {
            self.update_head(|head| {
                head.js.insert(src.to_owned());
            });
        }
    }

    // -- events -------------------------------------------------------------

    pub(crate) fn register_global(&self, node: WeakNode, event: EventKind, listener: Listener) {
        tracing::trace!(?event, "register global handler");
        self.events.borrow_mut().handlers.push(GlobalHandler {
            node,
            event,
            listener,
        });
    }

    /// Run every click-outside handler whose node is live, visible and does
    /// not contain `target`.
    pub fn click(&self, target: DomId) -> Result<()> {
        let due: Vec<Listener> = {
            let events = self.events.borrow();
            events
                .handlers
                .iter()
                .filter(|h| h.event == EventKind::ClickOutside)
                .filter_map(|h| {
                    let node = h.node.upgrade()?;
                    let dom = node.dom();
                    let hidden = self.target.style(dom, "display").as_deref() == Some("none");
                    (!hidden && !contains(self.target.as_ref(), dom, target))
                        .then(|| Rc::clone(&h.listener))
                })
                .collect()
        };
        for listener in due {
            listener()?;
        }
        Ok(())
    }

    /// Record a key press and run the global key handlers it completes.
    ///
    /// The press buffer keeps only as many keys as the longest registered
    /// key list. A handler matches when its keys are the most recent whole
    /// presses, in order; `GlobalKey` also needs every key still held.
    pub fn key_down(&self, key: &str) -> Result<()> {
        let due: Vec<Listener> = {
            let mut events = self.events.borrow_mut();
            events.held.insert(key.to_owned());
            events.buffer.push(key.to_owned());
            let longest = events
                .handlers
                .iter()
                .filter_map(|h| match &h.event {
                    EventKind::GlobalKey(keys) | EventKind::GlobalKeySeq(keys) => Some(keys.len()),
                    _ => None,
                })
                .max()
                .unwrap_or(0);
            let excess = events.buffer.len().saturating_sub(longest);
            events.buffer.drain(..excess);

            let due: Vec<Listener> = events
                .handlers
                .iter()
                .filter(|h| h.node.upgrade().is_some())
                .filter(|h| match &h.event {
                    EventKind::GlobalKey(keys) => {
                        keys.iter().all(|k| events.held.contains(k)) && ends_with_keys(&events.buffer, keys)
                    }
                    EventKind::GlobalKeySeq(keys) => ends_with_keys(&events.buffer, keys),
                    _ => false,
                })
                .map(|h| Rc::clone(&h.listener))
                .collect();
            if !due.is_empty() {
                events.held.remove(key);
                events.buffer.clear();
            }
            due
        };
        for listener in due {
            listener()?;
        }
        Ok(())
    }

    /// Keys currently in the press buffer, oldest first.
    #[must_use]
    pub fn pressed_keys(&self) -> Vec<String> {
        self.events.borrow().buffer.clone()
    }

    pub fn key_up(&self, key: &str) {
        self.events.borrow_mut().held.remove(key);
    }

    /// Drop handlers whose node is gone.
    pub(crate) fn prune_global_handlers(&self) {
        self.events
            .borrow_mut()
            .handlers
            .retain(|h| h.node.upgrade().is_some());
    }
}

fn ends_with_keys(buffer: &[String], keys: &[String]) -> bool {
    !keys.is_empty() && buffer.ends_with(keys)
}

/// Restores the previous buffering flag on drop.
#[derive(Debug)]
pub struct BufferingScope<'a> {
    session: &'a RenderSession,
    previous: bool,
}

impl Drop for BufferingScope<'_> {
    fn drop(&mut self) {
        self.session.buffering.set(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_dom::VirtualDocument;

    fn session(target: Rc<VirtualDocument>) -> Rc<RenderSession> {
        RenderSession::new(RenderConfig::default(), target).unwrap()
    }

    // -----------------------------------------------------------------------
    // ClassRegistry
    // -----------------------------------------------------------------------

    #[test]
    fn equal_values_share_a_class() {
        let mut reg = ClassRegistry::new("__");
        let a = reg.class_name("width", &CssValue::from("10px"));
        let b = reg.class_name("height", &CssValue::from("10px"));
        let c = reg.class_name("width", &CssValue::from("10px"));
        assert_eq!(a, "__w-1");
        assert_eq!(b, "__h-2");
        assert_eq!(a, c);
    }

    #[test]
    fn register_reports_new_and_changed_rules() {
        let mut reg = ClassRegistry::new("__");
        assert!(reg.register(".__w-1", "width", &CssValue::from("1px")));
        assert!(!reg.register(".__w-1", "width", &CssValue::from("1px")));
        assert!(reg.register("body.dark .__c-2", "color", &CssValue::from("#000")));
        assert!(reg.register("body.dark .__c-2", "color", &CssValue::from("#111")));
        assert_eq!(reg.len(), 2);
        assert_eq!(
            reg.rule("body.dark .__c-2").as_deref(),
            Some("body.dark .__c-2 { color: #111 !important; }")
        );
    }

    // -----------------------------------------------------------------------
    // Head
    // -----------------------------------------------------------------------

    #[test]
    fn head_markup() {
        let mut head = HeadState {
            title: Some("A & B".into()),
            ..HeadState::default()
        };
        head.set_meta(MetaKey::property("og:title"), Some("Hi".into()));
        head.set_meta(MetaKey::name("description"), Some("d".into()));
        head.set_meta(MetaKey::name("description"), None);
        head.css.insert("/a.css".into());
        assert_eq!(
            head.to_html(),
            "<title>A &amp; B</title>\n<meta property=\"og:title\" content=\"Hi\">\n<link rel=\"stylesheet\" href=\"/a.css\">"
        );
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    #[test]
    fn dark_mode_and_device_toggle_body_classes() {
        let doc = Rc::new(VirtualDocument::interactive());
        let s = session(Rc::clone(&doc));
        let body = doc.body();
        assert!(doc.class_list(body).is_empty());
        s.set_dark_mode(true).unwrap();
        s.set_device(Device::Mobile).unwrap();
        assert_eq!(doc.class_list(body), vec!["dark", "mobile"]);
        s.set_dark_mode(false).unwrap();
        assert_eq!(doc.class_list(body), vec!["mobile"]);
        assert_eq!(s.device(), Device::Mobile);
    }

    #[test]
    fn live_rules_are_appended_once() {
        let doc = Rc::new(VirtualDocument::interactive());
        let s = session(Rc::clone(&doc));
        s.register_rule(".__w-1", "width", &CssValue::from("1px"));
        s.register_rule(".__w-1", "width", &CssValue::from("1px"));
        {
            let _buffered = s.buffering();
            s.register_rule(".__h-2", "height", &CssValue::from("2px"));
        }
        assert!(!s.is_buffering());
        assert_eq!(doc.stylesheet(), ".__w-1 { width: 1px; }\n");
        assert_eq!(s.classes().len(), 2);
    }

    #[test]
    fn session_scopes_propagation_limit() {
        let before = trellis_reactive::propagation_limit();
        {
            let config = RenderConfig::default().with_propagation_limit(17);
            let _s = RenderSession::new(config, Rc::new(VirtualDocument::new())).unwrap();
            assert_eq!(trellis_reactive::propagation_limit(), 17);
        }
        assert_eq!(trellis_reactive::propagation_limit(), before);
    }

    #[test]
    fn device_for_width_uses_breakpoint() {
        let config = RenderConfig::default();
        assert_eq!(Device::for_width(&config, 400), Device::Mobile);
        assert_eq!(Device::for_width(&config, 1200), Device::Desktop);
    }
}
