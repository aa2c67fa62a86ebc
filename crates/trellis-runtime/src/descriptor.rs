#![forbid(unsafe_code)]

//! Element-descriptor trees and their interpreter.
//!
//! A descriptor is the JSON form of a builder call sequence:
//!
//! ```json
//! {
//!   "kind": 1,
//!   "properties": [{"kind": 5, "value": "100%"}],
//!   "events": [{"kind": 0, "action": {"toggle": "open"}}],
//!   "children": [{"kind": 5, "condition": {"$ref": "open"},
//!                 "properties": [{"kind": 2, "value": "Hello"}]}]
//! }
//! ```
//!
//! Property values are JSON literals with three escapes:
//!
//! - `{"$ref": "var.field"}`: the observable at that path in [`Globals`];
//!   the property follows it.
//! - `{"$variant": [tag, payload]}`: a tagged value.
//! - `{"$item": "field"}` / `{"$item": null}` / `{"$index": true}`: the
//!   current item, one of its fields, or its index inside a `for_each`.
//!
//! `condition` mounts the element through a conditional block (`{"$not": v}`
//! negates). `for_each` names a list; the element is rendered once per item.

use std::rc::Rc;

use serde::Deserialize;
use serde_json::Value as Json;
use trellis_core::{ElementKind, Error, EventKind, Result};
use trellis_dom::{Node, Parent, PropertyValue};
use trellis_reactive::{Dependency, ListItem, MutableList, RecordInstance, Value};

use crate::globals::Globals;
use crate::http::HttpRequest;

// ---------------------------------------------------------------------------
// Descriptor types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementDescriptor {
    /// Element kind code.
    pub kind: i32,
    /// Tag name for web components.
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub properties: Vec<PropertyDescriptor>,
    #[serde(default)]
    pub events: Vec<EventDescriptor>,
    #[serde(default)]
    pub children: Vec<ElementDescriptor>,
    #[serde(default)]
    pub condition: Option<Json>,
    /// Path of the list this element repeats over.
    #[serde(default)]
    pub for_each: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyDescriptor {
    /// Property kind code.
    pub kind: i32,
    pub value: Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventDescriptor {
    /// Event kind code.
    pub kind: i32,
    /// Keys for global key events.
    #[serde(default)]
    pub keys: Vec<String>,
    pub action: Action,
}

fn one() -> i64 {
    1
}

/// What an event handler does to the global state.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Set { path: String, value: Json },
    Toggle(String),
    Increment {
        path: String,
        #[serde(default = "one")]
        by: i64,
    },
    Append { list: String, value: Json },
    InsertAt { list: String, index: usize, value: Json },
    DeleteAt { list: String, index: usize },
    /// Delete the current `for_each` item from the named list.
    DeleteItem(String),
    Pop(String),
    ClearAll(String),
    ToggleDarkMode,
    EnableDarkMode,
    EnableLightMode,
    Http(HttpRequest),
    Batch(Vec<Action>),
}

/// Parse a tree: one element or an array of top-level elements.
pub fn parse_tree(json: Json) -> Result<Vec<ElementDescriptor>> {
    match json {
        Json::Array(_) => Ok(serde_json::from_value(json)?),
        other => Ok(vec![serde_json::from_value(other)?]),
    }
}

// ---------------------------------------------------------------------------
// Interpreter
// ---------------------------------------------------------------------------

/// Loop context for `$item` and `$index`.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    item: Option<ListItem>,
}

impl Scope {
    #[must_use]
    pub fn with_item(item: ListItem) -> Self {
        Self { item: Some(item) }
    }

    fn item(&self, escape: &str) -> Result<&ListItem> {
        self.item
            .as_ref()
            .ok_or_else(|| Error::descriptor(format!("{escape} used outside for_each")))
    }
}

/// A value read from a descriptor plus the observables it refers to.
struct Resolved {
    value: Value,
    deps: Vec<Dependency>,
}

impl Resolved {
    fn plain(value: Value) -> Self {
        Self {
            value,
            deps: Vec::new(),
        }
    }

    fn observed(value: Value) -> Self {
        let deps = vec![Dependency::wrap(value.clone())];
        Self { value, deps }
    }
}

/// Replays descriptor trees as builder calls against [`Globals`].
#[derive(Debug, Clone)]
pub struct Interpreter {
    globals: Rc<Globals>,
}

impl Interpreter {
    #[must_use]
    pub fn new(globals: Rc<Globals>) -> Self {
        Self { globals }
    }

    #[must_use]
    pub fn globals(&self) -> &Rc<Globals> {
        &self.globals
    }

    /// Mount every element of `tree` under `host`.
    pub fn mount_all(&self, host: &Node, tree: &[ElementDescriptor]) -> Result<()> {
        let scope = Scope::default();
        for desc in tree {
            self.mount(host, desc, &scope)?;
        }
        Ok(())
    }

    /// Mount `desc` as the last child of `host`, honouring `for_each` and
    /// `condition`.
    pub fn mount(&self, host: &Node, desc: &ElementDescriptor, scope: &Scope) -> Result<()> {
        if let Some(path) = &desc.for_each {
            let list = self.globals.list(path)?;
            let template = Rc::new(desc.clone());
            let this = self.clone();
            host.for_each(&list, move |parent, item| {
                this.build_item(parent, &template, &Scope::with_item(item.clone()))
            })?;
            return Ok(());
        }
        if desc.condition.is_some() {
            return self.mount_conditional(host, desc, scope);
        }
        self.build(&Parent::from(host), desc, scope)?;
        Ok(())
    }

    fn build_item(&self, parent: &Parent, desc: &ElementDescriptor, scope: &Scope) -> Result<Node> {
        if desc.condition.is_none() {
            return self.build(parent, desc, scope);
        }
        let wrapper = Node::create(parent, ElementKind::Wrapper)?;
        self.mount_conditional(&wrapper, desc, scope)?;
        Ok(wrapper)
    }

    fn mount_conditional(&self, host: &Node, desc: &ElementDescriptor, scope: &Scope) -> Result<()> {
        let Some(condition) = &desc.condition else {
            return Ok(());
        };
        let (negate, condition) = match condition.get("$not") {
            Some(inner) => (true, inner),
            None => (false, condition),
        };
        let Resolved { value, deps } = self.resolve(condition, scope)?;
        let template = Rc::new(ElementDescriptor {
            condition: None,
            ..desc.clone()
        });
        let this = self.clone();
        let scope = scope.clone();
        host.conditional(
            deps,
            move || {
                let holds = match value.resolve() {
                    Value::List(list) => !list.is_empty(),
                    other => other.is_truthy(),
                };
                Ok(holds != negate)
            },
            move |parent| this.build(parent, &template, &scope),
        )?;
        Ok(())
    }

    /// Create the element, apply its properties and events, then mount its
    /// children.
    pub fn build(&self, parent: &Parent, desc: &ElementDescriptor, scope: &Scope) -> Result<Node> {
        let kind = ElementKind::from_code(desc.kind, desc.tag.as_deref())?;
        tracing::trace!(?kind, "build element");
        let node = Node::create(parent, kind)?;

        for property in &desc.properties {
            let value = self.property_value(&property.value, scope)?;
            node.set_property_code(property.kind, value, &Value::Null)?;
        }

        for event in &desc.events {
            let kind = match EventKind::from_code(event.kind, event.keys.clone()) {
                Ok(kind) => kind,
                Err(err) => {
                    tracing::warn!(%err, "skipping event handler");
                    continue;
                }
            };
            let this = self.clone();
            let action = event.action.clone();
            let scope = scope.clone();
            node.add_event_handler(kind, Rc::new(move || this.run(&action, &scope)))?;
        }

        for child in &desc.children {
            self.mount(&node, child, scope)?;
        }
        Ok(node)
    }

    fn property_value(&self, json: &Json, scope: &Scope) -> Result<PropertyValue> {
        let Resolved { value, deps } = self.resolve(json, scope)?;
        if matches!(value, Value::Mutable(_) | Value::List(_) | Value::Record(_)) || deps.is_empty() {
            return Ok(PropertyValue::from(value));
        }
        Ok(PropertyValue::computed(deps, move || Ok(value.clone())))
    }

    fn resolve(&self, json: &Json, scope: &Scope) -> Result<Resolved> {
        match json {
            Json::Object(map) if map.len() == 1 => {
                if let Some(path) = map.get("$ref") {
                    let path = path
                        .as_str()
                        .ok_or_else(|| Error::descriptor("$ref takes a path string"))?;
                    return Ok(Resolved::observed(self.globals.lookup(path)?));
                }
                if let Some(field) = map.get("$item") {
                    let item = scope.item("$item")?;
                    return Ok(Resolved::observed(item_field(item, field)?));
                }
                if map.contains_key("$index") {
                    let item = scope.item("$index")?;
                    return Ok(Resolved::observed(Value::Mutable(item.index.clone())));
                }
                if let Some(variant) = map.get("$variant") {
                    return self.variant(variant, scope);
                }
                self.record(map, scope)
            }
            Json::Object(map) => self.record(map, scope),
            Json::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                let mut deps = Vec::new();
                for item in items {
                    let resolved = self.resolve(item, scope)?;
                    values.push(resolved.value);
                    deps.extend(resolved.deps);
                }
                Ok(Resolved {
                    value: Value::List(MutableList::new(values)),
                    deps,
                })
            }
            scalar => Ok(Resolved::plain(Value::from_json(scalar.clone()))),
        }
    }

    fn record(&self, map: &serde_json::Map<String, Json>, scope: &Scope) -> Result<Resolved> {
        let mut fields = Vec::with_capacity(map.len());
        let mut deps = Vec::new();
        for (key, value) in map {
            let resolved = self.resolve(value, scope)?;
            fields.push((key.clone(), resolved.value));
            deps.extend(resolved.deps);
        }
        Ok(Resolved {
            value: Value::Record(RecordInstance::new(fields)),
            deps,
        })
    }

    fn variant(&self, json: &Json, scope: &Scope) -> Result<Resolved> {
        let malformed = || Error::descriptor("$variant takes [tag, payload]");
        let Json::Array(parts) = json else {
            return Err(malformed());
        };
        let [tag, payload] = parts.as_slice() else {
            return Err(malformed());
        };
        let tag = tag
            .as_u64()
            .and_then(|t| u8::try_from(t).ok())
            .ok_or_else(malformed)?;
        let Resolved { value, deps } = self.resolve(payload, scope)?;
        Ok(Resolved {
            value: Value::variant(tag, value),
            deps,
        })
    }

    // -- actions -------------------------------------------------------------

    /// The current value of a descriptor literal, with references read once.
    fn snapshot(&self, json: &Json, scope: &Scope) -> Result<Value> {
        Ok(self.resolve(json, scope)?.value.resolve())
    }

    /// Run `action` against the global state.
    pub fn run(&self, action: &Action, scope: &Scope) -> Result<()> {
        let globals = &self.globals;
        tracing::debug!(?action, "run action");
        match action {
            Action::Set { path, value } => globals.set_value(path, self.snapshot(value, scope)?),
            Action::Toggle(path) => globals.toggle(path),
            Action::Increment { path, by } => globals.increment(path, *by),
            Action::Append { list, value } => globals.append(list, self.snapshot(value, scope)?),
            Action::InsertAt { list, index, value } => {
                globals.insert_at(list, *index, self.snapshot(value, scope)?)
            }
            Action::DeleteAt { list, index } => globals.delete_at(list, *index),
            Action::DeleteItem(list) => {
                let index = scope.item("delete_item")?.index.get();
                let index = index
                    .as_i64()
                    .and_then(|i| usize::try_from(i).ok())
                    .ok_or_else(|| Error::mismatch("index", index.type_name()))?;
                globals.delete_at(list, index)
            }
            Action::Pop(list) => globals.pop(list),
            Action::ClearAll(list) => globals.clear_all(list),
            Action::ToggleDarkMode => globals.toggle_dark_mode(),
            Action::EnableDarkMode => globals.enable_dark_mode(),
            Action::EnableLightMode => globals.enable_light_mode(),
            Action::Http(request) => {
                run_http(globals, request);
                Ok(())
            }
            Action::Batch(actions) => actions.iter().try_for_each(|a| self.run(a, scope)),
        }
    }
}

/// The item itself (`null`) or the cell of one of its fields.
fn item_field(item: &ListItem, field: &Json) -> Result<Value> {
    let base = item.item.to_value();
    match field {
        Json::Null => Ok(base),
        Json::String(path) => {
            let mut current = base;
            for name in path.split('.') {
                let record = current
                    .as_record()
                    .ok_or_else(|| Error::mismatch("record", current.resolve().type_name()))?;
                let cell = record.get(name).ok_or_else(|| Error::UnknownVariable {
                    path: format!("$item.{path}"),
                })?;
                current = Value::Mutable(cell);
            }
            Ok(current)
        }
        _ => Err(Error::descriptor("$item takes null or a field path")),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn run_http(globals: &Globals, request: &HttpRequest) {
    if let Some(navigation) = crate::http::http(globals, request) {
        tracing::info!(?navigation, "navigation requested");
    }
}

#[cfg(target_arch = "wasm32")]
fn run_http(_globals: &Globals, request: &HttpRequest) {
    tracing::warn!(url = %request.url, "http actions are not available in the browser build");
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use trellis_core::RenderConfig;
    use trellis_dom::{RenderSession, RenderTarget, VirtualDocument};

    use super::*;

    fn setup(state: Json) -> (Rc<VirtualDocument>, Rc<RenderSession>, Interpreter) {
        let doc = Rc::new(VirtualDocument::interactive());
        let session = RenderSession::new(RenderConfig::default().with_markdown(false), doc.clone()).unwrap();
        let globals = Rc::new(Globals::from_json(state).unwrap());
        globals.attach_session(&session);
        (doc, session, Interpreter::new(globals))
    }

    fn texts(doc: &VirtualDocument) -> Vec<String> {
        fn walk(doc: &VirtualDocument, id: trellis_dom::DomId, out: &mut Vec<String>) {
            for child in doc.children_of(id) {
                if doc.tag_name(child).is_some() && doc.children_of(child).is_empty() {
                    out.push(doc.inner_html(child));
                }
                walk(doc, child, out);
            }
        }
        let mut out = Vec::new();
        walk(doc, doc.body(), &mut out);
        out
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    #[test]
    fn parses_single_and_many() {
        let one = parse_tree(json!({"kind": 5})).unwrap();
        assert_eq!(one.len(), 1);
        let many = parse_tree(json!([{"kind": 5}, {"kind": 0, "children": [{"kind": 5}]}])).unwrap();
        assert_eq!(many[1].children.len(), 1);
        assert!(parse_tree(json!({"kind": 5, "colour": 1})).is_err());
        let action: Action = serde_json::from_value(json!("toggle_dark_mode")).unwrap();
        assert_eq!(action, Action::ToggleDarkMode);
        let action: Action = serde_json::from_value(json!({"increment": {"path": "n"}})).unwrap();
        assert_eq!(action, Action::Increment { path: "n".to_owned(), by: 1 });
    }

    // -----------------------------------------------------------------------
    // Building
    // -----------------------------------------------------------------------

    #[test]
    fn refs_bind_properties() {
        let (doc, session, interp) = setup(json!({"title": "Hi"}));
        let tree = parse_tree(json!({
            "kind": 5,
            "properties": [
                {"kind": 2, "value": {"$ref": "title"}},
                {"kind": 5, "value": "10px"},
            ],
        }))
        .unwrap();
        interp.mount_all(&session.root(), &tree).unwrap();
        assert_eq!(texts(&doc), vec!["Hi"]);
        interp.globals().set_value("title", Value::from("Bye")).unwrap();
        assert_eq!(texts(&doc), vec!["Bye"]);
    }

    #[test]
    fn unknown_property_code_is_fatal() {
        let (_doc, session, interp) = setup(json!({}));
        let tree = parse_tree(json!({"kind": 5, "properties": [{"kind": 999, "value": 1}]})).unwrap();
        let err = interp.mount_all(&session.root(), &tree).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn unknown_event_code_is_skipped() {
        let (doc, session, interp) = setup(json!({}));
        let tree = parse_tree(json!({
            "kind": 5,
            "events": [{"kind": 42, "action": "toggle_dark_mode"}],
        }))
        .unwrap();
        interp.mount_all(&session.root(), &tree).unwrap();
        assert_eq!(doc.children_of(doc.body()).len(), 1);
    }

    #[test]
    fn condition_follows_reference() {
        let (doc, session, interp) = setup(json!({"open": false}));
        let tree = parse_tree(json!([
            {"kind": 5, "condition": {"$ref": "open"},
             "properties": [{"kind": 2, "value": "shown"}]},
            {"kind": 5, "condition": {"$not": {"$ref": "open"}},
             "properties": [{"kind": 2, "value": "hidden"}]},
        ]))
        .unwrap();
        interp.mount_all(&session.root(), &tree).unwrap();
        assert_eq!(texts(&doc), vec!["hidden"]);
        interp.globals().toggle("open").unwrap();
        assert_eq!(texts(&doc), vec!["shown"]);
    }

    #[test]
    fn for_each_renders_items_and_fields() {
        let (doc, session, interp) = setup(json!({
            "todos": [{"title": "a"}, {"title": "b"}],
        }));
        let tree = parse_tree(json!({
            "kind": 5,
            "for_each": "todos",
            "properties": [{"kind": 2, "value": {"$item": "title"}}],
            "events": [{"kind": 0, "action": {"delete_item": "todos"}}],
        }))
        .unwrap();
        interp.mount_all(&session.root(), &tree).unwrap();
        assert_eq!(texts(&doc), vec!["a", "b"]);

        interp
            .globals()
            .append("todos", Value::from_json(json!({"title": "c"})))
            .unwrap();
        assert_eq!(texts(&doc), vec!["a", "b", "c"]);

        let first = doc
            .children_of(doc.body())
            .into_iter()
            .find(|id| doc.tag_name(*id).is_some())
            .unwrap();
        doc.dispatch_event(first, &EventKind::Click).unwrap();
        assert_eq!(texts(&doc), vec!["b", "c"]);
    }

    #[test]
    fn variants_and_records_reach_composites() {
        let (doc, session, interp) = setup(json!({"dark": "#eee"}));
        let tree = parse_tree(json!({
            "kind": 5,
            "properties": [
                {"kind": 0, "value": {"light": "#111", "dark": {"$ref": "dark"}}},
                {"kind": 35, "value": {"$variant": [4, "8px"]}},
            ],
        }))
        .unwrap();
        interp.mount_all(&session.root(), &tree).unwrap();
        assert!(doc.stylesheet().contains("color: #eee;"));
        interp.globals().set_value("dark", Value::from("#ddd")).unwrap();
        assert!(doc.stylesheet().contains("color: #ddd;"));
        let text = doc.children_of(doc.body())[0];
        assert_eq!(doc.style(text, "gap").as_deref(), Some("8px"));
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    #[test]
    fn actions_update_globals() {
        let (_doc, session, interp) = setup(json!({"n": 1, "items": [], "label": ""}));
        let scope = Scope::default();
        let batch: Action = serde_json::from_value(json!({"batch": [
            {"increment": {"path": "n", "by": 2}},
            {"append": {"list": "items", "value": {"$ref": "n"}}},
            {"set": {"path": "label", "value": "done"}},
            "toggle_dark_mode",
        ]}))
        .unwrap();
        interp.run(&batch, &scope).unwrap();
        let globals = interp.globals();
        assert_eq!(globals.get_value("n"), Some(Value::from(3)));
        assert_eq!(globals.list("items").unwrap().to_values(), vec![Value::from(3)]);
        assert_eq!(globals.get_value("label"), Some(Value::from("done")));
        assert!(session.is_dark_mode());
        assert!(interp.run(&Action::DeleteItem("items".to_owned()), &scope).is_err());
    }
}
