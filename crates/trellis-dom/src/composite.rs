#![forbid(unsafe_code)]

//! Style properties built from several record fields.
//!
//! A colour, shadow or gradient arrives as a record whose fields are
//! observables of their own. [`compose`] applies the value once and then
//! re-applies it whenever any field (at any depth) is written, so editing
//! `color.dark` alone restyles every node that uses it.
//!
//! Themed values become a light class plus a `body.dark .cls` override;
//! typography becomes a `body.mobile .cls` override. Switching theme or
//! device then only toggles a body class.

use trellis_core::css::{CssValue, class_prefix};
use trellis_core::{ElementKind, PropertyKind, Result};
use trellis_reactive::{Closure, Dependency, Value};

use crate::node::{Node, Slot};
use crate::style::{attach_css, attach_rule, attach_text, attach_themed};
use crate::target::{RenderMode, descendants_with_tag};

const MAX_FIELD_DEPTH: usize = 8;

const FILTERS: [&str; 8] = [
    "blur",
    "brightness",
    "contrast",
    "grayscale",
    "invert",
    "opacity",
    "sepia",
    "saturate",
];

const MASK_PREFIXES: [&str; 2] = ["", "-webkit"];

// ---------------------------------------------------------------------------
// Binding
// ---------------------------------------------------------------------------

/// Apply `value` through `apply` and keep it applied while any observable
/// inside `value`, or any of `extra`, changes.
pub(crate) fn compose(
    node: &Node,
    kind: PropertyKind,
    value: &Value,
    extra: Vec<Dependency>,
    apply: impl Fn(&Node, &Value) -> Result<()> + 'static,
) -> Result<()> {
    let slot = Slot::Composite(kind);
    if value.is_null() {
        node.clear_slot(slot);
        return apply(node, &Value::Null);
    }

    let mut deps = field_deps(value);
    deps.extend(extra);
    if deps.is_empty() {
        node.clear_slot(slot);
        return apply(node, value);
    }

    let weak = node.downgrade();
    let source = value.clone();
    let closure = Closure::new(move || {
        if let Some(node) = weak.upgrade() {
            apply(&node, &source)?;
        }
        Ok(Value::Null)
    })?
    .attached_to(node.bound_target(), node.id());
    let subscriptions = deps.iter().map(|d| d.subscribe(closure.clone())).collect();
    tracing::trace!(node = node.id().0, ?kind, deps = deps.len(), "composite bound");
    node.replace_slot(slot, subscriptions, deps);
    Ok(())
}

/// Every observable reachable from `value`: nested mutables, record fields,
/// lists and their items.
pub(crate) fn field_deps(value: &Value) -> Vec<Dependency> {
    let mut deps = Vec::new();
    collect(value, &mut deps, 0);
    deps
}

fn collect(value: &Value, deps: &mut Vec<Dependency>, depth: usize) {
    if depth > MAX_FIELD_DEPTH {
        return;
    }
    match value {
        Value::Mutable(m) => {
            deps.push(Dependency::from(m.clone()));
            collect(&m.get(), deps, depth + 1);
        }
        Value::Record(record) => {
            for (_, field) in record.fields() {
                deps.push(Dependency::from(field.clone()));
                collect(&field.get(), deps, depth + 1);
            }
        }
        Value::List(list) => {
            deps.push(Dependency::from(list.clone()));
            for item in list.items() {
                collect(&item.item.get_value(), deps, depth + 1);
            }
        }
        Value::Variant { payload, .. } => collect(payload, deps, depth + 1),
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn text(value: &Value, field: &str) -> Option<String> {
    value.field(field).filter(|v| !v.is_null()).map(|v| v.to_text())
}

/// `(light, dark)` of a themed value. A plain value is its own dark value.
fn themed(value: &Value) -> (Option<String>, Option<String>) {
    if value.as_record().is_some() {
        (text(value, "light"), text(value, "dark"))
    } else if value.is_null() {
        (None, None)
    } else {
        let t = value.to_text();
        (Some(t.clone()), Some(t))
    }
}

fn prefixed(prefix: &str, property: &str) -> String {
    if prefix.is_empty() {
        property.to_owned()
    } else {
        format!("{prefix}-{property}")
    }
}

/// `x`, `0px y` or `x y` from a `{x, y}` record; strings pass through.
fn axis_pair(value: &Value) -> Option<String> {
    if value.as_record().is_none() {
        return (!value.is_null()).then(|| value.to_text());
    }
    match (text(value, "x"), text(value, "y")) {
        (Some(x), None) => Some(x),
        (None, Some(y)) => Some(format!("0px {y}")),
        (Some(x), Some(y)) => Some(format!("{x} {y}")),
        (None, None) => None,
    }
}

// ---------------------------------------------------------------------------
// Colour
// ---------------------------------------------------------------------------

/// A `{light, dark}` colour on `property`. With `visited`, links keep the
/// colour after they are followed.
pub(crate) fn color(node: &Node, property: &str, value: &Value, visited: bool) -> Result<()> {
    let (light, dark) = themed(value);
    if light.is_none() && dark.is_none() {
        attach_text(node, property, None);
        return Ok(());
    }
    if light == dark {
        attach_text(node, property, light);
        return Ok(());
    }
    let (light, dark) = (light.unwrap_or_default(), dark.unwrap_or_default());
    if let Some(class) = attach_themed(node, property, light.clone(), dark.clone())
        && visited
    {
        attach_rule(node, &format!(".{class}:visited"), property, light.into());
        attach_rule(node, &format!("body.dark .{class}:visited"), property, dark.into());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Role (responsive typography)
// ---------------------------------------------------------------------------

const ROLE_FIELDS: [&str; 5] = ["font_family", "letter_spacing", "line_height", "size", "weight"];

fn same_role(desktop: &Value, mobile: &Value) -> bool {
    ROLE_FIELDS
        .iter()
        .all(|f| desktop.field(f).unwrap_or_default() == mobile.field(f).unwrap_or_default())
}

fn role_declarations(role: &Value) -> CssValue {
    let family = role.field("font_family").and_then(|f| match f.as_list() {
        Some(list) => {
            let names: Vec<String> = list.to_values().iter().map(Value::to_text).collect();
            (!names.is_empty()).then(|| names.join(", "))
        }
        None => (!f.is_null()).then(|| f.to_text()),
    });
    let mut decls = Vec::new();
    let mut push = |property: &str, value: Option<String>| {
        if let Some(value) = value {
            decls.push((property.to_owned(), value));
        }
    };
    push("font-family", family);
    push("letter-spacing", text(role, "letter_spacing"));
    push("font-size", text(role, "size"));
    push("font-weight", text(role, "weight"));
    push("line-height", text(role, "line_height"));
    CssValue::Declarations(decls)
}

/// A `{desktop, mobile}` typography record.
pub(crate) fn role(node: &Node, value: &Value) -> Result<()> {
    if value.is_null() {
        attach_css(node, "role", None, true);
        return Ok(());
    }
    let desktop = value.field("desktop").unwrap_or_default();
    let mobile = value.field("mobile").unwrap_or_default();
    let Some(class) = attach_css(node, "role", Some(role_declarations(&desktop)), true) else {
        return Ok(());
    };
    if !mobile.is_null() && !same_role(&desktop, &mobile) {
        attach_rule(node, &format!("body.mobile .{class}"), "role", role_declarations(&mobile));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Shadows
// ---------------------------------------------------------------------------

fn shadow_parts(value: &Value, fields: &[&str]) -> String {
    fields
        .iter()
        .map(|f| text(value, f).unwrap_or_else(|| "0px".to_owned()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `box-shadow` from `{x_offset, y_offset, blur, spread, inset, color}`.
pub(crate) fn shadow(node: &Node, value: &Value) -> Result<()> {
    if value.is_null() {
        attach_text(node, "box-shadow", None);
        return Ok(());
    }
    let inset = if value.field("inset").is_some_and(|v| v.is_truthy()) {
        "inset "
    } else {
        ""
    };
    let geometry = shadow_parts(value, &["x_offset", "y_offset", "blur", "spread"]);
    let (light, dark) = themed(&value.field("color").unwrap_or_default());
    let (light, dark) = (light.unwrap_or_default(), dark.unwrap_or_default());
    attach_themed(
        node,
        "box-shadow",
        format!("{inset}{geometry} {light}").trim_end().to_owned(),
        format!("{inset}{geometry} {dark}").trim_end().to_owned(),
    );
    Ok(())
}

/// `text-shadow` from `{x_offset, y_offset, blur, color}`.
pub(crate) fn text_shadow(node: &Node, value: &Value) -> Result<()> {
    if value.is_null() {
        attach_text(node, "text-shadow", None);
        return Ok(());
    }
    let geometry = shadow_parts(value, &["x_offset", "y_offset", "blur"]);
    let (light, dark) = themed(&value.field("color").unwrap_or_default());
    let (light, dark) = (light.unwrap_or_default(), dark.unwrap_or_default());
    attach_themed(
        node,
        "text-shadow",
        format!("{geometry} {light}").trim_end().to_owned(),
        format!("{geometry} {dark}").trim_end().to_owned(),
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Backgrounds
// ---------------------------------------------------------------------------

/// Colour stops of a gradient record, `(light, dark)`.
fn gradient_stops(value: &Value) -> (String, String) {
    let colors = value
        .field("colors")
        .and_then(|c| c.as_list())
        .map(|l| l.to_values())
        .unwrap_or_default();
    let mut light = String::new();
    let mut dark = String::new();
    for stop in &colors {
        let (l, d) = themed(&stop.field("color").unwrap_or_default());
        let mut tail = String::new();
        if let Some(start) = text(stop, "start") {
            tail.push(' ');
            tail.push_str(&start);
        }
        if let Some(end) = text(stop, "end") {
            tail.push(' ');
            tail.push_str(&end);
        }
        if let Some(position) = text(stop, "stop_position") {
            tail.push_str(", ");
            tail.push_str(&position);
        }
        for (out, color) in [(&mut light, l), (&mut dark, d)] {
            out.push(' ');
            out.push_str(&color.unwrap_or_default());
            out.push_str(&tail);
            out.push(',');
        }
    }
    let finish = |s: String| {
        let trimmed = s.trim();
        trimmed.strip_suffix(',').unwrap_or(trimmed).to_owned()
    };
    (finish(light), finish(dark))
}

/// `(light, dark)` `linear-gradient(...)` strings.
fn gradient(value: &Value) -> (String, String) {
    let direction = text(value, "direction").unwrap_or_else(|| "to bottom".to_owned());
    let (light, dark) = gradient_stops(value);
    (
        format!("linear-gradient({direction}, {light})"),
        format!("linear-gradient({direction}, {dark})"),
    )
}

pub(crate) fn linear_gradient(node: &Node, value: &Value) -> Result<()> {
    if value.is_null() {
        attach_text(node, "background-image", None);
        return Ok(());
    }
    let (light, dark) = gradient(value);
    attach_themed(node, "background-image", light, dark);
    Ok(())
}

/// `{src, position, repeat, size}`.
pub(crate) fn background_image(node: &Node, value: &Value) -> Result<()> {
    if value.is_null() {
        for property in [
            "background-repeat",
            "background-position",
            "background-size",
            "background-image",
        ] {
            attach_text(node, property, None);
        }
        return Ok(());
    }
    if let Some(repeat) = text(value, "repeat") {
        attach_text(node, "background-repeat", Some(repeat));
    }
    if let Some(position) = value.field("position").and_then(|p| axis_pair(&p)) {
        attach_text(node, "background-position", Some(position));
    }
    if let Some(size) = value.field("size").and_then(|s| axis_pair(&s)) {
        attach_text(node, "background-size", Some(size));
    }
    let (light, dark) = themed(&value.field("src").unwrap_or_default());
    attach_themed(
        node,
        "background-image",
        format!("url({})", light.unwrap_or_default()),
        format!("url({})", dark.unwrap_or_default()),
    );
    Ok(())
}

/// Variant `1 → solid`, `2 → image`, `3 → linear gradient`.
pub(crate) fn background(node: &Node, value: &Value) -> Result<()> {
    match value.as_variant() {
        None => {
            color(node, "background-color", &Value::Null, false)?;
            background_image(node, &Value::Null)?;
            Ok(())
        }
        Some((1, payload)) => color(node, "background-color", &payload, false),
        Some((2, payload)) => background_image(node, &payload),
        Some((3, payload)) => linear_gradient(node, &payload),
        Some((tag, _)) => {
            tracing::warn!(tag, "unknown background variant");
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Filters and masks
// ---------------------------------------------------------------------------

/// Variant `1..=8` sets one filter, `9` a record of several.
pub(crate) fn backdrop_filter(node: &Node, value: &Value) -> Result<()> {
    let css = match value.as_variant() {
        None => None,
        Some((tag @ 1..=8, payload)) => {
            Some(format!("{}({})", FILTERS[usize::from(tag) - 1], payload.to_text()))
        }
        Some((9, record)) => {
            let parts: Vec<String> = FILTERS
                .iter()
                .filter_map(|f| text(&record, f).map(|v| format!("{f}({v})")))
                .collect();
            (!parts.is_empty()).then(|| parts.join(" "))
        }
        Some((tag, _)) => {
            tracing::warn!(tag, "unknown backdrop filter variant");
            None
        }
    };
    attach_text(node, "backdrop-filter", css);
    Ok(())
}

fn mask_image(node: &Node, value: &Value, prefix: &str) {
    let property = prefixed(prefix, "mask-image");
    if value.is_null() {
        attach_text(node, &property, None);
        return;
    }
    let (src_light, src_dark) = themed(&value.field("src").unwrap_or_default());
    let tint = value.field("color").filter(|c| !c.is_null());
    let gradient_value = value.field("linear_gradient").filter(|g| !g.is_null());

    let source = |src: Option<String>, tint: Option<String>| {
        src.map(|src| match (&gradient_value, tint) {
            (Some(_), Some(color)) => format!("image(url({src}), {color})"),
            _ => format!("url({src})"),
        })
    };
    let (tint_light, tint_dark) = tint.as_ref().map(themed).unwrap_or_default();
    let mut light: Vec<String> = source(src_light, tint_light).into_iter().collect();
    let mut dark: Vec<String> = source(src_dark, tint_dark).into_iter().collect();
    if let Some(g) = &gradient_value {
        let (l, d) = gradient(g);
        light.push(l);
        dark.push(d);
    }
    let (light, dark) = (light.join(", "), dark.join(", "));
    if light == dark {
        attach_css(node, &property, Some(light.into()), true);
    } else {
        attach_themed(node, &property, light, dark);
    }
}

fn mask_multi(node: &Node, value: &Value, prefix: &str) {
    mask_image(node, &value.field("image").unwrap_or_default(), prefix);

    let size = text(value, "size").or_else(|| {
        let x = text(value, "size_x");
        let y = text(value, "size_y");
        (x.is_some() || y.is_some()).then(|| {
            format!(
                "{} {}",
                x.unwrap_or_else(|| "auto".to_owned()),
                y.unwrap_or_else(|| "auto".to_owned())
            )
        })
    });
    for (property, css) in [
        ("mask-size", size),
        ("mask-repeat", text(value, "repeat")),
        ("mask-position", text(value, "position")),
    ] {
        attach_css(node, &prefixed(prefix, property), css.map(CssValue::from), true);
    }
}

/// Variant `1 → image`, `2 → multi`, written with and without `-webkit`.
pub(crate) fn mask(node: &Node, value: &Value) -> Result<()> {
    for prefix in MASK_PREFIXES {
        match value.as_variant() {
            None => {
                for property in ["mask-repeat", "mask-position", "mask-size", "mask-image"] {
                    attach_text(node, &prefixed(prefix, property), None);
                }
            }
            Some((1, payload)) => mask_image(node, &payload, prefix),
            Some((2, payload)) => mask_multi(node, &payload, prefix),
            Some((tag, _)) => tracing::warn!(tag, "unknown mask variant"),
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Text and layout
// ---------------------------------------------------------------------------

/// A list of `italic`, `underline`, `line-through` or font weights.
pub(crate) fn text_styles(node: &Node, value: &Value) -> Result<()> {
    for property in ["font-style", "font-weight", "text-decoration"] {
        attach_text(node, property, None);
    }
    let styles = match value.as_list() {
        Some(list) => list.to_values(),
        None if value.is_null() => Vec::new(),
        None => vec![value.resolve()],
    };
    for style in styles {
        let style = style.to_text();
        let property = match style.as_str() {
            "italic" => "font-style",
            "underline" | "line-through" => "text-decoration",
            _ => "font-weight",
        };
        attach_text(node, property, Some(style));
    }
    Ok(())
}

/// `(justify-content, align-items)` for one of the nine positions.
fn alignment(kind: &ElementKind, position: &str) -> Option<(&'static str, &'static str)> {
    let (vertical, horizontal) = match position {
        "top-left" => ("start", "start"),
        "top-center" => ("start", "center"),
        "top-right" => ("start", "end"),
        "left" => ("center", "start"),
        "center" => ("center", "center"),
        "right" => ("center", "end"),
        "bottom-left" => ("end", "start"),
        "bottom-center" => ("end", "center"),
        "bottom-right" => ("end", "end"),
        _ => return None,
    };
    match kind {
        ElementKind::Column => Some((vertical, horizontal)),
        ElementKind::Row => Some((horizontal, vertical)),
        _ => None,
    }
}

pub(crate) fn align_content(node: &Node, value: &Value) -> Result<()> {
    if value.is_null() {
        attach_text(node, "justify-content", None);
        attach_text(node, "align-items", None);
        return Ok(());
    }
    let position = value.to_text();
    match alignment(node.kind(), &position) {
        Some((justify, align)) => {
            attach_text(node, "justify-content", Some(justify.to_owned()));
            attach_text(node, "align-items", Some(align.to_owned()));
        }
        None => tracing::warn!(%position, kind = ?node.kind(), "alignment ignored"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Theme-dependent sources
// ---------------------------------------------------------------------------

/// Write the light or dark `src` into `attribute`, following the session's
/// colour scheme.
pub(crate) fn themed_source(node: &Node, attribute: &str, value: &Value) -> Result<()> {
    let dom = node.dom();
    let (light, dark) = themed(value);
    let chosen = if node.session().is_dark_mode() {
        dark.or(light)
    } else {
        light
    };
    match chosen {
        Some(src) => node.target().set_attribute(dom, attribute, Some(&src)),
        None => node.target().remove_attribute(dom, attribute),
    }
    Ok(())
}

/// Colour of the anchors inside (or at) the node. Interactive pages only.
pub(crate) fn link_color(node: &Node, value: &Value) -> Result<()> {
    let session = node.session();
    if session.mode() != RenderMode::Interactive {
        return Ok(());
    }
    let target = node.target();
    let dom = node.dom();
    let anchors = if target.tag_name(dom).as_deref() == Some("a") {
        vec![dom]
    } else {
        descendants_with_tag(target.as_ref(), dom, "a")
    };
    let prefix = class_prefix(&session.class_prefix(), "link-color");
    for &anchor in &anchors {
        for class in target.class_list(anchor) {
            if class.starts_with(&prefix) {
                target.remove_class(anchor, &class);
            }
        }
    }

    let (light, dark) = themed(value);
    let Some(light) = light else {
        return Ok(());
    };
    let css = CssValue::from(light.clone());
    let class = session.class_name("link-color", &css);
    session.register_rule(&format!(".{class}"), "color", &css);
    if let Some(dark) = dark.filter(|d| *d != light) {
        session.register_rule(&format!("body.dark .{class}"), "color", &CssValue::from(dark));
    }
    for anchor in anchors {
        target.add_class(anchor, &class);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use trellis_core::RenderConfig;
    use trellis_reactive::{Mutable, MutableList, RecordInstance};

    use super::*;
    use crate::session::RenderSession;
    use crate::target::RenderTarget;
    use crate::virtual_dom::VirtualDocument;

    fn setup(doc: &Rc<VirtualDocument>) -> (Rc<RenderSession>, Node) {
        let session = RenderSession::new(RenderConfig::default(), doc.clone()).unwrap();
        let node = session.root().child(ElementKind::Column).unwrap();
        (session, node)
    }

    fn themed_record(light: &str, dark: &str) -> Value {
        Value::Record(RecordInstance::new([
            ("light", Value::from(light)),
            ("dark", Value::from(dark)),
        ]))
    }

    // -----------------------------------------------------------------------
    // Colour
    // -----------------------------------------------------------------------

    #[test]
    fn equal_colours_share_one_class() {
        let doc = Rc::new(VirtualDocument::new());
        let (session, node) = setup(&doc);
        color(&node, "color", &themed_record("red", "red"), true).unwrap();
        assert_eq!(session.classes().rules(), vec![".__c-1 { color: red !important; }"]);
    }

    #[test]
    fn visited_rules_follow_theme() {
        let doc = Rc::new(VirtualDocument::new());
        let (session, node) = setup(&doc);
        color(&node, "color", &themed_record("red", "blue"), true).unwrap();
        let rules = session.classes().rules();
        assert_eq!(rules.len(), 4);
        assert_eq!(rules[2], ".__c-1:visited { color: red !important; }");
        assert_eq!(rules[3], "body.dark .__c-1:visited { color: blue !important; }");
    }

    #[test]
    fn editing_dark_field_updates_override() {
        let doc = Rc::new(VirtualDocument::new());
        let (session, node) = setup(&doc);
        let record = RecordInstance::new([
            ("light", Value::from("red")),
            ("dark", Value::from("blue")),
        ]);
        compose(
            &node,
            PropertyKind::Color,
            &Value::Record(record.clone()),
            Vec::new(),
            |n, v| color(n, "color", v, false),
        )
        .unwrap();
        record.set("dark", Value::from("green")).unwrap();
        assert_eq!(
            session.classes().rule("body.dark .__c-1").as_deref(),
            Some("body.dark .__c-1 { color: green !important; }")
        );
    }

    #[test]
    fn destroyed_node_stops_listening() {
        let doc = Rc::new(VirtualDocument::new());
        let (_s, node) = setup(&doc);
        let dark = Mutable::new(Value::from("blue"));
        let record = RecordInstance::new([
            ("light", Value::from("red")),
            ("dark", Value::Mutable(dark.clone())),
        ]);
        compose(
            &node,
            PropertyKind::Color,
            &Value::Record(record),
            Vec::new(),
            |n, v| color(n, "color", v, false),
        )
        .unwrap();
        assert_eq!(dark.dependent_count(), 1);
        node.destroy();
        assert_eq!(dark.dependent_count(), 0);
    }

    // -----------------------------------------------------------------------
    // Composite strings
    // -----------------------------------------------------------------------

    #[test]
    fn shadow_string() {
        let doc = Rc::new(VirtualDocument::new());
        let (session, node) = setup(&doc);
        let value = Value::Record(RecordInstance::new([
            ("x_offset", Value::from("1px")),
            ("y_offset", Value::from("2px")),
            ("blur", Value::from("3px")),
            ("spread", Value::from("4px")),
            ("inset", Value::from(true)),
            ("color", themed_record("#000", "#000")),
        ]));
        shadow(&node, &value).unwrap();
        assert_eq!(
            session.classes().rules(),
            vec![".__bxs-1 { box-shadow: inset 1px 2px 3px 4px #000; }"]
        );
    }

    #[test]
    fn gradient_string() {
        let stop = |c: &str, start: &str| {
            Value::Record(RecordInstance::new([
                ("color", themed_record(c, c)),
                ("start", Value::from(start)),
            ]))
        };
        let value = Value::Record(RecordInstance::new([
            ("direction", Value::from("to right")),
            (
                "colors",
                Value::List(MutableList::new([stop("red", "0%"), stop("blue", "100%")])),
            ),
        ]));
        let (light, dark) = gradient(&value);
        assert_eq!(light, "linear-gradient(to right, red 0%, blue 100%)");
        assert_eq!(light, dark);
    }

    #[test]
    fn background_position_axes() {
        let xy = |x: Option<&str>, y: Option<&str>| {
            let mut fields = Vec::new();
            if let Some(x) = x {
                fields.push(("x", Value::from(x)));
            }
            if let Some(y) = y {
                fields.push(("y", Value::from(y)));
            }
            Value::Record(RecordInstance::new(fields))
        };
        assert_eq!(axis_pair(&xy(Some("1px"), None)).as_deref(), Some("1px"));
        assert_eq!(axis_pair(&xy(None, Some("2px"))).as_deref(), Some("0px 2px"));
        assert_eq!(axis_pair(&xy(Some("1px"), Some("2px"))).as_deref(), Some("1px 2px"));
        assert_eq!(axis_pair(&Value::from("center")).as_deref(), Some("center"));
    }

    #[test]
    fn backdrop_filters() {
        let doc = Rc::new(VirtualDocument::new());
        let (session, node) = setup(&doc);
        backdrop_filter(&node, &Value::variant(4, "50%")).unwrap();
        let multi = Value::Record(RecordInstance::new([
            ("blur", Value::from("2px")),
            ("sepia", Value::from("10%")),
        ]));
        backdrop_filter(&node, &Value::variant(9, multi)).unwrap();
        let rules = session.classes().rules();
        assert_eq!(rules[0], ".__bdf-1 { backdrop-filter: grayscale(50%); }");
        assert_eq!(rules[1], ".__bdf-2 { backdrop-filter: blur(2px) sepia(10%); }");
        assert_eq!(doc.class_list(node.dom()), vec!["ft_column", "__bdf-2"]);
    }

    #[test]
    fn mask_writes_both_prefixes() {
        let doc = Rc::new(VirtualDocument::new());
        let (_s, node) = setup(&doc);
        let image = Value::Record(RecordInstance::new([("src", themed_record("m.svg", "m.svg"))]));
        mask(&node, &Value::variant(1, image)).unwrap();
        let classes = doc.class_list(node.dom());
        assert!(classes.iter().any(|c| c.starts_with("__mi-")));
        assert!(classes.iter().any(|c| c.starts_with("__wmi-")));
        mask(&node, &Value::Null).unwrap();
        assert_eq!(doc.class_list(node.dom()), vec!["ft_column"]);
    }

    // -----------------------------------------------------------------------
    // Typography and layout
    // -----------------------------------------------------------------------

    #[test]
    fn role_adds_mobile_override() {
        let doc = Rc::new(VirtualDocument::new());
        let (session, node) = setup(&doc);
        let typography = |size: &str| {
            Value::Record(RecordInstance::new([
                ("font_family", Value::List(MutableList::new([Value::from("Inter"), Value::from("sans-serif")]))),
                ("size", Value::from(size)),
                ("weight", Value::from(400)),
            ]))
        };
        let value = Value::Record(RecordInstance::new([
            ("desktop", typography("20px")),
            ("mobile", typography("16px")),
        ]));
        role(&node, &value).unwrap();
        let rules = session.classes().rules();
        assert_eq!(rules.len(), 2);
        assert!(rules[0].starts_with(".__rl-1 { font-family: Inter, sans-serif; font-size: 20px;"));
        assert!(rules[1].starts_with("body.mobile .__rl-1 {"));
        assert!(rules[1].contains("font-size: 16px;"));
    }

    #[test]
    fn alignment_differs_by_axis() {
        assert_eq!(alignment(&ElementKind::Column, "top-right"), Some(("start", "end")));
        assert_eq!(alignment(&ElementKind::Row, "top-right"), Some(("end", "start")));
        assert_eq!(alignment(&ElementKind::Text, "center"), None);
        assert_eq!(alignment(&ElementKind::Row, "middle"), None);
    }

    #[test]
    fn text_styles_split_by_property() {
        let doc = Rc::new(VirtualDocument::new());
        let (_s, node) = setup(&doc);
        let styles = Value::List(MutableList::new([Value::from("italic"), Value::from("bold")]));
        text_styles(&node, &styles).unwrap();
        let classes = doc.class_list(node.dom());
        assert!(classes.iter().any(|c| c.starts_with("__fst-")));
        assert!(classes.iter().any(|c| c.starts_with("__fwt-")));
    }

    // -----------------------------------------------------------------------
    // Theme-dependent sources
    // -----------------------------------------------------------------------

    #[test]
    fn image_source_follows_dark_mode() {
        let doc = Rc::new(VirtualDocument::new());
        let (session, root) = setup(&doc);
        let image = root.child(ElementKind::Image).unwrap();
        compose(
            &image,
            PropertyKind::ImageSrc,
            &themed_record("day.png", "night.png"),
            vec![Dependency::from(session.dark_mode().clone())],
            |n, v| themed_source(n, "src", v),
        )
        .unwrap();
        assert_eq!(doc.attribute(image.dom(), "src"), Some(Some("day.png".to_owned())));
        session.set_dark_mode(true).unwrap();
        assert_eq!(doc.attribute(image.dom(), "src"), Some(Some("night.png".to_owned())));
    }

    #[test]
    fn link_colour_targets_anchors() {
        let doc = Rc::new(VirtualDocument::interactive());
        let (session, node) = setup(&doc);
        let anchor = doc.create_element("a");
        doc.append_child(node.dom(), anchor);
        link_color(&node, &themed_record("red", "blue")).unwrap();
        assert_eq!(doc.class_list(anchor), vec!["__lkc-1"]);
        assert!(session.has_rule("body.dark .__lkc-1"));
        link_color(&node, &Value::Null).unwrap();
        assert!(doc.class_list(anchor).is_empty());
    }
}
