#![forbid(unsafe_code)]

//! The property dispatch table.
//!
//! [`apply`] maps one `(PropertyKind, Value)` pair to a concrete mutation:
//! a generated style class, an attribute, a tag change, content, head
//! state or mounted children. Composite values go through
//! [`composite::compose`] so their fields stay bound.

use trellis_core::text::{find_and_remove_highlighter, slugify};
use trellis_core::{ElementKind, Error, PropertyKind, Result};
use trellis_reactive::{Dependency, Value};

use crate::composite::{self, compose};
use crate::markdown;
use crate::node::Node;
use crate::session::MetaKey;
use crate::style::attach_text;
use crate::target::RenderMode;

/// Plain properties: each CSS property gets the value as text.
fn css_properties(kind: PropertyKind) -> Option<&'static [&'static str]> {
    use PropertyKind as P;
    let properties: &'static [&'static str] = match kind {
        P::Width => &["width"],
        P::Height => &["height"],
        P::Padding => &["padding"],
        P::PaddingHorizontal => &["padding-left", "padding-right"],
        P::PaddingVertical => &["padding-top", "padding-bottom"],
        P::PaddingLeft => &["padding-left"],
        P::PaddingRight => &["padding-right"],
        P::PaddingTop => &["padding-top"],
        P::PaddingBottom => &["padding-bottom"],
        P::Margin => &["margin"],
        P::MarginHorizontal => &["margin-left", "margin-right"],
        P::MarginVertical => &["margin-top", "margin-bottom"],
        P::MarginLeft => &["margin-left"],
        P::MarginRight => &["margin-right"],
        P::MarginTop => &["margin-top"],
        P::MarginBottom => &["margin-bottom"],
        P::BorderWidth => &["border-width"],
        P::BorderTopWidth => &["border-top-width"],
        P::BorderBottomWidth => &["border-bottom-width"],
        P::BorderLeftWidth => &["border-left-width"],
        P::BorderRightWidth => &["border-right-width"],
        P::BorderRadius => &["border-radius"],
        P::BorderTopLeftRadius => &["border-top-left-radius"],
        P::BorderTopRightRadius => &["border-top-right-radius"],
        P::BorderBottomLeftRadius => &["border-bottom-left-radius"],
        P::BorderBottomRightRadius => &["border-bottom-right-radius"],
        P::BorderStyle => &["border-style"],
        P::BorderStyleVertical => &["border-top-style", "border-bottom-style"],
        P::BorderStyleHorizontal => &["border-left-style", "border-right-style"],
        P::BorderLeftStyle => &["border-left-style"],
        P::BorderRightStyle => &["border-right-style"],
        P::BorderTopStyle => &["border-top-style"],
        P::BorderBottomStyle => &["border-bottom-style"],
        P::ZIndex => &["z-index"],
        P::Top => &["top"],
        P::Bottom => &["bottom"],
        P::Left => &["left"],
        P::Right => &["right"],
        P::Overflow => &["overflow"],
        P::OverflowX => &["overflow-x"],
        P::OverflowY => &["overflow-y"],
        P::TextTransform => &["text-transform"],
        P::TextIndent => &["text-indent"],
        P::TextAlign => &["text-align"],
        P::Opacity => &["opacity"],
        P::Cursor => &["cursor"],
        P::MinHeight => &["min-height"],
        P::MaxHeight => &["max-height"],
        P::MinWidth => &["min-width"],
        P::MaxWidth => &["max-width"],
        P::WhiteSpace => &["white-space"],
        P::AlignSelf => &["align-self"],
        P::Display => &["display"],
        P::Fit => &["object-fit"],
        _ => return None,
    };
    Some(properties)
}

/// Colour properties and whether they also style visited links.
fn color_property(kind: PropertyKind) -> Option<(&'static str, bool)> {
    use PropertyKind as P;
    Some(match kind {
        P::Color => ("color", true),
        P::BorderColor => ("border-color", false),
        P::BorderLeftColor => ("border-left-color", false),
        P::BorderRightColor => ("border-right-color", false),
        P::BorderTopColor => ("border-top-color", false),
        P::BorderBottomColor => ("border-bottom-color", false),
        _ => return None,
    })
}

fn css_text(value: &Value) -> Option<String> {
    (!value.is_null()).then(|| value.to_text())
}

/// Items of a list value, or the value itself.
fn items(value: &Value) -> Vec<Value> {
    match value.as_list() {
        Some(list) => list.to_values(),
        None if value.is_null() => Vec::new(),
        None => vec![value.resolve()],
    }
}

/// Apply one property write to `node`.
///
/// Writes to a destroyed node are dropped: they can only arrive through a
/// binding that has not been unlinked yet.
pub(crate) fn apply(node: &Node, kind: PropertyKind, value: &Value, inherited: &Value) -> Result<()> {
    if node.is_destroyed() {
        tracing::trace!(node = node.id().0, ?kind, "write to destroyed node dropped");
        return Ok(());
    }
    tracing::trace!(node = node.id().0, ?kind, "apply property");

    if let Some(properties) = css_properties(kind) {
        let css = css_text(value);
        for property in properties {
            attach_text(node, property, css.clone());
        }
        return Ok(());
    }
    if let Some((property, visited)) = color_property(kind) {
        return compose(node, kind, value, Vec::new(), move |n, v| {
            composite::color(n, property, v, visited)
        });
    }

    let session = node.session();
    let target = node.target();
    let dom = node.dom();
    use PropertyKind as P;
    match kind {
        // -- composite styles ---------------------------------------------------
        P::Background => compose(node, kind, value, Vec::new(), composite::background),
        P::Role => compose(node, kind, value, Vec::new(), composite::role),
        P::Shadow => compose(node, kind, value, Vec::new(), composite::shadow),
        P::TextShadow => compose(node, kind, value, Vec::new(), composite::text_shadow),
        P::BackdropFilter => compose(node, kind, value, Vec::new(), composite::backdrop_filter),
        P::Mask => compose(node, kind, value, Vec::new(), composite::mask),
        P::TextStyle => compose(node, kind, value, Vec::new(), composite::text_styles),
        P::AlignContent => composite::align_content(node, value),
        P::LinkColor => {
            let dark = Dependency::from(session.dark_mode().clone());
            compose(node, kind, value, vec![dark], composite::link_color)
        }
        P::ImageSrc | P::VideoSrc | P::Poster => {
            let attribute = if kind == P::Poster { "poster" } else { "src" };
            let dark = Dependency::from(session.dark_mode().clone());
            compose(node, kind, value, vec![dark], move |n, v| {
                composite::themed_source(n, attribute, v)
            })
        }

        // -- special styles -----------------------------------------------------
        P::Sticky => {
            let css = match value.resolve() {
                Value::Null => None,
                Value::Boolean(true) => Some("sticky".to_owned()),
                Value::Boolean(false) => Some("static".to_owned()),
                other => Some(match other.to_text().as_str() {
                    "true" => "sticky".to_owned(),
                    "false" => "static".to_owned(),
                    text => text.to_owned(),
                }),
            };
            attach_text(node, "position", css);
            Ok(())
        }
        P::Wrap => {
            let css = match value.resolve() {
                Value::Null => None,
                Value::Boolean(true) => Some("wrap".to_owned()),
                Value::Boolean(false) => Some("nowrap".to_owned()),
                other => Some(other.to_text()),
            };
            attach_text(node, "flex-wrap", css);
            Ok(())
        }
        P::Spacing => {
            match value.as_variant() {
                None => {
                    attach_text(node, "justify-content", None);
                    attach_text(node, "gap", None);
                }
                Some((1..=3, payload)) => {
                    attach_text(node, "gap", None);
                    attach_text(node, "justify-content", css_text(&payload));
                }
                Some((4, payload)) => {
                    attach_text(node, "justify-content", None);
                    attach_text(node, "gap", css_text(&payload));
                }
                Some((tag, _)) => tracing::warn!(tag, "unknown spacing variant"),
            }
            Ok(())
        }
        P::LineClamp => {
            let clamp = css_text(value);
            let on = |v: &str| clamp.as_ref().map(|_| v.to_owned());
            attach_text(node, "-webkit-line-clamp", clamp.clone());
            attach_text(node, "display", on("-webkit-box"));
            attach_text(node, "overflow", on("hidden"));
            attach_text(node, "-webkit-box-orient", on("vertical"));
            Ok(())
        }
        P::Resize => {
            let resize = css_text(value);
            let overflow = resize.as_ref().map(|_| "auto".to_owned());
            attach_text(node, "resize", resize);
            attach_text(node, "overflow", overflow);
            Ok(())
        }
        P::Selectable => {
            let css = (value.as_bool() == Some(false)).then(|| "none".to_owned());
            attach_text(node, "user-select", css);
            Ok(())
        }
        P::Anchor => {
            anchor(node, value);
            Ok(())
        }

        // -- attributes ---------------------------------------------------------
        P::Id => attribute(node, "id", value),
        P::TextInputType => attribute(node, "type", value),
        P::Placeholder => attribute(node, "placeholder", value),
        P::Loading => attribute(node, "loading", value),
        P::Src => attribute(node, "src", value),
        P::Alt => attribute(node, "alt", value),
        P::InputMaxLength => attribute(node, "maxlength", value),
        P::FetchPriority => attribute(node, "fetchpriority", value),
        P::Checked => {
            match value.resolve() {
                Value::Boolean(true) => target.set_attribute(dom, "checked", None),
                Value::String(s) if s == "true" => target.set_attribute(dom, "checked", None),
                Value::Null | Value::Boolean(false) => target.remove_attribute(dom, "checked"),
                Value::String(s) if s == "false" => target.remove_attribute(dom, "checked"),
                other => target.set_attribute(dom, "checked", Some(&other.to_text())),
            }
            Ok(())
        }
        P::Enabled => {
            if value.as_bool() == Some(false) || value.as_string().as_deref() == Some("false") {
                target.set_attribute(dom, "disabled", None);
            } else {
                target.remove_attribute(dom, "disabled");
            }
            Ok(())
        }
        P::Autoplay | P::Muted | P::Controls | P::LoopVideo => {
            let name = match kind {
                P::Autoplay => "autoplay",
                P::Muted => "muted",
                P::Controls => "controls",
                _ => "loop",
            };
            if value.is_truthy() {
                target.set_attribute(dom, name, None);
            } else {
                target.remove_attribute(dom, name);
            }
            Ok(())
        }
        P::OpenInNewTab => {
            match value.resolve() {
                Value::Boolean(true) => target.set_attribute(dom, "target", Some("_blank")),
                Value::Null | Value::Boolean(false) => target.remove_attribute(dom, "target"),
                other => target.set_attribute(dom, "target", Some(&other.to_text())),
            }
            Ok(())
        }
        P::LinkRel => {
            let rel = items(value).iter().map(Value::to_text).collect::<Vec<_>>().join(" ");
            if rel.is_empty() {
                target.remove_attribute(dom, "rel");
            } else {
                target.set_attribute(dom, "rel", Some(&rel));
            }
            Ok(())
        }
        P::YoutubeSrc => {
            match css_text(value) {
                None => target.remove_attribute(dom, "src"),
                Some(id) if is_youtube_id(&id) => {
                    let src = format!("https://youtube.com/embed/{id}");
                    target.set_attribute(dom, "src", Some(&src));
                }
                Some(id) => tracing::warn!(%id, "not a youtube video id"),
            }
            Ok(())
        }
        P::Classes => {
            let classes: Vec<String> = items(value).iter().map(Value::to_text).collect();
            let previous = std::mem::replace(&mut node.extra().classes, classes.clone());
            for class in previous.iter().filter(|c| !classes.contains(c)) {
                target.remove_class(dom, class);
            }
            for class in &classes {
                target.add_class(dom, class);
            }
            Ok(())
        }

        // -- text input ---------------------------------------------------------
        P::TextInputValue => {
            node.set_raw_inner(value.resolve());
            update_text_input_value(node);
            Ok(())
        }
        P::DefaultTextInputValue => {
            if node.raw_inner().is_null() {
                node.set_raw_inner(value.resolve());
                update_text_input_value(node);
            }
            Ok(())
        }
        P::Multiline => {
            let tag = if value.is_truthy() { "textarea" } else { "input" };
            target.retag(dom, tag);
            if tag == "textarea" {
                target.remove_attribute(dom, "type");
            }
            update_text_input_value(node);
            Ok(())
        }

        // -- tag mutations ------------------------------------------------------
        P::Link => {
            link(node, value);
            Ok(())
        }
        P::Region => {
            match css_text(value) {
                Some(tag) => {
                    target.retag(dom, &tag);
                    let text = node.raw_inner();
                    let text = if text.is_null() {
                        target.inner_html(dom)
                    } else {
                        text.to_text()
                    };
                    let id = slugify(&text);
                    if !id.is_empty() {
                        target.set_attribute(dom, "id", Some(&id));
                    }
                }
                None => target.retag(dom, "div"),
            }
            Ok(())
        }

        // -- content ------------------------------------------------------------
        P::IntegerValue | P::DecimalValue | P::BooleanValue => {
            target.set_inner_html(dom, &value.to_text());
            Ok(())
        }
        P::StringValue => {
            let text = value.resolve();
            node.set_raw_inner(text.clone());
            let text = text.to_text();
            let html = if session.mode() == RenderMode::Interactive && session.config().markdown {
                markdown::inline(&text)
            } else {
                v_htmlescape::escape(&text).to_string()
            };
            target.set_inner_html(dom, &html);
            Ok(())
        }
        P::Code => {
            code(node, value);
            Ok(())
        }
        P::CodeShowLineNumber => {
            if value.is_truthy() {
                target.add_class(dom, "line-numbers");
            } else {
                target.remove_class(dom, "line-numbers");
            }
            Ok(())
        }
        P::CodeTheme => {
            let theme = css_text(value).map(|t| t.replacen('.', "-", 1));
            let previous = std::mem::replace(&mut node.extra().code_theme, theme.clone());
            code_class(node, previous.as_deref(), theme.as_deref());
            Ok(())
        }
        P::CodeLanguage => {
            let language = css_text(value).map(|l| format!("language-{l}"));
            let previous = std::mem::replace(&mut node.extra().code_language, language.clone());
            code_class(node, previous.as_deref(), language.as_deref());
            Ok(())
        }
        P::Children => {
            let components = items(value);
            node.mount_components(&components, inherited)
        }

        // -- document head ------------------------------------------------------
        P::MetaTitle => {
            let title = css_text(value);
            session.update_head(|head| head.title = title);
            Ok(())
        }
        P::MetaOGTitle => meta(node, MetaKey::property("og:title"), css_text(value)),
        P::MetaTwitterTitle => meta(node, MetaKey::name("twitter:title"), css_text(value)),
        P::MetaDescription => meta(node, MetaKey::name("description"), css_text(value)),
        P::MetaOGDescription => meta(node, MetaKey::property("og:description"), css_text(value)),
        P::MetaTwitterDescription => {
            meta(node, MetaKey::name("twitter:description"), css_text(value))
        }
        P::MetaOGImage => meta(node, MetaKey::property("og:image"), image_src(value)),
        P::MetaTwitterImage => meta(node, MetaKey::name("twitter:image"), image_src(value)),
        P::MetaThemeColor => {
            let color = match value.field("light") {
                Some(light) => css_text(&light),
                None => css_text(value),
            };
            meta(node, MetaKey::name("theme-color"), color)
        }
        P::MetaFacebookDomainVerification => meta(
            node,
            MetaKey::name("facebook-domain-verification"),
            css_text(value),
        ),
        P::Favicon => {
            if let Some(href) = image_src(value) {
                session.update_head(|head| head.favicon = Some(href));
            }
            Ok(())
        }
        P::Css => {
            for href in items(value) {
                session.add_external_css(&href.to_text());
            }
            Ok(())
        }
        P::Js => {
            for src in items(value) {
                session.add_external_js(&src.to_text());
            }
            Ok(())
        }

        // Plain and colour styles returned above.
        other => Err(Error::descriptor(format!(
            "property {} has no dispatch arm",
            other.name()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Set `name` from `value`; `Null` and `false` remove it.
fn attribute(node: &Node, name: &str, value: &Value) -> Result<()> {
    let target = node.target();
    match value.resolve() {
        Value::Null | Value::Boolean(false) => target.remove_attribute(node.dom(), name),
        other => target.set_attribute(node.dom(), name, Some(&other.to_text())),
    }
    Ok(())
}

fn meta(node: &Node, key: MetaKey, content: Option<String>) -> Result<()> {
    node.session().update_head(|head| head.set_meta(key, content));
    Ok(())
}

/// `src` of an image record, or the value itself.
fn image_src(value: &Value) -> Option<String> {
    match value.field("src") {
        Some(src) => match src.field("light") {
            Some(light) => css_text(&light),
            None => css_text(&src),
        },
        None if value.as_record().is_some() => None,
        None => css_text(value),
    }
}

fn is_youtube_id(id: &str) -> bool {
    id.len() == 11
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Variant `1 → position value`, `2 → absolute inside a relative parent`,
/// `3 → absolute inside the element with that id`.
fn anchor(node: &Node, value: &Value) {
    let target = node.target();
    match value.as_variant() {
        None => {
            attach_text(node, "position", None);
        }
        Some((1, payload)) => {
            attach_text(node, "position", css_text(&payload));
        }
        Some((2, payload)) => {
            attach_text(node, "position", css_text(&payload));
            if let Some(parent) = target.parent_of(node.outer_dom()) {
                target.set_style(parent, "position", "relative");
            }
        }
        Some((3, payload)) => {
            attach_text(node, "position", Some("absolute".to_owned()));
            let id = payload.to_text();
            match target.find_by_html_id(&id) {
                Some(container) => target.set_style(container, "position", "relative"),
                None => tracing::warn!(%id, "anchor container not found"),
            }
        }
        Some((tag, _)) => tracing::warn!(tag, "unknown anchor variant"),
    }
}

/// Make the node a link to `href`. Images are wrapped in an anchor, other
/// elements become one.
fn link(node: &Node, value: &Value) {
    let target = node.target();
    let dom = node.dom();
    let href = css_text(value);

    let anchor = if node.kind() == &ElementKind::Image {
        let existing = (node.outer_dom() != dom).then(|| node.outer_dom());
        match (existing, &href) {
            (Some(outer), _) => outer,
            (None, None) => return,
            (None, Some(_)) => {
                let outer = target.create_element("a");
                target.insert_after(dom, outer);
                target.append_child(outer, dom);
                node.set_outer(outer);
                outer
            }
        }
    } else {
        if href.is_some() && target.tag_name(dom).as_deref() != Some("a") {
            target.retag(dom, "a");
        }
        dom
    };
    match href {
        Some(href) => target.set_attribute(anchor, "href", Some(&href)),
        None => target.remove_attribute(anchor, "href"),
    }
}

/// Textareas hold their value as content, inputs as an attribute.
fn update_text_input_value(node: &Node) {
    let target = node.target();
    let dom = node.dom();
    let raw = node.raw_inner();
    if raw.is_null() {
        target.remove_attribute(dom, "value");
        return;
    }
    let text = raw.to_text();
    if target.tag_name(dom).as_deref() == Some("textarea") {
        target.set_inner_html(dom, &v_htmlescape::escape(&text).to_string());
    } else {
        target.set_attribute(dom, "value", Some(&text));
    }
}

fn code(node: &Node, value: &Value) {
    let target = node.target();
    let Some(child) = node.code_child() else {
        tracing::warn!(node = node.id().0, "code node without code child");
        return;
    };
    if value.is_null() {
        target.remove_attribute(node.dom(), "data-line");
        target.set_inner_html(child.dom(), "");
        return;
    }
    let highlighted = find_and_remove_highlighter(&value.to_text());
    if highlighted.lines.is_empty() {
        target.remove_attribute(node.dom(), "data-line");
    } else {
        target.set_attribute(node.dom(), "data-line", Some(&highlighted.lines));
    }
    let text = highlighted.text.strip_suffix('\n').unwrap_or(&highlighted.text);
    target.set_inner_html(child.dom(), &text.replace('<', "&lt;"));
}

/// Swap a class on a code node and its `code` child.
fn code_class(node: &Node, previous: Option<&str>, next: Option<&str>) {
    let target = node.target();
    let mut doms = vec![node.dom()];
    doms.extend(node.code_child().map(|c| c.dom()));
    for dom in doms {
        if let Some(previous) = previous {
            target.remove_class(dom, previous);
        }
        if let Some(next) = next {
            target.add_class(dom, next);
        }
    }
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
        let root = session.root();
        (session, root)
    }

    fn set(node: &Node, kind: PropertyKind, value: impl Into<Value>) {
        node.set_static_property(kind, &value.into(), &Value::Null).unwrap();
    }

    // -----------------------------------------------------------------------
    // Styles
    // -----------------------------------------------------------------------

    #[test]
    fn paired_padding_sets_both_sides() {
        let doc = Rc::new(VirtualDocument::new());
        let (session, root) = setup(&doc);
        let node = root.child(ElementKind::Column).unwrap();
        set(&node, PropertyKind::PaddingHorizontal, "4px");
        assert_eq!(
            session.classes().rules(),
            vec![
                ".__pl-1 { padding-left: 4px; }",
                ".__pr-2 { padding-right: 4px; }"
            ]
        );
    }

    #[test]
    fn shared_values_share_classes() {
        let doc = Rc::new(VirtualDocument::new());
        let (session, root) = setup(&doc);
        let a = root.child(ElementKind::Text).unwrap();
        let b = root.child(ElementKind::Text).unwrap();
        set(&a, PropertyKind::Width, "10px");
        set(&b, PropertyKind::Width, "10px");
        assert_eq!(doc.class_list(a.dom()), doc.class_list(b.dom()));
        assert_eq!(session.classes().len(), 1);
    }

    #[test]
    fn wrap_and_sticky_booleans() {
        let doc = Rc::new(VirtualDocument::new());
        let (session, root) = setup(&doc);
        let node = root.child(ElementKind::Row).unwrap();
        set(&node, PropertyKind::Wrap, false);
        set(&node, PropertyKind::Sticky, true);
        let rules = session.classes().rules();
        assert!(rules.contains(&".__fw-1 { flex-wrap: nowrap; }".to_owned()));
        assert!(rules.contains(&".__pos-2 { position: sticky; }".to_owned()));
    }

    #[test]
    fn line_clamp_adds_box_declarations() {
        let doc = Rc::new(VirtualDocument::new());
        let (session, root) = setup(&doc);
        let node = root.child(ElementKind::Text).unwrap();
        set(&node, PropertyKind::LineClamp, 3);
        let rules = session.classes().rules();
        assert!(rules.iter().any(|r| r.contains("-webkit-line-clamp: 3")));
        assert!(rules.iter().any(|r| r.contains("display: -webkit-box")));
        assert!(rules.iter().any(|r| r.contains("-webkit-box-orient: vertical")));
        set(&node, PropertyKind::LineClamp, Value::Null);
        assert_eq!(doc.class_list(node.dom()), Vec::<String>::new());
    }

    #[test]
    fn spacing_variants() {
        let doc = Rc::new(VirtualDocument::new());
        let (_s, root) = setup(&doc);
        let row = root.child(ElementKind::Row).unwrap();
        set(&row, PropertyKind::Spacing, Value::variant(4, "8px"));
        assert!(doc.class_list(row.dom()).iter().any(|c| c.starts_with("__g-")));
        set(&row, PropertyKind::Spacing, Value::variant(1, "space-between"));
        let classes = doc.class_list(row.dom());
        assert!(classes.iter().any(|c| c.starts_with("__jc-")));
        assert!(!classes.iter().any(|c| c.starts_with("__g-")));
    }

    #[test]
    fn anchor_by_id_makes_container_relative() {
        let doc = Rc::new(VirtualDocument::new());
        let (_s, root) = setup(&doc);
        let container = root.child(ElementKind::Column).unwrap();
        set(&container, PropertyKind::Id, "box");
        let badge = container.child(ElementKind::Text).unwrap();
        set(&badge, PropertyKind::Anchor, Value::variant(3, "box"));
        assert_eq!(doc.style(container.dom(), "position").as_deref(), Some("relative"));
    }

    #[test]
    fn reactive_colour_field() {
        let doc = Rc::new(VirtualDocument::new());
        let (session, root) = setup(&doc);
        let node = root.child(ElementKind::Text).unwrap();
        let light = Mutable::new(Value::from("red"));
        let record = RecordInstance::new([
            ("light", Value::Mutable(light.clone())),
            ("dark", Value::from("red")),
        ]);
        node.set_property(PropertyKind::Color, record, &Value::Null).unwrap();
        light.set(Value::from("pink")).unwrap();
        assert!(session.has_rule("body.dark .__c-2"));
        assert!(doc.class_list(node.dom()).contains(&"__c-2".to_owned()));
    }

    // -----------------------------------------------------------------------
    // Attributes
    // -----------------------------------------------------------------------

    #[test]
    fn boolean_attributes() {
        let doc = Rc::new(VirtualDocument::new());
        let (_s, root) = setup(&doc);
        let check = root.child(ElementKind::CheckBox).unwrap();
        set(&check, PropertyKind::Checked, true);
        set(&check, PropertyKind::Enabled, false);
        assert_eq!(doc.attribute(check.dom(), "checked"), Some(None));
        assert_eq!(doc.attribute(check.dom(), "disabled"), Some(None));
        set(&check, PropertyKind::Checked, Value::Null);
        set(&check, PropertyKind::Enabled, true);
        assert_eq!(doc.attribute(check.dom(), "checked"), None);
        assert_eq!(doc.attribute(check.dom(), "disabled"), None);
    }

    #[test]
    fn youtube_ids_are_checked() {
        let doc = Rc::new(VirtualDocument::new());
        let (_s, root) = setup(&doc);
        let frame = root.child(ElementKind::IFrame).unwrap();
        set(&frame, PropertyKind::YoutubeSrc, "not-an-id");
        assert_eq!(doc.attribute(frame.dom(), "src"), None);
        set(&frame, PropertyKind::YoutubeSrc, "dQw4w9WgXcQ");
        assert_eq!(
            doc.attribute(frame.dom(), "src"),
            Some(Some("https://youtube.com/embed/dQw4w9WgXcQ".to_owned()))
        );
    }

    #[test]
    fn classes_replace_previous_list() {
        let doc = Rc::new(VirtualDocument::new());
        let (_s, root) = setup(&doc);
        let node = root.child(ElementKind::Text).unwrap();
        set(&node, PropertyKind::Classes, MutableList::new([Value::from("a"), Value::from("b")]));
        set(&node, PropertyKind::Classes, MutableList::new([Value::from("b")]));
        assert_eq!(doc.class_list(node.dom()), vec!["b"]);
    }

    #[test]
    fn textarea_holds_value_as_content() {
        let doc = Rc::new(VirtualDocument::new());
        let (_s, root) = setup(&doc);
        let input = root.child(ElementKind::TextInput).unwrap();
        set(&input, PropertyKind::DefaultTextInputValue, "hi");
        assert_eq!(doc.attribute(input.dom(), "value"), Some(Some("hi".to_owned())));
        set(&input, PropertyKind::Multiline, true);
        assert_eq!(doc.tag_name(input.dom()).as_deref(), Some("textarea"));
        assert_eq!(doc.inner_html(input.dom()), "hi");
        set(&input, PropertyKind::DefaultTextInputValue, "ignored");
        assert_eq!(doc.inner_html(input.dom()), "hi");
    }

    // -----------------------------------------------------------------------
    // Tag mutations
    // -----------------------------------------------------------------------

    #[test]
    fn link_retags_and_keeps_classes() {
        let doc = Rc::new(VirtualDocument::new());
        let (_s, root) = setup(&doc);
        let row = root.child(ElementKind::Row).unwrap();
        set(&row, PropertyKind::Link, "/docs");
        assert_eq!(doc.tag_name(row.dom()).as_deref(), Some("a"));
        assert_eq!(doc.class_list(row.dom()), vec!["ft_row"]);
        assert_eq!(doc.attribute(row.dom(), "href"), Some(Some("/docs".to_owned())));
    }

    #[test]
    fn linked_image_is_wrapped() {
        let doc = Rc::new(VirtualDocument::interactive());
        let (_s, root) = setup(&doc);
        let image = root.child(ElementKind::Image).unwrap();
        set(&image, PropertyKind::Link, "/home");
        let outer = image.outer_dom();
        assert_ne!(outer, image.dom());
        assert_eq!(doc.parent_of(image.dom()), Some(outer));
        assert_eq!(doc.children_of(doc.body()), vec![outer]);
        assert_eq!(image.to_html(), doc.outer_html(outer));
    }

    #[test]
    fn region_slugifies_text() {
        let doc = Rc::new(VirtualDocument::new());
        let (_s, root) = setup(&doc);
        let heading = root.child(ElementKind::Text).unwrap();
        set(&heading, PropertyKind::StringValue, "Getting Started");
        set(&heading, PropertyKind::Region, "h2");
        assert_eq!(doc.tag_name(heading.dom()).as_deref(), Some("h2"));
        assert_eq!(
            doc.attribute(heading.dom(), "id"),
            Some(Some(slugify("Getting Started")))
        );
    }

    // -----------------------------------------------------------------------
    // Content
    // -----------------------------------------------------------------------

    #[test]
    fn string_value_by_mode() {
        let ssr = Rc::new(VirtualDocument::new());
        let (_s, root) = setup(&ssr);
        let text = root.child(ElementKind::Text).unwrap();
        set(&text, PropertyKind::StringValue, "*a* <b>");
        assert_eq!(ssr.inner_html(text.dom()), "*a* &lt;b&gt;");

        let live = Rc::new(VirtualDocument::interactive());
        let (_s, root) = setup(&live);
        let text = root.child(ElementKind::Text).unwrap();
        set(&text, PropertyKind::StringValue, "*a*");
        assert_eq!(live.inner_html(text.dom()), "<em>a</em>");
    }

    #[test]
    fn code_marks_highlighted_lines() {
        let doc = Rc::new(VirtualDocument::new());
        let (_s, root) = setup(&doc);
        let code = root.child(ElementKind::Code).unwrap();
        let source = format!("let a = 1; {}\nlet b = a < 2;", trellis_core::text::HIGHLIGHT_MARKER);
        set(&code, PropertyKind::Code, source);
        set(&code, PropertyKind::CodeLanguage, "rust");
        set(&code, PropertyKind::CodeLanguage, "toml");
        let child = code.code_child().unwrap();
        assert_eq!(doc.attribute(code.dom(), "data-line"), Some(Some("1".to_owned())));
        assert_eq!(doc.inner_html(child.dom()), "let a = 1; \nlet b = a &lt; 2;");
        assert_eq!(doc.class_list(child.dom()), vec!["language-toml"]);
    }

    // -----------------------------------------------------------------------
    // Head
    // -----------------------------------------------------------------------

    #[test]
    fn meta_properties_fill_head() {
        let doc = Rc::new(VirtualDocument::new());
        let (session, root) = setup(&doc);
        set(&root, PropertyKind::MetaTitle, "Home");
        set(&root, PropertyKind::MetaOGTitle, "Home");
        let image = RecordInstance::new([("src", Value::from("/a.png"))]);
        set(&root, PropertyKind::MetaTwitterImage, image);
        set(&root, PropertyKind::Css, MutableList::new([Value::from("/a.css"), Value::from("/a.css")]));
        let head = session.head();
        assert_eq!(head.title.as_deref(), Some("Home"));
        assert_eq!(head.meta(&MetaKey::property("og:title")), Some("Home"));
        assert_eq!(head.meta(&MetaKey::name("twitter:image")), Some("/a.png"));
        assert_eq!(head.css.len(), 1);
        set(&root, PropertyKind::MetaOGTitle, Value::Null);
        assert_eq!(session.head().meta(&MetaKey::property("og:title")), None);
    }
}
