#![forbid(unsafe_code)]

//! Generated style classes.
//!
//! Every style a property writes goes through [`attach_css`]: the value gets
//! a deterministic class name from the session's registry, and nodes with
//! equal styles share one class and one rule. A live page may instead write
//! an inline style for values nobody has needed a class for yet.

use trellis_core::css::{CssValue, class_prefix};

use crate::node::Node;

/// Attach `property: value` to `node` and return the class name.
///
/// `None` removes every class this property generated on the node (and the
/// inline style in a live page). In server-side or buffered mode the rule is
/// always registered and the class added. In a live page, `create_class`
/// or an already registered rule attaches the class, otherwise the value is
/// written inline.
pub(crate) fn attach_css(
    node: &Node,
    property: &str,
    value: Option<CssValue>,
    create_class: bool,
) -> Option<String> {
    let session = node.session();
    let target = session.target();
    let dom = node.dom();
    let prefix = class_prefix(&session.class_prefix(), property);

    let Some(value) = value else {
        remove_prefixed(node, &prefix, None);
        if session.is_live() {
            target.remove_style(dom, property);
        }
        return None;
    };

    let class = session.class_name(property, &value);
    let selector = format!(".{class}");
    remove_prefixed(node, &prefix, Some(&class));

    if !session.is_live() {
        session.register_rule(&selector, property, &value);
        target.add_class(dom, &class);
        return Some(class);
    }

    if create_class || session.has_rule(&selector) {
        session.register_rule(&selector, property, &value);
        clear_inline(node, property, &value);
        target.add_class(dom, &class);
    } else {
        target.remove_class(dom, &class);
        match &value {
            CssValue::Single(v) => target.set_style(dom, property, v),
            CssValue::Declarations(decls) => {
                for (p, v) in decls {
                    target.set_style(dom, p, v);
                }
            }
        }
    }
    Some(class)
}

/// Register a rule under an explicit selector (`body.dark .cls`,
/// `.cls:visited`, `body.mobile .cls`). Nothing is added to the node.
pub(crate) fn attach_rule(node: &Node, selector: &str, property: &str, value: CssValue) {
    node.session().register_rule(selector, property, &value);
}

/// Attach a light class and, when the dark value differs, a `body.dark`
/// override on top of it.
pub(crate) fn attach_themed(node: &Node, property: &str, light: String, dark: String) -> Option<String> {
    if light == dark {
        return attach_css(node, property, Some(light.into()), false);
    }
    let class = attach_css(node, property, Some(light.into()), true)?;
    attach_rule(node, &format!("body.dark .{class}"), property, dark.into());
    Some(class)
}

/// Shorthand for a single optional value.
pub(crate) fn attach_text(node: &Node, property: &str, value: Option<String>) -> Option<String> {
    attach_css(node, property, value.map(CssValue::from), false)
}

fn remove_prefixed(node: &Node, prefix: &str, keep: Option<&str>) {
    let target = node.target();
    let dom = node.dom();
    for class in target.class_list(dom) {
        if class.starts_with(prefix) && Some(class.as_str()) != keep {
            target.remove_class(dom, &class);
        }
    }
}

fn clear_inline(node: &Node, property: &str, value: &CssValue) {
    let target = node.target();
    match value {
        CssValue::Single(_) => target.remove_style(node.dom(), property),
        CssValue::Declarations(decls) => {
            for (p, _) in decls {
                target.remove_style(node.dom(), p);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use trellis_core::{ElementKind, RenderConfig};

    use super::*;
    use crate::session::RenderSession;
    use crate::target::RenderTarget;
    use crate::virtual_dom::VirtualDocument;

    fn node(doc: &Rc<VirtualDocument>) -> (Rc<RenderSession>, Node) {
        let session = RenderSession::new(RenderConfig::default(), doc.clone()).unwrap();
        let node = session.root().child(ElementKind::Column).unwrap();
        (session, node)
    }

    // -----------------------------------------------------------------------
    // Server-side
    // -----------------------------------------------------------------------

    #[test]
    fn server_side_always_uses_classes() {
        let doc = Rc::new(VirtualDocument::new());
        let (session, n) = node(&doc);
        let class = attach_text(&n, "width", Some("10px".into())).unwrap();
        assert_eq!(class, "__w-1");
        assert!(doc.class_list(n.dom()).contains(&class));
        assert!(doc.style(n.dom(), "width").is_none());
        assert_eq!(session.classes().rules(), vec![".__w-1 { width: 10px; }"]);
    }

    #[test]
    fn new_value_replaces_old_class() {
        let doc = Rc::new(VirtualDocument::new());
        let (_s, n) = node(&doc);
        attach_text(&n, "width", Some("10px".into()));
        attach_text(&n, "width", Some("20px".into()));
        assert_eq!(doc.class_list(n.dom()), vec!["ft_column", "__w-2"]);
        attach_text(&n, "width", None);
        assert_eq!(doc.class_list(n.dom()), vec!["ft_column"]);
    }

    // -----------------------------------------------------------------------
    // Live
    // -----------------------------------------------------------------------

    #[test]
    fn live_page_writes_inline_until_class_exists() {
        let doc = Rc::new(VirtualDocument::interactive());
        let (_s, n) = node(&doc);
        attach_text(&n, "height", Some("5px".into()));
        assert_eq!(doc.style(n.dom(), "height").as_deref(), Some("5px"));
        assert!(doc.stylesheet().is_empty());

        let other = n.child(ElementKind::Text).unwrap();
        attach_css(&other, "height", Some("5px".into()), true);
        attach_text(&n, "height", Some("5px".into()));
        assert!(doc.style(n.dom(), "height").is_none());
        assert!(doc.class_list(n.dom()).contains(&"__h-1".to_owned()));
        assert_eq!(doc.stylesheet(), ".__h-1 { height: 5px; }\n");
    }

    #[test]
    fn themed_pair_adds_dark_override() {
        let doc = Rc::new(VirtualDocument::new());
        let (session, n) = node(&doc);
        let class = attach_themed(&n, "color", "#fff".into(), "#000".into()).unwrap();
        let rules = session.classes().rules();
        assert_eq!(
            rules,
            vec![
                format!(".{class} {{ color: #fff !important; }}"),
                format!("body.dark .{class} {{ color: #000 !important; }}"),
            ]
        );
    }
}
