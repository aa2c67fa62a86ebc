#![forbid(unsafe_code)]

//! Render entry points.
//!
//! - [`ssr`] builds into a [`VirtualDocument`] and serializes the result.
//! - [`mount`] builds straight into a session's target.
//! - [`double_buffer`] builds a replacement tree off-page and swaps it in
//!   together with a regenerated stylesheet.

use std::rc::Rc;

use trellis_core::{RenderConfig, Result};

use crate::node::Node;
use crate::session::{HeadState, RenderSession};
use crate::target::RenderTarget;
use crate::virtual_dom::VirtualDocument;

/// A page rendered to strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsrPage {
    /// Markup of the body's children.
    pub body: String,
    /// Classes on the body element (`dark`, `mobile`).
    pub body_classes: Vec<String>,
    /// Every generated rule, in registration order.
    pub rules: Vec<String>,
    pub head: HeadState,
}

impl SsrPage {
    /// Body markup followed by the generated stylesheet.
    #[must_use]
    pub fn markup(&self) -> String {
        format!(
            "{}<style id=\"styles\">{}</style>",
            self.body,
            self.rules.join("\n\t")
        )
    }

    /// A complete HTML document.
    #[must_use]
    pub fn to_html(&self) -> String {
        let head = self.head.to_html();
        let body_open = if self.body_classes.is_empty() {
            "<body>".to_owned()
        } else {
            format!(
                "<body class=\"{}\">",
                v_htmlescape::escape(&self.body_classes.join(" "))
            )
        };
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n{head}\n</head>\n{body_open}{}</body>\n</html>\n",
            self.markup()
        )
    }
}

/// Run `build` against a fresh virtual document and serialize the page.
///
/// Every node is destroyed afterwards, so observables shared with the
/// caller do not keep closures into the discarded tree.
pub fn ssr(config: RenderConfig, build: impl FnOnce(&Node) -> Result<()>) -> Result<SsrPage> {
    let doc = Rc::new(VirtualDocument::new());
    let session = RenderSession::new(config, doc.clone())?;
    let root = session.root();
    let built = build(&root);
    let page = built.map(|()| {
        let body = doc
            .children_of(doc.body())
            .into_iter()
            .map(|child| doc.outer_html(child))
            .collect::<String>();
        SsrPage {
            body,
            body_classes: doc.class_list(doc.body()),
            rules: session.classes().rules(),
            head: session.head(),
        }
    });
    root.destroy();
    tracing::debug!(ok = page.is_ok(), nodes = doc.node_count(), "ssr finished");
    page
}

/// Run `build` against the session's target and return the root builder.
pub fn mount(session: &Rc<RenderSession>, build: impl FnOnce(&Node) -> Result<()>) -> Result<Node> {
    let root = session.root();
    build(&root)?;
    Ok(root)
}

/// Rebuild the page without intermediate states becoming visible.
///
/// `build` runs against a detached staging element in buffered mode, where
/// every style becomes a class. `previous` is then destroyed, the staging
/// children replace the body's children and the stylesheet is replaced
/// with the session's full rule set.
pub fn double_buffer(
    session: &Rc<RenderSession>,
    previous: Option<&Node>,
    build: impl FnOnce(&Node) -> Result<()>,
) -> Result<Node> {
    let target = Rc::clone(session.target());
    let staging = target.create_element("div");
    let root = session.root();
    root.set_dom(staging);
    {
        let _buffering = session.buffering();
        if let Err(err) = build(&root) {
            root.destroy_with(false);
            return Err(err);
        }
    }
    if let Some(previous) = previous {
        previous.destroy();
    }
    target.replace_styles(&session.classes().stylesheet());
    target.swap_body_children(staging);
    root.set_dom(target.body());
    tracing::debug!(rules = session.classes().len(), "double buffer swapped");
    Ok(root)
}
