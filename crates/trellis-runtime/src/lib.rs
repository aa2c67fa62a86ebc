#![forbid(unsafe_code)]

//! Application-facing runtime for trellis.
//!
//! - [`Globals`]: named state with dotted-path access, list operations,
//!   theme and device switches and `on_load` hooks.
//! - [`http`]: send JSON and write the response back into [`Globals`].
//! - [`Interpreter`]: replay an element-descriptor tree as builder calls.
//! - [`render_page`] / [`mount_page`]: render a tree to a string or into a
//!   live session.

pub mod descriptor;
pub mod globals;
pub mod http;

use std::rc::Rc;

use trellis_core::{RenderConfig, Result};
use trellis_dom::{Node, RenderSession, SsrPage};

pub use descriptor::{Action, ElementDescriptor, EventDescriptor, Interpreter, PropertyDescriptor, Scope, parse_tree};
pub use globals::Globals;
pub use http::{HttpRequest, Navigation, apply_response};

/// Render `tree` against `globals` to an HTML page, then fire `on_load`.
pub fn render_page(config: RenderConfig, globals: &Rc<Globals>, tree: &[ElementDescriptor]) -> Result<SsrPage> {
    let interpreter = Interpreter::new(Rc::clone(globals));
    trellis_dom::ssr(config, |root| {
        globals.attach_session(root.session());
        interpreter.mount_all(root, tree)?;
        globals.emit_on_load()
    })
}

/// Mount `tree` into a live `session`, then fire `on_load`.
pub fn mount_page(session: &Rc<RenderSession>, globals: &Rc<Globals>, tree: &[ElementDescriptor]) -> Result<Node> {
    globals.attach_session(session);
    let interpreter = Interpreter::new(Rc::clone(globals));
    let root = trellis_dom::mount(session, |root| interpreter.mount_all(root, tree))?;
    globals.emit_on_load()?;
    Ok(root)
}
