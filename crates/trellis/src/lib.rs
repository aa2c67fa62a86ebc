#![forbid(unsafe_code)]

//! Trellis public facade crate.
//!
//! Re-exports the crates of the workspace under one name, plus a prelude of
//! the types a page usually touches.
//!
//! ```
//! use trellis::prelude::*;
//!
//! let page = ssr(RenderConfig::default(), |root| {
//!     root.child(ElementKind::Text)?
//!         .set_property(PropertyKind::StringValue, "Hello", &Value::Null)
//! })?;
//! assert!(page.markup().contains(">Hello</div>"));
//! # Ok::<(), Error>(())
//! ```

pub use trellis_core as core;
pub use trellis_dom as dom;
pub use trellis_reactive as reactive;
#[cfg(feature = "runtime")]
pub use trellis_runtime as runtime;

pub mod prelude {
    pub use trellis_core::{ElementKind, Error, EventKind, PropertyKind, RenderConfig, Result};
    pub use trellis_dom::{
        Conditional, ForLoop, Node, Parent, PropertyValue, RenderSession, RenderTarget, SsrPage,
        VirtualDocument, double_buffer, mount, ssr,
    };
    pub use trellis_reactive::{Closure, Dependency, Mutable, MutableList, RecordInstance, Value, formula};
    #[cfg(feature = "runtime")]
    pub use trellis_runtime::{Globals, Interpreter, parse_tree, render_page};
}
