#![forbid(unsafe_code)]

//! Node builder for trellis.
//!
//! A [`RenderSession`] owns one [`RenderTarget`] and the class registry,
//! head state and global event handlers for a page. [`Node`]s are created
//! under the session root, receive properties through
//! [`Node::set_property`] and stay bound to any observable a property was
//! given, so later writes update the document in place.
//!
//! - [`VirtualDocument`]: an in-memory document for string rendering and
//!   tests.
//! - `LiveDomTarget` (wasm32 only): the browser DOM.
//! - [`Conditional`] and [`ForLoop`]: subtrees that follow a condition or a
//!   [`MutableList`](trellis_reactive::MutableList).
//! - [`ssr`], [`mount`] and [`double_buffer`]: render entry points.
//!
//! # Invariants
//!
//! 1. Destroying a node destroys its subtree, its blocks and every closure
//!    it owns; no observable keeps a dependent for a destroyed node.
//! 2. Equal (property, value) pairs share one generated class per session.
//! 3. Subtrees rendered by a block appear after its marker, in order, before
//!    any later sibling of the block.

mod composite;
mod dispatch;
mod style;

pub mod conditional;
pub mod for_loop;
pub mod markdown;
pub mod node;
pub mod render;
pub mod session;
pub mod target;
pub mod virtual_dom;

#[cfg(target_arch = "wasm32")]
mod live_dom;

pub use conditional::Conditional;
pub use for_loop::ForLoop;
#[cfg(target_arch = "wasm32")]
pub use live_dom::{LiveDomTarget, install_global_listeners};
pub use node::{Block, Component, Node, Parent, PropertyValue, WeakNode};
pub use render::{SsrPage, double_buffer, mount, ssr};
pub use session::{BufferingScope, ClassRegistry, Device, HeadState, MetaKey, RenderSession};
pub use target::{DomId, Listener, RenderMode, RenderTarget};
pub use virtual_dom::VirtualDocument;
