#![forbid(unsafe_code)]

//! Core: element/property/event codes, CSS class naming, render
//! configuration, and the shared error type.

pub mod config;
pub mod css;
pub mod error;
pub mod kind;
pub mod text;

pub use config::RenderConfig;
pub use error::{Error, Result};
pub use kind::{ElementKind, EventKind, PropertyKind};
