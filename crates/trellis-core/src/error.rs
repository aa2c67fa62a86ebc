#![forbid(unsafe_code)]

//! Error type shared by every trellis library crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A property code reached the dispatch table that this runtime does
    /// not know. Compiled output and runtime disagree on the enumeration.
    #[error("unknown property kind: {0}")]
    UnknownPropertyKind(i32),

    #[error("unknown element kind: {0}")]
    UnknownElementKind(i32),

    #[error("unknown event kind: {0}")]
    UnknownEventKind(i32),

    #[error("index {index} out of range for list of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("record replacement is missing field `{field}`")]
    MissingRecordField { field: String },

    #[error("node has been destroyed")]
    NodeDestroyed,

    #[error("propagation depth exceeded {limit} nested closure updates")]
    PropagationDepthExceeded { limit: usize },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("unknown variable: {path}")]
    UnknownVariable { path: String },

    #[error("invalid descriptor: {0}")]
    Descriptor(String),

    #[error("http error: {0}")]
    Http(String),

    /// The host page is missing something the live target needs.
    #[error("host error: {0}")]
    Host(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn mismatch(expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch { expected, found }
    }

    #[must_use]
    pub fn descriptor(message: impl Into<String>) -> Self {
        Self::Descriptor(message.into())
    }

    /// Whether this error signals a compiled-output/runtime version mismatch.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnknownPropertyKind(_) | Self::UnknownElementKind(_) | Self::UnknownEventKind(_)
        )
    }
}
