use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("render failed: {0}")]
    Render(#[from] trellis_core::Error),

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl CliError {
    /// 2 for problems with the inputs, 1 when rendering itself failed.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Render(err) if !is_input_error(err) => 1,
            _ => 2,
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>) -> impl FnOnce(serde_json::Error) -> Self {
        let path = path.into();
        move |source| Self::Json { path, source }
    }
}

fn is_input_error(err: &trellis_core::Error) -> bool {
    matches!(
        err,
        trellis_core::Error::Descriptor(_)
            | trellis_core::Error::Json(_)
            | trellis_core::Error::UnknownElementKind(_)
            | trellis_core::Error::UnknownPropertyKind(_)
    )
}
