use thiserror::Error;

use crate::loader::LoadError;

#[derive(Error, Debug)]
pub enum SelectorError {
    /// The surface handle was missing or cannot be drawn on.
    #[error("invalid surface: {0}")]
    InvalidArgument(String),

    /// An operation was called before the state it needs exists.
    #[error("precondition violated: {0}")]
    PreconditionViolation(&'static str),

    #[error("failed to load image '{uri}': {source}")]
    ImageLoad {
        uri: String,
        #[source]
        source: LoadError,
    },

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T, E = SelectorError> = std::result::Result<T, E>;
