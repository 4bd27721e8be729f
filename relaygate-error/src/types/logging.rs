use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки инициализации логирования.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoggingError {
    #[error("invalid log filter `{directive}`: {reason}")]
    InvalidDirective { directive: String, reason: String },

    #[error("cannot open log file {path}: {reason}")]
    File { path: String, reason: String },

    #[error("global subscriber already installed")]
    AlreadyInitialized,
}

impl ErrorExt for LoggingError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidDirective { .. } => StatusCode::ConfigInvalid,
            Self::File { .. } => StatusCode::Io,
            Self::AlreadyInitialized => StatusCode::Unexpected,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
