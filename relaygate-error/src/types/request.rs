use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки разбора входящего запроса на публикацию. Клиенту отдаются как 400.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("malformed request body: {reason}")]
    MalformedBody { reason: String },

    #[error("field `topic` is required and must not be empty")]
    MissingTopic,
}

impl ErrorExt for RequestError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedBody { .. } => StatusCode::InvalidData,
            Self::MissingTopic => StatusCode::MissingField,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
