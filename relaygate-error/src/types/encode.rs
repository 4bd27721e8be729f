use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибка кодирования тела сообщения в полезную нагрузку брокера.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("failed to serialize message: {reason}")]
    Serialization { reason: String },
}

impl From<serde_json::Error> for EncodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}

impl ErrorExt for EncodeError {
    fn status_code(&self) -> StatusCode {
        StatusCode::SerializationFailed
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
