use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки клиента брокера.
///
/// Сообщение `reason` передаётся от клиента брокера без изменений.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("broker connection failed: {reason}")]
    Connect { reason: String },

    #[error("publish to `{topic}` failed: {reason}")]
    Publish { topic: String, reason: String },

    #[error("subscribe to `{topic}` failed: {reason}")]
    Subscribe { topic: String, reason: String },

    #[error("ack of message `{id}` failed: {reason}")]
    Ack { id: String, reason: String },

    #[error("broker is closed")]
    Closed,
}

impl ErrorExt for BrokerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Connect { .. } => StatusCode::BrokerUnavailable,
            Self::Publish { .. } => StatusCode::PublishFailed,
            Self::Subscribe { .. } => StatusCode::SubscribeFailed,
            Self::Ack { .. } => StatusCode::AckFailed,
            Self::Closed => StatusCode::BrokerClosed,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogLevel;

    #[test]
    fn test_publish_error_keeps_reason() {
        let err = BrokerError::Publish {
            topic: "orders".to_string(),
            reason: "Message production error: QueueFull".to_string(),
        };
        assert!(err.to_string().contains("QueueFull"));
        assert_eq!(err.status_code(), StatusCode::PublishFailed);
        assert_eq!(err.status_code().http_status(), 500);
    }

    #[test]
    fn test_closed_logs_as_warning() {
        assert_eq!(BrokerError::Closed.status_code(), StatusCode::BrokerClosed);
        assert_eq!(BrokerError::Closed.status_code().log_level(), LogLevel::Warn);
    }
}
