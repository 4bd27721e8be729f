use std::{any::Any, time::Duration};

use thiserror::Error;

use crate::{BrokerError, ErrorExt, StatusCode};

/// Ошибки запуска и остановки шлюза.
///
/// Варианты запуска фатальны. `ShutdownTimeout` только логируется, остановка
/// продолжается.
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    #[error("failed to bind HTTP listener on {address}: {reason}")]
    Bind { address: String, reason: String },

    #[error("failed to set up subscription for topic `{topic}`: {source}")]
    SubscriptionSetup {
        topic: String,
        #[source]
        source: BrokerError,
    },

    #[error("{component} did not stop within {timeout:?}")]
    ShutdownTimeout {
        component: String,
        timeout: Duration,
    },

    #[error("HTTP server failed: {reason}")]
    Serve { reason: String },
}

impl ErrorExt for LifecycleError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Bind { .. } => StatusCode::AddressInUse,
            Self::SubscriptionSetup { .. } => StatusCode::SubscribeFailed,
            Self::ShutdownTimeout { .. } => StatusCode::ShutdownTimeout,
            Self::Serve { .. } => StatusCode::ServeFailed,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
