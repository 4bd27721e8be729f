use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки загрузки и валидации конфигурации.
///
/// Любая из них фатальна: процесс завершается до приёма трафика.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Файл или переменные окружения не удалось прочитать или разобрать.
    #[error("failed to load configuration: {reason}")]
    Load { reason: String },

    #[error("invalid configuration value `{field}`: {reason}")]
    Invalid { field: String, reason: String },

    /// Брокер неизвестен или не включён в сборку.
    #[error("unsupported broker kind `{kind}`")]
    UnsupportedBroker { kind: String },
}

impl ConfigError {
    pub fn invalid(
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Load { .. } | Self::Invalid { .. } => StatusCode::ConfigInvalid,
            Self::UnsupportedBroker { .. } => StatusCode::Unsupported,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
