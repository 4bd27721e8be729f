use std::any::Any;

use axum::{
    http::StatusCode as HttpStatus,
    response::{IntoResponse, Response},
    Json,
};
use relaygate_error::{BrokerError, EncodeError, ErrorExt, ErrorResponse, RequestError, StatusCode};
use thiserror::Error;

/// Ошибка обработки одного HTTP-запроса.
///
/// Не влияет на состояние процесса.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    BadRequest(#[from] RequestError),

    #[error(transparent)]
    Encoding(#[from] EncodeError),

    #[error(transparent)]
    Publish(#[from] BrokerError),
}

impl ErrorExt for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(e) => e.status_code(),
            Self::Encoding(e) => e.status_code(),
            Self::Publish(e) => e.status_code(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = HttpStatus::from_u16(self.status_code().http_status())
            .unwrap_or(HttpStatus::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorResponse::from_error(&self))).into_response()
    }
}
