use std::sync::Arc;

use axum::{extract::State, Json};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{encode, new_message_id, GatewayError, PublishRequest};
use crate::{
    broker::{OutboundMessage, Publisher},
    context::GatewayContext,
};

/// Ответ на успешную публикацию.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResponse {
    pub id: String,
}

/// `GET /ping`
pub async fn ping() -> &'static str {
    "pong"
}

/// `POST /publish`
pub async fn publish(
    State(ctx): State<Arc<GatewayContext>>,
    body: Bytes,
) -> Result<Json<PublishResponse>, GatewayError> {
    let id = handle_publish(ctx.publisher.as_ref(), &body).await?;
    Ok(Json(PublishResponse { id }))
}

/// Разбирает тело, кодирует сообщение и отправляет его ровно один раз.
///
/// Идентификатор создаётся до кодирования, поэтому он есть в логах даже при
/// ошибке кодирования или отправки.
pub async fn handle_publish(
    publisher: &dyn Publisher,
    body: &[u8],
) -> Result<String, GatewayError> {
    let request = PublishRequest::from_slice(body).inspect_err(|e| {
        debug!(error = %e, "rejected publish request");
    })?;

    let id = new_message_id();
    let payload = encode(&request.message).inspect_err(|e| {
        error!(id = %id, topic = %request.topic, error = %e, "failed to encode message");
    })?;

    publisher
        .publish(&request.topic, OutboundMessage::new(id.clone(), payload))
        .await
        .inspect_err(|e| {
            error!(id = %id, topic = %request.topic, error = %e, "failed to publish message");
        })?;

    debug!(id = %id, topic = %request.topic, "message published");
    Ok(id)
}
