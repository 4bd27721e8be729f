use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::broker::InboundMessage;

/// Цель логов обработанных сообщений.
pub const CONSUMER_TARGET: &str = "relaygate::consumer";

/// Обработчик одного полученного сообщения.
///
/// Реализация сама подтверждает сообщение и не возвращает ошибок: сбой
/// обработки не должен останавливать диспетчер.
#[async_trait]
pub trait MessageProcessor: Send + Sync {
    async fn process(
        &self,
        message: InboundMessage,
    );
}

/// Логирует каждое сообщение и подтверждает его.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingProcessor;

/// Текстовое представление полезной нагрузки для логов.
///
/// JSON отображается в компактном виде (строка без кавычек), всё остальное
/// как UTF-8 с заменой некорректных байт.
pub fn render_payload(payload: &[u8]) -> String {
    match serde_json::from_slice::<Value>(payload) {
        Ok(Value::String(s)) => s,
        Ok(value) => value.to_string(),
        Err(_) => String::from_utf8_lossy(payload).into_owned(),
    }
}

#[async_trait]
impl MessageProcessor for LoggingProcessor {
    async fn process(
        &self,
        message: InboundMessage,
    ) {
        let rendered = render_payload(&message.payload);
        info!(
            target: CONSUMER_TARGET,
            id = %message.id,
            topic = %message.topic,
            // tracing не пишет вложенные значения: JSON уходит строкой.
            payload = %rendered,
            "received message"
        );

        let id = message.id.clone();
        let topic = message.topic.clone();
        if let Err(e) = message.ack() {
            warn!(target: CONSUMER_TARGET, id = %id, topic = %topic, error = %e, "failed to ack message");
        }
    }
}
