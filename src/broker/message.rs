use std::fmt;

use bytes::Bytes;
use relaygate_error::BrokerError;

/// Сообщение, отправляемое в брокер.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Уникальный идентификатор попытки публикации.
    pub id: String,
    pub payload: Bytes,
}

impl OutboundMessage {
    pub fn new(
        id: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            id: id.into(),
            payload: payload.into(),
        }
    }
}

/// Способ подтвердить сообщение брокеру.
pub trait Acker: Send {
    fn ack(
        self: Box<Self>,
        id: &str,
    ) -> Result<(), BrokerError>;
}

/// Сообщение, полученное из подписки.
///
/// [`ack`](InboundMessage::ack) поглощает сообщение, поэтому подтвердить его
/// дважды нельзя.
pub struct InboundMessage {
    pub id: String,
    pub topic: String,
    pub payload: Bytes,
    acker: Box<dyn Acker>,
}

impl InboundMessage {
    pub fn new(
        id: impl Into<String>,
        topic: impl Into<String>,
        payload: impl Into<Bytes>,
        acker: impl Acker + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            topic: topic.into(),
            payload: payload.into(),
            acker: Box::new(acker),
        }
    }

    pub fn ack(self) -> Result<(), BrokerError> {
        self.acker.ack(&self.id)
    }
}

impl fmt::Debug for InboundMessage {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("InboundMessage")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}
