use std::sync::Arc;

use async_trait::async_trait;

use super::InboundMessage;

/// Источник сообщений одной подписки.
#[async_trait]
pub trait MessageSource: Send {
    /// Следующее сообщение или `None`, если поток закрыт.
    async fn next_message(&mut self) -> Option<InboundMessage>;
}

/// Подписка на один топик.
///
/// Отписка происходит автоматически при `Drop`.
pub struct Subscription {
    topic: Arc<str>,
    source: Box<dyn MessageSource>,
}

impl Subscription {
    pub fn new(
        topic: impl Into<Arc<str>>,
        source: impl MessageSource + 'static,
    ) -> Self {
        Self {
            topic: topic.into(),
            source: Box::new(source),
        }
    }

    /// Асинхронно ожидает следующее сообщение.
    ///
    /// `None` означает конец потока (брокер закрыт), а не ошибку.
    pub async fn recv(&mut self) -> Option<InboundMessage> {
        self.source.next_message().await
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .finish()
    }
}
