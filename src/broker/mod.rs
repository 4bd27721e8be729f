//! Граница с брокером сообщений: публикация, подписка, подтверждение.

#[cfg(feature = "kafka")]
pub mod kafka;
pub mod memory;
pub mod message;
pub mod subscription;

use std::sync::Arc;

use async_trait::async_trait;
pub use memory::MemoryBroker;
pub use message::{Acker, InboundMessage, OutboundMessage};
use relaygate_error::{BrokerError, StackError};
pub use subscription::{MessageSource, Subscription};

use crate::config::{BrokerKind, GatewaySettings};

/// Отправка сообщений в топики.
///
/// Реализации вызываются конкурентно из любого числа HTTP-запросов.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        message: OutboundMessage,
    ) -> Result<(), BrokerError>;
}

/// Получение сообщений из топиков.
#[async_trait]
pub trait Subscriber: Send + Sync {
    async fn subscribe(
        &self,
        topic: &str,
    ) -> Result<Subscription, BrokerError>;

    /// Закрывает все подписки: каждый `Subscription::recv` вернёт `None`.
    async fn close(&self) -> Result<(), BrokerError>;
}

/// Клиенты брокера, построенные из настроек.
#[derive(Clone)]
pub struct BrokerClients {
    pub publisher: Arc<dyn Publisher>,
    /// `None`, если потребление выключено.
    pub subscriber: Option<Arc<dyn Subscriber>>,
}

impl BrokerClients {
    /// Клиенты поверх одного брокера в памяти.
    pub fn memory(
        broker: Arc<MemoryBroker>,
        consume: bool,
    ) -> Self {
        let subscriber: Option<Arc<dyn Subscriber>> = if consume {
            Some(broker.clone())
        } else {
            None
        };
        Self {
            publisher: broker,
            subscriber,
        }
    }
}

/// Создаёт клиентов брокера, выбранного в `broker.kind`.
pub fn connect(settings: &GatewaySettings) -> Result<BrokerClients, StackError> {
    match settings.broker.kind {
        BrokerKind::Memory => {
            let broker = Arc::new(MemoryBroker::new(settings.broker.channel_capacity));
            Ok(BrokerClients::memory(broker, settings.consumer.enabled))
        }
        #[cfg(feature = "kafka")]
        BrokerKind::Kafka => kafka::connect(settings),
        #[cfg(not(feature = "kafka"))]
        BrokerKind::Kafka => Err(relaygate_error::ConfigError::UnsupportedBroker {
            kind: "kafka".to_string(),
        }
        .into()),
    }
}
