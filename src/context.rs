use std::sync::Arc;

use crate::{
    broker::{BrokerClients, Publisher, Subscriber},
    config::GatewaySettings,
};

/// Общее состояние процесса: настройки и клиенты брокера.
///
/// Передаётся через `Arc` в HTTP-обработчики, диспетчеры и координатор.
/// Закрывать subscriber имеет право только координатор.
pub struct GatewayContext {
    pub settings: Arc<GatewaySettings>,
    pub publisher: Arc<dyn Publisher>,
    pub subscriber: Option<Arc<dyn Subscriber>>,
}

impl GatewayContext {
    pub fn new(
        settings: Arc<GatewaySettings>,
        clients: BrokerClients,
    ) -> Self {
        Self {
            settings,
            publisher: clients.publisher,
            subscriber: clients.subscriber,
        }
    }

    pub fn consumer_enabled(&self) -> bool {
        self.settings.consumer.enabled && self.subscriber.is_some()
    }
}
