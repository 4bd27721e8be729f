use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::{DashMap, DashSet};
use relaygate_error::BrokerError;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::{
    Acker, InboundMessage, MessageSource, OutboundMessage, Publisher, Subscriber, Subscription,
};

type TopicKey = Arc<str>;

/// Сообщение внутри канала брокера.
#[derive(Debug, Clone)]
struct Envelope {
    id: String,
    payload: Bytes,
}

/// Учёт подтверждённых сообщений.
#[derive(Debug, Default)]
struct AckLedger {
    ids: DashSet<String>,
    count: AtomicUsize,
}

/// Брокер в памяти процесса.
///
/// Каждый топик это `broadcast`-канал в `DashMap`. Публикация в топик без
/// подписчиков принимается, но сообщение отбрасывается и учитывается в
/// `dropped_count`. После [`close`](Subscriber::close) все подписки
/// завершаются, а новые публикации и подписки отклоняются.
pub struct MemoryBroker {
    /// Топик → `Sender`
    channels: DashMap<TopicKey, broadcast::Sender<Envelope>>,
    /// Ёмкость буфера каждого `broadcast::channel`
    capacity: usize,
    closed: AtomicBool,
    ledger: Arc<AckLedger>,
    /// Общее количество вызовов `publish`
    publish_count: AtomicUsize,
    /// Количество сообщений, которые никто не получил
    dropped_count: AtomicUsize,
}

impl MemoryBroker {
    /// Создаёт брокер с заданной ёмкостью буфера на топик.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
            closed: AtomicBool::new(false),
            ledger: Arc::new(AckLedger::default()),
            publish_count: AtomicUsize::new(0),
            dropped_count: AtomicUsize::new(0),
        }
    }

    pub fn publish_count(&self) -> usize {
        self.publish_count.load(Ordering::Relaxed)
    }

    pub fn dropped_count(&self) -> usize {
        self.dropped_count.load(Ordering::Relaxed)
    }

    pub fn acked_count(&self) -> usize {
        self.ledger.count.load(Ordering::Relaxed)
    }

    pub fn is_acked(
        &self,
        id: &str,
    ) -> bool {
        self.ledger.ids.contains(id)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Количество активных подписок на топик.
    pub fn subscriber_count(
        &self,
        topic: &str,
    ) -> usize {
        self.channels
            .get(topic)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CHANNEL_CAPACITY)
    }
}

#[async_trait]
impl Publisher for MemoryBroker {
    async fn publish(
        &self,
        topic: &str,
        message: OutboundMessage,
    ) -> Result<(), BrokerError> {
        if self.is_closed() {
            return Err(BrokerError::Closed);
        }
        self.publish_count.fetch_add(1, Ordering::Relaxed);

        let sender = self.channels.get(topic).map(|entry| entry.value().clone());
        let envelope = Envelope {
            id: message.id,
            payload: message.payload,
        };

        let delivered = match sender {
            Some(tx) => tx.send(envelope).is_ok(),
            None => false,
        };
        if !delivered {
            self.dropped_count.fetch_add(1, Ordering::Relaxed);
            debug!(topic, "no subscribers, message dropped");
        }
        Ok(())
    }
}

#[async_trait]
impl Subscriber for MemoryBroker {
    async fn subscribe(
        &self,
        topic: &str,
    ) -> Result<Subscription, BrokerError> {
        if self.is_closed() {
            return Err(BrokerError::Closed);
        }

        let key: TopicKey = Arc::from(topic);
        let rx = self
            .channels
            .entry(key.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        // close() мог очистить каналы между проверкой и вставкой.
        if self.is_closed() {
            self.channels.remove(topic);
            return Err(BrokerError::Closed);
        }

        debug!(topic, "subscribed");
        Ok(Subscription::new(
            key.clone(),
            MemorySource {
                topic: key,
                rx,
                ledger: self.ledger.clone(),
            },
        ))
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.closed.store(true, Ordering::Release);
        let topics = self.channels.len();
        self.channels.clear();
        debug!(topics, "memory broker closed");
        Ok(())
    }
}

struct MemorySource {
    topic: TopicKey,
    rx: broadcast::Receiver<Envelope>,
    ledger: Arc<AckLedger>,
}

#[async_trait]
impl MessageSource for MemorySource {
    async fn next_message(&mut self) -> Option<InboundMessage> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) => {
                    return Some(InboundMessage::new(
                        envelope.id,
                        &*self.topic,
                        envelope.payload,
                        MemoryAck(self.ledger.clone()),
                    ))
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "subscription lagged, messages skipped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

struct MemoryAck(Arc<AckLedger>);

impl Acker for MemoryAck {
    fn ack(
        self: Box<Self>,
        id: &str,
    ) -> Result<(), BrokerError> {
        self.0.ids.insert(id.to_string());
        self.0.count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
