//! Брокер Kafka на `rdkafka` (фича `kafka`).

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer, StreamConsumer},
    message::{BorrowedMessage, Header, Headers, OwnedHeaders},
    producer::{FutureProducer, FutureRecord},
    util::Timeout,
    Message, Offset, TopicPartitionList,
};
use relaygate_error::{BrokerError, StackError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{
    Acker, BrokerClients, InboundMessage, MessageSource, OutboundMessage, Publisher, Subscriber,
    Subscription,
};
use crate::config::{GatewaySettings, OffsetReset};

/// Заголовок с идентификатором сообщения.
pub const MESSAGE_ID_HEADER: &str = "message_id";

const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Создаёт publisher и, если потребление включено, subscriber.
pub fn connect(settings: &GatewaySettings) -> Result<BrokerClients, StackError> {
    let brokers = settings.broker.addresses.join(",");

    let publisher = KafkaPublisher::new(&brokers, settings.debug)?;
    let subscriber: Option<Arc<dyn Subscriber>> = if settings.consumer.enabled {
        Some(Arc::new(KafkaSubscriber::new(
            &brokers,
            &settings.consumer.group_id,
            settings.consumer.offset_reset,
            settings.debug,
        )))
    } else {
        None
    };

    Ok(BrokerClients {
        publisher: Arc::new(publisher),
        subscriber,
    })
}

fn base_config(
    brokers: &str,
    debug: bool,
) -> ClientConfig {
    let mut config = ClientConfig::new();
    config.set("bootstrap.servers", brokers);
    if debug {
        config.set("debug", "broker,topic,msg");
    }
    config
}

/// Kafka producer.
///
/// Идентификатор сообщения уходит в заголовок `message_id` и в ключ записи.
pub struct KafkaPublisher {
    producer: FutureProducer,
}

impl KafkaPublisher {
    pub fn new(
        brokers: &str,
        debug: bool,
    ) -> Result<Self, BrokerError> {
        let producer: FutureProducer = base_config(brokers, debug)
            .set("acks", "all")
            .set("message.timeout.ms", "30000")
            .create()
            .map_err(|e| BrokerError::Connect {
                reason: e.to_string(),
            })?;

        info!(brokers, "kafka producer created");
        Ok(Self { producer })
    }
}

#[async_trait]
impl Publisher for KafkaPublisher {
    async fn publish(
        &self,
        topic: &str,
        message: OutboundMessage,
    ) -> Result<(), BrokerError> {
        let headers = OwnedHeaders::new().insert(Header {
            key: MESSAGE_ID_HEADER,
            value: Some(message.id.as_str()),
        });
        let record = FutureRecord::to(topic)
            .key(message.id.as_str())
            .payload(message.payload.as_ref())
            .headers(headers);

        match self.producer.send(record, Timeout::After(SEND_TIMEOUT)).await {
            Ok((partition, offset)) => {
                debug!(topic, id = %message.id, partition, offset, "message delivered");
                Ok(())
            }
            Err((err, _)) => Err(BrokerError::Publish {
                topic: topic.to_string(),
                reason: err.to_string(),
            }),
        }
    }
}

/// Kafka consumer group.
///
/// На каждый топик создаётся отдельный `StreamConsumer` группы. Автокоммит
/// выключен: смещение фиксируется при `ack`.
pub struct KafkaSubscriber {
    brokers: String,
    group_id: String,
    offset_reset: OffsetReset,
    debug: bool,
    stop: watch::Sender<bool>,
}

impl KafkaSubscriber {
    pub fn new(
        brokers: &str,
        group_id: &str,
        offset_reset: OffsetReset,
        debug: bool,
    ) -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            brokers: brokers.to_string(),
            group_id: group_id.to_string(),
            offset_reset,
            debug,
            stop,
        }
    }
}

#[async_trait]
impl Subscriber for KafkaSubscriber {
    async fn subscribe(
        &self,
        topic: &str,
    ) -> Result<Subscription, BrokerError> {
        if *self.stop.borrow() {
            return Err(BrokerError::Closed);
        }

        let subscribe_error = |reason: String| BrokerError::Subscribe {
            topic: topic.to_string(),
            reason,
        };

        let consumer: StreamConsumer = base_config(&self.brokers, self.debug)
            .set("group.id", &self.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", self.offset_reset.to_string())
            .set("session.timeout.ms", "30000")
            .create()
            .map_err(|e| subscribe_error(e.to_string()))?;
        consumer
            .subscribe(&[topic])
            .map_err(|e| subscribe_error(e.to_string()))?;

        info!(topic, group_id = %self.group_id, "kafka subscription created");
        Ok(Subscription::new(
            topic,
            KafkaSource {
                consumer: Arc::new(consumer),
                stop: self.stop.subscribe(),
            },
        ))
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.stop.send_replace(true);
        debug!("kafka subscriber closed");
        Ok(())
    }
}

struct KafkaSource {
    consumer: Arc<StreamConsumer>,
    stop: watch::Receiver<bool>,
}

impl KafkaSource {
    fn to_inbound(
        &self,
        message: &BorrowedMessage<'_>,
    ) -> InboundMessage {
        let id = message_id(message).unwrap_or_default();
        let payload = message
            .payload()
            .map(Bytes::copy_from_slice)
            .unwrap_or_default();

        InboundMessage::new(
            id,
            message.topic(),
            payload,
            KafkaAck {
                consumer: self.consumer.clone(),
                topic: message.topic().to_string(),
                partition: message.partition(),
                offset: message.offset(),
            },
        )
    }
}

#[async_trait]
impl MessageSource for KafkaSource {
    async fn next_message(&mut self) -> Option<InboundMessage> {
        loop {
            if *self.stop.borrow() {
                return None;
            }

            let consumer = self.consumer.clone();
            tokio::select! {
                changed = self.stop.changed() => {
                    // Отправитель удалён или выставлен флаг остановки.
                    if changed.is_err() || *self.stop.borrow() {
                        return None;
                    }
                }
                received = consumer.recv() => match received {
                    Ok(message) => return Some(self.to_inbound(&message)),
                    Err(err) => warn!(error = %err, "kafka receive failed"),
                },
            }
        }
    }
}

/// Идентификатор из заголовка `message_id`, иначе из ключа записи.
fn message_id(message: &BorrowedMessage<'_>) -> Option<String> {
    let from_header = message.headers().and_then(|headers| {
        headers
            .iter()
            .find(|h| h.key == MESSAGE_ID_HEADER)
            .and_then(|h| h.value)
            .map(|v| String::from_utf8_lossy(v).into_owned())
    });

    from_header.or_else(|| {
        message
            .key()
            .map(|k| String::from_utf8_lossy(k).into_owned())
    })
}

struct KafkaAck {
    consumer: Arc<StreamConsumer>,
    topic: String,
    partition: i32,
    offset: i64,
}

impl Acker for KafkaAck {
    fn ack(
        self: Box<Self>,
        id: &str,
    ) -> Result<(), BrokerError> {
        let ack_error = |reason: String| BrokerError::Ack {
            id: id.to_string(),
            reason,
        };

        let mut offsets = TopicPartitionList::new();
        offsets
            .add_partition_offset(&self.topic, self.partition, Offset::Offset(self.offset + 1))
            .map_err(|e| ack_error(e.to_string()))?;
        self.consumer
            .commit(&offsets, CommitMode::Async)
            .map_err(|e| ack_error(e.to_string()))
    }
}
