/// Broker boundary: publisher/subscriber traits, memory and Kafka brokers.
pub mod broker;
/// Configuration loading (YAML + environment) and validation.
pub mod config;
/// Consumer dispatchers and message processors.
pub mod consumer;
/// Shared process context passed to every component.
pub mod context;
/// HTTP publish path: encoder, handlers, router, server.
pub mod gateway;
/// Startup/shutdown coordination, banner, signals.
pub mod lifecycle;
/// Structured logging (formatting, filters, sinks).
pub mod logging;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Broker API.
pub use broker::{
    BrokerClients, InboundMessage, MemoryBroker, OutboundMessage, Publisher, Subscriber,
    Subscription,
};
/// Settings.
pub use config::{BrokerKind, GatewaySettings};
/// Consumer API.
pub use consumer::{DispatchReport, DispatcherSet, LoggingProcessor, MessageProcessor};
pub use context::GatewayContext;
/// Publish path.
pub use gateway::{encode, new_message_id, GatewayError, MessageBody};
/// Lifecycle.
pub use lifecycle::{run, shutdown_signal, Gateway, GatewayState, ShutdownReport};
pub use logging::{init_logging, LoggingHandle};
/// Error taxonomy.
pub use relaygate_error::{
    BrokerError, ConfigError, EncodeError, LifecycleError, LoggingError, RequestError,
    StackError,
};
