//! Потребление сообщений: диспетчеры по топикам и обработчик.

pub mod dispatcher;
pub mod processor;

pub use dispatcher::{run, DispatchReport, DispatcherSet, JoinOutcome};
pub use processor::{render_payload, LoggingProcessor, MessageProcessor};
