//! HTTP-сторона шлюза: приём запросов на публикацию.

pub mod encoder;
pub mod error;
pub mod handlers;
pub mod request;
pub mod router;
pub mod server;

pub use encoder::{encode, new_message_id, MessageBody};
pub use error::GatewayError;
pub use request::PublishRequest;
pub use router::build_router;
pub use server::{HttpServer, ServerHandle};
