//! Transport capability used by the state backend and discovery.
//!
//! Components only need to publish and to listen on a topic filter; how the
//! connection is driven, and how it reconnects, is up to the implementation
//! ([`super::client::RumqttTransport`] for a real broker).

pub use rumqttc::QoS;
use thiserror::Error;
use tracing::{info, warn};

use super::message::{MalformedMessageError, MqttMessage};
use crate::registry::RegistryError;

/// Callback for messages arriving on a listened filter
pub type MessageHandler = Box<dyn Fn(&MqttMessage) -> Result<(), ListenerError> + Send + 'static>;

pub trait MqttTransport: Send + Sync {
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        retain: bool,
        qos: QoS,
    ) -> Result<(), TransportError>;

    /// Starts a background listener on `filter`. Returns once the listener
    /// is running; messages are delivered from the listener's own thread.
    fn listen(&self, filter: &str, handler: MessageHandler) -> Result<(), TransportError>;
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("Failed to start listener thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("MQTT is not configured")]
    NotConfigured,
}

/// Everything a message handler may fail with
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error(transparent)]
    Malformed(#[from] MalformedMessageError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Decodes one publish and hands it to `handler`.
///
/// Never fails: malformed messages and handler errors are logged and the
/// message is dropped, so a listener loop survives any single bad message.
pub fn deliver(handler: &MessageHandler, topic: &str, payload: &[u8]) {
    let message = match MqttMessage::from_publish(topic, payload) {
        Ok(message) => message,
        Err(e) => {
            warn!("Dropping message: {}", e);
            return;
        }
    };

    info!("Got message from broker: {}", message);

    if let Err(e) = handler(&message) {
        warn!(topic = %message.topic, "Failed to handle message: {}", e);
    }
}
