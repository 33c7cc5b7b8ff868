//! # MQTT Integration Module
//!
//! Mirrors device state to an MQTT broker and lets the broker drive devices.
//!
//! ```text
//! mqtt/
//! ├── config.rs     - Broker connection and topic layout settings
//! ├── topics.rs     - Topic generation and parsing (pure)
//! ├── message.rs    - Inbound messages and the "on"/"off" wire format
//! ├── transport.rs  - Publish/listen capability used by the rest of the crate
//! ├── client.rs     - rumqttc implementation of the transport
//! └── discovery.rs  - Discovery announcements and the command listener
//! ```
//!
//! Listeners run on their own threads and call back into the registry or
//! the state backend; everything they touch is `Send + Sync`.

pub mod client;
pub mod config;
pub mod discovery;
pub mod message;
pub mod topics;
pub mod transport;

pub use client::RumqttTransport;
pub use config::{MqttConfig, TopicSettings};
pub use discovery::{DiscoveryError, MqttDiscovery};
pub use message::{MalformedMessageError, MqttMessage};
pub use topics::{TopicError, TopicKind, Topics};
pub use transport::{ListenerError, MessageHandler, MqttTransport, QoS, TransportError};
