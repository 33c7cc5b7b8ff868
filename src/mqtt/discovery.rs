//! MQTT discovery
//!
//! Announces every configured device to the broker and turns messages on
//! the command topics into registry switches. The component moves through
//! three states:
//!
//! ```text
//! Configured ──announce()──► Announced ──listen()──► Listening
//! ```
//!
//! Both duties require commands to be supported by the topic layout;
//! discovery without commands would announce devices nobody can control.

use std::sync::Arc;

use serde::Serialize;
use statum::{machine, state};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::config::MqttConfig;
use super::message::{MalformedMessageError, MqttMessage, PAYLOAD_OFF, PAYLOAD_ON};
use super::topics::{TopicError, TopicKind, Topics};
use super::transport::{ListenerError, MqttTransport, QoS, TransportError};
use crate::registry::DeviceRegistry;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("MQTT config is not valid")]
    InvalidMqttConfig,

    #[error("MQTT topic configuration does not support commands")]
    CommandsNotSupported,

    #[error(transparent)]
    Topic(#[from] TopicError),

    #[error("Discovery transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Discovery payload published once per device on its config topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryPayload {
    pub command_topic: String,
    pub name: String,
    pub state_on: &'static str,
    pub state_off: &'static str,
    pub payload_on: &'static str,
    pub payload_off: &'static str,
}

impl DiscoveryPayload {
    pub fn for_device(topics: &Topics, device_name: &str) -> Result<Self, TopicError> {
        Ok(Self {
            command_topic: topics.command_topic(device_name)?,
            name: device_name.to_string(),
            state_on: PAYLOAD_ON,
            state_off: PAYLOAD_OFF,
            payload_on: PAYLOAD_ON,
            payload_off: PAYLOAD_OFF,
        })
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum DiscoveryState {
    Configured,
    Announced,
    Listening,
}

#[machine]
pub struct MqttDiscovery<S: DiscoveryState> {
    topics: Arc<Topics>,
    registry: Arc<DeviceRegistry>,
    transport: Arc<dyn MqttTransport>,
}

impl MqttDiscovery<Configured> {
    /// Checks the preconditions; fails fast when MQTT is not configured or
    /// the topic layout has no command topics.
    pub fn create(
        mqtt_config: &MqttConfig,
        topics: Arc<Topics>,
        registry: Arc<DeviceRegistry>,
        transport: Arc<dyn MqttTransport>,
    ) -> Result<Self, DiscoveryError> {
        if !mqtt_config.is_valid() {
            return Err(DiscoveryError::InvalidMqttConfig);
        }
        if !topics.supports_commands() {
            return Err(DiscoveryError::CommandsNotSupported);
        }

        Ok(Self::new(topics, registry, transport))
    }

    /// Publishes the discovery payload of every device.
    ///
    /// A failed publish is logged and skipped; the device is announced
    /// again on the next start.
    pub fn announce(self) -> Result<MqttDiscovery<Announced>, DiscoveryError> {
        let devices = self.registry.list();
        let mut announced = 0;
        for device in &devices {
            let device_name = device.device_name();
            debug!("Publishing discovery config for {}", device_name);

            let payload = DiscoveryPayload::for_device(&self.topics, device_name)?;
            if let Err(e) = self.publish_config(device_name, &payload) {
                error!(
                    device = %device_name,
                    "Failed to publish discovery config: {}", e
                );
                continue;
            }
            announced += 1;
        }

        info!("Announced {} of {} devices", announced, devices.len());
        Ok(self.transition())
    }

    fn publish_config(
        &self,
        device_name: &str,
        payload: &DiscoveryPayload,
    ) -> Result<(), TransportError> {
        let encoded = serde_json::to_vec(payload)?;
        self.transport.publish(
            &self.topics.config_topic(device_name),
            encoded,
            true,
            QoS::AtMostOnce,
        )
    }
}

impl MqttDiscovery<Announced> {
    /// Starts the command listener on the wildcard command topic
    pub fn listen(self) -> Result<MqttDiscovery<Listening>, DiscoveryError> {
        let filter = self.topics.all_commands_topic()?;

        // Held weakly: the listener thread runs for the whole process and
        // must not keep the transmitter open after shutdown.
        let registry = Arc::downgrade(&self.registry);
        let topics = self.topics.clone();
        self.transport.listen(
            &filter,
            Box::new(move |message: &MqttMessage| {
                let Some(registry) = registry.upgrade() else {
                    debug!(topic = %message.topic, "Registry is gone, ignoring command");
                    return Ok(());
                };
                handle_command(&registry, &topics, message)
            }),
        )?;

        info!("MQTT discovery is listening for commands on '{}'", filter);
        Ok(self.transition())
    }
}

/// Announces all devices and starts listening for commands.
pub fn run(
    mqtt_config: &MqttConfig,
    topics: Arc<Topics>,
    registry: Arc<DeviceRegistry>,
    transport: Arc<dyn MqttTransport>,
) -> Result<MqttDiscovery<Listening>, DiscoveryError> {
    MqttDiscovery::<Configured>::create(mqtt_config, topics, registry, transport)?
        .announce()?
        .listen()
}

/// Turns one command message into a registry switch.
pub fn handle_command(
    registry: &DeviceRegistry,
    topics: &Topics,
    message: &MqttMessage,
) -> Result<(), ListenerError> {
    let device_name = topics
        .extract_device(&message.topic, TopicKind::Command)
        .ok_or_else(|| MalformedMessageError::UnknownTopic(message.topic.clone()))?;

    let on = message.is_on();
    if !registry.switch(&device_name, on)? {
        warn!(
            device = %device_name,
            "Command was not acknowledged by the transmitter"
        );
    }
    Ok(())
}
