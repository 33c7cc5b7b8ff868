use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info};

use super::{DeviceState, MemoryState, StateError};
use crate::device::Device;
use crate::mqtt::message::{on_off, MalformedMessageError, MqttMessage};
use crate::mqtt::topics::{TopicKind, Topics};
use crate::mqtt::transport::{ListenerError, MqttTransport, QoS};

/// State backend mirrored to the broker.
///
/// The local map is authoritative. Switches are published to the device's
/// state topic (retained, QoS 0) on a best-effort basis; failures are logged
/// and the broker stays stale until the next successful publish.
///
/// After `init_done` a listener on all state topics absorbs changes made by
/// other clients. Absorbed changes only touch the local map: they are not
/// published again and nothing is transmitted.
pub struct MqttState {
    local: Arc<MemoryState>,
    transport: Arc<dyn MqttTransport>,
    topics: Arc<Topics>,
    listening: AtomicBool,
}

impl MqttState {
    pub fn new(transport: Arc<dyn MqttTransport>, topics: Arc<Topics>) -> Self {
        Self {
            local: Arc::new(MemoryState::new()),
            transport,
            topics,
            listening: AtomicBool::new(false),
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }
}

/// Applies a state message observed on the bus to the local map.
fn absorb(local: &MemoryState, topics: &Topics, message: &MqttMessage) -> Result<(), ListenerError> {
    let device_name = topics
        .extract_device(&message.topic, TopicKind::State)
        .ok_or_else(|| MalformedMessageError::UnknownTopic(message.topic.clone()))?;

    if !local.contains(&device_name) {
        debug!(device = %device_name, "Ignoring state of unconfigured device");
        return Ok(());
    }

    local.switch(&device_name, message.is_on());
    Ok(())
}

impl DeviceState for MqttState {
    fn init_device(&self, device: &Device) {
        self.local.init_device(device);
    }

    fn init_done(&self) -> Result<(), StateError> {
        if self.listening.swap(true, Ordering::SeqCst) {
            debug!("State listener already running");
            return Ok(());
        }

        let filter = self.topics.all_states_topic();
        let local = self.local.clone();
        let topics = self.topics.clone();
        let started = self.transport.listen(
            &filter,
            Box::new(move |message: &MqttMessage| absorb(&local, &topics, message)),
        );

        if let Err(e) = started {
            self.listening.store(false, Ordering::SeqCst);
            return Err(e.into());
        }
        info!("Synchronising device states from '{}'", filter);
        Ok(())
    }

    fn lookup(&self, device_name: &str) -> bool {
        self.local.lookup(device_name)
    }

    fn switch(&self, device_name: &str, on: bool) {
        self.local.switch(device_name, on);

        let topic = self.topics.state_topic(device_name);
        let payload = on_off(on);
        match self
            .transport
            .publish(&topic, payload.as_bytes().to_vec(), true, QoS::AtMostOnce)
        {
            Ok(()) => debug!("Published state '{}' on '{}'", payload, topic),
            Err(e) => error!(
                "Error when publishing state '{}' for device '{}' on mqtt: {}",
                payload, device_name, e
            ),
        }
    }
}
