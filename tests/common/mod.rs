//! In-process stand-ins for the broker and the radio.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rc433::device::DeviceCatalog;
use rc433::mqtt::transport::deliver;
use rc433::mqtt::{MessageHandler, MqttTransport, TopicSettings, Topics, TransportError};
use rc433::rf::{RfController, RfError, Transmitter};
use rumqttc::{ClientError, Publish, QoS, Request};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
    pub qos: QoS,
}

/// Broker double: records publishes and routes injected messages to the
/// handlers whose filter matches.
#[derive(Default)]
pub struct LoopbackTransport {
    published: Mutex<Vec<Published>>,
    listeners: Mutex<Vec<(String, MessageHandler)>>,
    failing: AtomicBool,
}

impl LoopbackTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }

    pub fn clear_published(&self) {
        self.published.lock().unwrap().clear();
    }

    pub fn filters(&self) -> Vec<String> {
        self.listeners
            .lock()
            .unwrap()
            .iter()
            .map(|(filter, _)| filter.clone())
            .collect()
    }

    /// Every publish fails while set
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delivers a message as if the broker sent it; returns how many
    /// listeners it was routed to.
    pub fn inject(&self, topic: &str, payload: &[u8]) -> usize {
        let listeners = self.listeners.lock().unwrap();
        let mut routed = 0;
        for (filter, handler) in listeners.iter() {
            if filter_matches(filter, topic) {
                deliver(handler, topic, payload);
                routed += 1;
            }
        }
        routed
    }
}

impl MqttTransport for LoopbackTransport {
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        retain: bool,
        qos: QoS,
    ) -> Result<(), TransportError> {
        if self.failing.load(Ordering::SeqCst) {
            let request = Request::Publish(Publish::new(topic, qos, payload));
            return Err(ClientError::TryRequest(request).into());
        }

        self.published.lock().unwrap().push(Published {
            topic: topic.to_string(),
            payload: String::from_utf8(payload).unwrap(),
            retain,
            qos,
        });
        Ok(())
    }

    fn listen(&self, filter: &str, handler: MessageHandler) -> Result<(), TransportError> {
        self.listeners
            .lock()
            .unwrap()
            .push((filter.to_string(), handler));
        Ok(())
    }
}

/// MQTT filter matching with `+` and `#`
pub fn filter_matches(filter: &str, topic: &str) -> bool {
    let mut levels = topic.split('/');
    for part in filter.split('/') {
        match (part, levels.next()) {
            ("#", _) => return true,
            ("+", Some(_)) => {}
            (part, Some(level)) if part == level => {}
            _ => return false,
        }
    }
    levels.next().is_none()
}

/// Radio double counting what was sent
#[derive(Default)]
pub struct StubRadio {
    pub opened: AtomicUsize,
    pub released: AtomicUsize,
    pub codes: Mutex<Vec<u64>>,
    pub refuse: AtomicBool,
}

impl StubRadio {
    pub fn sent(&self) -> Vec<u64> {
        self.codes.lock().unwrap().clone()
    }

    pub fn set_acknowledging(&self, ack: bool) {
        self.refuse.store(!ack, Ordering::SeqCst);
    }
}

struct StubTransmitter(Arc<StubRadio>);

impl Drop for StubTransmitter {
    fn drop(&mut self) {
        self.0.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl Transmitter for StubTransmitter {
    fn transmit(&mut self, code: u64) -> bool {
        self.0.codes.lock().unwrap().push(code);
        !self.0.refuse.load(Ordering::SeqCst)
    }
}

pub fn stub_rf() -> (RfController, Arc<StubRadio>) {
    let radio = Arc::new(StubRadio::default());
    let shared = radio.clone();
    let controller = RfController::new(move || -> Result<Box<dyn Transmitter>, RfError> {
        shared.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubTransmitter(shared.clone())))
    });
    (controller, radio)
}

pub fn catalog(json: serde_json::Value) -> DeviceCatalog {
    DeviceCatalog::from_value(&json).unwrap()
}

pub fn plain_topics() -> Arc<Topics> {
    Arc::new(Topics::new(&TopicSettings::default()).unwrap())
}

pub fn discovery_topics() -> Arc<Topics> {
    let settings = TopicSettings {
        discovery: true,
        ..TopicSettings::default()
    };
    Arc::new(Topics::new(&settings).unwrap())
}
