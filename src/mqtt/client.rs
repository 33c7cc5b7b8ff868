//! rumqttc backed transport
//!
//! One client is dedicated to publishing; every listener gets a client of
//! its own. Each client is driven by a named OS thread iterating its
//! `Connection`, which is also where rumqttc reconnects after a failure.
//! Listeners (re)subscribe on every CONNACK, so subscriptions survive broker
//! restarts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use rumqttc::{Client, Connection, ConnectReturnCode, Event, Packet, QoS};
use tracing::{debug, error, info, warn};

use super::config::MqttConfig;
use super::transport::{deliver, MessageHandler, MqttTransport, TransportError};

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
enum ConnectionState {
    #[default]
    Connecting,
    Connected,
    Reconnecting,
}

pub struct RumqttTransport {
    config: MqttConfig,
    publisher: Client,
    listeners: AtomicUsize,
}

impl RumqttTransport {
    /// Creates the publishing client and starts driving it.
    pub fn connect(config: MqttConfig) -> Result<Self, TransportError> {
        if !config.is_valid() {
            return Err(TransportError::NotConfigured);
        }

        let (publisher, connection) = Client::new(config.options("pub"), config.capacity);
        let driver = Driver {
            name: "publisher".to_string(),
            client: publisher.clone(),
            subscription: None,
            reconnect_delay: config.reconnect_delay(),
        };
        thread::Builder::new()
            .name("mqtt-publisher".to_string())
            .spawn(move || driver.run(connection))?;

        info!(
            "MQTT publisher started for {}:{}",
            config.host.as_deref().unwrap_or_default(),
            config.port
        );

        Ok(Self {
            config,
            publisher,
            listeners: AtomicUsize::new(0),
        })
    }
}

impl MqttTransport for RumqttTransport {
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        retain: bool,
        qos: QoS,
    ) -> Result<(), TransportError> {
        debug!(
            topic = %topic,
            payload = %String::from_utf8_lossy(&payload),
            retain,
            "Publishing"
        );
        // try_publish: a broker outage must not block the caller once the queue is full
        self.publisher.try_publish(topic, qos, retain, payload)?;
        Ok(())
    }

    fn listen(&self, filter: &str, handler: MessageHandler) -> Result<(), TransportError> {
        let index = self.listeners.fetch_add(1, Ordering::SeqCst);
        let suffix = format!("listener{}", index);
        let (client, connection) = Client::new(self.config.options(&suffix), self.config.capacity);

        let driver = Driver {
            name: suffix,
            client,
            subscription: Some((filter.to_string(), handler)),
            reconnect_delay: self.config.reconnect_delay(),
        };
        thread::Builder::new()
            .name(format!("mqtt-listener-{}", index))
            .spawn(move || driver.run(connection))?;

        info!("Listening on '{}'", filter);
        Ok(())
    }
}

struct Driver {
    name: String,
    client: Client,
    subscription: Option<(String, MessageHandler)>,
    reconnect_delay: Duration,
}

impl Driver {
    fn run(self, mut connection: Connection) {
        let mut state = ConnectionState::default();

        for notification in connection.iter() {
            match notification {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code != ConnectReturnCode::Success {
                        error!("[{}] Broker refused connection: {:?}", self.name, ack.code);
                        continue;
                    }
                    state = ConnectionState::Connected;
                    info!("[{}] Connected to broker", self.name);
                    self.subscribe();
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    if let Some((_, handler)) = &self.subscription {
                        deliver(handler, &publish.topic, &publish.payload);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    if state != ConnectionState::Reconnecting {
                        warn!(
                            "[{}] Connection error: {}. Will automatically reconnect.",
                            self.name, e
                        );
                    } else {
                        debug!("[{}] Still disconnected: {}", self.name, e);
                    }
                    state = ConnectionState::Reconnecting;
                    thread::sleep(self.reconnect_delay);
                }
            }
        }

        info!("[{}] Event loop finished", self.name);
    }

    fn subscribe(&self) {
        let Some((filter, _)) = &self.subscription else {
            return;
        };
        match self.client.try_subscribe(filter.clone(), QoS::AtMostOnce) {
            Ok(()) => info!("[{}] Subscribed to '{}'", self.name, filter),
            Err(e) => error!("[{}] Failed to subscribe to '{}': {}", self.name, filter, e),
        }
    }
}
