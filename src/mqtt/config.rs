use std::time::Duration;

use rumqttc::MqttOptions;
use serde::{Deserialize, Serialize};

/// Broker connection parameters.
///
/// MQTT is disabled unless `host` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker hostname, `None` disables every MQTT feature
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Prefix of the client ids; every connection appends its own suffix
    pub client_id: String,
    pub keep_alive_secs: u64,
    /// Capacity of the request queue between a client and its event loop
    pub capacity: usize,
    /// Pause before polling again after a connection error
    pub reconnect_delay_ms: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 1883,
            user: None,
            password: None,
            client_id: "rc433".to_string(),
            keep_alive_secs: 30,
            capacity: 64,
            reconnect_delay_ms: 1000,
        }
    }
}

impl MqttConfig {
    pub fn is_valid(&self) -> bool {
        self.host.as_deref().is_some_and(|host| !host.trim().is_empty())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Connection options for one client. Each connection needs a distinct
    /// `suffix`, brokers drop older sessions sharing a client id.
    pub fn options(&self, suffix: &str) -> MqttOptions {
        let host = self.host.clone().unwrap_or_default();
        let mut options = MqttOptions::new(format!("{}-{}", self.client_id, suffix), host, self.port);
        options.set_keep_alive(Duration::from_secs(self.keep_alive_secs.max(5)));
        if let Some(user) = &self.user {
            options.set_credentials(user.clone(), self.password.clone().unwrap_or_default());
        }
        options
    }
}

/// Raw topic layout settings, see [`super::topics::Topics`] for the derived form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicSettings {
    /// Publish discovery payloads and accept commands
    pub discovery: bool,
    pub root: String,
    pub state: String,
    /// Command segment, only used when discovery is enabled
    pub command: Option<String>,
}

impl Default for TopicSettings {
    fn default() -> Self {
        Self {
            discovery: false,
            root: "rc433".to_string(),
            state: "state".to_string(),
            command: Some("set".to_string()),
        }
    }
}
