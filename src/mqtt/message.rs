use chrono::NaiveDateTime;
use std::fmt;
use thiserror::Error;

/// Payload published for a device that is on
pub const PAYLOAD_ON: &str = "on";
/// Payload published for a device that is off
pub const PAYLOAD_OFF: &str = "off";

const TRUTHY: [&str; 3] = ["on", "true", "an"];

/// Inbound message as handed to listener callbacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: String,
    pub received_at: NaiveDateTime,
}

impl fmt::Display for MqttMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} - {}: {}", self.received_at, self.topic, self.payload)
    }
}

impl MqttMessage {
    pub fn from_topic(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        MqttMessage {
            topic: topic.into(),
            payload: payload.into(),
            received_at: chrono::Local::now().naive_local(),
        }
    }

    /// Decodes a raw publish. The payload has to be UTF-8.
    pub fn from_publish(topic: &str, payload: &[u8]) -> Result<Self, MalformedMessageError> {
        let payload = std::str::from_utf8(payload).map_err(|_| MalformedMessageError::Payload {
            topic: topic.to_string(),
        })?;
        Ok(Self::from_topic(topic, payload))
    }

    pub fn is_on(&self) -> bool {
        parse_on_off(&self.payload)
    }
}

/// Wire representation of a device state
pub fn on_off(on: bool) -> &'static str {
    if on {
        PAYLOAD_ON
    } else {
        PAYLOAD_OFF
    }
}

/// Case-insensitive; anything that is not a known "on" token means off.
pub fn parse_on_off(payload: &str) -> bool {
    let payload = payload.trim();
    TRUTHY.iter().any(|token| payload.eq_ignore_ascii_case(token))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedMessageError {
    #[error("Could not extract a device name from topic '{0}'")]
    UnknownTopic(String),

    #[error("Payload on topic '{topic}' is not valid UTF-8")]
    Payload { topic: String },
}
