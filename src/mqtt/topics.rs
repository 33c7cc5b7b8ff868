//! Topic protocol
//!
//! Every device owns three topics below a common root:
//!
//! ```text
//! <root>[/switch]/<device_name>/<state>     current state, retained "on"/"off"
//! <root>[/switch]/<device_name>/<command>   requested state (discovery only)
//! <root>[/switch]/<device_name>/config      discovery payload
//! ```
//!
//! The `/switch` level is inserted when discovery is enabled so the root can
//! point at an automation system's discovery prefix. Generation and
//! [`Topics::extract_device`] are inverse operations for device names made
//! of word characters.

use std::fmt;

use thiserror::Error;

use super::config::TopicSettings;

const DISCOVERY_COMPONENT: &str = "switch";
const CONFIG_SEGMENT: &str = "config";
const SINGLE_LEVEL_WILDCARD: &str = "+";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicKind {
    State,
    Command,
    Config,
}

impl fmt::Display for TopicKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self {
            TopicKind::State => "state",
            TopicKind::Command => "command",
            TopicKind::Config => "config",
        };
        f.write_str(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicError {
    #[error("No command topic is configured")]
    CommandsNotSupported,

    #[error("Invalid topic {name} '{value}': {reason}")]
    InvalidSegment {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Validated topic layout, derived once from [`TopicSettings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    root: String,
    state: String,
    command: Option<String>,
}

impl Topics {
    pub fn new(settings: &TopicSettings) -> Result<Self, TopicError> {
        let root = settings.root.trim_matches('/');
        validate("root", root, true)?;
        validate("state segment", &settings.state, false)?;

        let command = match settings.command.as_deref() {
            Some(command) if settings.discovery && !command.is_empty() => {
                validate("command segment", command, false)?;
                if command == settings.state {
                    return Err(TopicError::InvalidSegment {
                        name: "command segment",
                        value: command.to_string(),
                        reason: "must differ from the state segment",
                    });
                }
                Some(command.to_string())
            }
            _ => None,
        };

        let root = if settings.discovery {
            format!("{}/{}", root, DISCOVERY_COMPONENT)
        } else {
            root.to_string()
        };

        Ok(Self {
            root,
            state: settings.state.clone(),
            command,
        })
    }

    pub fn state_topic(&self, device_name: &str) -> String {
        self.device_topic(device_name, &self.state)
    }

    /// Filter matching the state topics of all devices
    pub fn all_states_topic(&self) -> String {
        self.state_topic(SINGLE_LEVEL_WILDCARD)
    }

    pub fn supports_commands(&self) -> bool {
        self.command.is_some()
    }

    pub fn command_topic(&self, device_name: &str) -> Result<String, TopicError> {
        let command = self
            .command
            .as_deref()
            .ok_or(TopicError::CommandsNotSupported)?;
        Ok(self.device_topic(device_name, command))
    }

    /// Filter matching the command topics of all devices
    pub fn all_commands_topic(&self) -> Result<String, TopicError> {
        self.command_topic(SINGLE_LEVEL_WILDCARD)
    }

    pub fn config_topic(&self, device_name: &str) -> String {
        self.device_topic(device_name, CONFIG_SEGMENT)
    }

    pub fn topic(&self, kind: TopicKind, device_name: &str) -> Result<String, TopicError> {
        match kind {
            TopicKind::State => Ok(self.state_topic(device_name)),
            TopicKind::Command => self.command_topic(device_name),
            TopicKind::Config => Ok(self.config_topic(device_name)),
        }
    }

    /// Recovers the device name from a concrete topic of the given kind.
    ///
    /// The whole topic has to match the template and the name has to consist
    /// of word characters only; anything else yields `None`.
    pub fn extract_device(&self, topic: &str, kind: TopicKind) -> Option<String> {
        let segment = match kind {
            TopicKind::State => self.state.as_str(),
            TopicKind::Command => self.command.as_deref()?,
            TopicKind::Config => CONFIG_SEGMENT,
        };

        let device_name = topic
            .strip_prefix(self.root.as_str())?
            .strip_prefix('/')?
            .strip_suffix(segment)?
            .strip_suffix('/')?;

        is_addressable(device_name).then(|| device_name.to_string())
    }

    fn device_topic(&self, device_name: &str, segment: &str) -> String {
        format!("{}/{}/{}", self.root, device_name, segment)
    }
}

/// Whether a device name can be recovered from its topics: non-empty and
/// made of word characters only.
pub fn is_addressable(device_name: &str) -> bool {
    !device_name.is_empty() && device_name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn validate(name: &'static str, value: &str, allow_levels: bool) -> Result<(), TopicError> {
    let invalid = |reason| TopicError::InvalidSegment {
        name,
        value: value.to_string(),
        reason,
    };

    if value.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if value.contains(['+', '#']) {
        return Err(invalid("must not contain wildcards"));
    }
    if !allow_levels && value.contains('/') {
        return Err(invalid("must be a single topic level"));
    }
    if value == CONFIG_SEGMENT && !allow_levels {
        return Err(invalid("is reserved for discovery payloads"));
    }
    Ok(())
}
