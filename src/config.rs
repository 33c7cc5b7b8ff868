//! # Configuration
//!
//! Daemon settings are read from a TOML file and then overridden by
//! environment variables, so a container deployment can run without a file:
//!
//! ```toml
//! [general]
//! config_dir = "/etc/rc433"
//! devices_file = "devices.json"
//!
//! [rf]
//! gpio_out = 17
//! protocol = 1
//! dry_run = false
//!
//! [mqtt]
//! host = "broker.local"
//! port = 1883
//!
//! [topics]
//! discovery = true
//! root = "rc433"
//! state = "state"
//! command = "set"
//! ```
//!
//! Every section is optional; a missing file means defaults everywhere.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::mqtt::{MqttConfig, TopicError, TopicSettings, Topics};
use crate::rf::GpioSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for {name}: {reason}")]
    InvalidOverride {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Invalid topic configuration: {0}")]
    Topics(#[from] TopicError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub rf: RfConfig,
    pub mqtt: MqttConfig,
    pub topics: TopicSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the device catalog
    pub config_dir: PathBuf,
    pub devices_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            devices_file: "devices.json".to_string(),
        }
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("rc433"))
        .unwrap_or_else(|| {
            warn!("Could not determine config directory, using ./conf");
            PathBuf::from("./conf")
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RfConfig {
    /// BCM number of the transmitter pin
    pub gpio_out: u8,
    pub protocol: u8,
    pub pulse_length: Option<u32>,
    pub code_length: u32,
    pub repeat: u32,
    /// Acknowledge every code without touching the GPIO
    pub dry_run: bool,
}

impl Default for RfConfig {
    fn default() -> Self {
        let gpio = GpioSettings::default();
        Self {
            gpio_out: gpio.pin,
            protocol: gpio.protocol,
            pulse_length: gpio.pulse_length,
            code_length: gpio.code_length,
            repeat: gpio.repeat,
            dry_run: false,
        }
    }
}

impl RfConfig {
    pub fn gpio_settings(&self) -> GpioSettings {
        GpioSettings {
            pin: self.gpio_out,
            protocol: self.protocol,
            pulse_length: self.pulse_length,
            code_length: self.code_length,
            repeat: self.repeat,
        }
    }
}

impl AppConfig {
    /// Reads `path` (if given and present), applies the process environment
    /// and validates the topic layout.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, std::env::vars())
    }

    pub fn load_with<I, K, V>(path: Option<&Path>, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            Some(path) => {
                warn!(
                    "Config file {} does not exist, using defaults",
                    path.display()
                );
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_overrides(vars)?;
        config.topics()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading config from {}", path.display());
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Applies the environment variable overrides. Unrelated names are ignored.
    pub fn apply_overrides<I, K, V>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in vars {
            let (name, value) = (name.as_ref(), value.as_ref());
            match name {
                "CONFIG_DIR" => self.general.config_dir = PathBuf::from(value),
                "GPIO_OUT" => self.rf.gpio_out = parse(name, value)?,
                "MQTT_HOST" => self.mqtt.host = non_empty(value),
                "MQTT_PORT" => self.mqtt.port = parse(name, value)?,
                "MQTT_USER" => self.mqtt.user = non_empty(value),
                "MQTT_PASSWORD" => self.mqtt.password = non_empty(value),
                "MQTT_ROOT" => self.topics.root = value.to_string(),
                "MQTT_STATE_TOPIC" => self.topics.state = value.to_string(),
                "MQTT_DISCOVERY" => self.topics.discovery = is_truthy(value),
                "MQTT_COMMAND_TOPIC" => self.topics.command = non_empty(value),
                _ => continue,
            }
            debug!("Applied override {}", name);
        }
        Ok(())
    }

    pub fn devices_path(&self) -> PathBuf {
        self.general.config_dir.join(&self.general.devices_file)
    }

    pub fn topics(&self) -> Result<Topics, TopicError> {
        Topics::new(&self.topics)
    }
}

fn parse<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidOverride {
            name: name.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const NO_ENV: [(&str, &str); 0] = [];

    #[test]
    fn defaults_match_the_documented_values() {
        let config = AppConfig::default();

        assert_eq!(config.general.devices_file, "devices.json");
        assert_eq!(config.rf.gpio_out, 17);
        assert_eq!(config.rf.protocol, 1);
        assert_eq!(config.rf.code_length, 24);
        assert_eq!(config.rf.repeat, 10);
        assert!(!config.rf.dry_run);
        assert_eq!(config.mqtt.host, None);
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.topics.root, "rc433");
        assert!(!config.topics.discovery);
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[rf]\ndry_run = true\n\n[mqtt]\nhost = \"broker.local\"\n\n[topics]\ndiscovery = true"
        )
        .unwrap();

        let config = AppConfig::load_with(Some(file.path()), NO_ENV).unwrap();

        assert!(config.rf.dry_run);
        assert_eq!(config.rf.gpio_out, 17);
        assert_eq!(config.mqtt.host.as_deref(), Some("broker.local"));
        assert_eq!(config.mqtt.port, 1883);
        assert!(config.topics().unwrap().supports_commands());
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_with(Some(&dir.path().join("absent.toml")), NO_ENV).unwrap();

        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn broken_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[mqtt\nhost = ").unwrap();

        let err = AppConfig::load_with(Some(file.path()), NO_ENV).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = AppConfig::default();
        config
            .apply_overrides([
                ("CONFIG_DIR", "/srv/rc433"),
                ("GPIO_OUT", "27"),
                ("MQTT_HOST", "mqtt"),
                ("MQTT_PORT", "8883"),
                ("MQTT_USER", "user"),
                ("MQTT_PASSWORD", "secret"),
                ("MQTT_ROOT", "home"),
                ("MQTT_STATE_TOPIC", "status"),
                ("MQTT_DISCOVERY", "Yes"),
                ("MQTT_COMMAND_TOPIC", "cmd"),
                ("PATH", "/usr/bin"),
            ])
            .unwrap();

        assert_eq!(config.devices_path(), PathBuf::from("/srv/rc433/devices.json"));
        assert_eq!(config.rf.gpio_out, 27);
        assert_eq!(config.mqtt.host.as_deref(), Some("mqtt"));
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.mqtt.user.as_deref(), Some("user"));
        assert_eq!(config.mqtt.password.as_deref(), Some("secret"));

        let topics = config.topics().unwrap();
        assert_eq!(topics.state_topic("lamp"), "home/switch/lamp/status");
        assert_eq!(topics.command_topic("lamp").unwrap(), "home/switch/lamp/cmd");
    }

    #[test]
    fn empty_command_topic_disables_commands() {
        let mut config = AppConfig::default();
        config
            .apply_overrides([("MQTT_DISCOVERY", "true"), ("MQTT_COMMAND_TOPIC", "")])
            .unwrap();

        assert_eq!(config.topics.command, None);
        assert!(!config.topics().unwrap().supports_commands());
    }

    #[test]
    fn invalid_number_names_the_variable() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides([("MQTT_PORT", "eighteen")])
            .unwrap_err();

        match err {
            ConfigError::InvalidOverride { name, value, .. } => {
                assert_eq!(name, "MQTT_PORT");
                assert_eq!(value, "eighteen");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_topics_are_rejected_on_load() {
        let err = AppConfig::load_with(None, [("MQTT_STATE_TOPIC", "a/b")]).unwrap_err();
        assert!(matches!(err, ConfigError::Topics(_)));
    }
}
