//! Wiring of the registry and its collaborators from an [`AppConfig`].
//!
//! Backends are picked from the configuration: with a usable MQTT config the
//! state is mirrored to the broker and discovery may run, otherwise state is
//! kept in memory only.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::{AppConfig, RfConfig};
use crate::device::{ConfigurationError, DeviceCatalog};
use crate::mqtt::discovery::{self, Listening};
use crate::mqtt::{
    DiscoveryError, MqttConfig, MqttDiscovery, MqttTransport, RumqttTransport, TopicError, Topics,
    TransportError,
};
use crate::registry::{DeviceRegistry, RegistryError};
use crate::rf::{DryRunTransmitter, GpioTransmitter, RfController, RfError, Transmitter};
use crate::state::{DeviceState, MemoryState, MqttState};

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Device catalog error: {0}")]
    Catalog(#[from] ConfigurationError),

    #[error(transparent)]
    Topics(#[from] TopicError),

    #[error("MQTT transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Everything a running service needs, built once at startup
pub struct Services {
    pub registry: Arc<DeviceRegistry>,
    pub topics: Arc<Topics>,
    pub transport: Option<Arc<dyn MqttTransport>>,
}

impl Services {
    pub fn build(config: &AppConfig) -> Result<Self, SetupError> {
        let topics = Arc::new(config.topics()?);
        let transport = create_transport(&config.mqtt)?;
        let registry = create_registry(config, transport.clone(), topics.clone())?;

        Ok(Self {
            registry,
            topics,
            transport,
        })
    }
}

pub fn create_store(config: &AppConfig) -> Result<DeviceCatalog, ConfigurationError> {
    DeviceCatalog::from_json_file(config.devices_path())
}

/// Connects to the broker if MQTT is configured
pub fn create_transport(
    config: &MqttConfig,
) -> Result<Option<Arc<dyn MqttTransport>>, TransportError> {
    if !config.is_valid() {
        info!("No MQTT host configured, running without MQTT");
        return Ok(None);
    }
    let transport: Arc<dyn MqttTransport> = Arc::new(RumqttTransport::connect(config.clone())?);
    Ok(Some(transport))
}

pub fn create_state(
    transport: Option<Arc<dyn MqttTransport>>,
    topics: Arc<Topics>,
) -> Box<dyn DeviceState> {
    match transport {
        Some(transport) => {
            info!("Using MQTT synchronised device state");
            Box::new(MqttState::new(transport, topics))
        }
        None => {
            info!("Using in-memory device state");
            Box::new(MemoryState::new())
        }
    }
}

pub fn create_rf_controller(config: &RfConfig) -> RfController {
    if config.dry_run {
        info!("RF dry run enabled, codes will not be transmitted");
        return RfController::new(|| -> Result<Box<dyn Transmitter>, RfError> {
            Ok(Box::new(DryRunTransmitter))
        });
    }

    let settings = config.gpio_settings();
    RfController::new(move || -> Result<Box<dyn Transmitter>, RfError> {
        Ok(Box::new(GpioTransmitter::open(&settings)?))
    })
}

pub fn create_registry(
    config: &AppConfig,
    transport: Option<Arc<dyn MqttTransport>>,
    topics: Arc<Topics>,
) -> Result<Arc<DeviceRegistry>, SetupError> {
    let store = create_store(config)?;
    let state = create_state(transport, topics);
    let rf = create_rf_controller(&config.rf);

    Ok(Arc::new(DeviceRegistry::new(Box::new(store), state, rf)?))
}

/// Starts discovery when it can work; `None` otherwise.
pub fn create_discovery(
    config: &MqttConfig,
    topics: Arc<Topics>,
    registry: Arc<DeviceRegistry>,
    transport: Option<Arc<dyn MqttTransport>>,
) -> Result<Option<MqttDiscovery<Listening>>, DiscoveryError> {
    let Some(transport) = transport.filter(|_| config.is_valid()) else {
        warn!("MQTT discovery disabled, configure an MQTT host to enable it");
        return Ok(None);
    };
    if !topics.supports_commands() {
        warn!("MQTT discovery disabled, set MQTT_DISCOVERY and a command topic to enable it");
        return Ok(None);
    }

    discovery::run(config, topics, registry, transport).map(Some)
}
