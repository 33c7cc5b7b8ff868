use std::path::PathBuf;

use color_eyre::Result;
use rc433::factory::{self, Services};
use rc433::AppConfig;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;
    debug!("Effective configuration: {:?}", config);

    let services = Services::build(&config)?;
    for device in services.registry.list() {
        info!(
            device = %device.device_name(),
            variant = device.device.variant_tag(),
            "Device configured"
        );
    }

    let discovery = match factory::create_discovery(
        &config.mqtt,
        services.topics.clone(),
        services.registry.clone(),
        services.transport.clone(),
    ) {
        Ok(discovery) => discovery,
        Err(e) => {
            error!("Failed to start MQTT discovery: {}", e);
            None
        }
    };

    info!("rc433 is running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    // Listener threads only hold the registry weakly, dropping these releases the transmitter
    drop(discovery);
    drop(services);
    info!("Shutdown complete");

    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|level| level.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
