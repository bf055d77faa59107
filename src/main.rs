use anyhow::Result;

// Generate ESP-IDF app descriptor
#[cfg(target_os = "espidf")]
#[allow(unexpected_cfgs)]
mod app_desc {
    esp_idf_sys::esp_app_desc!();
}

#[cfg(target_os = "espidf")]
mod config;
mod logging;
#[cfg(target_os = "espidf")]
mod mqtt;
#[cfg(target_os = "espidf")]
mod network;
#[cfg(target_os = "espidf")]
mod ota;
#[cfg(target_os = "espidf")]
mod sensors;
#[cfg(target_os = "espidf")]
mod system;
mod version;

#[cfg(target_os = "espidf")]
fn main() -> Result<()> {
    use agent_core::Agent;
    use log::info;
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_svc::{eventloop::EspSystemEventLoop, nvs::EspDefaultNvsPartition};
    use std::time::{Duration, Instant};

    use crate::network::EspWifiLink;
    use crate::sensors::ChipSensors;
    use crate::system::{reset, storage, EspRestart, GpioLed};

    // Initialize ESP-IDF
    esp_idf_svc::sys::link_patches();
    logging::init_logger()?;

    info!("{} starting", version::full_version());
    info!("Boot reason: {}", reset::get_reset_reason());
    info!("Running from app partition {}", ota::running_partition_label());
    if reset::was_software_reset() {
        info!("Software reset detected, previous boot installed an update or lost the network");
    }

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let config = config::load_or_default(nvs.clone())?;
    if !logging::set_max_level_from_str(&config.log_level) {
        log::warn!("Unknown log level '{}', keeping info", config.log_level);
    }

    let restart = EspRestart;
    let mut link = EspWifiLink::new(peripherals.modem, sys_loop, nvs)?;
    info!("WiFi MAC: {}", link.get_mac());

    // Data partition only holds the version record; firmware lives in the app slots
    let data_mounted = match storage::mount_littlefs() {
        Ok(()) => true,
        Err(e) => {
            log::error!("Data partition unavailable, skipping update: {:?}", e);
            false
        }
    };

    if data_mounted {
        match config.validate() {
            Ok(()) => {
                if let Err(e) = run_update(&config, &mut link, &restart) {
                    log::error!("Update pass aborted: {:?}", e);
                }
            }
            Err(e) => log::error!("Invalid configuration, skipping update: {}", e),
        }
    }

    let installed_version = if data_mounted {
        read_installed_version(&config)
    } else {
        None
    };

    let led = GpioLed::new(config.led_gpio)?;
    let sensors = ChipSensors::new();
    let (session, events) = mqtt::connect(&config.mqtt)?;
    let mut agent = Agent::new(
        &config,
        installed_version,
        session,
        sensors,
        led,
        &restart,
        Instant::now(),
    );

    info!("Entering main loop, publishing every {}s", config.publish_interval_secs);
    loop {
        while let Ok(event) = events.try_recv() {
            agent.handle(event);
        }
        agent.tick(Instant::now());
        std::thread::sleep(Duration::from_millis(100));
    }
}

/// One OTA pass. Only returns when no restart was requested.
#[cfg(target_os = "espidf")]
fn run_update(
    config: &agent_core::AgentConfig,
    link: &mut network::EspWifiLink,
    restart: &system::EspRestart,
) -> Result<()> {
    use agent_core::storage::FsStorage;
    use agent_core::{OtaOutcome, OtaUpdater};

    let mut slot = ota::EspFirmwareSlot::new()?;
    let mut fs = FsStorage::new(system::storage::MOUNT_POINT);
    let mut http = network::EspHttpClient::new(config.ota.http_timeout());

    let mut updater = OtaUpdater::new(config, link, &mut http, &mut fs, &mut slot, restart)?;
    log::info!("Current version: {}", updater.current_version());
    match updater.update_if_available() {
        OtaOutcome::Rebooting(cause) => {
            // Only reached if the restart request returned
            log::error!("Restart after {:?} did not happen", cause);
        }
        outcome => log::info!("OTA finished: {:?}", outcome),
    }
    Ok(())
}

/// The version to announce over MQTT; `None` when the record cannot be read.
#[cfg(target_os = "espidf")]
fn read_installed_version(config: &agent_core::AgentConfig) -> Option<u32> {
    use agent_core::ota::VersionStore;
    use agent_core::storage::FsStorage;

    let fs = FsStorage::new(system::storage::MOUNT_POINT);
    match VersionStore::read(&fs, &config.ota.version_filename) {
        Ok(version) => Some(version),
        Err(e) => {
            log::warn!("Could not read version record: {}", e);
            None
        }
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() -> Result<()> {
    logging::init_logger()?;
    log::error!(
        "{} must be built for an ESP-IDF target; run `cargo test -p agent-core` for the host logic",
        version::full_version()
    );
    std::process::exit(1);
}
