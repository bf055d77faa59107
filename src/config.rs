use agent_core::AgentConfig;
use anyhow::Result;
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};

const CONFIG_NAMESPACE: &str = "ota_agent";
const CONFIG_KEY: &str = "config";

/// Defaults compiled in by build.rs from agent_config.h
pub fn compiled_defaults() -> AgentConfig {
    let mut config = AgentConfig::default();
    config.wifi.ssid = env!("WIFI_SSID").to_string();
    config.wifi.password = env!("WIFI_PASSWORD").to_string();
    config.ota.repo_url = env!("OTA_REPO_URL").to_string();
    config.mqtt.broker_url = env!("MQTT_BROKER_URL").to_string();

    log::info!(
        "Config default: SSID='{}', Password={}, repo='{}'",
        config.wifi.ssid,
        if config.wifi.password.is_empty() { "<empty>" } else { "<set>" },
        config.ota.repo_url
    );
    config
}

pub fn load_or_default(partition: EspDefaultNvsPartition) -> Result<AgentConfig> {
    let mut nvs = EspNvs::new(partition, CONFIG_NAMESPACE, true)?;

    match load_from_nvs(&nvs) {
        Ok(mut config) => {
            log::info!("Loaded configuration from NVS");

            // Blank endpoints in NVS fall back to the compiled-in ones
            let defaults = compiled_defaults();
            let mut patched = false;
            if config.wifi.ssid.is_empty() {
                log::warn!("NVS WiFi credentials empty, using compiled defaults: SSID='{}'", defaults.wifi.ssid);
                config.wifi = defaults.wifi;
                patched = true;
            }
            if config.ota.repo_url.is_empty() {
                config.ota.repo_url = defaults.ota.repo_url;
                patched = true;
            }
            if config.mqtt.broker_url.is_empty() {
                config.mqtt.broker_url = defaults.mqtt.broker_url;
                patched = true;
            }

            if patched {
                if let Err(e) = save_to_nvs(&mut nvs, &config) {
                    log::warn!("Failed to save updated config: {:?}", e);
                }
            }
            Ok(config)
        }
        Err(e) => {
            log::warn!("Failed to load config from NVS: {:?}, using defaults", e);
            let config = compiled_defaults();

            // Try to save default config to NVS for next time
            if let Err(save_err) = save_to_nvs(&mut nvs, &config) {
                log::warn!("Failed to save default config to NVS: {:?}", save_err);
            }
            Ok(config)
        }
    }
}

fn load_from_nvs(nvs: &EspNvs<NvsDefault>) -> Result<AgentConfig> {
    let mut buf = vec![0u8; 2048]; // Max config size
    let data = nvs
        .get_blob(CONFIG_KEY, &mut buf)?
        .ok_or_else(|| anyhow::anyhow!("Config not found in NVS"))?;

    let config: AgentConfig = serde_json::from_slice(data)?;
    Ok(config)
}

fn save_to_nvs(nvs: &mut EspNvs<NvsDefault>, config: &AgentConfig) -> Result<()> {
    let json = serde_json::to_vec(config)?;
    nvs.set_blob(CONFIG_KEY, &json)?;
    log::info!("Configuration saved to NVS");
    Ok(())
}
