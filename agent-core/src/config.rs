/// Configuration structures that can be tested independently
use crate::network::ConnectPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("WiFi SSID cannot be empty")]
    EmptySsid,
    #[error("repository URL must start with http:// or https://: '{0}'")]
    InvalidRepoUrl(String),
    #[error("{0} cannot be empty")]
    EmptyFileName(&'static str),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("MQTT broker URL cannot be empty")]
    EmptyBroker,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WifiConfig {
    pub ssid: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OtaConfig {
    /// Repository base, e.g. `https://github.com/owner/repo/`
    pub repo_url: String,
    /// Image name under the repository's `main/` directory
    pub firmware_filename: String,
    /// Version record on the data partition
    pub version_filename: String,
    pub connect_attempts: u32,
    pub connect_interval_ms: u64,
    pub http_timeout_secs: u64,
    /// Largest image accepted; matches the size of one app slot
    pub max_firmware_bytes: usize,
}

impl Default for OtaConfig {
    fn default() -> Self {
        Self {
            repo_url: String::new(),
            firmware_filename: "firmware.bin".to_string(),
            version_filename: "version.json".to_string(),
            connect_attempts: 20,
            connect_interval_ms: 500,
            http_timeout_secs: 30,
            max_firmware_bytes: 3 * 1024 * 1024,
        }
    }
}

impl OtaConfig {
    pub fn connect_policy(&self) -> ConnectPolicy {
        ConnectPolicy {
            max_attempts: self.connect_attempts,
            attempt_interval: Duration::from_millis(self.connect_interval_ms),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MqttTopics {
    pub version: String,
    pub temperature: String,
    pub humidity: String,
    pub reset: String,
    pub led: String,
}

impl Default for MqttTopics {
    fn default() -> Self {
        Self {
            version: "esp32/version".to_string(),
            temperature: "esp32/sensor/temp".to_string(),
            humidity: "esp32/sensor/hum".to_string(),
            reset: "esp32/reset".to_string(),
            led: "esp32/led".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MqttConfig {
    pub broker_url: String,
    pub client_id: String,
    pub topics: MqttTopics,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_url: "mqtt://172.16.0.35:1883".to_string(),
            client_id: "esp32_client".to_string(),
            topics: MqttTopics::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    #[serde(default)]
    pub wifi: WifiConfig,
    #[serde(default)]
    pub ota: OtaConfig,
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default = "default_publish_interval")]
    pub publish_interval_secs: u32,
    #[serde(default = "default_led_gpio")]
    pub led_gpio: u8,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_publish_interval() -> u32 {
    5
}

fn default_led_gpio() -> u8 {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            wifi: WifiConfig::default(),
            ota: OtaConfig::default(),
            mqtt: MqttConfig::default(),
            publish_interval_secs: default_publish_interval(),
            led_gpio: default_led_gpio(),
            log_level: default_log_level(),
        }
    }
}

impl AgentConfig {
    pub fn publish_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.publish_interval_secs))
    }

    /// Reject configurations the updater could not act on safely.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wifi.ssid.is_empty() {
            return Err(ConfigError::EmptySsid);
        }

        let repo = &self.ota.repo_url;
        if !(repo.starts_with("http://") || repo.starts_with("https://")) {
            return Err(ConfigError::InvalidRepoUrl(repo.clone()));
        }

        if self.ota.firmware_filename.is_empty() {
            return Err(ConfigError::EmptyFileName("firmware_filename"));
        }
        if self.ota.version_filename.is_empty() {
            return Err(ConfigError::EmptyFileName("version_filename"));
        }

        if self.ota.connect_attempts == 0 {
            return Err(ConfigError::Zero("connect_attempts"));
        }
        if self.ota.max_firmware_bytes == 0 {
            return Err(ConfigError::Zero("max_firmware_bytes"));
        }
        if self.publish_interval_secs == 0 {
            return Err(ConfigError::Zero("publish_interval_secs"));
        }
        if self.mqtt.broker_url.is_empty() {
            return Err(ConfigError::EmptyBroker);
        }

        Ok(())
    }
}
