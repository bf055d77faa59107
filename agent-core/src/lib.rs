//! Agent Core - Hardware-independent logic for the ESP32 OTA sensor agent
//!
//! This crate contains the self-update pipeline and the MQTT application
//! logic. Everything that touches the radio, the app slots, flash or GPIO sits behind a
//! small trait so the whole thing can be tested on the host platform
//! without requiring ESP32 hardware.

pub mod agent;
pub mod commands;
pub mod config;
pub mod device;
pub mod error;
pub mod http;
pub mod network;
pub mod ota;
pub mod storage;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;

pub use agent::{Agent, Inbound};
pub use config::AgentConfig;
pub use error::OtaError;
pub use ota::{FirmwareSlot, OtaOutcome, OtaState, OtaUpdater, RebootCause};
