// Centralized build information

// Cargo package version from Cargo.toml. The OTA version compared against
// the repository is the integer in version.json, not this string.
pub const CARGO_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const FIRMWARE_NAME: &str = "ESP32 OTA Agent";

// Full version string for the boot banner
pub fn full_version() -> String {
    format!("{} {}", FIRMWARE_NAME, CARGO_VERSION)
}
