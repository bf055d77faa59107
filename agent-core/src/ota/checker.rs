use crate::error::OtaError;
use crate::http::HttpClient;
use serde::{Deserialize, Deserializer};

/// Upper bound for `version.json`; anything larger is not a descriptor.
pub const MAX_DESCRIPTOR_BYTES: usize = 4096;

/// The remote `version.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteDescriptor {
    #[serde(deserialize_with = "version_number")]
    pub version: u32,
    /// Hex SHA-256 of the firmware image, when the repository publishes one
    #[serde(default)]
    pub sha256: Option<String>,
}

// Accepts `4` as well as `"4"`.
fn version_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => u32::try_from(n).map_err(serde::de::Error::custom),
        Raw::Text(s) => s.trim().parse::<u32>().map_err(serde::de::Error::custom),
    }
}

#[derive(Debug)]
pub enum UpdateDecision {
    NoUpdate,
    UpdateAvailable(RemoteDescriptor),
    CheckFailed(OtaError),
}

/// The only update trigger: strictly newer. No downgrades.
pub fn is_newer(local: u32, remote: u32) -> bool {
    local < remote
}

pub fn parse_descriptor(body: &[u8]) -> Result<RemoteDescriptor, OtaError> {
    Ok(serde_json::from_slice(body)?)
}

/// Fetch `version_url` once and compare it with `current_version`.
///
/// Every failure (status, transport, body) is reported as `CheckFailed`;
/// nothing is written anywhere.
pub fn check_for_update<H: HttpClient>(
    http: &mut H,
    version_url: &str,
    current_version: u32,
) -> UpdateDecision {
    log::info!("Checking for latest version... on {}", version_url);

    let response = match http.get(version_url, MAX_DESCRIPTOR_BYTES) {
        Ok(response) => response,
        Err(e) => {
            log::warn!("Exception occurred while checking for updates: {}", e);
            return UpdateDecision::CheckFailed(e);
        }
    };

    if !response.is_ok() {
        log::warn!("Error: received status code {}", response.status);
        log::debug!("Response text was: {}", response.body_preview(200));
        return UpdateDecision::CheckFailed(OtaError::Http {
            status: response.status,
        });
    }

    let descriptor = match parse_descriptor(&response.body) {
        Ok(descriptor) => descriptor,
        Err(e) => {
            log::warn!("Error parsing version descriptor: {}", e);
            log::debug!("Response text was: {}", response.body_preview(200));
            return UpdateDecision::CheckFailed(e);
        }
    };

    log::info!("latest version is: {}", descriptor.version);
    let newer = is_newer(current_version, descriptor.version);
    log::info!("Newer version available: {}", newer);

    if newer {
        UpdateDecision::UpdateAvailable(descriptor)
    } else {
        UpdateDecision::NoUpdate
    }
}
