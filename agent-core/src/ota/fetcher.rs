use super::slot::FirmwareSlot;
use crate::error::OtaError;
use crate::http::HttpClient;
use sha2::{Digest, Sha256};

/// Where to download from and what the image must look like.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub url: &'a str,
    pub max_bytes: usize,
    pub expected_sha256: Option<&'a str>,
}

/// An image written to the inactive slot, waiting for promotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifact {
    pub size: usize,
    pub sha256: String,
}

pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Download the firmware image and stage it in the inactive slot.
///
/// The image is checked for size and digest before the slot is touched, so
/// a rejected download never costs a flash erase. The running firmware is
/// never written.
pub fn fetch<H, F>(
    http: &mut H,
    slot: &mut F,
    request: &FetchRequest<'_>,
) -> Result<StagedArtifact, OtaError>
where
    H: HttpClient,
    F: FirmwareSlot,
{
    log::info!("Downloading firmware from {}", request.url);

    let response = http.get(request.url, request.max_bytes)?;
    if !response.is_ok() {
        log::warn!(
            "Failed to download the latest code, status code: {}",
            response.status
        );
        return Err(OtaError::Http {
            status: response.status,
        });
    }

    let size = response.body.len();
    if size == 0 || size > request.max_bytes {
        return Err(OtaError::InvalidSize(size));
    }

    let sha256 = sha256_hex(&response.body);
    if let Some(expected) = request.expected_sha256 {
        if !expected.trim().eq_ignore_ascii_case(&sha256) {
            return Err(OtaError::Integrity {
                expected: expected.trim().to_ascii_lowercase(),
                actual: sha256,
            });
        }
        log::info!("Firmware digest verified");
    }

    slot.stage(&response.body)?;

    log::info!("Staged {} bytes in the inactive slot", size);
    Ok(StagedArtifact { size, sha256 })
}
