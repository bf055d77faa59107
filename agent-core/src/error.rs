use std::io;
use thiserror::Error;

/// Everything that can go wrong while checking for, fetching or installing
/// a firmware update.
///
/// None of these ever leave the updater: each one is either downgraded to
/// "no update performed" or routed to a device restart.
#[derive(Debug, Error)]
pub enum OtaError {
    #[error("network unavailable after {attempts} connection attempts")]
    Network { attempts: u32 },

    #[error("unexpected HTTP status {status}")]
    Http { status: u16 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("filesystem error: {0}")]
    Filesystem(#[from] io::Error),

    #[error("firmware slot error: {0}")]
    Slot(String),

    #[error("sha256 mismatch: expected {expected}, got {actual}")]
    Integrity { expected: String, actual: String },

    #[error("invalid firmware size: {0} bytes")]
    InvalidSize(usize),
}

impl From<serde_json::Error> for OtaError {
    fn from(err: serde_json::Error) -> Self {
        OtaError::Parse(err.to_string())
    }
}
