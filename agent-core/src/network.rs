use crate::device::Restart;
use crate::error::OtaError;
use std::fmt;
use std::thread;
use std::time::Duration;

/// Station-mode WiFi interface.
pub trait WifiLink {
    type Error: fmt::Debug;

    fn is_active(&self) -> bool;
    fn activate(&mut self) -> Result<(), Self::Error>;
    /// Starts association; does not wait for it to complete.
    fn connect(&mut self, ssid: &str, password: &str) -> Result<(), Self::Error>;
    fn is_connected(&self) -> bool;
    fn ip_address(&self) -> Option<String>;
}

impl<T: WifiLink + ?Sized> WifiLink for &mut T {
    type Error = T::Error;

    fn is_active(&self) -> bool {
        (**self).is_active()
    }

    fn activate(&mut self) -> Result<(), Self::Error> {
        (**self).activate()
    }

    fn connect(&mut self, ssid: &str, password: &str) -> Result<(), Self::Error> {
        (**self).connect(ssid, password)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn ip_address(&self) -> Option<String> {
        (**self).ip_address()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectPolicy {
    pub max_attempts: u32,
    pub attempt_interval: Duration,
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        // ~10s ceiling
        Self {
            max_attempts: 20,
            attempt_interval: Duration::from_millis(500),
        }
    }
}

/// Bring the link up, polling at most `policy.max_attempts` times.
///
/// A link that never comes up is treated as unrecoverable: the device is
/// restarted. `Err(OtaError::Network)` is only observable where the restart
/// returns (test doubles).
pub fn ensure_connected<L, R>(
    link: &mut L,
    restart: &R,
    ssid: &str,
    password: &str,
    policy: ConnectPolicy,
) -> Result<Option<String>, OtaError>
where
    L: WifiLink,
    R: Restart,
{
    if !link.is_connected() {
        log::info!("Connecting to WiFi '{}'...", ssid);

        if !link.is_active() {
            if let Err(e) = link.activate() {
                log::warn!("Failed to activate WiFi interface: {:?}", e);
            }
        }
        if let Err(e) = link.connect(ssid, password) {
            log::warn!("Failed to start WiFi connection: {:?}", e);
        }

        let mut attempt = 0;
        while !link.is_connected() && attempt < policy.max_attempts {
            thread::sleep(policy.attempt_interval);
            attempt += 1;
            log::debug!("Waiting for WiFi ({}/{})", attempt, policy.max_attempts);
        }
    }

    if link.is_connected() {
        let ip = link.ip_address();
        log::info!("Connected to WiFi, IP is: {}", ip.as_deref().unwrap_or("<unknown>"));
        Ok(ip)
    } else {
        log::error!(
            "Failed to connect to WiFi after {} attempts, restarting device",
            policy.max_attempts
        );
        restart.restart();
        Err(OtaError::Network {
            attempts: policy.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeLink, RecordingRestart};

    fn fast(max_attempts: u32) -> ConnectPolicy {
        ConnectPolicy {
            max_attempts,
            attempt_interval: Duration::ZERO,
        }
    }

    #[test]
    fn test_connects_after_a_few_polls() {
        let mut link = FakeLink::connects_after(3);
        let restart = RecordingRestart::new();

        let ip = ensure_connected(&mut link, &restart, "Fave", "pw", fast(20)).unwrap();

        assert_eq!(ip.as_deref(), Some("192.168.1.50"));
        assert!(link.activated);
        assert_eq!(link.connect_calls, vec![("Fave".to_string(), "pw".to_string())]);
        assert_eq!(restart.count(), 0);
    }

    #[test]
    fn test_already_connected_skips_association() {
        let mut link = FakeLink::connects_after(0);
        let restart = RecordingRestart::new();

        ensure_connected(&mut link, &restart, "Fave", "pw", fast(20)).unwrap();

        assert!(link.connect_calls.is_empty());
        assert_eq!(restart.count(), 0);
    }

    #[test]
    fn test_exhaustion_restarts_device() {
        let mut link = FakeLink::never_connects();
        let restart = RecordingRestart::new();

        let result = ensure_connected(&mut link, &restart, "Fave", "pw", fast(5));

        assert!(matches!(result, Err(OtaError::Network { attempts: 5 })));
        assert_eq!(restart.count(), 1);
        // one check up front, six loop conditions, one final check
        assert_eq!(link.polls(), 8);
    }

    #[test]
    fn test_driver_errors_count_as_failed_polls() {
        let mut link = FakeLink::failing_driver();
        let restart = RecordingRestart::new();

        let result = ensure_connected(&mut link, &restart, "Fave", "pw", fast(5));

        assert!(matches!(result, Err(OtaError::Network { attempts: 5 })));
        assert!(link.activated);
        assert_eq!(link.connect_calls.len(), 1);
        // the loop still polls to exhaustion after both driver calls fail
        assert_eq!(link.polls(), 8);
        assert_eq!(restart.count(), 1);
    }
}
