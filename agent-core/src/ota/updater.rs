// OTA Updater - sequences connect, check, fetch and install

use super::checker::{check_for_update, UpdateDecision};
use super::fetcher::{fetch, FetchRequest};
use super::installer::{install, InstallResult};
use super::slot::FirmwareSlot;
use super::urls::RepoUrls;
use super::version_store::VersionStore;
use crate::config::{AgentConfig, WifiConfig};
use crate::device::Restart;
use crate::error::OtaError;
use crate::http::HttpClient;
use crate::network::{ensure_connected, ConnectPolicy, WifiLink};
use crate::storage::Storage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaState {
    Idle,
    CheckingUpdate,
    Fetching,
    Installing,
    Rebooting,
}

#[derive(Debug)]
pub enum RebootCause {
    NetworkUnavailable,
    Installed(u32),
    InstallFailed(OtaError),
}

/// What `update_if_available` did. Only `Rebooting` means a restart was
/// requested; on hardware that variant is never actually returned.
#[derive(Debug)]
pub enum OtaOutcome {
    NoUpdate,
    CheckFailed(OtaError),
    FetchFailed(OtaError),
    Rebooting(RebootCause),
}

pub struct OtaUpdater<L, H, S, F, R> {
    link: L,
    http: H,
    storage: S,
    slot: F,
    restart: R,
    wifi: WifiConfig,
    policy: ConnectPolicy,
    urls: RepoUrls,
    max_firmware_bytes: usize,
    store: VersionStore,
    state: OtaState,
}

impl<L, H, S, F, R> OtaUpdater<L, H, S, F, R>
where
    L: WifiLink,
    H: HttpClient,
    S: Storage,
    F: FirmwareSlot,
    R: Restart,
{
    /// Derive the remote URLs and open (or create) the version record.
    pub fn new(
        config: &AgentConfig,
        link: L,
        http: H,
        mut storage: S,
        slot: F,
        restart: R,
    ) -> Result<Self, OtaError> {
        let urls = RepoUrls::new(&config.ota.repo_url, &config.ota.firmware_filename);
        let store = VersionStore::open(&mut storage, &config.ota.version_filename)?;

        Ok(Self {
            link,
            http,
            storage,
            slot,
            restart,
            wifi: config.wifi.clone(),
            policy: config.ota.connect_policy(),
            urls,
            max_firmware_bytes: config.ota.max_firmware_bytes,
            store,
            state: OtaState::Idle,
        })
    }

    pub fn current_version(&self) -> u32 {
        self.store.current()
    }

    pub fn state(&self) -> OtaState {
        self.state
    }

    pub fn urls(&self) -> &RepoUrls {
        &self.urls
    }

    /// Connect, then ask the repository whether a newer version exists.
    pub fn check(&mut self) -> UpdateDecision {
        self.state = OtaState::CheckingUpdate;

        if let Err(e) = ensure_connected(
            &mut self.link,
            &self.restart,
            &self.wifi.ssid,
            &self.wifi.password,
            self.policy,
        ) {
            return UpdateDecision::CheckFailed(e);
        }

        check_for_update(&mut self.http, &self.urls.version_url, self.store.current())
    }

    /// Check for updates, download and install them.
    ///
    /// Never propagates an error: failures before the install step leave the
    /// firmware and the version record untouched and return control to the
    /// caller.
    pub fn update_if_available(&mut self) -> OtaOutcome {
        let descriptor = match self.check() {
            UpdateDecision::UpdateAvailable(descriptor) => descriptor,
            UpdateDecision::NoUpdate => {
                log::info!("No new updates available.");
                self.state = OtaState::Idle;
                return OtaOutcome::NoUpdate;
            }
            UpdateDecision::CheckFailed(OtaError::Network { .. }) => {
                // ensure_connected already requested the restart
                self.state = OtaState::Rebooting;
                return OtaOutcome::Rebooting(RebootCause::NetworkUnavailable);
            }
            UpdateDecision::CheckFailed(e) => {
                log::warn!("Update check failed, continuing with current firmware: {}", e);
                self.state = OtaState::Idle;
                return OtaOutcome::CheckFailed(e);
            }
        };

        self.state = OtaState::Fetching;
        let request = FetchRequest {
            url: &self.urls.firmware_url,
            max_bytes: self.max_firmware_bytes,
            expected_sha256: descriptor.sha256.as_deref(),
        };
        let staged = match fetch(&mut self.http, &mut self.slot, &request) {
            Ok(staged) => staged,
            Err(e) => {
                log::warn!("Exception occurred while fetching latest code: {}", e);
                self.state = OtaState::Idle;
                return OtaOutcome::FetchFailed(e);
            }
        };

        self.state = OtaState::Installing;
        log::debug!("Staged image: {} bytes, sha256 {}", staged.size, staged.sha256);
        let result = install(
            &mut self.slot,
            &mut self.storage,
            &mut self.store,
            &self.restart,
            descriptor.version,
        );

        self.state = OtaState::Rebooting;
        OtaOutcome::Rebooting(match result {
            InstallResult::Installed(version) => RebootCause::Installed(version),
            InstallResult::InstallFailed(e) => RebootCause::InstallFailed(e),
        })
    }
}
