// OTA (Over-The-Air) update module

pub mod checker;
pub mod fetcher;
pub mod installer;
pub mod slot;
pub mod updater;
pub mod urls;
pub mod version_store;

pub use checker::{RemoteDescriptor, UpdateDecision};
pub use fetcher::StagedArtifact;
pub use installer::InstallResult;
pub use slot::FirmwareSlot;
pub use updater::{OtaOutcome, OtaState, OtaUpdater, RebootCause};
pub use urls::RepoUrls;
pub use version_store::{VersionRecord, VersionStore};

// OTA update flow (once per boot, before the main loop):
// 1. Bring up WiFi (restart if it never comes up)
// 2. Fetch version.json and compare with the local record
// 3. Download the image and write it to the inactive slot
// 4. Switch the boot slot, record the version
// 5. Restart
