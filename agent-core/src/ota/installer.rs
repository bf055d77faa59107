use super::slot::FirmwareSlot;
use super::version_store::VersionStore;
use crate::device::Restart;
use crate::error::OtaError;
use crate::storage::Storage;

#[derive(Debug)]
pub enum InstallResult {
    Installed(u32),
    InstallFailed(OtaError),
}

/// Switch the boot slot to the staged image, record the new version and
/// restart.
///
/// The restart happens whatever the outcome. A failed switch leaves the boot
/// selection and the version record as they were, so the device reboots
/// into the old firmware and the next check tries again.
pub fn install<F, S, R>(
    slot: &mut F,
    storage: &mut S,
    store: &mut VersionStore,
    restart: &R,
    new_version: u32,
) -> InstallResult
where
    F: FirmwareSlot,
    S: Storage,
    R: Restart,
{
    log::info!("Updating device... (switching boot slot to version {})", new_version);

    let result = match slot.promote() {
        Ok(()) => match store.save(storage, new_version) {
            Ok(()) => {
                log::info!("Firmware version {} installed", new_version);
                InstallResult::Installed(new_version)
            }
            Err(e) => {
                // The new image boots anyway; its first check sees the old
                // number and installs the same version again.
                log::error!("Boot slot switched but version record not updated: {}", e);
                InstallResult::InstallFailed(e)
            }
        },
        Err(e) => {
            log::error!("Exception occurred while updating: {}", e);
            InstallResult::InstallFailed(e)
        }
    };

    log::info!("Restarting device...");
    restart.restart();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSlot, Journal, MemStorage, RecordingRestart};

    struct Device {
        slot: FakeSlot,
        storage: MemStorage,
        store: VersionStore,
    }

    fn staged_device(journal: &Journal) -> Device {
        let mut slot = FakeSlot::with_journal(journal.clone(), b"old image");
        slot.staged = Some(b"new image".to_vec());
        let mut storage = MemStorage::with_journal(journal.clone());
        storage.put("version.json", br#"{"version":3}"#);
        let store = VersionStore::open(&mut storage, "version.json").unwrap();
        Device {
            slot,
            storage,
            store,
        }
    }

    #[test]
    fn test_install_switches_slot_records_and_restarts() {
        let journal = Journal::new();
        let mut d = staged_device(&journal);
        let restart = RecordingRestart::with_journal(journal.clone());

        let result = install(&mut d.slot, &mut d.storage, &mut d.store, &restart, 4);

        assert!(matches!(result, InstallResult::Installed(4)));
        assert_eq!(d.slot.boot_image, b"new image");
        assert!(d.slot.staged.is_none());
        assert_eq!(d.store.load(&d.storage).unwrap(), 4);
        assert_eq!(restart.count(), 1);
        assert_eq!(
            journal.entries(),
            vec![
                "promote",
                "write version.json.tmp",
                "rename version.json.tmp -> version.json",
                "restart",
            ]
        );
    }

    #[test]
    fn test_failed_switch_keeps_version_and_still_restarts() {
        let journal = Journal::new();
        let mut d = staged_device(&journal);
        d.slot.fail_promote(true);
        let restart = RecordingRestart::new();

        let result = install(&mut d.slot, &mut d.storage, &mut d.store, &restart, 4);

        assert!(matches!(result, InstallResult::InstallFailed(OtaError::Slot(_))));
        assert_eq!(d.store.current(), 3);
        assert_eq!(d.store.load(&d.storage).unwrap(), 3);
        assert_eq!(d.slot.boot_image, b"old image");
        assert_eq!(restart.count(), 1);
    }

    #[test]
    fn test_nothing_staged_fails_install() {
        let journal = Journal::new();
        let mut d = staged_device(&journal);
        d.slot.staged = None;
        let restart = RecordingRestart::new();

        let result = install(&mut d.slot, &mut d.storage, &mut d.store, &restart, 4);

        assert!(matches!(result, InstallResult::InstallFailed(_)));
        assert_eq!(d.store.load(&d.storage).unwrap(), 3);
        assert_eq!(d.slot.boot_image, b"old image");
        assert_eq!(restart.count(), 1);
    }

    #[test]
    fn test_failed_version_write_after_switch_still_restarts() {
        let journal = Journal::new();
        let mut d = staged_device(&journal);
        d.storage.fail_writes(true);
        let restart = RecordingRestart::new();

        let result = install(&mut d.slot, &mut d.storage, &mut d.store, &restart, 4);

        assert!(matches!(result, InstallResult::InstallFailed(OtaError::Filesystem(_))));
        assert_eq!(d.slot.boot_image, b"new image");
        assert_eq!(d.store.load(&d.storage).unwrap(), 3);
        assert_eq!(restart.count(), 1);
    }
}
