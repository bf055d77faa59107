use crate::error::OtaError;
use crate::storage::Storage;
use serde::{Deserialize, Serialize};

/// On-disk shape of the installed firmware version: `{"version": 3}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version: u32,
}

/// The only state that survives a reboot.
///
/// Holds the record's file name and the last value read or written; the
/// storage itself is passed in per call so the installer can share it.
#[derive(Debug)]
pub struct VersionStore {
    name: String,
    current: u32,
}

impl VersionStore {
    /// Read the record, creating `{"version": 0}` on first boot.
    ///
    /// A record that cannot be parsed is reset to 0: the next check then
    /// reinstalls whatever the repository currently advertises.
    pub fn open<S: Storage>(storage: &mut S, name: &str) -> Result<Self, OtaError> {
        let mut store = Self {
            name: name.to_string(),
            current: 0,
        };

        match storage.read(name)? {
            Some(bytes) => match serde_json::from_slice::<VersionRecord>(&bytes) {
                Ok(record) => {
                    store.current = record.version;
                    log::info!("Current device firmware version is '{}'", record.version);
                }
                Err(e) => {
                    log::warn!("Version record {} is unreadable ({}), resetting to 0", name, e);
                    store.save(storage, 0)?;
                }
            },
            None => {
                log::info!("No version record found, creating {} with version 0", name);
                store.save(storage, 0)?;
            }
        }

        Ok(store)
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read a record without creating or repairing it.
    pub fn read<S: Storage>(storage: &S, name: &str) -> Result<u32, OtaError> {
        let bytes = storage
            .read(name)?
            .ok_or_else(|| OtaError::Parse(format!("version record {} is missing", name)))?;
        let record: VersionRecord = serde_json::from_slice(&bytes)?;
        Ok(record.version)
    }

    /// Re-read the persisted value.
    pub fn load<S: Storage>(&self, storage: &S) -> Result<u32, OtaError> {
        Self::read(storage, &self.name)
    }

    /// Write through a temp file and rename it over the record.
    pub fn save<S: Storage>(&mut self, storage: &mut S, version: u32) -> Result<(), OtaError> {
        let json = serde_json::to_vec(&VersionRecord { version })?;
        let tmp = format!("{}.tmp", self.name);

        storage.write(&tmp, &json)?;
        storage.rename(&tmp, &self.name)?;

        self.current = version;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FsStorage;
    use crate::testing::MemStorage;

    #[test]
    fn test_first_boot_creates_zero_record() {
        let mut storage = MemStorage::new();
        let store = VersionStore::open(&mut storage, "version.json").unwrap();

        assert_eq!(store.current(), 0);
        assert_eq!(storage.file("version.json").unwrap(), br#"{"version":0}"#);
        assert!(!storage.exists("version.json.tmp"));
    }

    #[test]
    fn test_existing_record_is_read() {
        let mut storage = MemStorage::new();
        storage.put("version.json", br#"{"version": 3}"#);

        let store = VersionStore::open(&mut storage, "version.json").unwrap();
        assert_eq!(store.current(), 3);
    }

    #[test]
    fn test_corrupt_record_resets_to_zero() {
        let mut storage = MemStorage::new();
        storage.put("version.json", b"{\"version\": ");

        let store = VersionStore::open(&mut storage, "version.json").unwrap();
        assert_eq!(store.current(), 0);
        assert_eq!(store.load(&storage).unwrap(), 0);
    }

    #[test]
    fn test_negative_version_is_rejected() {
        let mut storage = MemStorage::new();
        storage.put("version.json", br#"{"version": -1}"#);

        let store = VersionStore::open(&mut storage, "version.json").unwrap();
        assert_eq!(store.current(), 0);
    }

    #[test]
    fn test_round_trip_on_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FsStorage::new(dir.path());

        let mut store = VersionStore::open(&mut storage, "version.json").unwrap();
        for version in [1, 7, 42, u32::MAX] {
            store.save(&mut storage, version).unwrap();
            assert_eq!(store.current(), version);
            assert_eq!(store.load(&storage).unwrap(), version);

            let reopened = VersionStore::open(&mut storage, "version.json").unwrap();
            assert_eq!(reopened.current(), version);
        }
    }

    #[test]
    fn test_failed_save_keeps_previous_value() {
        let mut storage = MemStorage::new();
        storage.put("version.json", br#"{"version": 3}"#);
        let mut store = VersionStore::open(&mut storage, "version.json").unwrap();

        storage.fail_writes(true);
        assert!(store.save(&mut storage, 4).is_err());

        assert_eq!(store.current(), 3);
        assert_eq!(store.load(&storage).unwrap(), 3);
    }

    #[test]
    fn test_failed_rename_keeps_previous_record() {
        let mut storage = MemStorage::new();
        storage.put("version.json", br#"{"version": 3}"#);
        let mut store = VersionStore::open(&mut storage, "version.json").unwrap();

        storage.fail_renames(true);
        assert!(matches!(store.save(&mut storage, 4), Err(OtaError::Filesystem(_))));

        assert_eq!(store.current(), 3);
        assert_eq!(store.load(&storage).unwrap(), 3);
    }

    #[test]
    fn test_read_does_not_create_or_repair() {
        let storage = MemStorage::new();
        assert!(matches!(
            VersionStore::read(&storage, "version.json"),
            Err(OtaError::Parse(_))
        ));
        assert!(!storage.exists("version.json"));

        let mut storage = MemStorage::new();
        storage.put("version.json", b"garbage");
        assert!(VersionStore::read(&storage, "version.json").is_err());
        assert_eq!(storage.file("version.json").unwrap(), b"garbage");

        storage.put("version.json", br#"{"version": 3}"#);
        assert_eq!(VersionStore::read(&storage, "version.json").unwrap(), 3);
    }
}
