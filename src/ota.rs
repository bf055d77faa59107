// App slot handling on top of the ESP-IDF OTA API

use agent_core::ota::FirmwareSlot;
use agent_core::OtaError;
use anyhow::{bail, Result};
use core::ffi::c_void;
use esp_idf_sys::{
    esp_err_t, esp_ota_abort, esp_ota_begin, esp_ota_end, esp_ota_get_next_update_partition,
    esp_ota_get_running_partition, esp_ota_handle_t, esp_ota_set_boot_partition, esp_ota_write,
    esp_partition_t, EspError, ESP_ERR_OTA_VALIDATE_FAILED,
};
use std::ffi::CStr;

const WRITE_CHUNK: usize = 4096;

/// The `ota_0`/`ota_1` pair. Images go to whichever slot is not running;
/// `promote` points `otadata` at it.
pub struct EspFirmwareSlot {
    update_partition: *const esp_partition_t,
    staged: bool,
}

impl EspFirmwareSlot {
    pub fn new() -> Result<Self> {
        let update_partition = unsafe { esp_ota_get_next_update_partition(core::ptr::null()) };
        if update_partition.is_null() {
            bail!("No OTA update partition, the partition table needs ota_0 and ota_1");
        }

        log::info!(
            "Running from {}, updates go to {}",
            running_partition_label(),
            partition_label(update_partition)
        );
        Ok(Self {
            update_partition,
            staged: false,
        })
    }
}

fn slot_error(what: &str, code: esp_err_t) -> OtaError {
    match EspError::from(code) {
        Some(e) => OtaError::Slot(format!("{}: {}", what, e)),
        None => OtaError::Slot(format!("{}: error {}", what, code)),
    }
}

fn partition_label(partition: *const esp_partition_t) -> String {
    if partition.is_null() {
        return "<unknown>".to_string();
    }
    // Safety: partition table entries are static for the lifetime of the app
    unsafe { CStr::from_ptr((*partition).label.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

pub fn running_partition_label() -> String {
    partition_label(unsafe { esp_ota_get_running_partition() })
}

impl FirmwareSlot for EspFirmwareSlot {
    fn stage(&mut self, image: &[u8]) -> Result<(), OtaError> {
        self.staged = false;

        let mut handle: esp_ota_handle_t = 0;
        let ret = unsafe { esp_ota_begin(self.update_partition, image.len() as _, &mut handle) };
        if ret != 0 {
            return Err(slot_error("esp_ota_begin", ret));
        }

        let mut written = 0;
        for chunk in image.chunks(WRITE_CHUNK) {
            let ret = unsafe { esp_ota_write(handle, chunk.as_ptr() as *const c_void, chunk.len() as _) };
            if ret != 0 {
                unsafe { esp_ota_abort(handle) };
                return Err(slot_error("esp_ota_write", ret));
            }
            written += chunk.len();
            if written % (64 * WRITE_CHUNK) == 0 {
                log::info!("OTA progress: {}% ({}/{})", written * 100 / image.len(), written, image.len());
            }
        }

        // Checks the image header and digest before anything can boot it
        let ret = unsafe { esp_ota_end(handle) };
        if ret == ESP_ERR_OTA_VALIDATE_FAILED as esp_err_t {
            return Err(OtaError::Slot("image failed validation".to_string()));
        } else if ret != 0 {
            return Err(slot_error("esp_ota_end", ret));
        }

        self.staged = true;
        log::info!("Image written to {}", partition_label(self.update_partition));
        Ok(())
    }

    fn promote(&mut self) -> Result<(), OtaError> {
        if !self.staged {
            return Err(OtaError::Slot("no image staged".to_string()));
        }

        let ret = unsafe { esp_ota_set_boot_partition(self.update_partition) };
        if ret != 0 {
            return Err(slot_error("esp_ota_set_boot_partition", ret));
        }

        self.staged = false;
        log::info!("Boot partition set to {}", partition_label(self.update_partition));
        Ok(())
    }
}
