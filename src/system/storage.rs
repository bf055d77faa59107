use anyhow::{bail, Result};
use esp_idf_sys::littlefs::{esp_vfs_littlefs_conf_t, esp_vfs_littlefs_register};
use std::ffi::CStr;

/// Where the data partition shows up in the VFS.
pub const MOUNT_POINT: &str = "/littlefs";

const BASE_PATH: &CStr = c"/littlefs";
const PARTITION_LABEL: &CStr = c"storage";

/// Mount the LittleFS data partition holding the firmware images and the
/// version record. A partition that fails to mount is formatted.
pub fn mount_littlefs() -> Result<()> {
    let mut conf: esp_vfs_littlefs_conf_t = Default::default();
    conf.base_path = BASE_PATH.as_ptr();
    conf.partition_label = PARTITION_LABEL.as_ptr();
    conf.set_format_if_mount_failed(1);
    conf.set_dont_mount(0);

    let ret = unsafe { esp_vfs_littlefs_register(&conf) };
    if ret != esp_idf_sys::ESP_OK {
        bail!("Failed to mount LittleFS partition 'storage': error {}", ret);
    }

    log::info!("LittleFS mounted at {}", MOUNT_POINT);
    Ok(())
}
