use agent_core::device::Restart;
use log::info;

/// Software restart through `esp_restart`.
pub struct EspRestart;

impl Restart for EspRestart {
    fn restart(&self) {
        info!("Restarting device...");

        // Let the UART drain before the chip goes down
        log::logger().flush();
        esp_idf_hal::delay::FreeRtos::delay_ms(100);

        esp_idf_hal::reset::restart();
    }
}

/// Get the last reset reason as a string
pub fn get_reset_reason() -> &'static str {
    let reason = unsafe { esp_idf_sys::esp_reset_reason() };

    match reason {
        esp_idf_sys::esp_reset_reason_t_ESP_RST_UNKNOWN => "Unknown",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_POWERON => "Power-on",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_EXT => "External pin",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_SW => "Software reset",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_PANIC => "Panic",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_INT_WDT => "Interrupt watchdog",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_TASK_WDT => "Task watchdog",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_WDT => "Other watchdog",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_DEEPSLEEP => "Deep sleep",
        esp_idf_sys::esp_reset_reason_t_ESP_RST_BROWNOUT => "Brownout",
        _ => "Unknown reason code",
    }
}

/// Software resets follow an install or a lost network on the previous boot.
pub fn was_software_reset() -> bool {
    let reason = unsafe { esp_idf_sys::esp_reset_reason() };
    reason == esp_idf_sys::esp_reset_reason_t_ESP_RST_SW
}
