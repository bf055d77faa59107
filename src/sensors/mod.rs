// On-chip sensors published over MQTT

use agent_core::telemetry::{SensorReading, SensorSource};

/// The die temperature sensor. The board carries no humidity sensor, so the
/// humidity topic stays silent.
pub struct ChipSensors {
    temp_sensor_handle: Option<esp_idf_sys::temperature_sensor_handle_t>,
}

impl ChipSensors {
    pub fn new() -> Self {
        let temp_handle = unsafe {
            use esp_idf_sys::*;

            let tsens_config = temperature_sensor_config_t {
                range_min: -10,
                range_max: 80,
                clk_src: soc_periph_temperature_sensor_clk_src_t_TEMPERATURE_SENSOR_CLK_SRC_DEFAULT,
            };

            let mut handle: temperature_sensor_handle_t = std::ptr::null_mut();
            let ret = temperature_sensor_install(&tsens_config, &mut handle);
            if ret != ESP_OK {
                log::warn!("Failed to install temperature sensor: {}", ret);
                None
            } else {
                let ret = temperature_sensor_enable(handle);
                if ret != ESP_OK {
                    log::warn!("Failed to enable temperature sensor: {}", ret);
                    temperature_sensor_uninstall(handle);
                    None
                } else {
                    log::info!("Temperature sensor initialized successfully");
                    Some(handle)
                }
            }
        };

        Self {
            temp_sensor_handle: temp_handle,
        }
    }

    fn read_internal_temperature(&self) -> Option<f32> {
        let handle = self.temp_sensor_handle?;
        let mut temp_celsius = 0.0f32;
        let ret = unsafe { esp_idf_sys::temperature_sensor_get_celsius(handle, &mut temp_celsius) };
        if ret != esp_idf_sys::ESP_OK {
            log::warn!("Failed to read temperature: {}", ret);
            None
        } else {
            Some(temp_celsius)
        }
    }
}

impl SensorSource for ChipSensors {
    fn sample(&mut self) -> SensorReading {
        SensorReading {
            temperature_c: self.read_internal_temperature(),
            humidity_pct: None,
        }
    }
}

impl Drop for ChipSensors {
    fn drop(&mut self) {
        if let Some(handle) = self.temp_sensor_handle {
            unsafe {
                esp_idf_sys::temperature_sensor_disable(handle);
                esp_idf_sys::temperature_sensor_uninstall(handle);
            }
        }
    }
}
