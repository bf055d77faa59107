use agent_core::device::StatusLed;
use anyhow::Result;
use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};

/// Status LED on a plain GPIO, active high.
pub struct GpioLed {
    pin: PinDriver<'static, AnyOutputPin, Output>,
}

impl GpioLed {
    /// The pin number comes from runtime config, so the pin is claimed by
    /// number rather than taken from `Peripherals`.
    pub fn new(gpio: u8) -> Result<Self> {
        // Safety: the configured LED pin is not handed to any other driver
        let pin = unsafe { AnyOutputPin::new(i32::from(gpio)) };
        let mut pin = PinDriver::output(pin)?;
        pin.set_low()?;
        log::info!("Status LED on GPIO{}", gpio);
        Ok(Self { pin })
    }
}

impl StatusLed for GpioLed {
    fn set(&mut self, on: bool) {
        let result = if on { self.pin.set_high() } else { self.pin.set_low() };
        if let Err(e) = result {
            log::warn!("Failed to drive LED: {:?}", e);
        }
    }
}
