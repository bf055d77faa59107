pub mod led;
pub mod reset;
pub mod storage;

pub use led::GpioLed;
pub use reset::EspRestart;
