use crate::error::OtaError;

/// The pair of application slots the bootloader chooses between.
///
/// `stage` only ever writes the slot that is not running. `promote` is the
/// single atomic step that makes the staged image the one booted next; until
/// it succeeds the device keeps booting the current firmware.
pub trait FirmwareSlot {
    /// Write and validate a complete image in the inactive slot. A failed
    /// stage leaves nothing promotable behind.
    fn stage(&mut self, image: &[u8]) -> Result<(), OtaError>;

    /// Switch the boot selection to the staged image.
    fn promote(&mut self) -> Result<(), OtaError>;
}

impl<T: FirmwareSlot + ?Sized> FirmwareSlot for &mut T {
    fn stage(&mut self, image: &[u8]) -> Result<(), OtaError> {
        (**self).stage(image)
    }

    fn promote(&mut self) -> Result<(), OtaError> {
        (**self).promote()
    }
}
