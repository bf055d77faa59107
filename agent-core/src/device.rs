// Device capabilities that the core logic drives but never implements itself.

/// Full device restart.
///
/// On hardware `restart` never returns. Test doubles record the call and
/// return, so every caller must treat the code after it as reachable.
pub trait Restart {
    fn restart(&self);
}

impl<T: Restart + ?Sized> Restart for &T {
    fn restart(&self) {
        (**self).restart()
    }
}

/// The single status LED driven by the `led` command topic.
pub trait StatusLed {
    fn set(&mut self, on: bool);
}

impl<T: StatusLed + ?Sized> StatusLed for &mut T {
    fn set(&mut self, on: bool) {
        (**self).set(on)
    }
}
