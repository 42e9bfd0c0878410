//! Status indicator LED.
//!
//! Lit whenever the pump is commanded to run; dark after `off` or a zero
//! manual level.

use embedded_hal::digital::OutputPin;

use crate::error::ActuatorError;

pub struct StatusLed<P: OutputPin> {
    pin: P,
    on: bool,
}

impl<P: OutputPin> StatusLed<P> {
    pub fn new(pin: P) -> Self {
        Self { pin, on: false }
    }

    pub fn set(&mut self, on: bool) -> Result<(), ActuatorError> {
        let result = if on { self.pin.set_high() } else { self.pin.set_low() };
        result.map_err(|_| ActuatorError::GpioWriteFailed)?;
        self.on = on;
        Ok(())
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}
