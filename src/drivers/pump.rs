//! Circulation pump speed driver.
//!
//! The pump's speed input takes a PWM carrier; the duty cycle is the
//! commanded level. Levels live in a 16-bit domain (0..=65535) and are
//! scaled onto whatever resolution the PWM channel has.
//!
//! Levels above 65535 saturate at full duty. The controller itself never
//! clamps a manual level, so this is the one place the hardware bound is
//! applied.
//!
//! Generic over [`SetDutyCycle`] so host tests can drive a mock channel.

use embedded_hal::pwm::SetDutyCycle;
use log::warn;

use crate::error::ActuatorError;

/// Full scale of the level domain.
pub const LEVEL_FULL_SCALE: u16 = u16::MAX;

pub struct PumpDriver<P: SetDutyCycle> {
    pwm: P,
    level: u32,
}

impl<P: SetDutyCycle> PumpDriver<P> {
    pub fn new(pwm: P) -> Self {
        Self { pwm, level: 0 }
    }

    /// Drive the pump at `level`, saturating at full duty.
    pub fn set_level(&mut self, level: u32) -> Result<(), ActuatorError> {
        let duty = u16::try_from(level).unwrap_or(LEVEL_FULL_SCALE);
        if u32::from(duty) != level {
            warn!("Pump: level {} exceeds hardware range, saturating", level);
        }
        self.pwm
            .set_duty_cycle_fraction(duty, LEVEL_FULL_SCALE)
            .map_err(|_| ActuatorError::PwmWriteFailed)?;
        self.level = level;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), ActuatorError> {
        self.set_level(0)
    }

    /// Last level successfully written, as requested (unsaturated).
    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn is_running(&self) -> bool {
        self.level > 0
    }

    pub fn channel(&self) -> &P {
        &self.pwm
    }
}
