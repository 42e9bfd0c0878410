//! Owned control context.
//!
//! One [`ControlState`] lives inside the application service for the whole
//! process lifetime and is handed by reference to every controller tick and
//! command. A watchdog restart is the only thing that re-initialises it.

use crate::app::ports::ActuatorPort;

use super::Millis;

/// Interpolation origin captured once per ramp episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RampOrigin {
    pub start_ms: Millis,
    pub start_level: u32,
}

/// Boost bookkeeping.
///
/// `last_start_ms` is signed: `auto` primes it to a point before boot when
/// issued early in the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoostState {
    pub active: bool,
    pub last_start_ms: i64,
}

/// Shared control state mutated by commands, the boost scheduler and the
/// ramp controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlState {
    /// Last level written to the output.
    pub current_level: u32,
    /// Level the ramp is heading for.
    pub target_level: u32,
    /// Present only while interpolating.
    pub ramp: Option<RampOrigin>,
    pub boost: BoostState,
    pub indicator_on: bool,
}

impl ControlState {
    /// Fail-safe initial state: full power, indicator on.
    pub fn new(pwm_max: u32) -> Self {
        Self {
            current_level: pwm_max,
            target_level: pwm_max,
            ramp: None,
            boost: BoostState {
                active: false,
                last_start_ms: 0,
            },
            indicator_on: true,
        }
    }

    /// Jump straight to `level`, bypassing the ramp.
    pub fn set_immediate(&mut self, level: u32, hw: &mut impl ActuatorPort) {
        self.target_level = level;
        self.current_level = level;
        self.ramp = None;
        hw.write_level(level);
    }

    /// Point the ramp at a new target. Interpolation restarts from the
    /// current level on the next ramp tick.
    pub fn retarget(&mut self, level: u32) {
        self.target_level = level;
        self.ramp = None;
    }

    pub fn set_indicator(&mut self, on: bool, hw: &mut impl ActuatorPort) {
        self.indicator_on = on;
        hw.set_indicator(on);
    }

    pub fn is_ramping(&self) -> bool {
        self.ramp.is_some()
    }
}
