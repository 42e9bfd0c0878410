//! Boost scheduler: periodic full-speed window against stagnation.

use crate::app::ports::ActuatorPort;

use super::Millis;
use super::context::ControlState;

/// What a boost tick did, so the caller can report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoostTransition {
    Started,
    Ended,
}

#[derive(Debug, Clone, Copy)]
pub struct BoostScheduler {
    interval_ms: i64,
    duration_ms: i64,
    max_level: u32,
    nominal_level: u32,
}

impl BoostScheduler {
    pub fn new(interval_ms: Millis, duration_ms: Millis, max_level: u32, nominal_level: u32) -> Self {
        Self {
            interval_ms: interval_ms as i64,
            duration_ms: duration_ms as i64,
            max_level,
            nominal_level,
        }
    }

    pub fn nominal_level(&self) -> u32 {
        self.nominal_level
    }

    /// One boost tick.
    ///
    /// Entry writes full power straight to the output. Exit only retargets,
    /// leaving the ramp to carry the output back down to nominal.
    pub fn tick(
        &self,
        state: &mut ControlState,
        now: Millis,
        hw: &mut impl ActuatorPort,
    ) -> Option<BoostTransition> {
        let now = now as i64;
        let since_start = now - state.boost.last_start_ms;

        if !state.boost.active {
            if since_start < self.interval_ms {
                return None;
            }
            state.set_immediate(self.max_level, hw);
            state.boost.last_start_ms = now;
            state.boost.active = true;
            return Some(BoostTransition::Started);
        }

        if since_start >= self.duration_ms {
            state.retarget(self.nominal_level);
            state.boost.active = false;
            return Some(BoostTransition::Ended);
        }
        None
    }
}
