//! Ramp controller: linear interpolation of the output level.
//!
//! Each episode captures a single origin (time and level) when it starts.
//! Re-targeting clears the origin, so the next episode interpolates from
//! the already-interpolated level and the trajectory stays continuous.

use crate::app::ports::ActuatorPort;

use super::Millis;
use super::context::{ControlState, RampOrigin};

/// Drives `current_level` toward `target_level` over a fixed duration.
#[derive(Debug, Clone, Copy)]
pub struct RampController {
    duration_ms: Millis,
    max_level: u32,
}

impl RampController {
    pub fn new(duration_ms: Millis, max_level: u32) -> Self {
        Self {
            duration_ms: duration_ms.max(1),
            max_level,
        }
    }

    /// One ramp tick. Writes to the output when the level changes, and
    /// refreshes it unconditionally once the target is held.
    pub fn tick(&self, state: &mut ControlState, now: Millis, hw: &mut impl ActuatorPort) {
        let origin = match state.ramp {
            Some(origin) => origin,
            None if state.current_level == state.target_level => {
                hw.write_level(state.current_level);
                return;
            }
            None => {
                let origin = RampOrigin {
                    start_ms: now,
                    start_level: state.current_level,
                };
                state.ramp = Some(origin);
                origin
            }
        };

        let elapsed = now.saturating_sub(origin.start_ms);
        if elapsed >= self.duration_ms {
            state.current_level = state.target_level;
            state.ramp = None;
            hw.write_level(state.current_level);
            return;
        }

        let next = self.interpolate(origin.start_level, state.target_level, elapsed);
        if next != state.current_level {
            state.current_level = next;
            hw.write_level(next);
        }
        if next == state.target_level {
            state.ramp = None;
        }
    }

    fn interpolate(&self, start: u32, target: u32, elapsed: Millis) -> u32 {
        let progress = elapsed as f32 / self.duration_ms as f32;
        let start = start as f32;
        let level = start + (target as f32 - start) * progress;
        level.round().clamp(0.0, self.max_level as f32) as u32
    }
}
