//! Command processor: applies remote commands to the control state.
//!
//! ```text
//!            any command except Reset
//!           ┌──────────┐
//!           ▼          │
//!       ┌─────────┐────┘      Reset      ┌───────────────┐
//!  ───▶ │ Running │ ──────────────────▶  │ AwaitingReset │  (terminal)
//!       └─────────┘                      └───────────────┘
//! ```
//!
//! `AwaitingReset` is left only by the watchdog restarting the device.

use crate::app::ports::ActuatorPort;
use crate::control::Millis;
use crate::control::context::ControlState;

use super::commands::Command;
use super::events::CommandOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    Running,
    AwaitingReset,
}

pub struct CommandProcessor {
    state: ProcessorState,
    max_level: u32,
    boost_interval_ms: i64,
    auto_lead_ms: i64,
}

impl CommandProcessor {
    pub fn new(max_level: u32, boost_interval_ms: Millis, auto_lead_ms: Millis) -> Self {
        Self {
            state: ProcessorState::Running,
            max_level,
            boost_interval_ms: boost_interval_ms as i64,
            auto_lead_ms: auto_lead_ms as i64,
        }
    }

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    pub fn is_awaiting_reset(&self) -> bool {
        self.state == ProcessorState::AwaitingReset
    }

    /// Apply `command` at `now`.
    pub fn apply(
        &mut self,
        command: &Command,
        now: Millis,
        ctx: &mut ControlState,
        hw: &mut impl ActuatorPort,
    ) -> CommandOutcome {
        if self.is_awaiting_reset() {
            return CommandOutcome::Rejected;
        }

        match command {
            Command::Reset => {
                self.state = ProcessorState::AwaitingReset;
                CommandOutcome::RestartRequested
            }
            Command::Off => {
                ctx.set_immediate(0, hw);
                ctx.boost.active = false;
                ctx.set_indicator(false, hw);
                CommandOutcome::Applied
            }
            Command::On => {
                ctx.set_immediate(self.max_level, hw);
                ctx.boost.active = false;
                ctx.set_indicator(true, hw);
                CommandOutcome::Applied
            }
            Command::Auto => {
                // Primed so the next boost starts `auto_lead_ms` from now. The
                // active flag makes the next boost tick close this phantom
                // window first, handing the target back to nominal.
                ctx.boost.last_start_ms = now as i64 - self.boost_interval_ms + self.auto_lead_ms;
                ctx.boost.active = true;
                ctx.set_indicator(true, hw);
                CommandOutcome::Applied
            }
            Command::SetLevel(level) => {
                ctx.retarget(*level);
                ctx.boost.active = false;
                ctx.set_indicator(*level > 0, hw);
                CommandOutcome::Applied
            }
            Command::Unknown(_) => CommandOutcome::Ignored,
        }
    }
}
