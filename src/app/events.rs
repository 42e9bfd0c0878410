//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them: mirror to the serial console, publish to
//! the broker, or record them in a test.

use crate::telemetry::{LogLine, TelemetryData};

use super::commands::Command;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Full telemetry snapshot, periodic or after a command.
    Telemetry(TelemetryData),

    /// Free-text message for the remote log channel.
    Log(LogLine),

    /// A remote command was applied (or rejected while awaiting reset).
    CommandHandled { command: Command, outcome: CommandOutcome },
}

/// Result of handing a [`Command`] to the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// State was mutated.
    Applied,
    /// Unrecognised payload; nothing changed.
    Ignored,
    /// The processor entered its terminal state; the watchdog must be starved.
    RestartRequested,
    /// Already awaiting reset; the command was dropped.
    Rejected,
}
