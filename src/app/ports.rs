//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService / Runtime (domain)
//! ```
//!
//! Driven adapters (PWM output, diagnostic inputs, MQTT transport, task
//! watchdog, clock) implement these traits. The domain consumes them via
//! generics, so the control core never touches hardware directly and runs
//! unchanged against the mocks in `tests/`.

use crate::control::Millis;
use crate::error::CommsError;
use crate::sensors::diagnostic::DiagnosticSnapshot;
use crate::sensors::feedback::FeedbackSample;

use super::commands::CommandText;

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to drive the pump output.
pub trait ActuatorPort {
    /// Write a level in the 16-bit output domain. Values above full scale
    /// are accepted; the driver saturates them.
    fn write_level(&mut self, level: u32);

    /// Switch the status indicator.
    fn set_indicator(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: feedback timing and diagnostic inputs.
pub trait SensorPort {
    /// Torn-free copy of the ISR-maintained feedback timing.
    fn feedback_sample(&mut self) -> FeedbackSample;

    /// Read every diagnostic input. Failed reads report zero.
    fn read_diagnostics(&mut self) -> DiagnosticSnapshot;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go (serial log, MQTT).
/// Delivery is best-effort; an implementation must never fail the caller.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Transport port (driven adapter: domain ↔ broker)
// ───────────────────────────────────────────────────────────────

/// Network state reported in telemetry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkStatus {
    pub connected: bool,
    pub ip: heapless::String<16>,
}

impl Default for LinkStatus {
    fn default() -> Self {
        let mut ip = heapless::String::new();
        let _ = ip.push_str("0.0.0.0");
        Self { connected: false, ip }
    }
}

/// Remote command channel plus connection management.
///
/// Every call must return within a bounded time; the control loop feeds the
/// watchdog between them.
pub trait TransportPort {
    /// (Re)establish the broker session and subscribe to the command topic.
    fn connect(&mut self) -> Result<(), CommsError>;

    fn is_connected(&self) -> bool;

    /// Non-blocking poll for the next pending command payload.
    ///
    /// `Err` means the session is broken and the runtime should reconnect.
    fn poll_command(&mut self) -> Result<Option<CommandText>, CommsError>;

    /// Keep-alive probe.
    fn ping(&mut self) -> Result<(), CommsError>;

    /// Tear down the session and the radio. Used on the way to a forced restart.
    fn shutdown(&mut self);

    fn link_status(&self) -> LinkStatus;
}

// ───────────────────────────────────────────────────────────────
// Watchdog port
// ───────────────────────────────────────────────────────────────

/// Hardware countdown that restarts the device unless fed.
pub trait WatchdogPort {
    fn feed(&mut self);

    /// Configured timeout in milliseconds.
    fn timeout_ms(&self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time since boot.
pub trait ClockPort {
    fn uptime_us(&self) -> u64;

    fn uptime_ms(&self) -> Millis {
        self.uptime_us() / 1_000
    }
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from task bodies)
// ───────────────────────────────────────────────────────────────

/// Identifies one of the periodic control-loop tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskId {
    Ramp,
    Boost,
    Telemetry,
    KeepAlive,
    Housekeeping,
}

/// Callback trait that the scheduler invokes when a task is due.
///
/// The [`Scheduler`](crate::scheduler::Scheduler) only tracks periods; the
/// runtime implements this trait to run the actual task bodies.
pub trait SchedulerDelegate {
    fn on_task_due(&mut self, task: TaskId, now_ms: Millis);
}
