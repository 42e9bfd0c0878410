//! Speed control: the owned control context plus the two periodic
//! controllers that mutate it.
//!
//! ```text
//!  Command ─┐
//!           ├──▶ ControlState ──▶ RampController::tick ──▶ ActuatorPort
//!  Boost  ──┘
//! ```
//!
//! Everything here runs in the single control-loop context; nothing is
//! shared with interrupts.

pub mod boost;
pub mod context;
pub mod ramp;

/// Monotonic milliseconds since boot.
pub type Millis = u64;
