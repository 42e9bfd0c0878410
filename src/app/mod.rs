//! Application core: pure domain logic, zero I/O.
//!
//! Command parsing and processing, the service that owns the control state,
//! and the cooperative runtime that drives it. All interaction with
//! hardware and the network happens through the **port traits** in
//! [`ports`], so this layer runs unchanged against test mocks.

pub mod commands;
pub mod events;
pub mod ports;
pub mod processor;
pub mod runtime;
pub mod service;
