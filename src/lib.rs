//! Circulation pump controller firmware library.
//!
//! Exposes the pure-logic modules for integration testing and the host
//! simulation. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod pins;
pub mod scheduler;
pub mod supervisor;
pub mod telemetry;

pub mod adapters;
pub mod control;
pub mod drivers;
pub mod sensors;

mod esp_link_shims;
