//! System configuration parameters
//!
//! All tunable parameters for the circulation pump controller.
//! Network credentials can be baked in at build time through the
//! `CIRCPUMP_WIFI_SSID`, `CIRCPUMP_WIFI_PASS` and `CIRCPUMP_MQTT_URL`
//! environment variables.

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Firmware identifier reported in every telemetry payload.
pub const FIRMWARE_VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Output ---
    /// Hardware maximum of the pump PWM level (16-bit domain).
    pub pwm_max: u32,
    /// Set-point the pump returns to after a boost cycle.
    pub nominal_level: u32,
    /// PWM carrier frequency driven into the pump input.
    pub pwm_frequency_hz: u32,
    /// Duration of one linear ramp episode (milliseconds).
    pub ramp_duration_ms: u64,

    // --- Boost ---
    /// Time between boost starts (seconds).
    pub boost_interval_secs: u32,
    /// Length of a full-speed boost window (seconds).
    pub boost_duration_secs: u32,
    /// After `auto`, the next boost starts this many seconds later.
    pub auto_boost_lead_secs: u32,

    // --- Feedback decoder ---
    /// Edges closer than this to the previous accepted edge are bounce.
    pub feedback_min_pulse_us: u32,
    /// No accepted edge for this long means the feedback line is dead.
    pub feedback_timeout_ms: u32,
    /// Nominal carrier of the pump's feedback signal.
    pub feedback_carrier_hz: f32,

    // --- Watchdog ---
    pub watchdog_enabled: bool,
    pub watchdog_timeout_ms: u32,
    /// Transport connect attempts before the watchdog is starved.
    pub reconnect_attempts: u8,

    // --- Timing ---
    pub ramp_tick_ms: u32,
    pub boost_tick_ms: u32,
    pub telemetry_interval_ms: u32,
    pub keepalive_interval_ms: u32,
    pub housekeeping_interval_ms: u32,

    // --- Network ---
    pub wifi_ssid: String<32>,
    pub wifi_password: String<64>,
    pub broker_url: String<64>,
    pub client_id: String<32>,
    pub mqtt_keepalive_secs: u16,
    pub topic_command: String<32>,
    pub topic_telemetry: String<32>,
    pub topic_status: String<32>,
    pub topic_log: String<32>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Output
            pwm_max: 64_000,
            nominal_level: 29_000,
            pwm_frequency_hz: 150,
            ramp_duration_ms: 16_000,

            // Boost
            boost_interval_secs: 900, // 15 min
            boost_duration_secs: 5,
            auto_boost_lead_secs: 10,

            // Feedback
            feedback_min_pulse_us: 2_000,
            feedback_timeout_ms: 50,
            feedback_carrier_hz: 75.0,

            // Watchdog
            watchdog_enabled: true,
            watchdog_timeout_ms: 8_000,
            reconnect_attempts: 5,

            // Timing
            ramp_tick_ms: 200,
            boost_tick_ms: 1_000,
            telemetry_interval_ms: 5_000,
            keepalive_interval_ms: 240_000,
            housekeeping_interval_ms: 3_600_000,

            // Network
            wifi_ssid: bounded(option_env!("CIRCPUMP_WIFI_SSID").unwrap_or("")),
            wifi_password: bounded(option_env!("CIRCPUMP_WIFI_PASS").unwrap_or("")),
            broker_url: bounded(option_env!("CIRCPUMP_MQTT_URL").unwrap_or("mqtt://192.168.178.23:1883")),
            client_id: bounded("picow2"),
            mqtt_keepalive_secs: 300,
            topic_command: bounded("heatp/pump"),
            topic_telemetry: bounded("heatp/pins"),
            topic_status: bounded("heatp/pico120"),
            topic_log: bounded("heatp/log"),
        }
    }
}

impl SystemConfig {
    /// Duration-style accessors in milliseconds.
    pub fn boost_interval_ms(&self) -> u64 {
        u64::from(self.boost_interval_secs) * 1_000
    }

    pub fn boost_duration_ms(&self) -> u64 {
        u64::from(self.boost_duration_secs) * 1_000
    }

    pub fn auto_boost_lead_ms(&self) -> u64 {
        u64::from(self.auto_boost_lead_secs) * 1_000
    }

    /// Period of the feedback carrier in microseconds (≈13333.33 µs at 75 Hz).
    pub fn nominal_feedback_period_us(&self) -> f32 {
        1_000_000.0 / self.feedback_carrier_hz
    }

    /// Reject configurations that would break the control or watchdog contract.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pwm_max == 0 {
            return Err(ConfigError::ValidationFailed("pwm_max must be > 0"));
        }
        if self.nominal_level > self.pwm_max {
            return Err(ConfigError::ValidationFailed("nominal_level exceeds pwm_max"));
        }
        if self.ramp_duration_ms == 0 {
            return Err(ConfigError::ValidationFailed("ramp_duration_ms must be > 0"));
        }
        if self.boost_duration_secs == 0 {
            return Err(ConfigError::ValidationFailed("boost_duration_secs must be > 0"));
        }
        if self.boost_duration_secs >= self.boost_interval_secs {
            return Err(ConfigError::ValidationFailed(
                "boost_duration_secs must be shorter than boost_interval_secs",
            ));
        }
        if self.auto_boost_lead_secs > self.boost_interval_secs {
            return Err(ConfigError::ValidationFailed(
                "auto_boost_lead_secs exceeds boost_interval_secs",
            ));
        }
        if self.feedback_carrier_hz.is_nan() || self.feedback_carrier_hz <= 0.0 {
            return Err(ConfigError::ValidationFailed("feedback_carrier_hz must be > 0"));
        }
        if self.reconnect_attempts == 0 {
            return Err(ConfigError::ValidationFailed("reconnect_attempts must be > 0"));
        }

        let periods = [
            self.ramp_tick_ms,
            self.boost_tick_ms,
            self.telemetry_interval_ms,
            self.keepalive_interval_ms,
            self.housekeeping_interval_ms,
        ];
        if periods.contains(&0) {
            return Err(ConfigError::ValidationFailed("task periods must be > 0"));
        }
        // Tasks feed the watchdog; the loop itself feeds between them, so only
        // the fast control ticks have to fit inside the timeout.
        if self.watchdog_timeout_ms <= self.ramp_tick_ms.max(self.boost_tick_ms) {
            return Err(ConfigError::ValidationFailed(
                "watchdog_timeout_ms must exceed the control tick periods",
            ));
        }
        Ok(())
    }
}

/// Truncating conversion into a fixed-capacity string.
fn bounded<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
