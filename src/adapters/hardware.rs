//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the [`SensorHub`] and the actuator drivers, exposing them through
//! [`SensorPort`] and [`ActuatorPort`]. On non-espidf targets the drivers
//! sit on the simulated handles from `hw_init`.
//!
//! Actuator failures are logged and swallowed: the control state has
//! already moved on, and the next ramp tick rewrites the output anyway.

use log::warn;

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::drivers::hw_init::{GpioOutput, LedcPwm};
use crate::drivers::pump::PumpDriver;
use crate::drivers::status_led::StatusLed;
use crate::sensors::SensorHub;
use crate::sensors::diagnostic::DiagnosticSnapshot;
use crate::sensors::feedback::FeedbackSample;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    sensor_hub: SensorHub,
    pump: PumpDriver<LedcPwm>,
    led: StatusLed<GpioOutput>,
}

impl HardwareAdapter {
    pub fn new(sensor_hub: SensorHub, pump: PumpDriver<LedcPwm>, led: StatusLed<GpioOutput>) -> Self {
        Self { sensor_hub, pump, led }
    }

    pub fn pump(&self) -> &PumpDriver<LedcPwm> {
        &self.pump
    }

    pub fn led(&self) -> &StatusLed<GpioOutput> {
        &self.led
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl SensorPort for HardwareAdapter {
    fn feedback_sample(&mut self) -> FeedbackSample {
        self.sensor_hub.feedback_sample()
    }

    fn read_diagnostics(&mut self) -> DiagnosticSnapshot {
        self.sensor_hub.read_diagnostics()
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl ActuatorPort for HardwareAdapter {
    fn write_level(&mut self, level: u32) {
        if let Err(e) = self.pump.set_level(level) {
            warn!("Hardware: pump level {} not applied: {}", level, e);
        }
    }

    fn set_indicator(&mut self, on: bool) {
        if let Err(e) = self.led.set(on) {
            warn!("Hardware: indicator not switched: {}", e);
        }
    }
}
