//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing application events to the ESP-IDF
//! logger (UART / USB-CDC). The MQTT transport forwards every event here as
//! well, so the serial console always carries a copy of what went out.

use log::{info, warn};

use crate::app::events::{AppEvent, CommandOutcome};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink {
    emitted: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events seen since construction.
    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        self.emitted = self.emitted.wrapping_add(1);
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | up={}s | wlan={} led={} | pwm={} | fb {}/{}us {:.2}Hz {:.2}% | {}",
                    t.uptime_secs,
                    t.wlan,
                    t.led,
                    t.pwm,
                    t.high_time_us,
                    t.low_time_us,
                    t.frequency_hz,
                    t.duty_percent,
                    t.status,
                );
            }
            AppEvent::Log(line) => {
                info!("LOG   | {}", line);
            }
            AppEvent::CommandHandled { command, outcome } => match outcome {
                CommandOutcome::Rejected => warn!("CMD   | {:?} rejected, awaiting reset", command),
                _ => info!("CMD   | {:?} -> {:?}", command, outcome),
            },
        }
    }
}
