//! Telemetry payloads.
//!
//! The JSON keys and the status line layout are the wire format consumed by
//! the downstream bridge, so field names here are renamed to match it
//! exactly. `UPTIME` must stay seconds since boot: the bridge counts a
//! restart whenever it drops from above 300 to below 30.

use core::fmt::Write;

use serde::Serialize;

use crate::sensors::diagnostic::DiagnosticSnapshot;
use crate::sensors::feedback::FeedbackReport;

/// Free-text log message.
pub type LogLine = heapless::String<96>;

/// Status summary line published next to the JSON map.
pub type StatusLine = heapless::String<192>;

/// One telemetry snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryData {
    #[serde(rename = "FW")]
    pub firmware: heapless::String<96>,
    #[serde(rename = "UPTIME")]
    pub uptime_secs: u64,
    #[serde(rename = "WLAN")]
    pub wlan: u8,
    #[serde(rename = "LED")]
    pub led: u8,
    #[serde(rename = "PWM")]
    pub pwm: u32,
    #[serde(rename = "PIN0")]
    pub pin0: u32,
    #[serde(rename = "PIN1")]
    pub pin1: u8,
    #[serde(rename = "PIN7")]
    pub pin7: u8,
    #[serde(rename = "PIN5")]
    pub pin5: u8,
    #[serde(rename = "PIN5_Flank_us")]
    pub flank_time_us: u64,
    #[serde(rename = "PIN5_HIGH_us")]
    pub high_time_us: u32,
    #[serde(rename = "PIN5_LOW_us")]
    pub low_time_us: u32,
    #[serde(rename = "PIN5_Freq_Hz")]
    pub frequency_hz: f32,
    #[serde(rename = "PumpDuty")]
    pub duty_percent: f32,
    #[serde(rename = "PumpStatus")]
    pub status: &'static str,
    #[serde(rename = "PIN19")]
    pub pin19: u8,
    #[serde(rename = "PumpFeedback")]
    pub pump_feedback: u8,
    #[serde(rename = "PIN26")]
    pub pin26: f32,
    #[serde(rename = "PIN27")]
    pub pin27: f32,
    #[serde(rename = "PIN28")]
    pub pin28: f32,

    /// Only used in the status line.
    #[serde(skip)]
    pub ip: heapless::String<16>,
    #[serde(skip)]
    pub mem_percent: u8,
}

/// Inputs for [`TelemetryData::build`] that come from outside the decoder.
pub struct TelemetryContext<'a> {
    pub firmware: &'a str,
    pub uptime_secs: u64,
    pub connected: bool,
    pub ip: &'a str,
    pub indicator_on: bool,
    pub level: u32,
}

impl TelemetryData {
    pub fn build(ctx: &TelemetryContext<'_>, feedback: &FeedbackReport, diag: &DiagnosticSnapshot) -> Self {
        let mut firmware = heapless::String::new();
        push_truncated(&mut firmware, ctx.firmware);
        let mut ip = heapless::String::new();
        push_truncated(&mut ip, ctx.ip);

        Self {
            firmware,
            uptime_secs: ctx.uptime_secs,
            wlan: u8::from(ctx.connected),
            led: u8::from(ctx.indicator_on),
            pwm: ctx.level,
            pin0: ctx.level,
            pin1: u8::from(diag.test_input),
            pin7: u8::from(diag.aux_feedback),
            pin5: u8::from(diag.feedback_line),
            flank_time_us: feedback.flank_time_us,
            high_time_us: feedback.high_time_us,
            low_time_us: feedback.low_time_us,
            frequency_hz: round_to(feedback.frequency_hz, 2),
            duty_percent: round_to(feedback.duty_percent, 2),
            status: feedback.status.label(),
            pin19: u8::from(diag.pump_sense),
            pump_feedback: u8::from(diag.pump_sense),
            pin26: diag.voltages[0],
            pin27: diag.voltages[1],
            pin28: diag.voltages[2],
            ip,
            mem_percent: diag.mem_percent,
        }
    }

    /// JSON map for the telemetry topic.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// `PWM:<level>,IP:<addr>,MEM:<pct>%,PIN7:..,PIN5:..,PUMP:..,Duty:<pct>%,Status:<text>`
    pub fn status_line(&self) -> StatusLine {
        let mut line = StatusLine::new();
        let written = write!(
            line,
            "PWM:{},IP:{},MEM:{}%,PIN7:{},PIN5:{},PUMP:{},Duty:{:.1}%,Status:{}",
            self.pwm,
            self.ip,
            self.mem_percent,
            level_name(self.pin7),
            level_name(self.pin5),
            level_name(self.pin19),
            self.duty_percent,
            self.status,
        );
        if written.is_err() {
            log::warn!("telemetry: status line truncated");
        }
        line
    }
}

/// Render `HH:MM:SS - <message>` for the remote log channel.
pub fn format_log_line(hms: (u8, u8, u8), message: &str) -> heapless::String<128> {
    let mut out = heapless::String::new();
    let (h, m, s) = hms;
    let _ = write!(out, "{h:02}:{m:02}:{s:02} - ");
    push_truncated(&mut out, message);
    out
}

/// Build a [`LogLine`] from format arguments, truncating on overflow.
pub fn log_line(args: core::fmt::Arguments<'_>) -> LogLine {
    let mut writer = Truncating(LogLine::new());
    let _ = writer.write_fmt(args);
    writer.0
}

/// `fmt::Write` adapter that keeps what fits and drops the rest.
struct Truncating<const N: usize>(heapless::String<N>);

impl<const N: usize> Write for Truncating<N> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        push_truncated(&mut self.0, s);
        Ok(())
    }
}

fn level_name(value: u8) -> &'static str {
    if value == 0 { "LOW" } else { "HIGH" }
}

fn round_to(value: f32, decimals: i32) -> f32 {
    let scale = 10f32.powi(decimals);
    (value * scale).round() / scale
}

fn push_truncated<const N: usize>(out: &mut heapless::String<N>, text: &str) {
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
}
