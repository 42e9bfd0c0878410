//! Pump PWM feedback decoder.
//!
//! Two halves with distinct execution contexts:
//!
//! - [`FeedbackCell::record_edge`] runs inside the GPIO interrupt on every
//!   edge of the feedback line and is the **only** writer.
//! - [`FeedbackDecoder::sample`] runs on the telemetry tick and turns a
//!   snapshot into a duty cycle and a [`PumpStatus`].
//!
//! The ISR and the control loop share the timing fields through a
//! single-writer seqlock: the writer bumps the sequence to odd, stores the
//! fields, then bumps it back to even; the reader retries until it sees the
//! same even sequence on both sides of its loads. A reader therefore never
//! pairs a fresh `high_time_us` with a stale `low_time_us`.

use core::hint::spin_loop;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering, fence};

/// Default bounce filter in microseconds.
pub const DEFAULT_MIN_PULSE_US: u32 = 2_000;

// ───────────────────────────────────────────────────────────────
// Shared sample (ISR → sampler)
// ───────────────────────────────────────────────────────────────

/// Timing of the most recent accepted edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedbackSample {
    /// Duration of the phase that ended with the line going high.
    pub high_time_us: u32,
    /// Duration of the phase that ended with the line going low.
    pub low_time_us: u32,
    /// Timestamp of the last accepted edge.
    pub last_pulse_us: u64,
    /// Timestamp of the last edge of any kind, bounce included.
    pub last_flank_us: u64,
}

/// Lock-free single-writer cell holding the live [`FeedbackSample`].
pub struct FeedbackCell {
    seq: AtomicU32,
    high_us: AtomicU32,
    low_us: AtomicU32,
    pulse_lo: AtomicU32,
    pulse_hi: AtomicU32,
    flank_lo: AtomicU32,
    flank_hi: AtomicU32,
    /// Set once the first edge has been seen; that edge has no predecessor
    /// to measure against.
    armed: AtomicBool,
    min_pulse_us: AtomicU32,
}

/// The cell fed by the feedback GPIO interrupt.
/// `static` because ESP-IDF ISR callbacks cannot capture state.
pub static FEEDBACK: FeedbackCell = FeedbackCell::new(DEFAULT_MIN_PULSE_US);

/// Called from the GPIO ISR on every edge of the feedback line.
pub fn feedback_isr_handler(now_us: u64, line_high: bool) {
    FEEDBACK.record_edge(now_us, line_high);
}

impl FeedbackCell {
    pub const fn new(min_pulse_us: u32) -> Self {
        Self {
            seq: AtomicU32::new(0),
            high_us: AtomicU32::new(0),
            low_us: AtomicU32::new(0),
            pulse_lo: AtomicU32::new(0),
            pulse_hi: AtomicU32::new(0),
            flank_lo: AtomicU32::new(0),
            flank_hi: AtomicU32::new(0),
            armed: AtomicBool::new(false),
            min_pulse_us: AtomicU32::new(min_pulse_us),
        }
    }

    /// Adjust the bounce filter. Call before the ISR is enabled.
    pub fn set_min_pulse_us(&self, us: u32) {
        self.min_pulse_us.store(us, Ordering::Relaxed);
    }

    /// Record one edge. Returns `true` when the edge was accepted.
    ///
    /// Deltas at or below the bounce filter are discarded: phase times,
    /// the pulse timestamp and the flank timestamp all stay as they were.
    ///
    /// Single writer: only the feedback ISR may call this.
    pub fn record_edge(&self, now_us: u64, line_high: bool) -> bool {
        let prev = join(
            self.pulse_hi.load(Ordering::Relaxed),
            self.pulse_lo.load(Ordering::Relaxed),
        );
        let armed = self.armed.load(Ordering::Relaxed);
        let delta = now_us.saturating_sub(prev);
        let accepted = !armed || delta > u64::from(self.min_pulse_us.load(Ordering::Relaxed));

        self.begin_write();
        if accepted {
            if armed {
                let phase = u32::try_from(delta).unwrap_or(u32::MAX);
                if line_high {
                    self.high_us.store(phase, Ordering::Relaxed);
                } else {
                    self.low_us.store(phase, Ordering::Relaxed);
                }
            }
            store_split(&self.pulse_hi, &self.pulse_lo, now_us);
            store_split(&self.flank_hi, &self.flank_lo, now_us);
        }
        self.end_write();

        if !armed {
            self.armed.store(true, Ordering::Relaxed);
        }
        accepted
    }

    /// Torn-free copy of the current sample.
    pub fn snapshot(&self) -> FeedbackSample {
        loop {
            let before = self.seq.load(Ordering::Acquire);
            if before & 1 == 1 {
                spin_loop();
                continue;
            }
            let sample = FeedbackSample {
                high_time_us: self.high_us.load(Ordering::Relaxed),
                low_time_us: self.low_us.load(Ordering::Relaxed),
                last_pulse_us: join(
                    self.pulse_hi.load(Ordering::Relaxed),
                    self.pulse_lo.load(Ordering::Relaxed),
                ),
                last_flank_us: join(
                    self.flank_hi.load(Ordering::Relaxed),
                    self.flank_lo.load(Ordering::Relaxed),
                ),
            };
            fence(Ordering::Acquire);
            if self.seq.load(Ordering::Relaxed) == before {
                return sample;
            }
            spin_loop();
        }
    }

    fn begin_write(&self) {
        self.seq.fetch_add(1, Ordering::Relaxed);
        fence(Ordering::Release);
    }

    fn end_write(&self) {
        self.seq.fetch_add(1, Ordering::Release);
    }
}

fn join(hi: u32, lo: u32) -> u64 {
    (u64::from(hi) << 32) | u64::from(lo)
}

fn store_split(hi: &AtomicU32, lo: &AtomicU32, value: u64) {
    hi.store((value >> 32) as u32, Ordering::Relaxed);
    lo.store(value as u32, Ordering::Relaxed);
}

// ───────────────────────────────────────────────────────────────
// Status classification
// ───────────────────────────────────────────────────────────────

/// Pump operating state reported through the feedback duty cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpStatus {
    InterfaceDamagedPowerOff,
    PermanentFailure,
    AbnormalFunction,
    AbnormalRunning,
    Normal,
    Standby,
    InterfaceDamagedLowPulse,
    /// No accepted edge within the timeout window.
    Timeout,
}

impl PumpStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::InterfaceDamagedPowerOff => "Interface Damaged / Power OFF",
            Self::PermanentFailure => "Permanent Failure — pump stopped (internal error)",
            Self::AbnormalFunction => "Abnormal Function Mode — temporarily stopped/warning",
            Self::AbnormalRunning => "Abnormal Running Mode — suboptimal performance",
            Self::Normal => "Normal Operation — flow/power feedback",
            Self::Standby => "Stand-by — active stop via PWM input",
            Self::InterfaceDamagedLowPulse => "Interface Damaged / Low Pulse",
            Self::Timeout => "TIMEOUT / NO PULSE",
        }
    }
}

impl core::fmt::Display for PumpStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the classification table.
#[derive(Clone, Copy)]
pub struct StatusRange {
    pub matches: fn(f32) -> bool,
    pub status: PumpStatus,
}

/// Evaluated top to bottom, first match wins. The ranges overlap at their
/// boundaries on purpose; the last row catches everything.
pub const STATUS_RANGES: [StatusRange; 7] = [
    StatusRange {
        matches: |d| d >= 97.5,
        status: PumpStatus::InterfaceDamagedPowerOff,
    },
    StatusRange {
        matches: |d| d >= 92.5,
        status: PumpStatus::PermanentFailure,
    },
    StatusRange {
        matches: |d| (82.5..=92.5).contains(&d),
        status: PumpStatus::AbnormalFunction,
    },
    StatusRange {
        matches: |d| d > 77.5 && d < 82.5,
        status: PumpStatus::AbnormalRunning,
    },
    StatusRange {
        matches: |d| (5.0..=77.5).contains(&d),
        status: PumpStatus::Normal,
    },
    StatusRange {
        matches: |d| (1.5..5.0).contains(&d),
        status: PumpStatus::Standby,
    },
    StatusRange {
        matches: |_| true,
        status: PumpStatus::InterfaceDamagedLowPulse,
    },
];

/// Map a duty cycle onto the status table.
pub fn classify(duty_percent: f32) -> PumpStatus {
    STATUS_RANGES
        .iter()
        .find(|range| (range.matches)(duty_percent))
        .map_or(PumpStatus::InterfaceDamagedLowPulse, |range| range.status)
}

// ───────────────────────────────────────────────────────────────
// Sampler
// ───────────────────────────────────────────────────────────────

/// Decoded feedback, as reported in telemetry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackReport {
    pub high_time_us: u32,
    pub low_time_us: u32,
    pub flank_time_us: u64,
    pub frequency_hz: f32,
    pub duty_percent: f32,
    pub status: PumpStatus,
}

impl FeedbackReport {
    pub const TIMEOUT: Self = Self {
        high_time_us: 0,
        low_time_us: 0,
        flank_time_us: 0,
        frequency_hz: 0.0,
        duty_percent: 0.0,
        status: PumpStatus::Timeout,
    };
}

/// Turns raw edge timing into a duty cycle and a status.
#[derive(Debug, Clone, Copy)]
pub struct FeedbackDecoder {
    timeout_us: u64,
    nominal_period_us: f32,
}

impl FeedbackDecoder {
    pub fn new(timeout_ms: u32, nominal_period_us: f32) -> Self {
        Self {
            timeout_us: u64::from(timeout_ms) * 1_000,
            nominal_period_us,
        }
    }

    /// Decode a snapshot taken at `now_us`.
    ///
    /// Duty is measured against the fixed nominal carrier period, not the
    /// measured one; the measured period only yields the diagnostic
    /// frequency.
    pub fn sample(&self, raw: FeedbackSample, now_us: u64) -> FeedbackReport {
        let age = now_us.saturating_sub(raw.last_pulse_us);
        let total = u64::from(raw.high_time_us) + u64::from(raw.low_time_us);
        if age >= self.timeout_us || total == 0 {
            return FeedbackReport::TIMEOUT;
        }

        let frequency_hz = 1.0 / (total as f32 * 1e-6);
        let duty_percent = (raw.high_time_us as f32 / self.nominal_period_us * 100.0).clamp(0.0, 100.0);

        FeedbackReport {
            high_time_us: raw.high_time_us,
            low_time_us: raw.low_time_us,
            flank_time_us: raw.last_flank_us,
            frequency_hz,
            duty_percent,
            status: classify(duty_percent),
        }
    }
}
