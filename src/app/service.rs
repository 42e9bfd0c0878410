//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the control state, both periodic controllers, the
//! command processor and the feedback decoder. It exposes one entry point
//! per scheduled task plus [`handle_command`](AppService::handle_command).
//! All I/O flows through port traits injected at call sites, making the
//! entire service testable with mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                 │          AppService          │
//! ActuatorPort ◀──│ Ramp · Boost · Commands · FB │
//!                 └──────────────────────────────┘
//! ```

use log::{info, warn};

use crate::config::{FIRMWARE_VERSION, SystemConfig};
use crate::control::Millis;
use crate::control::boost::{BoostScheduler, BoostTransition};
use crate::control::context::ControlState;
use crate::control::ramp::RampController;
use crate::sensors::feedback::{FeedbackDecoder, FeedbackReport};
use crate::telemetry::{TelemetryContext, TelemetryData, log_line};

use super::commands::Command;
use super::events::{AppEvent, CommandOutcome};
use super::ports::{ActuatorPort, EventSink, LinkStatus, SensorPort};
use super::processor::CommandProcessor;

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    config: SystemConfig,
    ctx: ControlState,
    ramp: RampController,
    boost: BoostScheduler,
    processor: CommandProcessor,
    decoder: FeedbackDecoder,
    link: LinkStatus,
    firmware: heapless::String<96>,
    last_feedback: FeedbackReport,
}

impl AppService {
    /// Construct the service from configuration.
    ///
    /// Nothing is written to hardware until [`apply_initial_output`].
    ///
    /// [`apply_initial_output`]: Self::apply_initial_output
    pub fn new(config: SystemConfig) -> Self {
        let ctx = ControlState::new(config.pwm_max);
        let ramp = RampController::new(config.ramp_duration_ms, config.pwm_max);
        let boost = BoostScheduler::new(
            config.boost_interval_ms(),
            config.boost_duration_ms(),
            config.pwm_max,
            config.nominal_level,
        );
        let processor = CommandProcessor::new(config.pwm_max, config.boost_interval_ms(), config.auto_boost_lead_ms());
        let decoder = FeedbackDecoder::new(config.feedback_timeout_ms, config.nominal_feedback_period_us());

        Self {
            config,
            ctx,
            ramp,
            boost,
            processor,
            decoder,
            link: LinkStatus::default(),
            firmware: crate::diagnostics::firmware_description(),
            last_feedback: FeedbackReport::TIMEOUT,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Fail-safe output: full power and indicator on. First thing at boot.
    pub fn apply_initial_output(&mut self, hw: &mut impl ActuatorPort) {
        hw.write_level(self.ctx.current_level);
        self.ctx.set_indicator(true, hw);
        info!("AppService: output at {} (fail-safe full power)", self.ctx.current_level);
    }

    /// Startup announcement: log line plus an immediate telemetry snapshot.
    pub fn announce(&mut self, now_us: u64, hw: &mut impl SensorPort, sink: &mut impl EventSink) {
        let ip = self.link.ip.clone();
        self.log(sink, format_args!("Start - IP: {} | FW: {}", ip, FIRMWARE_VERSION));
        self.publish_telemetry(now_us, hw, sink);
    }

    /// Network state reported in telemetry.
    pub fn set_link(&mut self, link: LinkStatus) {
        self.link = link;
    }

    // ── Scheduled tasks ───────────────────────────────────────

    /// Ramp task (~200 ms).
    pub fn ramp_tick(&mut self, now_ms: Millis, hw: &mut impl ActuatorPort) {
        if self.processor.is_awaiting_reset() {
            return;
        }
        self.ramp.tick(&mut self.ctx, now_ms, hw);
    }

    /// Boost task (~1 s).
    pub fn boost_tick(&mut self, now_ms: Millis, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        if self.processor.is_awaiting_reset() {
            return;
        }
        match self.boost.tick(&mut self.ctx, now_ms, hw) {
            Some(BoostTransition::Started) => {
                self.ctx.set_indicator(true, hw);
                let secs = self.config.boost_duration_secs;
                self.log(sink, format_args!("boost: {}s at 100%", secs));
            }
            Some(BoostTransition::Ended) => {
                let secs = self.config.ramp_duration_ms / 1_000;
                let nominal = self.boost.nominal_level();
                self.log(sink, format_args!("boost end -> {}s ramp to {}", secs, nominal));
            }
            None => {}
        }
    }

    /// Telemetry task (~5 s): sample the decoder and publish a snapshot.
    pub fn publish_telemetry(&mut self, now_us: u64, hw: &mut impl SensorPort, sink: &mut impl EventSink) {
        let telemetry = self.build_telemetry(now_us, hw);
        sink.emit(&AppEvent::Telemetry(telemetry));
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply one remote command. Every handled command except `Reset`
    /// publishes a fresh telemetry snapshot.
    pub fn handle_command(
        &mut self,
        command: Command,
        now_us: u64,
        hw: &mut (impl SensorPort + ActuatorPort),
        sink: &mut impl EventSink,
    ) -> CommandOutcome {
        let outcome = self.processor.apply(&command, now_us / 1_000, &mut self.ctx, hw);

        match &command {
            _ if outcome == CommandOutcome::Rejected => {
                warn!("AppService: awaiting reset, dropped {:?}", command);
            }
            Command::Reset => {
                let secs = self.config.watchdog_timeout_ms / 1_000;
                self.log(sink, format_args!("remote reset -> watchdog expires in {}s", secs));
            }
            Command::Off => self.log(sink, format_args!("pump off")),
            Command::On => self.log(sink, format_args!("manual -> 100%")),
            Command::Auto => self.log(sink, format_args!("auto re-enabled")),
            Command::SetLevel(level) => self.log(sink, format_args!("manual -> {}", level)),
            Command::Unknown(text) => self.log(sink, format_args!("unknown: {}", text)),
        }

        sink.emit(&AppEvent::CommandHandled {
            command,
            outcome,
        });

        if matches!(outcome, CommandOutcome::Applied | CommandOutcome::Ignored) {
            self.publish_telemetry(now_us, hw, sink);
        }
        outcome
    }

    // ── Logging ───────────────────────────────────────────────

    /// Mirror a message to the serial log and the remote log channel.
    pub fn log(&self, sink: &mut impl EventSink, args: core::fmt::Arguments<'_>) {
        let line = log_line(args);
        info!("{}", line);
        sink.emit(&AppEvent::Log(line));
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build a telemetry snapshot, sampling the feedback decoder at `now_us`.
    pub fn build_telemetry(&mut self, now_us: u64, hw: &mut impl SensorPort) -> TelemetryData {
        let raw = hw.feedback_sample();
        self.last_feedback = self.decoder.sample(raw, now_us);
        let diag = hw.read_diagnostics();

        let ctx = TelemetryContext {
            firmware: &self.firmware,
            uptime_secs: now_us / 1_000_000,
            connected: self.link.connected,
            ip: &self.link.ip,
            indicator_on: self.ctx.indicator_on,
            level: self.ctx.current_level,
        };
        TelemetryData::build(&ctx, &self.last_feedback, &diag)
    }

    pub fn control_state(&self) -> &ControlState {
        &self.ctx
    }

    /// Decoder result from the most recent telemetry snapshot.
    pub fn last_feedback(&self) -> &FeedbackReport {
        &self.last_feedback
    }

    pub fn is_awaiting_reset(&self) -> bool {
        self.processor.is_awaiting_reset()
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }
}
