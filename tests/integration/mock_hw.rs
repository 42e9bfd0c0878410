//! Mock adapters for integration tests.
//!
//! [`MockHardware`] records every actuator call so tests can assert on the
//! full output history. [`SimTransport`] scripts the broker side,
//! [`SimClock`] and [`SimWatchdog`] share one simulated timeline so a test
//! can tell exactly when the watchdog would have fired.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use circpump::app::commands::CommandText;
use circpump::app::events::AppEvent;
use circpump::app::ports::{
    ActuatorPort, ClockPort, EventSink, LinkStatus, SensorPort, TransportPort, WatchdogPort,
};
use circpump::error::CommsError;
use circpump::sensors::diagnostic::DiagnosticSnapshot;
use circpump::sensors::feedback::FeedbackSample;

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Level(u32),
    Indicator(bool),
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub calls: Vec<ActuatorCall>,
    pub feedback: FeedbackSample,
    pub diagnostics: DiagnosticSnapshot,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            feedback: FeedbackSample::default(),
            diagnostics: DiagnosticSnapshot::default(),
        }
    }

    pub fn levels(&self) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                ActuatorCall::Level(l) => Some(*l),
                ActuatorCall::Indicator(_) => None,
            })
            .collect()
    }

    pub fn last_level(&self) -> Option<u32> {
        self.levels().last().copied()
    }

    pub fn indicator(&self) -> Option<bool> {
        self.calls.iter().rev().find_map(|c| match c {
            ActuatorCall::Indicator(on) => Some(*on),
            ActuatorCall::Level(_) => None,
        })
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuatorPort for MockHardware {
    fn write_level(&mut self, level: u32) {
        self.calls.push(ActuatorCall::Level(level));
    }

    fn set_indicator(&mut self, on: bool) {
        self.calls.push(ActuatorCall::Indicator(on));
    }
}

impl SensorPort for MockHardware {
    fn feedback_sample(&mut self) -> FeedbackSample {
        self.feedback
    }

    fn read_diagnostics(&mut self) -> DiagnosticSnapshot {
        self.diagnostics
    }
}

// ── Event recording ───────────────────────────────────────────

/// Messages of every `AppEvent::Log` in `events`.
pub fn log_messages(events: &[AppEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Log(line) => Some(line.to_string()),
            _ => None,
        })
        .collect()
}

pub fn telemetry_count(events: &[AppEvent]) -> usize {
    events.iter().filter(|e| matches!(e, AppEvent::Telemetry(_))).count()
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logs(&self) -> Vec<String> {
        log_messages(&self.events)
    }

    pub fn telemetry_count(&self) -> usize {
        telemetry_count(&self.events)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── SimTransport ──────────────────────────────────────────────

/// Scripted broker connection.
///
/// `connect` pops `connect_script` first; once that is empty it succeeds
/// while `reachable` is set.
pub struct SimTransport {
    pub link_up: bool,
    /// `link_status` reports the link down for this many more queries.
    pub link_delay: Cell<u32>,
    pub online: bool,
    pub reachable: bool,
    pub connect_script: VecDeque<Result<(), CommsError>>,
    pub inbox: VecDeque<CommandText>,
    pub connect_calls: u32,
    pub pings: u32,
    pub shut_down: bool,
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl SimTransport {
    /// Link up, broker reachable, not yet connected.
    pub fn new() -> Self {
        Self {
            link_up: true,
            link_delay: Cell::new(0),
            online: false,
            reachable: true,
            connect_script: VecDeque::new(),
            inbox: VecDeque::new(),
            connect_calls: 0,
            pings: 0,
            shut_down: false,
            events: Vec::new(),
        }
    }

    pub fn push_command(&mut self, payload: &str) {
        let mut text = CommandText::new();
        text.push_str(payload).expect("command fits");
        self.inbox.push_back(text);
    }

    /// Broker goes away: the session drops and every reconnect fails.
    pub fn drop_broker(&mut self) {
        self.online = false;
        self.reachable = false;
    }

    pub fn logs(&self) -> Vec<String> {
        log_messages(&self.events)
    }

    pub fn telemetry_count(&self) -> usize {
        telemetry_count(&self.events)
    }
}

impl Default for SimTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportPort for SimTransport {
    fn connect(&mut self) -> Result<(), CommsError> {
        self.connect_calls += 1;
        let result = self.connect_script.pop_front().unwrap_or(if self.reachable {
            Ok(())
        } else {
            Err(CommsError::MqttConnectFailed)
        });
        self.online = result.is_ok();
        result
    }

    fn is_connected(&self) -> bool {
        self.online && !self.shut_down
    }

    fn poll_command(&mut self) -> Result<Option<CommandText>, CommsError> {
        if let Some(text) = self.inbox.pop_front() {
            return Ok(Some(text));
        }
        if !self.is_connected() {
            return Err(CommsError::NotConnected);
        }
        Ok(None)
    }

    fn ping(&mut self) -> Result<(), CommsError> {
        self.pings += 1;
        if self.is_connected() { Ok(()) } else { Err(CommsError::NotConnected) }
    }

    fn shutdown(&mut self) {
        self.shut_down = true;
        self.online = false;
        self.link_up = false;
    }

    fn link_status(&self) -> LinkStatus {
        let pending = self.link_delay.get();
        if pending > 0 {
            self.link_delay.set(pending - 1);
        }
        let up = self.link_up && pending == 0;
        let mut ip = heapless::String::new();
        let _ = ip.push_str(if up { "192.168.178.50" } else { "0.0.0.0" });
        LinkStatus { connected: up, ip }
    }
}

impl EventSink for SimTransport {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Simulated time ────────────────────────────────────────────

/// Shared monotonic clock. Clones observe the same time.
#[derive(Clone, Default)]
pub struct SimClock(Rc<Cell<u64>>);

#[allow(dead_code)]
impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.0.get() / 1_000
    }

    pub fn set_ms(&self, ms: u64) {
        self.0.set(ms * 1_000);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.0.set(self.0.get() + ms * 1_000);
    }
}

impl ClockPort for SimClock {
    fn uptime_us(&self) -> u64 {
        self.0.get()
    }
}

/// Countdown watchdog on the simulated timeline.
pub struct SimWatchdog {
    clock: SimClock,
    timeout_ms: u32,
    pub last_feed_ms: u64,
    pub feeds: u32,
}

#[allow(dead_code)]
impl SimWatchdog {
    pub fn new(clock: SimClock, timeout_ms: u32) -> Self {
        let last_feed_ms = clock.now_ms();
        Self {
            clock,
            timeout_ms,
            last_feed_ms,
            feeds: 0,
        }
    }

    /// Whether the hardware would have restarted by now.
    pub fn expired(&self) -> bool {
        self.clock.now_ms() - self.last_feed_ms >= u64::from(self.timeout_ms)
    }
}

impl WatchdogPort for SimWatchdog {
    fn feed(&mut self) {
        self.last_feed_ms = self.clock.now_ms();
        self.feeds += 1;
    }

    fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }
}
