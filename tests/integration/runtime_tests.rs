//! End-to-end tests of the cooperative loop on a simulated timeline.
//!
//! The clock only moves when a test advances it, so task due times, boost
//! windows and the watchdog deadline are all exact.

use std::collections::VecDeque;

use crate::mock_hw::{ActuatorCall, MockHardware, SimClock, SimTransport, SimWatchdog};

use circpump::app::runtime::{Runtime, StepOutcome};
use circpump::config::SystemConfig;
use circpump::error::CommsError;

type SimRuntime = Runtime<MockHardware, SimTransport, SimWatchdog, SimClock>;

/// Loop pass spacing. Every task period is a multiple of it.
const STEP_MS: u64 = 100;

struct Rig {
    clock: SimClock,
    rt: SimRuntime,
}

impl Rig {
    fn new(config: SystemConfig, transport: SimTransport) -> Self {
        let clock = SimClock::new();
        let watchdog = SimWatchdog::new(clock.clone(), config.watchdog_timeout_ms);
        let rt = Runtime::new(config, MockHardware::new(), transport, watchdog, clock.clone());
        Self { clock, rt }
    }

    fn boot(config: SystemConfig) -> Self {
        let mut rig = Self::new(config, SimTransport::new());
        rig.rt.power_on();
        rig.rt.start(|| {});
        rig
    }

    /// Step until `until_ms`. Stops early at the first terminal pass.
    fn run_until(&mut self, until_ms: u64) -> StepOutcome {
        while self.clock.now_ms() < until_ms {
            self.clock.advance_ms(STEP_MS);
            if self.rt.step() == StepOutcome::AwaitingReset {
                return StepOutcome::AwaitingReset;
            }
            assert!(
                !self.rt.supervisor().watchdog().expired(),
                "watchdog expired at {}ms while running",
                self.clock.now_ms()
            );
        }
        StepOutcome::Running
    }

    fn level(&self) -> u32 {
        self.rt.app().control_state().current_level
    }

    fn logs(&self) -> Vec<String> {
        self.rt.transport().logs()
    }
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn power_on_drives_full_output_before_networking() {
    let mut rig = Rig::new(SystemConfig::default(), SimTransport::new());
    rig.rt.power_on();

    assert_eq!(
        rig.rt.hardware().calls,
        vec![ActuatorCall::Level(64_000), ActuatorCall::Indicator(true)]
    );
    assert_eq!(rig.rt.transport().connect_calls, 0);
    assert_eq!(rig.rt.supervisor().feed_count(), 1);
}

#[test]
fn start_announces_and_registers_every_task() {
    let rig = Rig::boot(SystemConfig::default());

    assert_eq!(rig.rt.transport().connect_calls, 1);
    let logs = rig.logs();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0], "transport connected");
    assert!(logs[1].starts_with("Start - IP: 192.168.178.50 | FW: v"), "{}", logs[1]);
    assert_eq!(rig.rt.transport().telemetry_count(), 1);
    assert_eq!(rig.rt.scheduler().active_count(), 5);
}

#[test]
fn start_waits_for_the_link_while_feeding() {
    let transport = SimTransport::new();
    transport.link_delay.set(3);
    let mut rig = Rig::new(SystemConfig::default(), transport);
    rig.rt.power_on();

    let mut idles = 0;
    rig.rt.start(|| idles += 1);

    assert_eq!(idles, 3);
    // power_on, three waits, the announcement.
    assert_eq!(rig.rt.supervisor().feed_count(), 5);
    assert!(rig.logs()[1].contains("192.168.178.50"));
}

#[test]
fn initial_connect_failure_is_retried_on_the_first_pass() {
    let mut transport = SimTransport::new();
    transport.connect_script = VecDeque::from([Err(CommsError::MqttConnectFailed)]);
    let mut rig = Rig::new(SystemConfig::default(), transport);
    rig.rt.power_on();
    rig.rt.start(|| {});
    assert!(!rig.rt.transport().online);

    assert_eq!(rig.run_until(STEP_MS), StepOutcome::Running);
    assert!(rig.rt.transport().online);
    assert_eq!(rig.rt.transport().connect_calls, 2);
    assert!(rig.logs().contains(&"transport connected".to_string()));
}

#[test]
fn failed_first_connect_does_not_report_connected() {
    let mut transport = SimTransport::new();
    transport.connect_script = VecDeque::from([Err(CommsError::MqttConnectFailed)]);
    let mut rig = Rig::new(SystemConfig::default(), transport);
    rig.rt.power_on();
    rig.rt.start(|| {});

    let logs = rig.logs();
    assert!(!logs.contains(&"transport connected".to_string()));
    assert!(logs.iter().any(|l| l.starts_with("Start - IP: ")));
}

// ── Periodic tasks ────────────────────────────────────────────

#[test]
fn telemetry_every_five_seconds() {
    let mut rig = Rig::boot(SystemConfig::default());
    rig.run_until(4_900);
    assert_eq!(rig.rt.transport().telemetry_count(), 1);
    rig.run_until(5_000);
    assert_eq!(rig.rt.transport().telemetry_count(), 2);
    rig.run_until(20_000);
    assert_eq!(rig.rt.transport().telemetry_count(), 5);
}

#[test]
fn first_boost_then_ramp_back_to_nominal() {
    let mut rig = Rig::boot(SystemConfig::default());

    rig.run_until(899_900);
    assert!(!rig.rt.app().control_state().boost.active);
    assert_eq!(rig.level(), 64_000);

    rig.run_until(900_000);
    assert!(rig.rt.app().control_state().boost.active);
    assert!(rig.logs().contains(&"boost: 5s at 100%".to_string()));

    rig.run_until(905_000);
    assert!(!rig.rt.app().control_state().boost.active);
    assert_eq!(rig.rt.app().control_state().target_level, 29_000);
    assert!(rig.logs().contains(&"boost end -> 16s ramp to 29000".to_string()));

    rig.run_until(913_200);
    assert_eq!(rig.level(), 46_500);

    rig.run_until(921_000);
    assert!(rig.level() > 29_000);
    rig.run_until(921_200);
    assert_eq!(rig.level(), 29_000);
    assert_eq!(rig.rt.hardware().last_level(), Some(29_000));
}

#[test]
fn keepalive_pings_every_four_minutes() {
    let mut rig = Rig::boot(SystemConfig::default());
    rig.run_until(239_900);
    assert_eq!(rig.rt.transport().pings, 0);
    rig.run_until(240_000);
    assert_eq!(rig.rt.transport().pings, 1);
    rig.run_until(480_000);
    assert_eq!(rig.rt.transport().pings, 2);
}

#[test]
fn housekeeping_logs_heap_usage() {
    let config = SystemConfig {
        housekeeping_interval_ms: 10_000,
        ..SystemConfig::default()
    };
    let mut rig = Rig::boot(config);
    rig.run_until(10_000);
    let heap_logs: Vec<_> = rig.logs().into_iter().filter(|l| l.starts_with("heap free: ")).collect();
    assert_eq!(heap_logs.len(), 1);
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn remote_off_is_applied_and_held() {
    let mut rig = Rig::boot(SystemConfig::default());
    rig.run_until(1_000);
    rig.rt.transport_mut().push_command("OFF");
    rig.run_until(1_100);

    assert_eq!(rig.level(), 0);
    assert_eq!(rig.rt.hardware().indicator(), Some(false));
    assert!(rig.logs().contains(&"pump off".to_string()));

    let before = rig.rt.hardware().calls.len();
    rig.run_until(2_100);
    let after: Vec<_> = rig.rt.hardware().calls[before..].to_vec();
    assert!(!after.is_empty());
    assert!(after.iter().all(|c| *c == ActuatorCall::Level(0)));
}

#[test]
fn one_command_per_pass() {
    let mut rig = Rig::boot(SystemConfig::default());
    rig.rt.transport_mut().push_command("off");
    rig.rt.transport_mut().push_command("on");
    rig.run_until(STEP_MS);
    assert_eq!(rig.level(), 0);
    rig.run_until(2 * STEP_MS);
    assert_eq!(rig.level(), 64_000);
}

#[test]
fn remote_reset_starves_the_watchdog() {
    let mut rig = Rig::boot(SystemConfig::default());
    rig.run_until(30_000);

    rig.rt.transport_mut().push_command("reset");
    assert_eq!(rig.run_until(30_100), StepOutcome::AwaitingReset);

    assert!(rig.rt.supervisor().is_starving());
    assert!(rig.rt.transport().shut_down);
    assert_eq!(rig.rt.scheduler().active_count(), 0);
    assert_eq!(rig.logs().last().map(String::as_str), Some("remote reset -> watchdog expires in 8s"));

    let last_feed = rig.rt.supervisor().watchdog().last_feed_ms;
    assert!(last_feed <= 30_100);
    let calls = rig.rt.hardware().calls.len();
    let events = rig.rt.transport().events.len();

    // Keep looping like the device does; nothing feeds any more.
    while rig.clock.now_ms() < last_feed + 7_999 {
        rig.clock.advance_ms(1);
        assert_eq!(rig.rt.step(), StepOutcome::AwaitingReset);
        assert!(!rig.rt.supervisor().watchdog().expired());
    }
    rig.clock.advance_ms(1);
    assert_eq!(rig.rt.step(), StepOutcome::AwaitingReset);
    assert!(rig.rt.supervisor().watchdog().expired());

    assert_eq!(rig.rt.hardware().calls.len(), calls);
    assert_eq!(rig.rt.transport().events.len(), events);
}

#[test]
fn commands_after_reset_are_never_read() {
    let mut rig = Rig::boot(SystemConfig::default());
    rig.rt.transport_mut().push_command("reset");
    rig.rt.transport_mut().push_command("off");
    assert_eq!(rig.run_until(STEP_MS), StepOutcome::AwaitingReset);
    rig.run_until(10 * STEP_MS);
    assert_eq!(rig.rt.transport().inbox.len(), 1);
    assert_eq!(rig.level(), 64_000);
}

// ── Reconnect ─────────────────────────────────────────────────

#[test]
fn reconnect_succeeds_on_third_attempt() {
    let mut rig = Rig::boot(SystemConfig::default());
    rig.run_until(1_000);

    let transport = rig.rt.transport_mut();
    transport.online = false;
    transport.connect_script = VecDeque::from([
        Err(CommsError::MqttConnectFailed),
        Err(CommsError::MqttConnectFailed),
        Ok(()),
    ]);
    let feeds = rig.rt.supervisor().feed_count();

    assert_eq!(rig.run_until(1_100), StepOutcome::Running);
    assert_eq!(rig.rt.transport().connect_calls, 4);
    assert!(rig.rt.transport().online);
    assert!(!rig.rt.supervisor().is_starving());

    let logs = rig.logs();
    assert!(logs.contains(&"error: transport not connected".to_string()));
    assert_eq!(logs.last().map(String::as_str), Some("transport connected"));
    // Loop feed plus one between each failed attempt.
    assert_eq!(rig.rt.supervisor().feed_count(), feeds + 3);
}

#[test]
fn reconnect_exhaustion_forces_restart() {
    let mut rig = Rig::boot(SystemConfig::default());
    rig.run_until(1_000);
    rig.rt.transport_mut().drop_broker();

    assert_eq!(rig.run_until(1_100), StepOutcome::AwaitingReset);
    assert_eq!(rig.rt.transport().connect_calls, 1 + 5);
    assert!(rig.rt.supervisor().is_starving());
    assert_eq!(rig.rt.scheduler().active_count(), 0);
    assert_eq!(
        rig.logs().last().map(String::as_str),
        Some("FATAL: reconnect failed 5 times -> reset")
    );

    // Terminal: no further attempts.
    rig.run_until(5_000);
    assert_eq!(rig.rt.transport().connect_calls, 6);
}

#[test]
fn keepalive_on_a_dead_session_triggers_reconnect() {
    let mut rig = Rig::boot(SystemConfig::default());
    rig.run_until(239_900);
    // Session silently gone but the inbox keeps the poll path quiet.
    rig.rt.transport_mut().online = false;
    rig.rt.transport_mut().push_command("auto");
    rig.run_until(240_000);
    assert_eq!(rig.rt.transport().connect_calls, 2);
    assert!(rig.rt.transport().online);
}

