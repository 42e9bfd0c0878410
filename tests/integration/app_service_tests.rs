//! Integration tests for the remote command → AppService → actuator chain.
//!
//! Each test drives `handle_command` the way the runtime does and asserts
//! on the actuator history, the remote log and the telemetry that follows.

use crate::mock_hw::{ActuatorCall, MockHardware, RecordingSink};

use circpump::app::commands::Command;
use circpump::app::events::{AppEvent, CommandOutcome};
use circpump::app::service::AppService;
use circpump::config::SystemConfig;

const NOW_US: u64 = 60_000_000;

fn make_app() -> (AppService, MockHardware, RecordingSink) {
    let mut app = AppService::new(SystemConfig::default());
    let mut hw = MockHardware::new();
    app.apply_initial_output(&mut hw);
    hw.calls.clear();
    (app, hw, RecordingSink::new())
}

#[test]
fn off_stops_output_and_indicator_immediately() {
    let (mut app, mut hw, mut sink) = make_app();

    let outcome = app.handle_command(Command::parse("off"), NOW_US, &mut hw, &mut sink);

    assert_eq!(outcome, CommandOutcome::Applied);
    assert_eq!(hw.calls, vec![ActuatorCall::Level(0), ActuatorCall::Indicator(false)]);
    assert_eq!(app.control_state().current_level, 0);
    assert!(!app.control_state().boost.active);
    assert_eq!(sink.logs(), vec!["pump off".to_string()]);
    assert_eq!(sink.telemetry_count(), 1);
}

#[test]
fn on_jumps_to_full_power() {
    let (mut app, mut hw, mut sink) = make_app();
    app.handle_command(Command::Off, NOW_US, &mut hw, &mut sink);
    hw.calls.clear();

    app.handle_command(Command::parse(" ON "), NOW_US, &mut hw, &mut sink);

    assert_eq!(hw.calls, vec![ActuatorCall::Level(64_000), ActuatorCall::Indicator(true)]);
    assert!(sink.logs().contains(&"manual -> 100%".to_string()));
}

#[test]
fn level_command_retargets_without_writing() {
    let (mut app, mut hw, mut sink) = make_app();

    app.handle_command(Command::parse("20000"), NOW_US, &mut hw, &mut sink);

    // The ramp owns the output; only the indicator changes now.
    assert_eq!(hw.calls, vec![ActuatorCall::Indicator(true)]);
    assert_eq!(app.control_state().target_level, 20_000);
    assert_eq!(app.control_state().current_level, 64_000);
    assert_eq!(sink.logs(), vec!["manual -> 20000".to_string()]);
}

#[test]
fn zero_level_turns_indicator_off() {
    let (mut app, mut hw, mut sink) = make_app();
    app.handle_command(Command::parse("0"), NOW_US, &mut hw, &mut sink);
    assert_eq!(hw.indicator(), Some(false));
}

#[test]
fn over_range_level_is_kept_as_target() {
    let (mut app, mut hw, mut sink) = make_app();
    app.handle_command(Command::parse("70000"), NOW_US, &mut hw, &mut sink);
    assert_eq!(app.control_state().target_level, 70_000);
}

#[test]
fn unknown_command_is_logged_and_still_reports() {
    let (mut app, mut hw, mut sink) = make_app();
    let before = app.control_state().clone();

    let outcome = app.handle_command(Command::parse("Turbo"), NOW_US, &mut hw, &mut sink);

    assert_eq!(outcome, CommandOutcome::Ignored);
    assert!(hw.calls.is_empty());
    assert_eq!(app.control_state(), &before);
    assert_eq!(sink.logs(), vec!["unknown: turbo".to_string()]);
    assert_eq!(sink.telemetry_count(), 1);
}

#[test]
fn reset_is_terminal_and_publishes_no_telemetry() {
    let (mut app, mut hw, mut sink) = make_app();

    let outcome = app.handle_command(Command::parse("RESET"), NOW_US, &mut hw, &mut sink);

    assert_eq!(outcome, CommandOutcome::RestartRequested);
    assert!(app.is_awaiting_reset());
    assert_eq!(sink.telemetry_count(), 0);
    assert_eq!(sink.logs(), vec!["remote reset -> watchdog expires in 8s".to_string()]);

    // Everything after is dropped.
    sink.events.clear();
    let outcome = app.handle_command(Command::On, NOW_US, &mut hw, &mut sink);
    assert_eq!(outcome, CommandOutcome::Rejected);
    assert!(hw.calls.is_empty());
    assert_eq!(sink.telemetry_count(), 0);
    assert!(matches!(
        sink.events.as_slice(),
        [AppEvent::CommandHandled {
            outcome: CommandOutcome::Rejected,
            ..
        }]
    ));
}

#[test]
fn announce_logs_start_then_reports() {
    let (mut app, mut hw, mut sink) = make_app();
    app.announce(0, &mut hw, &mut sink);

    let logs = sink.logs();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].starts_with("Start - IP: 0.0.0.0 | FW: v"));
    assert!(matches!(sink.events.last(), Some(AppEvent::Telemetry(_))));
}

#[test]
fn telemetry_json_uses_wire_keys() {
    let (mut app, mut hw, _) = make_app();
    hw.feedback.high_time_us = 6_666;
    hw.feedback.low_time_us = 6_667;
    hw.feedback.last_pulse_us = NOW_US - 1_000;
    hw.feedback.last_flank_us = NOW_US - 1_000;

    let t = app.build_telemetry(NOW_US, &mut hw);
    let json: serde_json::Value = serde_json::from_slice(&t.to_json().unwrap()).unwrap();

    for key in [
        "FW",
        "UPTIME",
        "WLAN",
        "LED",
        "PWM",
        "PIN0",
        "PIN5_Flank_us",
        "PIN5_HIGH_us",
        "PIN5_LOW_us",
        "PIN5_Freq_Hz",
        "PumpDuty",
        "PumpStatus",
        "PIN26",
        "PIN27",
        "PIN28",
    ] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    assert_eq!(json["UPTIME"], 60);
    assert_eq!(json["PWM"], 64_000);
    assert_eq!(json["PumpStatus"], "Normal Operation — flow/power feedback");
    let duty = json["PumpDuty"].as_f64().unwrap();
    assert!((duty - 50.0).abs() < 0.1);
}

#[test]
fn stale_feedback_reports_timeout() {
    let (mut app, mut hw, _) = make_app();
    hw.feedback.high_time_us = 6_666;
    hw.feedback.low_time_us = 6_667;
    hw.feedback.last_pulse_us = NOW_US - 50_000;

    let t = app.build_telemetry(NOW_US, &mut hw);
    assert_eq!(t.status, "TIMEOUT / NO PULSE");
    assert_eq!(t.high_time_us, 0);
    assert_eq!(t.duty_percent, 0.0);
}
