//! Integration tests for the ramp and boost controllers driven through the
//! service's scheduled task entry points.

use crate::mock_hw::{ActuatorCall, MockHardware, RecordingSink};

use circpump::app::commands::Command;
use circpump::app::service::AppService;
use circpump::config::SystemConfig;

fn booted() -> (AppService, MockHardware, RecordingSink) {
    let mut app = AppService::new(SystemConfig::default());
    let mut hw = MockHardware::new();
    app.apply_initial_output(&mut hw);
    hw.calls.clear();
    (app, hw, RecordingSink::new())
}

#[test]
fn idle_ramp_refreshes_the_held_level() {
    let (mut app, mut hw, _) = booted();
    for t in [200, 400, 600] {
        app.ramp_tick(t, &mut hw);
    }
    assert_eq!(hw.levels(), vec![64_000, 64_000, 64_000]);
}

#[test]
fn level_command_ramps_linearly_over_sixteen_seconds() {
    let (mut app, mut hw, mut sink) = booted();
    app.handle_command(Command::SetLevel(32_000), 10_000_000, &mut hw, &mut sink);
    hw.calls.clear();

    // Origin captured on the first tick after retargeting.
    app.ramp_tick(10_000, &mut hw);
    assert!(hw.levels().is_empty());

    app.ramp_tick(14_000, &mut hw);
    assert_eq!(app.control_state().current_level, 56_000);

    app.ramp_tick(18_000, &mut hw);
    assert_eq!(app.control_state().current_level, 48_000);

    app.ramp_tick(26_000, &mut hw);
    assert_eq!(app.control_state().current_level, 32_000);
    assert!(app.control_state().ramp.is_none());
    assert_eq!(hw.levels(), vec![56_000, 48_000, 32_000]);
}

#[test]
fn ramp_sequence_is_monotonic_toward_target() {
    let (mut app, mut hw, mut sink) = booted();
    app.handle_command(Command::SetLevel(0), 0, &mut hw, &mut sink);
    hw.calls.clear();

    let mut t = 0;
    while t <= 16_400 {
        app.ramp_tick(t, &mut hw);
        t += 200;
    }
    let levels = hw.levels();
    assert!(levels.windows(2).all(|w| w[1] <= w[0]));
    assert_eq!(levels.last(), Some(&0));
}

#[test]
fn first_boost_starts_after_one_interval_and_ends_five_seconds_later() {
    let (mut app, mut hw, mut sink) = booted();

    app.boost_tick(899_000, &mut hw, &mut sink);
    assert!(hw.calls.is_empty());
    assert!(!app.control_state().boost.active);

    app.boost_tick(900_000, &mut hw, &mut sink);
    assert_eq!(hw.calls, vec![ActuatorCall::Level(64_000), ActuatorCall::Indicator(true)]);
    assert!(app.control_state().boost.active);
    assert_eq!(sink.logs(), vec!["boost: 5s at 100%".to_string()]);

    hw.calls.clear();
    app.boost_tick(904_000, &mut hw, &mut sink);
    assert!(app.control_state().boost.active);

    app.boost_tick(905_000, &mut hw, &mut sink);
    assert!(!app.control_state().boost.active);
    assert_eq!(app.control_state().target_level, 29_000);
    // Exit hands the descent to the ramp; nothing is written directly.
    assert!(hw.calls.is_empty());
    assert_eq!(sink.logs().last().map(String::as_str), Some("boost end -> 16s ramp to 29000"));
}

#[test]
fn boost_exit_ramps_down_to_nominal() {
    let (mut app, mut hw, mut sink) = booted();
    app.boost_tick(900_000, &mut hw, &mut sink);
    app.boost_tick(905_000, &mut hw, &mut sink);
    hw.calls.clear();

    app.ramp_tick(905_200, &mut hw);
    app.ramp_tick(913_200, &mut hw);
    assert_eq!(app.control_state().current_level, 46_500);
    app.ramp_tick(921_200, &mut hw);
    assert_eq!(app.control_state().current_level, 29_000);
    assert_eq!(hw.levels(), vec![46_500, 29_000]);
}

#[test]
fn next_boost_follows_one_interval_after_the_last() {
    let (mut app, mut hw, mut sink) = booted();
    app.boost_tick(900_000, &mut hw, &mut sink);
    app.boost_tick(905_000, &mut hw, &mut sink);

    app.boost_tick(1_799_000, &mut hw, &mut sink);
    assert!(!app.control_state().boost.active);
    app.boost_tick(1_800_000, &mut hw, &mut sink);
    assert!(app.control_state().boost.active);
}

#[test]
fn manual_level_cancels_an_active_boost() {
    let (mut app, mut hw, mut sink) = booted();
    app.boost_tick(900_000, &mut hw, &mut sink);
    app.handle_command(Command::SetLevel(10_000), 901_000_000, &mut hw, &mut sink);

    assert!(!app.control_state().boost.active);
    app.boost_tick(905_000, &mut hw, &mut sink);
    // No boost end: the manual target survives.
    assert_eq!(app.control_state().target_level, 10_000);
}

#[test]
fn auto_closes_a_phantom_boost_then_boosts_after_the_lead() {
    let (mut app, mut hw, mut sink) = booted();
    app.handle_command(Command::Off, 59_000_000, &mut hw, &mut sink);
    app.handle_command(Command::Auto, 60_000_000, &mut hw, &mut sink);
    assert!(app.control_state().boost.active);
    assert_eq!(app.control_state().boost.last_start_ms, 60_000 - 900_000 + 10_000);
    assert_eq!(hw.indicator(), Some(true));
    sink.events.clear();

    app.boost_tick(61_000, &mut hw, &mut sink);
    assert!(!app.control_state().boost.active);
    assert_eq!(app.control_state().target_level, 29_000);
    assert_eq!(sink.logs(), vec!["boost end -> 16s ramp to 29000".to_string()]);

    app.boost_tick(69_000, &mut hw, &mut sink);
    assert!(!app.control_state().boost.active);
    app.boost_tick(70_000, &mut hw, &mut sink);
    assert!(app.control_state().boost.active);
    assert_eq!(hw.last_level(), Some(64_000));
}

#[test]
fn off_does_not_disable_boost_scheduling() {
    let (mut app, mut hw, mut sink) = booted();
    app.handle_command(Command::Off, 1_000_000, &mut hw, &mut sink);

    // Boost scheduling keeps running from the boot anchor.
    app.boost_tick(900_000, &mut hw, &mut sink);
    assert!(app.control_state().boost.active);
    assert_eq!(app.control_state().current_level, 64_000);
}
