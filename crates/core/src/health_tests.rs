// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::{Clock, FakeClock};
use yare::parameterized;

fn config() -> HeartbeatConfig {
    HeartbeatConfig {
        poll_interval: Duration::from_secs(5),
        miss_threshold: 2,
        failure_threshold: 4,
    }
}

fn session(clock: &FakeClock) -> Session {
    Session::new(InstanceId::from_string("inst-guest-a"), &config(), clock.now())
}

#[test]
fn first_heartbeat_admits_unknown_to_healthy() {
    let clock = FakeClock::new();
    let mut s = session(&clock);
    assert_eq!(s.state(), HealthState::Unknown);

    let t = s.observe(EventFlags::NONE, 0, clock.now()).unwrap();
    assert_eq!(t.from, HealthState::Unknown);
    assert_eq!(t.to, HealthState::Healthy);
    assert_eq!(t.cause, TransitionCause::Heartbeat);
}

#[test]
fn heartbeats_within_budget_never_degrade() {
    let clock = FakeClock::new();
    let mut s = session(&clock);
    s.observe(EventFlags::NONE, 0, clock.now());

    // Gaps of 9s stay under poll_interval * miss_threshold = 10s.
    for seq in 1..=20u32 {
        clock.advance_secs(9);
        assert_eq!(s.evaluate(clock.now()), None, "spurious transition at seq {seq}");
        assert_eq!(s.observe(EventFlags::NONE, seq, clock.now()), None);
        assert_eq!(s.state(), HealthState::Healthy);
    }
}

#[test]
fn silence_degrades_at_miss_threshold_not_before() {
    let clock = FakeClock::new();
    let mut s = session(&clock);
    s.observe(EventFlags::NONE, 0, clock.now());

    clock.advance_secs(9);
    assert_eq!(s.evaluate(clock.now()), None);

    clock.advance_secs(1);
    let t = s.evaluate(clock.now()).unwrap();
    assert_eq!(t.to, HealthState::Degraded);
    assert_eq!(t.cause, TransitionCause::Timeout);
    assert_eq!(s.missed(), 2);
}

#[test]
fn degraded_fails_at_failure_threshold() {
    let clock = FakeClock::new();
    let mut s = session(&clock);
    s.observe(EventFlags::NONE, 0, clock.now());

    clock.advance_secs(10);
    assert_eq!(s.evaluate(clock.now()).unwrap().to, HealthState::Degraded);
    clock.advance_secs(5);
    assert_eq!(s.evaluate(clock.now()), None);
    clock.advance_secs(5);
    let t = s.evaluate(clock.now()).unwrap();
    assert_eq!(t.from, HealthState::Degraded);
    assert_eq!(t.to, HealthState::Failed);
}

#[test]
fn deep_silence_reports_degraded_before_failed() {
    let clock = FakeClock::new();
    let mut s = session(&clock);
    s.observe(EventFlags::NONE, 0, clock.now());

    // One sweep after both thresholds have long passed.
    clock.advance_secs(60);
    assert_eq!(s.evaluate(clock.now()).unwrap().to, HealthState::Degraded);
    assert_eq!(s.evaluate(clock.now()).unwrap().to, HealthState::Failed);
    assert_eq!(s.evaluate(clock.now()), None);
}

#[parameterized(
    degraded = { 10 },
    failed = { 20 },
)]
fn recovery_is_immediate_on_any_heartbeat(silence_secs: u64) {
    let clock = FakeClock::new();
    let mut s = session(&clock);
    s.observe(EventFlags::NONE, 0, clock.now());

    clock.advance_secs(silence_secs);
    while s.evaluate(clock.now()).is_some() {}
    assert_ne!(s.state(), HealthState::Healthy);

    let t = s.observe(EventFlags::NONE, 1, clock.now()).unwrap();
    assert_eq!(t.to, HealthState::Healthy);
    assert_eq!(s.missed(), 0);
    // Recovered session gets the full timeout budget again.
    clock.advance_secs(9);
    assert_eq!(s.evaluate(clock.now()), None);
}

#[test]
fn repeated_sweeps_in_same_state_emit_nothing() {
    let clock = FakeClock::new();
    let mut s = session(&clock);
    s.observe(EventFlags::NONE, 0, clock.now());

    clock.advance_secs(10);
    assert!(s.evaluate(clock.now()).is_some());
    for _ in 0..10 {
        assert_eq!(s.evaluate(clock.now()), None);
    }
}

#[parameterized(
    unknown = { 0 },
    healthy = { 1 },
    degraded = { 2 },
    failed = { 3 },
)]
fn stopping_flag_disables_from_any_state(stage: u8) {
    let clock = FakeClock::new();
    let mut s = session(&clock);
    if stage >= 1 {
        s.observe(EventFlags::NONE, 0, clock.now());
    }
    if stage >= 2 {
        clock.advance_secs(10);
        s.evaluate(clock.now());
    }
    if stage >= 3 {
        clock.advance_secs(10);
        s.evaluate(clock.now());
    }

    let from = s.state();
    let t = s.observe(EventFlags::STOPPING, 99, clock.now()).unwrap();
    assert_eq!(t.from, from);
    assert_eq!(t.to, HealthState::Disabled);
    assert_eq!(t.cause, TransitionCause::GracefulStop);

    // Timers are disarmed once disabled.
    clock.advance_secs(3600);
    assert_eq!(s.evaluate(clock.now()), None);
}

#[test]
fn disabled_absorbs_heartbeats_without_events() {
    let clock = FakeClock::new();
    let mut s = session(&clock);
    s.disable(TransitionCause::Disabled).unwrap();

    assert_eq!(s.observe(EventFlags::NONE, 7, clock.now()), None);
    assert_eq!(s.state(), HealthState::Disabled);
    // The beat is still acknowledged internally.
    assert_eq!(s.last_seq(), Some(7));
}

#[test]
fn enable_rearms_at_unknown() {
    let clock = FakeClock::new();
    let mut s = session(&clock);
    s.observe(EventFlags::NONE, 0, clock.now());
    s.disable(TransitionCause::Disabled).unwrap();

    let t = s.enable(clock.now()).unwrap();
    assert_eq!(t.to, HealthState::Unknown);
    assert_eq!(t.cause, TransitionCause::Enabled);
    // Enabling a session that is not disabled is a no-op.
    assert_eq!(s.enable(clock.now()), None);

    let t = s.observe(EventFlags::NONE, 1, clock.now()).unwrap();
    assert_eq!(t.to, HealthState::Healthy);
}

#[test]
fn sequence_regression_is_restart_not_error() {
    let clock = FakeClock::new();
    let mut s = session(&clock);
    s.observe(EventFlags::NONE, 4000, clock.now());
    assert_eq!(s.restarts(), 0);

    // Agent restarted: counter reset to zero. No transition, no error.
    clock.advance_secs(5);
    assert_eq!(s.observe(EventFlags::STARTING, 0, clock.now()), None);
    assert_eq!(s.restarts(), 1);
    assert_eq!(s.state(), HealthState::Healthy);
    assert_eq!(s.last_seq(), Some(0));
}

#[test]
fn sequence_wrap_is_not_a_restart() {
    let clock = FakeClock::new();
    let mut s = session(&clock);
    s.observe(EventFlags::NONE, u32::MAX - 1, clock.now());
    clock.advance_secs(5);
    s.observe(EventFlags::NONE, 3, clock.now());
    assert_eq!(s.restarts(), 0);
}

#[test]
fn unknown_session_never_times_out() {
    let clock = FakeClock::new();
    let mut s = session(&clock);
    clock.advance_secs(3600);
    assert_eq!(s.evaluate(clock.now()), None);
    assert_eq!(s.state(), HealthState::Unknown);
    // Eviction sees the silence, though.
    assert!(s.silence(clock.now()) >= Duration::from_secs(3600));
}

#[test]
fn reconfigure_applies_to_subsequent_evaluations() {
    let clock = FakeClock::new();
    let mut s = session(&clock);
    s.observe(EventFlags::NONE, 0, clock.now());

    s.reconfigure(&HeartbeatConfig {
        poll_interval: Duration::from_secs(1),
        miss_threshold: 3,
        failure_threshold: 6,
    });
    clock.advance_secs(3);
    assert_eq!(s.evaluate(clock.now()).unwrap().to, HealthState::Degraded);
}
