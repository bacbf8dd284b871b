// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::stats::ServerStats;
use std::time::Duration;
use vigil_core::{EventFlags, FakeClock, HeartbeatConfig, InstanceId};
use vigil_wire::Heartbeat;

fn sweeper(clock: &FakeClock) -> Sweeper<FakeClock> {
    let config = Arc::new(Mutex::new(ServerConfig {
        heartbeat: HeartbeatConfig {
            poll_interval: Duration::from_secs(5),
            miss_threshold: 2,
            failure_threshold: 4,
        },
        ..ServerConfig::default()
    }));
    let stats = Arc::new(ServerStats::default());
    let registry = Arc::new(SessionRegistry::new(clock.clone(), Arc::clone(&config)));
    Sweeper::new(
        registry,
        EventQueue::new(16, Arc::clone(&stats)),
        Arc::new(Progress::new(clock.epoch_ms())),
        config,
        clock.clone(),
    )
}

#[test]
fn pass_queues_timeout_transitions_and_marks_progress() {
    let clock = FakeClock::new();
    let sweeper = sweeper(&clock);
    let id = InstanceId::from_string("inst-a");
    sweeper.registry.register(id.clone());
    sweeper
        .registry
        .observe(&Heartbeat {
            instance: id,
            seq: 0,
            flags: EventFlags::NONE,
            sent_ms: 0,
        })
        .unwrap();

    // Receiver path queued the Unknown -> Healthy event.
    assert_eq!(sweeper.queue.len(), 1);

    clock.advance_secs(10);
    sweeper.pass();
    assert_eq!(sweeper.queue.len(), 2);
    assert_eq!(sweeper.probe.sweep_age_ms(clock.epoch_ms()), 0);

    // Unchanged state: a second pass queues nothing.
    sweeper.pass();
    assert_eq!(sweeper.queue.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn run_ticks_finer_than_the_poll_interval_and_stops_on_cancel() {
    let clock = FakeClock::new();
    let sweeper = sweeper(&clock);
    let id = InstanceId::from_string("inst-a");
    sweeper.registry.register(id.clone());
    sweeper
        .registry
        .observe(&Heartbeat {
            instance: id,
            seq: 0,
            flags: EventFlags::NONE,
            sent_ms: 0,
        })
        .unwrap();
    let queue = Arc::clone(&sweeper.queue);

    let cancel = CancellationToken::new();
    let task = tokio::spawn(sweeper.run(cancel.clone()));

    // Silence for two poll intervals; the paused runtime auto-advances the
    // sweep's sleep, and the fake clock supplies the elapsed time.
    clock.advance_secs(10);
    tokio::time::sleep(Duration::from_secs(3)).await;
    let drained = queue.len();
    assert!(drained >= 2, "expected healthy + degraded events, got {drained}");

    cancel.cancel();
    task.await.expect("sweep task panicked");
}
