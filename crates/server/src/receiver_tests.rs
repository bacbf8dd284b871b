// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::Ordering;
use vigil_core::{FakeClock, InstanceId, ServerConfig};

fn peer() -> SocketAddr {
    "192.0.2.7:4242".parse().unwrap()
}

fn receiver(clock: &FakeClock) -> Receiver<FakeClock> {
    let config = Arc::new(Mutex::new(ServerConfig::default()));
    let stats = Arc::new(ServerStats::default());
    Receiver::new(
        Arc::new(SessionRegistry::new(clock.clone(), config)),
        EventQueue::new(16, Arc::clone(&stats)),
        stats,
        Arc::new(Progress::new(clock.epoch_ms())),
        clock.clone(),
    )
}

fn encoded(id: &str, seq: u32, flags: EventFlags) -> Vec<u8> {
    Heartbeat {
        instance: InstanceId::from_string(id),
        seq,
        flags,
        sent_ms: 0,
    }
    .encode()
    .unwrap()
}

#[test]
fn corrupt_datagrams_are_counted_and_dropped() {
    let clock = FakeClock::new();
    let rx = receiver(&clock);

    rx.handle_datagram(b"not a heartbeat", peer());
    rx.handle_datagram(&[], peer());

    assert_eq!(rx.stats.corrupt.load(Ordering::Relaxed), 2);
    assert_eq!(rx.stats.received.load(Ordering::Relaxed), 0);
    assert!(rx.queue.is_empty());
}

#[test]
fn unknown_identities_are_counted_and_dropped() {
    let clock = FakeClock::new();
    let rx = receiver(&clock);

    rx.handle_datagram(&encoded("inst-ghost", 1, EventFlags::NONE), peer());

    assert_eq!(rx.stats.unknown.load(Ordering::Relaxed), 1);
    assert_eq!(rx.stats.received.load(Ordering::Relaxed), 0);
    assert!(rx.queue.is_empty());
}

#[test]
fn registered_heartbeats_feed_the_session_and_queue() {
    let clock = FakeClock::new();
    let rx = receiver(&clock);
    rx.registry.register(InstanceId::from_string("inst-a"));

    rx.handle_datagram(&encoded("inst-a", 0, EventFlags::STARTING), peer());
    assert_eq!(rx.stats.received.load(Ordering::Relaxed), 1);
    // Unknown -> Healthy transition queued.
    assert_eq!(rx.queue.len(), 1);

    // Steady beats produce no further events.
    rx.handle_datagram(&encoded("inst-a", 1, EventFlags::NONE), peer());
    assert_eq!(rx.stats.received.load(Ordering::Relaxed), 2);
    assert_eq!(rx.queue.len(), 1);
}

#[test]
fn unknown_warnings_are_rate_limited() {
    let clock = FakeClock::new();
    let throttle = Throttle::new(Duration::from_secs(10));

    assert_eq!(throttle.allow(clock.now()), Some(0));
    for _ in 0..5 {
        assert_eq!(throttle.allow(clock.now()), None);
    }
    clock.advance_secs(10);
    assert_eq!(throttle.allow(clock.now()), Some(5));
}

#[tokio::test]
async fn run_stops_on_cancel_and_marks_progress() {
    let clock = FakeClock::new();
    let rx = receiver(&clock);
    rx.registry.register(InstanceId::from_string("inst-a"));
    let stats = Arc::clone(&rx.stats);
    let probe = Arc::clone(&rx.probe);

    let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    let cancel = CancellationToken::new();
    let task = tokio::spawn(rx.run(server, cancel.clone()));

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client
        .send_to(&encoded("inst-a", 0, EventFlags::NONE), addr)
        .await
        .unwrap();

    while stats.received.load(Ordering::Relaxed) == 0 {
        tokio::task::yield_now().await;
    }
    assert_eq!(probe.recv_age_ms(clock.epoch_ms()), 0);

    cancel.cancel();
    task.await.expect("receive loop panicked");
}
