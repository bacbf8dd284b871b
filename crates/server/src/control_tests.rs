// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use vigil_core::{EventFlags, FakeClock, HealthState, InstanceId, ServerConfig};
use vigil_wire::Heartbeat;

fn ctx(clock: &FakeClock) -> Arc<ControlCtx<FakeClock>> {
    let config = Arc::new(Mutex::new(ServerConfig::default()));
    let stats = Arc::new(ServerStats::default());
    Arc::new(ControlCtx {
        registry: Arc::new(SessionRegistry::new(clock.clone(), config)),
        queue: EventQueue::new(16, Arc::clone(&stats)),
        stats,
        probe: Arc::new(Progress::new(clock.epoch_ms())),
        clock: clock.clone(),
        start_time: Instant::now(),
        shutdown: CancellationToken::new(),
    })
}

async fn roundtrip(ctx: &Arc<ControlCtx<FakeClock>>, request: Request) -> Response {
    let (client, server) = tokio::io::duplex(4096);
    let ctx = Arc::clone(ctx);
    let task = tokio::spawn(async move {
        let _ = handle_connection(server, &ctx).await;
    });

    let (mut reader, mut writer) = tokio::io::split(client);
    write_frame(&mut writer, &encode(&request).unwrap()).await.unwrap();
    let body = read_frame(&mut reader).await.unwrap().expect("response frame");
    writer.shutdown().await.unwrap();
    task.await.unwrap();
    decode(&body).unwrap()
}

#[tokio::test]
async fn ping_reports_progress_and_session_count() {
    let clock = FakeClock::new();
    let ctx = ctx(&clock);
    ctx.registry.register(InstanceId::from_string("inst-a"));
    clock.advance(Duration::from_millis(250));

    match roundtrip(&ctx, Request::Ping).await {
        Response::Pong { recv_age_ms, sweep_age_ms, sessions, .. } => {
            assert_eq!(recv_age_ms, 250);
            assert_eq!(sweep_age_ms, 250);
            assert_eq!(sessions, 1);
        }
        other => panic!("expected Pong, got {other:?}"),
    }
}

#[tokio::test]
async fn register_observe_status_flow() {
    let clock = FakeClock::new();
    let ctx = ctx(&clock);

    let response =
        roundtrip(&ctx, Request::Register { instance: InstanceId::from_string("inst-a") }).await;
    assert_eq!(response, Response::Ok);

    ctx.registry
        .observe(&Heartbeat {
            instance: InstanceId::from_string("inst-a"),
            seq: 3,
            flags: EventFlags::NONE,
            sent_ms: 0,
        })
        .unwrap();

    match roundtrip(&ctx, Request::Status).await {
        Response::Status { sessions, counters } => {
            assert_eq!(sessions.len(), 1);
            assert_eq!(sessions[0].state, HealthState::Healthy);
            assert_eq!(sessions[0].last_seq, Some(3));
            assert_eq!(counters.events_dropped, 0);
        }
        other => panic!("expected Status, got {other:?}"),
    }
}

#[tokio::test]
async fn disable_and_deregister_queue_events() {
    let clock = FakeClock::new();
    let ctx = ctx(&clock);
    ctx.registry.register(InstanceId::from_string("inst-a"));
    ctx.registry
        .observe(&Heartbeat {
            instance: InstanceId::from_string("inst-a"),
            seq: 0,
            flags: EventFlags::NONE,
            sent_ms: 0,
        })
        .unwrap();
    let queued = ctx.queue.len();

    let response =
        roundtrip(&ctx, Request::Disable { instance: InstanceId::from_string("inst-a") }).await;
    assert_eq!(response, Response::Ok);
    assert_eq!(ctx.queue.len(), queued + 1);

    let response =
        roundtrip(&ctx, Request::Deregister { instance: InstanceId::from_string("inst-a") })
            .await;
    assert_eq!(response, Response::Ok);
    assert_eq!(ctx.registry.len(), 0);
}

#[tokio::test]
async fn unknown_instances_get_an_error_response() {
    let clock = FakeClock::new();
    let ctx = ctx(&clock);

    match roundtrip(&ctx, Request::Enable { instance: InstanceId::from_string("inst-x") }).await {
        Response::Error { message } => assert!(message.contains("inst-x")),
        other => panic!("expected Error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_requests_are_answered_not_dropped() {
    let clock = FakeClock::new();
    let ctx = ctx(&clock);

    let (client, server) = tokio::io::duplex(4096);
    let task = {
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            let _ = handle_connection(server, &ctx).await;
        })
    };

    let (mut reader, mut writer) = tokio::io::split(client);
    write_frame(&mut writer, b"{\"type\":\"no_such_request\"}").await.unwrap();
    let body = read_frame(&mut reader).await.unwrap().expect("response frame");
    writer.shutdown().await.unwrap();
    task.await.unwrap();

    match decode::<Response>(&body).unwrap() {
        Response::Error { message } => assert!(message.contains("malformed request")),
        other => panic!("expected Error, got {other:?}"),
    }
}

#[tokio::test]
async fn shutdown_request_cancels_the_daemon_token() {
    let clock = FakeClock::new();
    let ctx = ctx(&clock);

    assert_eq!(roundtrip(&ctx, Request::Shutdown).await, Response::Ok);
    assert!(ctx.shutdown.is_cancelled());
}
