// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-socket listener.
//!
//! The orchestration layer and the `vigil` CLI talk to the daemon over a
//! Unix socket: registration and deregistration as guests are created and
//! destroyed, enable/disable, status queries, the liveness ping consumed by
//! the process monitor, and graceful shutdown. Each connection is served by
//! its own task so a slow client never blocks the accept loop — or anything
//! else in the daemon.

use crate::dispatch::EventQueue;
use crate::probe::Progress;
use crate::registry::SessionRegistry;
use crate::stats::ServerStats;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use vigil_core::Clock;
use vigil_wire::{decode, encode, read_frame, write_frame, ControlError, Request, Response};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared daemon context for request handlers.
pub struct ControlCtx<C: Clock> {
    pub registry: Arc<SessionRegistry<C>>,
    pub queue: Arc<EventQueue>,
    pub stats: Arc<ServerStats>,
    pub probe: Arc<Progress>,
    pub clock: C,
    pub start_time: Instant,
    /// Cancelling this token shuts the whole daemon down.
    pub shutdown: CancellationToken,
}

/// Accept loop. Connection tasks outlive a cancelled accept loop just long
/// enough to flush their final response.
pub async fn run<C: Clock>(listener: UnixListener, ctx: Arc<ControlCtx<C>>) {
    let cancel = ctx.shutdown.clone();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    let ctx = Arc::clone(&ctx);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &ctx).await {
                            tracing::debug!("control connection error: {}", e);
                        }
                    });
                }
                Err(e) => tracing::error!("control accept error: {}", e),
            },
        }
    }
    tracing::info!("control listener stopped");
}

/// Serve one connection: a sequence of length-prefixed request/response
/// pairs until the client hangs up.
pub async fn handle_connection<C, S>(stream: S, ctx: &ControlCtx<C>) -> Result<(), ControlError>
where
    C: Clock,
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    while let Some(body) = read_frame(&mut reader).await? {
        let response = match decode::<Request>(&body) {
            Ok(request) => handle_request(request, ctx),
            Err(e) => Response::error(format!("malformed request: {e}")),
        };
        write_frame(&mut writer, &encode(&response)?).await?;
    }
    Ok(())
}

fn handle_request<C: Clock>(request: Request, ctx: &ControlCtx<C>) -> Response {
    match request {
        Request::Ping => {
            let now_ms = ctx.clock.epoch_ms();
            Response::Pong {
                version: VERSION.to_string(),
                uptime_ms: ctx.start_time.elapsed().as_millis() as u64,
                recv_age_ms: ctx.probe.recv_age_ms(now_ms),
                sweep_age_ms: ctx.probe.sweep_age_ms(now_ms),
                sessions: ctx.registry.len(),
            }
        }

        Request::Status => Response::Status {
            sessions: ctx.registry.snapshot(),
            counters: ctx.stats.snapshot(),
        },

        Request::Register { instance } => {
            if ctx.registry.register(instance.clone()) {
                tracing::info!(%instance, "registered instance");
            }
            Response::Ok
        }

        Request::Deregister { instance } => match ctx.registry.deregister(&instance) {
            Ok(event) => {
                tracing::info!(%instance, "deregistered instance");
                if let Some(event) = event {
                    ctx.queue.push(event);
                }
                Response::Ok
            }
            Err(e) => Response::error(e.to_string()),
        },

        Request::Enable { instance } => match ctx.registry.enable(&instance) {
            Ok(event) => {
                if let Some(event) = event {
                    ctx.queue.push(event);
                }
                Response::Ok
            }
            Err(e) => Response::error(e.to_string()),
        },

        Request::Disable { instance } => match ctx.registry.disable(&instance) {
            Ok(event) => {
                if let Some(event) = event {
                    ctx.queue.push(event);
                }
                Response::Ok
            }
            Err(e) => Response::error(e.to_string()),
        },

        Request::Shutdown => {
            tracing::info!("shutdown requested over control socket");
            ctx.shutdown.cancel();
            Response::Ok
        }
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
