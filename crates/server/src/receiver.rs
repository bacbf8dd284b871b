// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! UDP receive loop.
//!
//! One task owns the listening socket for all guests on the host. Every
//! datagram is decoded, demultiplexed by embedded identity, and fed to the
//! matching session; corrupt payloads and unregistered identities are
//! counted and dropped without disturbing the loop. The protocol is
//! fire-and-forget — nothing is ever sent back.

use crate::dispatch::EventQueue;
use crate::probe::Progress;
use crate::registry::SessionRegistry;
use crate::stats::ServerStats;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use vigil_core::{Clock, EventFlags};
use vigil_wire::{Heartbeat, MAX_DATAGRAM};

/// Rate limit for unknown-identity warnings: stale or spoofed traffic can
/// arrive at datagram rates and must not flood the log.
const UNKNOWN_WARN_PERIOD: Duration = Duration::from_secs(10);

pub struct Receiver<C: Clock> {
    registry: Arc<SessionRegistry<C>>,
    queue: Arc<EventQueue>,
    stats: Arc<ServerStats>,
    probe: Arc<Progress>,
    clock: C,
    unknown_warn: Throttle,
}

impl<C: Clock> Receiver<C> {
    pub fn new(
        registry: Arc<SessionRegistry<C>>,
        queue: Arc<EventQueue>,
        stats: Arc<ServerStats>,
        probe: Arc<Progress>,
        clock: C,
    ) -> Self {
        Self {
            registry,
            queue,
            stats,
            probe,
            clock,
            unknown_warn: Throttle::new(UNKNOWN_WARN_PERIOD),
        }
    }

    /// Run until cancelled. Per-datagram errors are local and the loop
    /// survives transient socket errors.
    pub async fn run(self, socket: UdpSocket, cancel: CancellationToken) {
        // One byte of headroom so an over-long datagram reads as oversize
        // instead of silently truncating into a length mismatch.
        let mut buf = [0u8; MAX_DATAGRAM + 1];
        // The idle tick keeps the liveness probe moving on a quiet host;
        // progress means "the loop is responsive", not "traffic exists".
        let mut idle = tokio::time::interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = idle.tick() => self.probe.mark_recv(self.clock.epoch_ms()),
                received = socket.recv_from(&mut buf) => match received {
                    Ok((len, peer)) => {
                        self.probe.mark_recv(self.clock.epoch_ms());
                        self.handle_datagram(&buf[..len], peer);
                    }
                    Err(e) => tracing::error!("heartbeat socket receive failed: {}", e),
                },
            }
        }
        tracing::info!("receive loop stopped");
    }

    fn handle_datagram(&self, bytes: &[u8], peer: SocketAddr) {
        let beat = match Heartbeat::decode(bytes) {
            Ok(beat) => beat,
            Err(err) => {
                ServerStats::bump(&self.stats.corrupt);
                tracing::debug!(%peer, %err, "dropping corrupt datagram");
                return;
            }
        };

        match self.registry.observe(&beat) {
            Ok(event) => {
                ServerStats::bump(&self.stats.received);
                if beat.flags.contains(EventFlags::STARTING) {
                    tracing::debug!(instance = %beat.instance, seq = beat.seq, "agent starting");
                }
                if let Some(event) = event {
                    self.queue.push(event);
                }
            }
            Err(unknown) => {
                ServerStats::bump(&self.stats.unknown);
                if let Some(suppressed) = self.unknown_warn.allow(self.clock.now()) {
                    tracing::warn!(
                        %peer,
                        instance = %unknown.0,
                        suppressed,
                        "dropping heartbeat for unregistered instance"
                    );
                }
            }
        }
    }
}

/// Allows one log line per period, counting what it suppressed in between.
struct Throttle {
    period: Duration,
    last: Mutex<Option<Instant>>,
    suppressed: AtomicU64,
}

impl Throttle {
    fn new(period: Duration) -> Self {
        Self {
            period,
            last: Mutex::new(None),
            suppressed: AtomicU64::new(0),
        }
    }

    /// Some(suppressed_count) when the caller may log now.
    fn allow(&self, now: Instant) -> Option<u64> {
        let mut last = self.last.lock();
        let due = match *last {
            None => true,
            Some(at) => now.saturating_duration_since(at) >= self.period,
        };
        if due {
            *last = Some(now);
            Some(self.suppressed.swap(0, Ordering::Relaxed))
        } else {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            None
        }
    }
}

#[cfg(test)]
#[path = "receiver_tests.rs"]
mod tests;
