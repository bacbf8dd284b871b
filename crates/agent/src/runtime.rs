// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat emission.

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, warn};
use vigil_core::{Clock, EventFlags, InstanceId};
use vigil_wire::Heartbeat;

/// Transport seam for the tick loop; the real implementation is a connected
/// UDP socket, tests record payloads.
#[async_trait]
pub trait Beacon: Send + Sync {
    async fn send(&self, payload: &[u8]) -> io::Result<()>;
}

/// Fire-and-forget UDP transport to the host's server endpoint.
pub struct UdpBeacon {
    socket: UdpSocket,
}

impl UdpBeacon {
    pub async fn connect(endpoint: &str) -> io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(endpoint).await?;
        Ok(Self { socket })
    }
}

#[async_trait]
impl Beacon for UdpBeacon {
    async fn send(&self, payload: &[u8]) -> io::Result<()> {
        self.socket.send(payload).await.map(|_| ())
    }
}

/// The agent's only state: its identity, its timer period, and a sequence
/// counter. A restarted agent naturally resets the counter to zero; the
/// server reads that regression as "agent restarted", not as an error.
pub struct AgentRuntime<B, C: Clock> {
    instance: InstanceId,
    poll_interval: Duration,
    beacon: B,
    clock: C,
    seq: u32,
    started: bool,
}

impl<B: Beacon, C: Clock> AgentRuntime<B, C> {
    pub fn new(instance: InstanceId, poll_interval: Duration, beacon: B, clock: C) -> Self {
        Self {
            instance,
            poll_interval,
            beacon,
            clock,
            seq: 0,
            started: false,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Adjust the timer period (configuration reload).
    pub fn set_poll_interval(&mut self, poll_interval: Duration) {
        self.poll_interval = poll_interval;
    }

    /// Swap the transport (endpoint change on reload).
    pub fn replace_beacon(&mut self, beacon: B) {
        self.beacon = beacon;
    }

    /// One timer tick: emit one heartbeat. The first beat after process
    /// start carries the STARTING flag.
    pub async fn beat(&mut self) {
        let flags = if self.started {
            EventFlags::NONE
        } else {
            self.started = true;
            EventFlags::STARTING
        };
        self.emit(flags).await;
    }

    /// Final beat on graceful stop: the STOPPING flag lets the server
    /// distinguish a clean shutdown from a failure.
    pub async fn stop(&mut self) {
        self.emit(EventFlags::STOPPING).await;
    }

    async fn emit(&mut self, flags: EventFlags) {
        let beat = Heartbeat {
            instance: self.instance.clone(),
            seq: self.seq,
            flags,
            sent_ms: self.clock.epoch_ms(),
        };
        // Wrap-around is normal, expected progression.
        self.seq = self.seq.wrapping_add(1);

        match beat.encode() {
            Ok(payload) => {
                if let Err(e) = self.beacon.send(&payload).await {
                    // Keep ticking: server-side timeouts own unavailability.
                    warn!(seq = beat.seq, "heartbeat send failed: {}", e);
                } else {
                    debug!(seq = beat.seq, flags = %beat.flags, "heartbeat sent");
                }
            }
            Err(e) => warn!("heartbeat encode failed: {}", e),
        }
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
