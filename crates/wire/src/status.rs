// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status reporting types shared by the daemon and its clients.

use serde::{Deserialize, Serialize};
use vigil_core::{HealthState, InstanceId};

/// One row of the session table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub instance: InstanceId,
    pub state: HealthState,
    /// Whole poll intervals elapsed since the last heartbeat.
    pub missed: u32,
    pub last_seq: Option<u32>,
    /// Sequence regressions observed (agent restarts).
    pub restarts: u32,
    pub silence_ms: u64,
}

/// Monotonic counters kept by the server since startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCounters {
    /// Valid heartbeats accepted.
    pub received: u64,
    /// Datagrams dropped as corrupt.
    pub corrupt: u64,
    /// Datagrams dropped for unregistered identities.
    pub unknown: u64,
    /// Health events handed to the sink.
    pub events_delivered: u64,
    /// Health events dropped by the bounded queue (oldest-first).
    pub events_dropped: u64,
}
