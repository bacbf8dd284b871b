// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control requests accepted by the server daemon.

use serde::{Deserialize, Serialize};
use vigil_core::InstanceId;

/// A request from the CLI or the orchestration layer.
///
/// Serializes as `{"type": "...", ...fields}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Cheap liveness probe: is the receive/sweep loop making progress?
    Ping,

    /// Full session table and counters.
    Status,

    /// Announce an instance; its session starts in `unknown`.
    Register { instance: InstanceId },

    /// Destroy an instance's session (e.g. the VM is being deleted).
    Deregister { instance: InstanceId },

    /// Re-admit a disabled instance to monitoring.
    Enable { instance: InstanceId },

    /// Force an instance out of monitoring without destroying its session.
    Disable { instance: InstanceId },

    /// Graceful daemon shutdown.
    Shutdown,
}
