// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control responses returned by the server daemon.

use crate::status::{ServerCounters, SessionEntry};
use serde::{Deserialize, Serialize};

/// Answer to a [`crate::Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Ok,

    Error { message: String },

    /// Liveness probe answer. Ages are measured against the server clock,
    /// so a stalled loop shows up as a growing age no matter what the
    /// guests are doing.
    Pong {
        version: String,
        uptime_ms: u64,
        /// Time since the receive loop last made progress.
        recv_age_ms: u64,
        /// Time since the sweep loop last completed a pass.
        sweep_age_ms: u64,
        sessions: usize,
    },

    Status {
        sessions: Vec<SessionEntry>,
        counters: ServerCounters,
    },
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error { message: message.into() }
    }
}
