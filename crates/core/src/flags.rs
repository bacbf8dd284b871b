// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat event flags.

use serde::{Deserialize, Serialize};

/// Small bitset carried in every heartbeat message.
///
/// An empty set is a normal liveness beat. Unknown bits survive a
/// decode/encode round trip so newer agents can talk to older servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventFlags(u8);

impl EventFlags {
    /// Normal liveness beat.
    pub const NONE: EventFlags = EventFlags(0);
    /// Agent just (re)started; the first beat after boot carries this.
    pub const STARTING: EventFlags = EventFlags(1 << 0);
    /// Agent is shutting down deliberately; suppresses failure detection.
    pub const STOPPING: EventFlags = EventFlags(1 << 1);

    pub const fn from_bits(bits: u8) -> Self {
        EventFlags(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: EventFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn with(self, other: EventFlags) -> Self {
        EventFlags(self.0 | other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for EventFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return f.write_str("normal");
        }
        let mut parts = Vec::new();
        if self.contains(EventFlags::STARTING) {
            parts.push("starting");
        }
        if self.contains(EventFlags::STOPPING) {
            parts.push("stopping");
        }
        if self.0 & !(EventFlags::STARTING.0 | EventFlags::STOPPING.0) != 0 {
            parts.push("unknown");
        }
        f.write_str(&parts.join("+"))
    }
}

#[cfg(test)]
#[path = "flags_tests.rs"]
mod tests;
