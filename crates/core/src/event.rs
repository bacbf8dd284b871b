// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health events delivered to the maintenance authority.

use crate::health::{HealthState, Transition, TransitionCause};
use crate::id::InstanceId;
use serde::{Deserialize, Serialize};

/// One edge-triggered state change for one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthEvent {
    pub instance: InstanceId,
    pub previous: HealthState,
    pub current: HealthState,
    pub cause: TransitionCause,
    /// Wall-clock time of the transition, for consumers and logs only.
    pub at_ms: u64,
}

impl HealthEvent {
    pub fn from_transition(instance: InstanceId, transition: Transition, at_ms: u64) -> Self {
        Self {
            instance,
            previous: transition.from,
            current: transition.to,
            cause: transition.cause,
            at_ms,
        }
    }
}

/// Boundary to the orchestration/maintenance authority.
///
/// `emit` must be cheap and non-blocking; the server decouples slow
/// consumers behind a bounded queue so detection never stalls on delivery.
pub trait HealthSink: Send + Sync {
    fn emit(&self, event: HealthEvent);
}
