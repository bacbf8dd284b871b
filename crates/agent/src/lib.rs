// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! vigil-agent: guest-resident heartbeat emitter.
//!
//! One agent per VM instance. It does exactly one thing: on every timer
//! tick, build and send a heartbeat datagram to the host's server. Sending
//! is fire-and-forget — a failed send is logged and the next tick tries
//! again, because declaring unavailability is solely the server's job.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod runtime;

pub use runtime::{AgentRuntime, Beacon, UdpBeacon};
