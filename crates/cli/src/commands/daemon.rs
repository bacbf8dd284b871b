// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon management.

use crate::client::Client;
use anyhow::Context;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use vigil_server::Paths;
use vigil_wire::Request;

/// Graceful stop: ask over the control socket; if the socket is gone but a
/// pid file remains, fall back to SIGTERM.
pub async fn stop() -> anyhow::Result<()> {
    match Client::connect().await {
        Ok(mut client) => {
            client.expect_ok(&Request::Shutdown).await?;
            println!("daemon stopping");
            Ok(())
        }
        Err(connect_err) => {
            let paths = Paths::resolve()?;
            let raw = std::fs::read_to_string(&paths.lock_path)
                .map_err(|_| connect_err.context("daemon not running"))?;
            let pid: i32 = raw.trim().parse().context("malformed pid file")?;
            kill(Pid::from_raw(pid), Signal::SIGTERM)
                .with_context(|| format!("sending SIGTERM to {pid}"))?;
            println!("sent SIGTERM to {pid}");
            Ok(())
        }
    }
}
