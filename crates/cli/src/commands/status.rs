// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status and liveness display.

use crate::client::Client;
use anyhow::bail;
use vigil_wire::{Request, Response, ServerCounters, SessionEntry};

pub async fn status() -> anyhow::Result<()> {
    let mut client = Client::connect().await?;
    match client.request(&Request::Status).await? {
        Response::Status { sessions, counters } => {
            print!("{}", render_status(&sessions, &counters));
            Ok(())
        }
        Response::Error { message } => bail!("{message}"),
        other => bail!("unexpected response: {other:?}"),
    }
}

pub async fn ping() -> anyhow::Result<()> {
    let mut client = Client::connect().await?;
    match client.request(&Request::Ping).await? {
        Response::Pong { version, uptime_ms, recv_age_ms, sweep_age_ms, sessions } => {
            println!(
                "vigild {} up {}  recv {} ago  sweep {} ago  {} session(s)",
                version,
                format_ms(uptime_ms),
                format_ms(recv_age_ms),
                format_ms(sweep_age_ms),
                sessions
            );
            Ok(())
        }
        Response::Error { message } => bail!("{message}"),
        other => bail!("unexpected response: {other:?}"),
    }
}

fn render_status(sessions: &[SessionEntry], counters: &ServerCounters) -> String {
    let mut out = String::new();
    if sessions.is_empty() {
        out.push_str("no registered instances\n");
    } else {
        out.push_str(&format!(
            "{:<38} {:<9} {:>6} {:>8} {:>9}\n",
            "INSTANCE", "STATE", "MISSED", "RESTARTS", "SILENCE"
        ));
        for entry in sessions {
            out.push_str(&format!(
                "{:<38} {:<9} {:>6} {:>8} {:>9}\n",
                entry.instance.as_str(),
                entry.state.as_str(),
                entry.missed,
                entry.restarts,
                format_ms(entry.silence_ms),
            ));
        }
    }
    out.push_str(&format!(
        "received {}  corrupt {}  unknown {}  events {} (+{} dropped)\n",
        counters.received,
        counters.corrupt,
        counters.unknown,
        counters.events_delivered,
        counters.events_dropped,
    ));
    out
}

/// Compact elapsed-time rendering: 450ms, 3s, 2m14s, 1h03m.
fn format_ms(ms: u64) -> String {
    if ms < 1_000 {
        return format!("{ms}ms");
    }
    let secs = ms / 1_000;
    if secs < 60 {
        return format!("{secs}s");
    }
    let mins = secs / 60;
    if mins < 60 {
        return format!("{}m{:02}s", mins, secs % 60);
    }
    format!("{}h{:02}m", mins / 60, mins % 60)
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
