// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration model and loader.
//!
//! Agent and server share one ini-style file with `[heartbeat]`, `[server]`
//! and `[agent]` sections; each role reads its own subset. Loading validates
//! the threshold ordering invariant up front so a bad file can never arm the
//! state machine — callers that reload on SIGHUP keep the previously active
//! configuration when `load` returns an error.

use crate::id::InstanceId;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MISS_THRESHOLD: u32 = 2;
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 4;
pub const DEFAULT_PORT: u16 = 7710;
pub const DEFAULT_SWEEP_DIVISOR: u32 = 4;
pub const DEFAULT_EVICTION_MULTIPLIER: u32 = 12;
pub const DEFAULT_EVENT_QUEUE: usize = 256;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("missing required key {key}")]
    Missing { key: &'static str },
}

/// Timing knobs of the failure-detection protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Interval between agent heartbeats; also the unit of timeout math.
    pub poll_interval: Duration,
    /// Consecutive missed intervals before HEALTHY degrades.
    pub miss_threshold: u32,
    /// Consecutive missed intervals before DEGRADED fails.
    pub failure_threshold: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            miss_threshold: DEFAULT_MISS_THRESHOLD,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        }
    }
}

impl HeartbeatConfig {
    /// Enforce `failure_threshold >= miss_threshold >= 1` and a positive
    /// poll interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid {
                key: "poll_interval",
                reason: "must be positive".into(),
            });
        }
        if self.miss_threshold == 0 {
            return Err(ConfigError::Invalid {
                key: "miss_threshold",
                reason: "must be at least 1".into(),
            });
        }
        if self.failure_threshold < self.miss_threshold {
            return Err(ConfigError::Invalid {
                key: "failure_threshold",
                reason: format!(
                    "must be >= miss_threshold ({})",
                    self.miss_threshold
                ),
            });
        }
        Ok(())
    }
}

/// Host-side daemon configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub heartbeat: HeartbeatConfig,
    /// Address the UDP listening endpoint binds to.
    pub bind_address: String,
    pub port: u16,
    /// The sweep ticks at `poll_interval / sweep_divisor`, keeping the
    /// cadence finer than the smallest poll interval.
    pub sweep_divisor: u32,
    /// Sessions silent for `eviction_multiplier x poll_interval` are
    /// destroyed (hard eviction bound).
    pub eviction_multiplier: u32,
    /// Capacity of the bounded health-event queue (drop-oldest on overflow).
    pub event_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            heartbeat: HeartbeatConfig::default(),
            bind_address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            sweep_divisor: DEFAULT_SWEEP_DIVISOR,
            eviction_multiplier: DEFAULT_EVICTION_MULTIPLIER,
            event_queue: DEFAULT_EVENT_QUEUE,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::parse(&read(path)?)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text)?;
        let heartbeat = raw.heartbeat.resolve()?;
        let server = raw.server;

        let config = Self {
            heartbeat,
            bind_address: server.bind_address.unwrap_or_else(|| "0.0.0.0".into()),
            port: server.port.unwrap_or(DEFAULT_PORT),
            sweep_divisor: server.sweep_divisor.unwrap_or(DEFAULT_SWEEP_DIVISOR),
            eviction_multiplier: server
                .eviction_multiplier
                .unwrap_or(DEFAULT_EVICTION_MULTIPLIER),
            event_queue: server.event_queue.unwrap_or(DEFAULT_EVENT_QUEUE),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.heartbeat.validate()?;
        if self.sweep_divisor == 0 {
            return Err(ConfigError::Invalid {
                key: "sweep_divisor",
                reason: "must be at least 1".into(),
            });
        }
        if self.eviction_multiplier <= self.heartbeat.failure_threshold {
            return Err(ConfigError::Invalid {
                key: "eviction_multiplier",
                reason: format!(
                    "must exceed failure_threshold ({})",
                    self.heartbeat.failure_threshold
                ),
            });
        }
        if self.event_queue == 0 {
            return Err(ConfigError::Invalid {
                key: "event_queue",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Sweep cadence: finer than the poll interval, floored at 50ms.
    pub fn sweep_period(&self) -> Duration {
        let period = self.heartbeat.poll_interval / self.sweep_divisor.max(1);
        period.max(Duration::from_millis(50))
    }

    /// Total silence after which a session is evicted.
    pub fn eviction_bound(&self) -> Duration {
        self.heartbeat.poll_interval * self.eviction_multiplier
    }
}

/// Guest-side agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub poll_interval: Duration,
    /// Identity to report; may instead be supplied on the command line.
    pub instance: Option<InstanceId>,
    pub server_address: String,
    pub server_port: u16,
}

impl AgentConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::parse(&read(path)?)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text)?;
        let heartbeat = raw.heartbeat.resolve()?;
        let agent = raw.agent;

        let server_address = agent
            .server_address
            .ok_or(ConfigError::Missing { key: "agent.server_address" })?;

        Ok(Self {
            poll_interval: heartbeat.poll_interval,
            instance: agent.instance.map(InstanceId::from_string),
            server_address,
            server_port: agent.server_port.unwrap_or(DEFAULT_PORT),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.server_address, self.server_port)
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a duration string like "30s", "5m", "500ms" into a Duration.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let (num_str, suffix) = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| (&s[..i], &s[i..]))
        .unwrap_or((s, ""));

    let num: u64 = num_str.parse().map_err(|_| format!("invalid number in duration: {}", s))?;

    let multiplier = match suffix.trim() {
        "ms" | "millis" | "millisecond" | "milliseconds" => {
            return Ok(Duration::from_millis(num));
        }
        "" | "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3600,
        other => return Err(format!("unknown duration suffix: {}", other)),
    };

    Ok(Duration::from_secs(num * multiplier))
}

/// Raw file schema. Both roles deserialize the whole file and pick their
/// sections; unknown keys are tolerated so one file can serve both daemons.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    heartbeat: RawHeartbeat,
    #[serde(default)]
    server: RawServer,
    #[serde(default)]
    agent: RawAgent,
}

#[derive(Debug, Default, Deserialize)]
struct RawHeartbeat {
    poll_interval: Option<DurationValue>,
    miss_threshold: Option<u32>,
    failure_threshold: Option<u32>,
}

impl RawHeartbeat {
    fn resolve(&self) -> Result<HeartbeatConfig, ConfigError> {
        let poll_interval = match &self.poll_interval {
            Some(value) => value.resolve().map_err(|reason| ConfigError::Invalid {
                key: "poll_interval",
                reason,
            })?,
            None => DEFAULT_POLL_INTERVAL,
        };
        let config = HeartbeatConfig {
            poll_interval,
            miss_threshold: self.miss_threshold.unwrap_or(DEFAULT_MISS_THRESHOLD),
            failure_threshold: self
                .failure_threshold
                .unwrap_or(DEFAULT_FAILURE_THRESHOLD),
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawServer {
    bind_address: Option<String>,
    port: Option<u16>,
    sweep_divisor: Option<u32>,
    eviction_multiplier: Option<u32>,
    event_queue: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAgent {
    instance: Option<String>,
    server_address: Option<String>,
    server_port: Option<u16>,
}

/// Accepts `poll_interval = 5` (seconds) or `poll_interval = "500ms"`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DurationValue {
    Secs(u64),
    Text(String),
}

impl DurationValue {
    fn resolve(&self) -> Result<Duration, String> {
        match self {
            DurationValue::Secs(secs) => Ok(Duration::from_secs(*secs)),
            DurationValue::Text(text) => parse_duration(text),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
