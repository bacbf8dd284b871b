// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-socket client.

use anyhow::{bail, Context};
use std::path::Path;
use std::time::Duration;
use tokio::net::UnixStream;
use vigil_server::Paths;
use vigil_wire::{decode, encode, read_frame, write_frame, Request, Response};

/// Default request timeout, configurable via `VIGIL_IPC_TIMEOUT_MS`.
fn ipc_timeout() -> Duration {
    std::env::var("VIGIL_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

pub struct Client {
    stream: UnixStream,
}

impl Client {
    pub async fn connect() -> anyhow::Result<Self> {
        let paths = Paths::resolve()?;
        Self::connect_at(&paths.socket_path).await
    }

    pub async fn connect_at(path: &Path) -> anyhow::Result<Self> {
        let stream = UnixStream::connect(path)
            .await
            .with_context(|| format!("daemon not reachable at {}", path.display()))?;
        Ok(Self { stream })
    }

    pub async fn request(&mut self, request: &Request) -> anyhow::Result<Response> {
        let (mut reader, mut writer) = self.stream.split();
        let exchange = async {
            write_frame(&mut writer, &encode(request)?).await?;
            let body = read_frame(&mut reader).await?;
            Ok::<_, anyhow::Error>(body)
        };
        let body = tokio::time::timeout(ipc_timeout(), exchange)
            .await
            .context("request timed out")??
            .context("daemon closed the connection")?;
        Ok(decode(&body)?)
    }

    /// Send a request and fail on anything but `Ok`.
    pub async fn expect_ok(&mut self, request: &Request) -> anyhow::Result<()> {
        match self.request(request).await? {
            Response::Ok => Ok(()),
            Response::Error { message } => bail!("{message}"),
            other => bail!("unexpected response: {other:?}"),
        }
    }
}
