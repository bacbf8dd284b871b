// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-socket framing: 4-byte length prefix (big-endian) + JSON payload.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Frames larger than this are rejected before allocation.
pub const MAX_FRAME: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame of {len} bytes exceeds {MAX_FRAME}")]
    FrameTooLarge { len: usize },

    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Serialize a message to its JSON body (no length prefix).
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ControlError> {
    Ok(serde_json::to_vec(message)?)
}

/// Parse a JSON body produced by [`encode`].
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ControlError> {
    Ok(serde_json::from_slice(body)?)
}

/// Read one length-prefixed frame. Returns `Ok(None)` on a clean EOF at a
/// frame boundary.
pub async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<Option<Vec<u8>>, ControlError> {
    let mut prefix = [0u8; 4];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_FRAME {
        return Err(ControlError::FrameTooLarge { len });
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

/// Write one length-prefixed frame.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    body: &[u8],
) -> Result<(), ControlError> {
    if body.len() > MAX_FRAME {
        return Err(ControlError::FrameTooLarge { len: body.len() });
    }
    writer.write_all(&(body.len() as u32).to_be_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
