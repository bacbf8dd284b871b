// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat datagram codec.
//!
//! Fixed layout, big-endian, bounded well under a single unfragmented
//! datagram:
//!
//! ```text
//! magic    u16   0x5647
//! version  u8    1
//! flags    u8    EventFlags bits
//! seq      u32   wraps at u32::MAX
//! sent_ms  u64   sender wall clock, diagnostics only
//! id_len   u8    1..=64
//! id       [u8]  UTF-8 identity
//! ```
//!
//! Decoding is strict: wrong magic, unsupported version, truncation, a bad
//! identity length, or trailing bytes all yield a [`WireError`] and never a
//! partially populated message.

use thiserror::Error;
use vigil_core::{EventFlags, InstanceId};

pub const MAGIC: u16 = 0x5647;
pub const VERSION: u8 = 1;
/// Bytes before the identity field.
pub const HEADER_LEN: usize = 17;
pub const MAX_IDENTITY: usize = 64;
/// Upper bound on any heartbeat datagram; fits one unfragmented packet.
pub const MAX_DATAGRAM: usize = 512;

/// Datagram corruption taxonomy. Every variant is a drop-and-count at the
/// receiver, never a crash.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("bad magic 0x{found:04x}")]
    BadMagic { found: u16 },

    #[error("unsupported version {found}")]
    UnsupportedVersion { found: u8 },

    #[error("truncated datagram: {len} bytes")]
    Truncated { len: usize },

    #[error("datagram exceeds {MAX_DATAGRAM} bytes: {len}")]
    Oversize { len: usize },

    #[error("identity length {len} out of bounds 1..={MAX_IDENTITY}")]
    IdentityLength { len: usize },

    #[error("identity length {expected} disagrees with payload ({found} bytes)")]
    LengthMismatch { expected: usize, found: usize },

    #[error("identity is not valid UTF-8")]
    IdentityEncoding,
}

/// One liveness beat from a guest agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heartbeat {
    pub instance: InstanceId,
    pub seq: u32,
    pub flags: EventFlags,
    /// Sender wall clock in epoch milliseconds. Diagnostics only — timeout
    /// math never reads this, so guest clock skew is harmless.
    pub sent_ms: u64,
}

impl Heartbeat {
    /// Serialize to the fixed wire layout. Fails only when the identity
    /// exceeds its wire bound.
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let id = self.instance.as_str().as_bytes();
        if id.is_empty() || id.len() > MAX_IDENTITY {
            return Err(WireError::IdentityLength { len: id.len() });
        }

        let mut buf = Vec::with_capacity(HEADER_LEN + id.len());
        buf.extend_from_slice(&MAGIC.to_be_bytes());
        buf.push(VERSION);
        buf.push(self.flags.bits());
        buf.extend_from_slice(&self.seq.to_be_bytes());
        buf.extend_from_slice(&self.sent_ms.to_be_bytes());
        buf.push(id.len() as u8);
        buf.extend_from_slice(id);
        Ok(buf)
    }

    /// Parse a received datagram.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() > MAX_DATAGRAM {
            return Err(WireError::Oversize { len: buf.len() });
        }
        if buf.len() < HEADER_LEN {
            return Err(WireError::Truncated { len: buf.len() });
        }

        let magic = u16::from_be_bytes([buf[0], buf[1]]);
        if magic != MAGIC {
            return Err(WireError::BadMagic { found: magic });
        }
        let version = buf[2];
        if version != VERSION {
            return Err(WireError::UnsupportedVersion { found: version });
        }

        let flags = EventFlags::from_bits(buf[3]);
        let seq = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let sent_ms = u64::from_be_bytes([
            buf[8], buf[9], buf[10], buf[11], buf[12], buf[13], buf[14], buf[15],
        ]);

        let id_len = buf[16] as usize;
        if id_len == 0 || id_len > MAX_IDENTITY {
            return Err(WireError::IdentityLength { len: id_len });
        }
        let id = &buf[HEADER_LEN..];
        if id.len() != id_len {
            return Err(WireError::LengthMismatch { expected: id_len, found: id.len() });
        }
        let id = std::str::from_utf8(id).map_err(|_| WireError::IdentityEncoding)?;

        Ok(Self {
            instance: InstanceId::from_string(id),
            seq,
            flags,
            sent_ms,
        })
    }
}

#[cfg(test)]
#[path = "datagram_tests.rs"]
mod tests;
