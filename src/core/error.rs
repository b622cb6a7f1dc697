//! Error types shared across the link layers.

use thiserror::Error;

use crate::framing::{FrameError, ReassemblyError};

/// Errors that can occur when decoding an application payload.
///
/// A decode error never desynchronizes framing: the frame that carried the
/// payload is still consumed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Invalid encoding.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Unexpected end of data.
    #[error("unexpected end of data")]
    UnexpectedEof,
}

/// Peer declared a protocol major version other than the one we speak.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("protocol major version mismatch: expected {expected}, peer reports {actual}")]
pub struct VersionMismatch {
    /// Version this client speaks.
    pub expected: u32,
    /// Version the peer declared.
    pub actual: u32,
}

/// Top-level link errors.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Decode error.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Framing error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Reassembly error.
    #[error("reassembly error: {0}")]
    Reassembly(#[from] ReassemblyError),

    /// Protocol version mismatch.
    #[error(transparent)]
    Version(#[from] VersionMismatch),

    /// Data-plane tunnel error.
    #[cfg(feature = "transport")]
    #[error("tunnel error: {0}")]
    Tunnel(#[from] crate::transport::TunnelError),

    /// Control-plane error.
    #[cfg(feature = "control")]
    #[error("control plane error: {0}")]
    ControlPlane(#[from] crate::control::ControlPlaneError),

    /// Handshake error.
    #[cfg(feature = "client")]
    #[error("handshake error: {0}")]
    Handshake(#[from] crate::client::HandshakeError),

    /// Rejected tunnel tuning.
    #[error("tuning error: {0}")]
    Tuning(#[from] super::types::TuningError),

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
