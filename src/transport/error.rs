//! Data-plane error types.

use std::io;

use thiserror::Error;

use crate::core::{TuningError, VersionMismatch};
use crate::framing::FrameError;

/// Data-plane tunnel errors.
#[derive(Debug, Error)]
pub enum TunnelError {
    /// Send attempted after shutdown.
    #[error("tunnel closed")]
    ChannelClosed,

    /// Frame could not be built.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// UDP socket error.
    #[error("transport i/o error: {0}")]
    Transport(#[from] io::Error),

    /// The reliable-transport primitive rejected a call.
    #[error("reliable transport error: {0}")]
    Kcp(String),

    /// Tuning rejected before activation.
    #[error("invalid tuning: {0}")]
    Tuning(#[from] TuningError),

    /// Peer changed protocol major version mid-session under a strict policy.
    #[error(transparent)]
    ProtocolVersionMismatch(#[from] VersionMismatch),

    /// A background driver panicked or was aborted.
    #[error("tunnel driver failed: {0}")]
    Driver(String),
}

impl TunnelError {
    /// Check if this error ends the tunnel.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TunnelError::ChannelClosed
                | TunnelError::Transport(_)
                | TunnelError::ProtocolVersionMismatch(_)
                | TunnelError::Driver(_)
        )
    }
}

/// Result type for tunnel operations.
pub type TunnelResult<T> = Result<T, TunnelError>;

/// I/O errors a UDP receive can report for an earlier send (ICMP unreachable)
/// without the socket being unusable.
pub(crate) fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}
