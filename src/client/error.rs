//! Session-level error types.

use std::io;

use thiserror::Error;

use super::session::HandshakeState;
use crate::control::ControlPlaneError;
use crate::core::{DecodeError, TuningError, VersionMismatch};
use crate::transport::TunnelError;

/// Errors from session negotiation and steady-state operation.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// A bounded wait expired.
    #[error("timed out while {stage}")]
    HandshakeTimeout {
        /// State the orchestrator was waiting in.
        stage: HandshakeState,
    },

    /// Controller speaks another protocol major version under a strict policy.
    #[error(transparent)]
    ProtocolVersionMismatch(#[from] VersionMismatch),

    /// A control-plane payload failed to decode.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// State machine misuse.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        /// Current state.
        from: HandshakeState,
        /// Requested state.
        to: HandshakeState,
    },

    /// The control plane closed before the handshake finished.
    #[error("control plane closed")]
    ControlPlaneClosed,

    /// Other control-plane failure.
    #[error("control plane error: {0}")]
    ControlPlane(ControlPlaneError),

    /// Data-plane failure.
    #[error("tunnel error: {0}")]
    Tunnel(#[from] TunnelError),

    /// Negotiated tuning is unusable.
    #[error("invalid tuning: {0}")]
    Tuning(#[from] TuningError),

    /// Address resolution or socket bind failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors from a negotiated session: [`ActiveSession`](super::ActiveSession)
/// send, heartbeat and release. Same variants as [`HandshakeError`].
pub type SessionError = HandshakeError;

impl From<ControlPlaneError> for HandshakeError {
    fn from(err: ControlPlaneError) -> Self {
        match err {
            ControlPlaneError::Closed => HandshakeError::ControlPlaneClosed,
            ControlPlaneError::Decode(e) => HandshakeError::Decode(e),
            other => HandshakeError::ControlPlane(other),
        }
    }
}

impl HandshakeError {
    /// Check if the session cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        match self {
            HandshakeError::Tunnel(e) => e.is_fatal(),
            HandshakeError::ControlPlane(e) => e.is_fatal(),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_plane_errors_map() {
        assert!(matches!(
            HandshakeError::from(ControlPlaneError::Closed),
            HandshakeError::ControlPlaneClosed
        ));
        assert!(matches!(
            HandshakeError::from(ControlPlaneError::Decode(DecodeError::UnexpectedEof)),
            HandshakeError::Decode(DecodeError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_fatality() {
        let timeout = HandshakeError::HandshakeTimeout {
            stage: HandshakeState::AwaitingSession,
        };
        assert!(timeout.is_fatal());
        assert_eq!(timeout.to_string(), "timed out while awaiting session");

        assert!(!HandshakeError::Tunnel(TunnelError::Kcp("full".into())).is_fatal());
        assert!(HandshakeError::Tunnel(TunnelError::ChannelClosed).is_fatal());
        assert!(!HandshakeError::from(ControlPlaneError::Timeout).is_fatal());
    }

    #[test]
    fn test_session_errors_from_steady_state_layers() {
        let closed: SessionError = TunnelError::ChannelClosed.into();
        assert!(matches!(closed, SessionError::Tunnel(TunnelError::ChannelClosed)));
        assert_eq!(closed.to_string(), "tunnel error: tunnel closed");
    }
}
