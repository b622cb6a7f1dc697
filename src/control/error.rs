//! Control-plane error types.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::core::DecodeError;

/// Control-plane errors.
#[derive(Debug, Error)]
pub enum ControlPlaneError {
    /// WebSocket or underlying TCP failure.
    #[error("control plane transport error: {0}")]
    Transport(Box<tungstenite::Error>),

    /// The connection is closed, locally or by the peer.
    #[error("control plane closed")]
    Closed,

    /// The connection did not open in time.
    #[error("control plane connect timed out")]
    Timeout,

    /// An upstream payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

impl From<tungstenite::Error> for ControlPlaneError {
    fn from(err: tungstenite::Error) -> Self {
        match err {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                ControlPlaneError::Closed
            }
            other => ControlPlaneError::Transport(Box::new(other)),
        }
    }
}

impl ControlPlaneError {
    /// Check if the connection is unusable after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ControlPlaneError::Transport(_) | ControlPlaneError::Closed
        )
    }
}

/// Result type for control-plane operations.
pub type ControlResult<T> = Result<T, ControlPlaneError>;
