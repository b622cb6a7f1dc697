//! Control plane: the WebSocket connection used for session bootstrap,
//! configuration and low-rate telemetry.
//!
//! The handshake only needs a byte-message pipe, expressed by [`ControlPlane`].
//! [`ControlPlaneClient`] implements it over `tokio-tungstenite`.

use std::future::Future;

use bytes::Bytes;

mod client;
mod error;

pub use client::{ControlPlaneClient, PeerIdentity};
pub use error::*;

/// A bidirectional byte-message pipe to the controller.
pub trait ControlPlane: Send {
    /// Send one binary message.
    fn send(&mut self, payload: Vec<u8>) -> impl Future<Output = ControlResult<()>> + Send;

    /// Wait for the next binary message.
    ///
    /// Returns [`ControlPlaneError::Closed`] once the connection is gone.
    fn recv(&mut self) -> impl Future<Output = ControlResult<Bytes>> + Send;

    /// Discard incoming application payloads while keeping the connection
    /// serviced.
    fn set_drain_mode(&mut self, drain: bool);

    /// Close the connection. Closing twice is a no-op.
    fn close(&mut self) -> impl Future<Output = ControlResult<()>> + Send;
}
