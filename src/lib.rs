//! # teleop-link
//!
//! Low-latency teleoperation link between a client and a mobile-robot
//! controller.
//!
//! A session starts on a WebSocket **control plane**. The controller assigns
//! a session id, the client asks it to open a KCP-over-UDP **data plane**, and
//! once the controller answers with its port, high-rate commands and status
//! move to the data plane while the control plane stays open as a heartbeat
//! and release channel.
//!
//! ## Feature Flags
//!
//! - `transport` (default): Data plane (tick clock, KCP adapter, UDP tunnel)
//! - `control` (default): WebSocket control plane
//! - `proto` (default): Protobuf controller API messages
//! - `client` (default): Handshake orchestration and session handle
//!
//! ## Modules
//!
//! - [`core`]: Codec traits, tuning, constants and error types (always included)
//! - [`framing`]: Length-prefixed framing inside the reliable stream (always included)
//! - [`transport`]: Data-plane tunnel (requires `transport` feature)
//! - [`control`]: Control plane (requires `control` feature)
//! - [`proto`]: Controller message schema (requires `proto` feature)
//! - [`client`]: Session API (requires `client` feature)
//!
//! ## Example Usage
//!
//! ```no_run
//! use teleop_link::prelude::*;
//! use teleop_link::proto::{ApiDown, ProtoCodec};
//!
//! # async fn run() -> Result<(), HandshakeError> {
//! let config = ClientConfigBuilder::new("192.168.1.10").build();
//! let mut active = HandshakeOrchestrator::connect(config, ProtoCodec).await?;
//!
//! active.send(&ApiDown::base_move(0.2, 0.0, 0.0)).await?;
//! if let Some(status) = active.recv().await {
//!     println!("odometry: {:?}", status.odometry());
//! }
//!
//! active.deinit().await
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Framing (always included)
pub mod framing;

// Data plane (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

// Control plane (feature-gated)
#[cfg(feature = "control")]
#[cfg_attr(docsrs, doc(cfg(feature = "control")))]
pub mod control;

// Controller messages (feature-gated)
#[cfg(feature = "proto")]
#[cfg_attr(docsrs, doc(cfg(feature = "proto")))]
pub mod proto;

// Client API (feature-gated)
#[cfg(feature = "client")]
#[cfg_attr(docsrs, doc(cfg(feature = "client")))]
pub mod client;

#[cfg(test)]
mod test_support;

/// Prelude module for convenient imports.
pub mod prelude {
    // Core traits and types
    pub use crate::core::*;

    #[cfg(feature = "transport")]
    pub use crate::transport::{
        DataPlaneTunnel, TunnelError, TunnelOptions, TunnelReceiver, TunnelResult,
        TunnelStatsSnapshot,
    };

    #[cfg(feature = "control")]
    pub use crate::control::{ControlPlane, ControlPlaneClient, ControlPlaneError};

    #[cfg(feature = "client")]
    pub use crate::client::{
        ActiveSession, ClientConfig, ClientConfigBuilder, HandshakeError, HandshakeOrchestrator,
        HandshakeState, Session, SessionError,
    };
}

// Re-export commonly used items at crate root
pub use core::{DecodeError, LinkError, MessageCodec, TunnelConfig};
