//! Data plane: a reliable message tunnel over UDP.
//!
//! This module provides:
//!
//! - **Reliable transport**: [`ReliableTransport`] and its KCP implementation [`KcpTransport`]
//! - **Tick clock**: [`TickClock`], the millisecond time base handed to the primitive
//! - **Sockets**: [`DataPlaneSocket`] with address-family-aware binding
//! - **Tunnel**: [`DataPlaneTunnel`], which owns the primitive, its drivers and framing
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Application messages             │
//! ├─────────────────────────────────────────┤
//! │   Framing + reassembly                  │
//! ├─────────────────────────────────────────┤
//! │   Reliable transport (KCP)              │  ← This module
//! │   tick / receive / output drivers       │
//! ├─────────────────────────────────────────┤
//! │              UDP                        │
//! └─────────────────────────────────────────┘
//! ```

mod clock;
mod error;
mod primitive;
mod socket;
mod stats;
mod tunnel;

pub use clock::TickClock;
pub use error::*;
pub use primitive::{DatagramSink, KcpTransport, ReliableTransport};
pub use socket::*;
pub use stats::{TunnelStats, TunnelStatsSnapshot};
pub use tokio::sync::mpsc::error::TryRecvError;
pub use tunnel::{DataPlaneTunnel, TunnelOptions, TunnelReceiver};
