//! Session record and handshake states.

use std::fmt;
use std::net::SocketAddr;

use crate::core::TunnelConfig;

/// Handshake and session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeState {
    /// Control plane connected, nothing sent yet.
    Idle,
    /// Waiting for the controller to assign a session id.
    AwaitingSession,
    /// Data plane requested, waiting for the controller's port.
    AwaitingRemoteEndpoint,
    /// Tunnel up and primed.
    TunnelActive,
    /// Normal operation.
    SteadyState,
    /// Releasing control.
    Deinitializing,
    /// Torn down.
    Closed,
}

impl HandshakeState {
    /// Check if `next` directly follows `self`.
    ///
    /// Forward transitions are strictly sequential. With the data plane
    /// disabled, `AwaitingSession` leads straight to `SteadyState`. Any state
    /// may abort to `Closed`.
    pub fn can_transition_to(self, next: HandshakeState, data_plane_enabled: bool) -> bool {
        use HandshakeState::*;

        if next == Closed {
            return self != Closed;
        }
        matches!(
            (self, next, data_plane_enabled),
            (Idle, AwaitingSession, _)
                | (AwaitingSession, AwaitingRemoteEndpoint, true)
                | (AwaitingSession, SteadyState, false)
                | (AwaitingRemoteEndpoint, TunnelActive, true)
                | (TunnelActive, SteadyState, true)
                | (SteadyState, Deinitializing, _)
        )
    }
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandshakeState::Idle => "idle",
            HandshakeState::AwaitingSession => "awaiting session",
            HandshakeState::AwaitingRemoteEndpoint => "awaiting remote endpoint",
            HandshakeState::TunnelActive => "tunnel active",
            HandshakeState::SteadyState => "steady state",
            HandshakeState::Deinitializing => "deinitializing",
            HandshakeState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// One negotiated control session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub(crate) session_id: u32,
    pub(crate) raw_session_id: u64,
    pub(crate) local_port: Option<u16>,
    pub(crate) remote_endpoint: Option<SocketAddr>,
    pub(crate) tuning: TunnelConfig,
}

impl Session {
    /// Session id as used for the data-plane conversation.
    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    /// Session id exactly as the controller reported it.
    pub fn raw_session_id(&self) -> u64 {
        self.raw_session_id
    }

    /// Local data-plane port, when a data plane was negotiated.
    pub fn local_port(&self) -> Option<u16> {
        self.local_port
    }

    /// Controller's data-plane endpoint.
    pub fn remote_endpoint(&self) -> Option<SocketAddr> {
        self.remote_endpoint
    }

    /// Tuning in effect: local defaults with controller overrides applied.
    pub fn tuning(&self) -> &TunnelConfig {
        &self.tuning
    }

    /// Check if the controller's data-plane endpoint is known.
    pub fn is_data_plane_ready(&self) -> bool {
        self.remote_endpoint.is_some()
    }
}

/// Data-plane conversation id for a reported session id.
///
/// The conversation id is the low 32 bits; `None` when those are all zero.
pub(crate) fn conversation_id(raw: u64) -> Option<u32> {
    let conv = raw as u32;
    (conv != 0).then_some(conv)
}
