//! Session negotiation over the control plane.
//!
//! ```text
//! Idle ─► AwaitingSession ─► AwaitingRemoteEndpoint ─► TunnelActive ─► SteadyState
//!                   │                                                    ▲
//!                   └──────────── data plane disabled ───────────────────┘
//! ```
//!
//! Each wait is bounded. Messages that lack the awaited field are ignored;
//! decode failures and, under a strict policy, version mismatches abort.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, error, info, trace, warn};

use super::active::{ActiveSession, DataPlane};
use super::config::ClientConfig;
use super::error::HandshakeError;
use super::session::{HandshakeState, Session, conversation_id};
use crate::control::{ControlPlane, ControlPlaneClient};
use crate::core::{DataPlaneStatus, DownMessage, MessageCodec, UpMessage, VersionGate};
use crate::transport::{DataPlaneSocket, DataPlaneTunnel, resolve, unspecified_for};

/// Runs the handshake once and hands off an [`ActiveSession`].
pub struct HandshakeOrchestrator<P: ControlPlane, C: MessageCodec> {
    control: P,
    codec: C,
    config: ClientConfig,
    state: HandshakeState,
    versions: VersionGate,
    data_plane: Option<DataPlane<C>>,
}

impl<P: ControlPlane, C: MessageCodec> std::fmt::Debug for HandshakeOrchestrator<P, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandshakeOrchestrator")
            .field("state", &self.state)
            .field("host", &self.config.host)
            .finish()
    }
}

impl<C: MessageCodec> HandshakeOrchestrator<ControlPlaneClient, C> {
    /// Connect to the controller named in `config` and negotiate a session.
    pub async fn connect(
        config: ClientConfig,
        codec: C,
    ) -> Result<ActiveSession<ControlPlaneClient, C>, HandshakeError> {
        let control = ControlPlaneClient::connect(&config.control_url()).await?;
        Self::new(control, codec, config).run().await
    }
}

impl<P: ControlPlane, C: MessageCodec> HandshakeOrchestrator<P, C> {
    /// Create an orchestrator over an already-connected control plane.
    pub fn new(control: P, codec: C, config: ClientConfig) -> Self {
        let versions = VersionGate::new(
            config.expected_protocol_major_version,
            config.version_policy,
        );
        Self {
            control,
            codec,
            config,
            state: HandshakeState::Idle,
            versions,
            data_plane: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Negotiate the session.
    ///
    /// On failure everything opened so far is torn down, tunnel first.
    pub async fn run(mut self) -> Result<ActiveSession<P, C>, HandshakeError> {
        match self.negotiate().await {
            Ok(session) => Ok(ActiveSession::new(
                self.control,
                self.codec,
                session,
                self.data_plane,
                &self.config,
                self.versions,
            )),
            Err(e) => {
                error!(error = %e, state = %self.state, "handshake failed");
                self.state = HandshakeState::Closed;
                if let Some(data_plane) = self.data_plane.take() {
                    if let Err(shutdown) = data_plane.tunnel.shutdown().await {
                        debug!(error = %shutdown, "tunnel shutdown after failed handshake");
                    }
                }
                if let Err(close) = self.control.close().await {
                    debug!(error = %close, "control plane close after failed handshake");
                }
                Err(e)
            }
        }
    }

    async fn negotiate(&mut self) -> Result<Session, HandshakeError> {
        self.transition(HandshakeState::AwaitingSession)?;
        self.send_control(&C::Down::set_report_frequency(
            self.config.bootstrap_report_frequency,
        ))
        .await?;

        let raw_session_id = self
            .await_field(self.config.session_timeout, |msg| {
                let raw = msg.session_id();
                match conversation_id(raw) {
                    Some(_) if raw > u64::from(u32::MAX) => {
                        warn!(raw, "session id wider than 32 bits, using the low half");
                        Some(raw)
                    }
                    Some(_) => Some(raw),
                    None if raw != 0 => {
                        debug!(raw, "ignoring session id with zero low half");
                        None
                    }
                    None => None,
                }
            })
            .await?;
        let session_id = conversation_id(raw_session_id).unwrap_or_default();
        info!(session_id, "session assigned");

        let mut session = Session {
            session_id,
            raw_session_id,
            local_port: None,
            remote_endpoint: None,
            tuning: self.config.tuning,
        };

        if !self.config.data_plane_enabled {
            self.transition(HandshakeState::SteadyState)?;
            if self.config.initialize_control {
                self.send_control(&C::Down::control_initialize(true)).await?;
            }
            info!(session_id, "steady state on control plane only");
            return Ok(session);
        }

        let remote_ip = resolve(&self.config.host, self.config.control_port)
            .await?
            .ip();
        let bind = self.config.bind_addr.unwrap_or_else(|| unspecified_for(remote_ip));
        let socket = DataPlaneSocket::bind(bind).await?;
        let local_port = socket.local_port();
        session.local_port = Some(local_port);

        self.transition(HandshakeState::AwaitingRemoteEndpoint)?;
        self.send_control(&C::Down::enable_data_plane(local_port, &self.config.tuning))
            .await?;

        let status: DataPlaneStatus = self
            .await_field(self.config.data_plane_timeout, |msg| {
                msg.data_plane_status().filter(|s| s.remote_port != 0)
            })
            .await?;
        if let Some(proposal) = &status.tuning {
            session.tuning.apply_override(proposal);
            debug!(?proposal, "controller tuning applied");
        }
        session.tuning.validate()?;
        let remote = SocketAddr::new(remote_ip, status.remote_port);
        session.remote_endpoint = Some(remote);

        let (tunnel, inbound) = DataPlaneTunnel::activate(
            socket,
            remote,
            session_id,
            &session.tuning,
            self.codec.clone(),
            self.config.tunnel_options(),
        )?;
        let tunnel = Arc::new(tunnel);
        self.data_plane = Some(DataPlane {
            tunnel: Arc::clone(&tunnel),
            inbound,
        });
        self.transition(HandshakeState::TunnelActive)?;
        tunnel.send(&C::Down::placeholder())?;
        info!(session_id, %remote, local_port, "handoff to data plane");

        self.send_control(&C::Down::set_report_frequency(
            self.config.steady_report_frequency,
        ))
        .await?;
        self.control.set_drain_mode(true);
        tunnel.send(&C::Down::set_report_frequency(
            self.config.data_plane_report_frequency,
        ))?;
        if self.config.initialize_control {
            tunnel.send(&C::Down::control_initialize(true))?;
        }
        self.transition(HandshakeState::SteadyState)?;
        Ok(session)
    }

    fn transition(&mut self, next: HandshakeState) -> Result<(), HandshakeError> {
        if !self
            .state
            .can_transition_to(next, self.config.data_plane_enabled)
        {
            return Err(HandshakeError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        info!(from = %self.state, to = %next, "handshake transition");
        self.state = next;
        Ok(())
    }

    async fn send_control(&mut self, msg: &C::Down) -> Result<(), HandshakeError> {
        self.control.send(self.codec.encode(msg)).await?;
        Ok(())
    }

    /// Wait up to `limit` for a control message `extract` accepts.
    async fn await_field<T>(
        &mut self,
        limit: Duration,
        extract: impl Fn(&C::Up) -> Option<T>,
    ) -> Result<T, HandshakeError> {
        let stage = self.state;
        match timeout(limit, self.next_matching(&extract)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%stage, ?limit, "handshake wait expired");
                Err(HandshakeError::HandshakeTimeout { stage })
            }
        }
    }

    async fn next_matching<T>(
        &mut self,
        extract: &impl Fn(&C::Up) -> Option<T>,
    ) -> Result<T, HandshakeError> {
        loop {
            let payload = self.control.recv().await?;
            let message = self.codec.decode(&payload)?;
            self.versions.check(message.protocol_major_version())?;
            if let Some(log) = message.peer_log() {
                warn!(peer_log = log, "controller log");
            }
            if let Some(value) = extract(&message) {
                return Ok(value);
            }
            trace!(state = %self.state, "control message without awaited field");
        }
    }
}
