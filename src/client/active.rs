//! Steady-state session handle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::config::ClientConfig;
use super::error::{HandshakeError, SessionError};
use super::session::{HandshakeState, Session};
use crate::control::ControlPlane;
use crate::core::{DownMessage, MessageCodec, UpMessage, VersionGate};
use crate::transport::{DataPlaneTunnel, TunnelReceiver, TunnelStatsSnapshot};

/// Tunnel handed over by the orchestrator.
pub(crate) struct DataPlane<C: MessageCodec> {
    pub(crate) tunnel: Arc<DataPlaneTunnel<C>>,
    pub(crate) inbound: TunnelReceiver<C::Up>,
}

/// A negotiated session in steady state.
///
/// Commands and status go through the data plane when one was negotiated and
/// through the control plane otherwise. Call [`maintain`](Self::maintain)
/// regularly to keep the control-plane heartbeat going, and
/// [`deinit`](Self::deinit) to release control and tear everything down.
pub struct ActiveSession<P: ControlPlane, C: MessageCodec> {
    control: P,
    codec: C,
    session: Session,
    state: HandshakeState,
    data_plane: Option<DataPlane<C>>,
    versions: VersionGate,
    heartbeat_interval: Duration,
    release_timeout: Duration,
    last_heartbeat: Instant,
    control_stream_ended: bool,
}

impl<P: ControlPlane, C: MessageCodec> std::fmt::Debug for ActiveSession<P, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveSession")
            .field("session", &self.session)
            .field("state", &self.state)
            .field("data_plane", &self.data_plane.is_some())
            .finish()
    }
}

impl<P: ControlPlane, C: MessageCodec> ActiveSession<P, C> {
    pub(crate) fn new(
        control: P,
        codec: C,
        session: Session,
        data_plane: Option<DataPlane<C>>,
        config: &ClientConfig,
        versions: VersionGate,
    ) -> Self {
        Self {
            control,
            codec,
            session,
            state: HandshakeState::SteadyState,
            data_plane,
            versions,
            heartbeat_interval: config.heartbeat_interval,
            release_timeout: config.release_timeout,
            last_heartbeat: Instant::now(),
            control_stream_ended: false,
        }
    }

    /// Send one message on the primary channel.
    pub async fn send(&mut self, msg: &C::Down) -> Result<(), SessionError> {
        match &self.data_plane {
            Some(data_plane) => data_plane.tunnel.send(msg)?,
            None => self.control.send(self.codec.encode(msg)).await?,
        }
        Ok(())
    }

    /// Wait for the next status message on the primary channel.
    ///
    /// Returns `None` once the channel has ended. On the control plane,
    /// undecodable payloads are logged and skipped.
    pub async fn recv(&mut self) -> Option<C::Up> {
        if let Some(data_plane) = &mut self.data_plane {
            return data_plane.inbound.recv().await;
        }
        if self.control_stream_ended {
            return None;
        }

        loop {
            let payload = match self.control.recv().await {
                Ok(payload) => payload,
                Err(e) => {
                    info!(error = %e, "control plane stream ended");
                    self.control_stream_ended = true;
                    return None;
                }
            };
            let message = match self.codec.decode(&payload) {
                Ok(message) => message,
                Err(e) => {
                    warn!(error = %e, "dropping undecodable control payload");
                    continue;
                }
            };
            if let Err(mismatch) = self.versions.check(message.protocol_major_version()) {
                error!(error = %mismatch, "ending session stream");
                self.control_stream_ended = true;
                return None;
            }
            if let Some(log) = message.peer_log() {
                warn!(peer_log = log, "controller log");
            }
            return Some(message);
        }
    }

    /// Send the control-plane heartbeat if `heartbeat_interval` has elapsed.
    ///
    /// Returns whether a heartbeat was sent.
    pub async fn maintain(&mut self) -> Result<bool, SessionError> {
        if self.last_heartbeat.elapsed() < self.heartbeat_interval {
            return Ok(false);
        }
        self.control
            .send(self.codec.encode(&C::Down::placeholder()))
            .await?;
        self.last_heartbeat = Instant::now();
        debug!("control plane heartbeat");
        Ok(true)
    }

    /// The negotiated session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Current state.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Shared handle to the tunnel, for sending from another task.
    pub fn tunnel(&self) -> Option<Arc<DataPlaneTunnel<C>>> {
        self.data_plane.as_ref().map(|d| Arc::clone(&d.tunnel))
    }

    /// Data-plane counters, when a data plane is up.
    pub fn tunnel_stats(&self) -> Option<TunnelStatsSnapshot> {
        self.data_plane.as_ref().map(|d| d.tunnel.stats())
    }

    /// Release control and tear down: the tunnel first, then the control plane.
    ///
    /// The release message goes over the control plane, since the data plane
    /// is about to close. Every step runs even if an earlier one failed; the
    /// first error is returned.
    pub async fn deinit(mut self) -> Result<(), SessionError> {
        self.state = HandshakeState::Deinitializing;
        info!(session_id = self.session.session_id, "releasing control");
        let mut first_error: Option<SessionError> = None;

        let release = self.codec.encode(&C::Down::control_initialize(false));
        match timeout(self.release_timeout, self.control.send(release)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(error = %e, "control release not sent");
                first_error.get_or_insert(e.into());
            }
            Err(_) => {
                warn!("control release timed out");
                first_error.get_or_insert(HandshakeError::HandshakeTimeout {
                    stage: HandshakeState::Deinitializing,
                });
            }
        }

        if let Some(data_plane) = self.data_plane.take() {
            if let Err(e) = data_plane.tunnel.shutdown().await {
                warn!(error = %e, "tunnel ended with an error");
                first_error.get_or_insert(e.into());
            }
        }

        if let Err(e) = self.control.close().await {
            first_error.get_or_insert(e.into());
        }
        self.state = HandshakeState::Closed;
        info!(session_id = self.session.session_id, "session closed");

        first_error.map_or(Ok(()), Err)
    }
}
