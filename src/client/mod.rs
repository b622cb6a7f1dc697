//! Session orchestration.
//!
//! [`HandshakeOrchestrator`] drives a control plane through session
//! negotiation and, when enabled, brings up the data-plane tunnel. The result
//! is an [`ActiveSession`] that routes traffic over the primary channel until
//! [`ActiveSession::deinit`] releases control.
//!
//! ```text
//! Idle -> AwaitingSession -> AwaitingRemoteEndpoint -> TunnelActive -> SteadyState
//!              |                                                          |
//!              +--------------- (data plane disabled) ------------------->+
//!                                                                         v
//!                                                  Closed <- Deinitializing
//! ```

mod active;
mod config;
mod error;
mod handshake;
mod session;
#[cfg(test)]
pub(crate) mod test_control;

pub use active::ActiveSession;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{HandshakeError, SessionError};
pub use handshake::HandshakeOrchestrator;
pub use session::{HandshakeState, Session};
