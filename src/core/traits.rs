//! Interfaces to the message codec.
//!
//! The link never inspects application fields beyond the session id, the
//! protocol version tag and the embedded data-plane status. Everything else in
//! a message is opaque and belongs to the codec.

use super::error::DecodeError;
use super::types::{DataPlaneStatus, ReportFrequency, TunnelConfig};

/// The fields of an upstream (controller -> client) message the link reads.
pub trait UpMessage {
    /// Session id, 0 while unassigned.
    fn session_id(&self) -> u64;

    /// Protocol major version declared by the controller.
    fn protocol_major_version(&self) -> u32;

    /// Data-plane status, when the message carries one.
    fn data_plane_status(&self) -> Option<DataPlaneStatus>;

    /// Diagnostic log line attached by the controller.
    ///
    /// Its presence usually means something went wrong on the controller.
    fn peer_log(&self) -> Option<&str> {
        None
    }

    /// Kind of device the controller reports itself as, e.g. a robot model name.
    fn peer_kind(&self) -> Option<&str> {
        None
    }
}

/// The downstream (client -> controller) messages the link must be able to build.
///
/// Actuator commands are built by the caller; only session-management
/// messages are needed here.
pub trait DownMessage: Sized {
    /// Change the status-report rate of the channel this message travels on.
    fn set_report_frequency(frequency: ReportFrequency) -> Self;

    /// Ask the controller to open its data plane towards `local_port`.
    fn enable_data_plane(local_port: u16, tuning: &TunnelConfig) -> Self;

    /// No-op message, used to prime the data plane and as a heartbeat.
    fn placeholder() -> Self;

    /// Acquire (`true`) or release (`false`) control of the robot.
    fn control_initialize(active: bool) -> Self;
}

/// Encodes downstream messages and decodes upstream messages.
///
/// # Example
///
/// ```ignore
/// #[derive(Clone)]
/// struct JsonCodec;
///
/// impl MessageCodec for JsonCodec {
///     type Up = StatusUp;
///     type Down = CommandDown;
///
///     fn encode(&self, msg: &CommandDown) -> Vec<u8> {
///         serde_json::to_vec(msg).unwrap_or_default()
///     }
///
///     fn decode(&self, bytes: &[u8]) -> Result<StatusUp, DecodeError> {
///         serde_json::from_slice(bytes).map_err(|e| DecodeError::InvalidEncoding(e.to_string()))
///     }
/// }
/// ```
pub trait MessageCodec: Clone + Send + Sync + 'static {
    /// Upstream message type.
    type Up: UpMessage + Send + 'static;

    /// Downstream message type.
    type Down: DownMessage + Send + Sync + 'static;

    /// Serialize a downstream message.
    fn encode(&self, msg: &Self::Down) -> Vec<u8>;

    /// Deserialize an upstream message.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Up, DecodeError>;
}
