//! Controller API messages used by the link and the base-move demo.
//!
//! Hand-written prost definitions for the subset of the controller's public API
//! this crate exchanges. Field tags and enum values must match the firmware's
//! schema; unknown fields are skipped on decode.

/// Upstream message: controller to client.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ApiUp {
    /// Protocol major version of the controller firmware.
    #[prost(uint32, tag = "1")]
    pub protocol_major_version: u32,
    /// Protocol minor version of the controller firmware.
    #[prost(uint32, tag = "2")]
    pub protocol_minor_version: u32,
    /// Device kind.
    #[prost(enumeration = "RobotType", tag = "3")]
    pub robot_type: i32,
    /// Session id, 0 while unassigned.
    #[prost(uint64, tag = "4")]
    pub session_id: u64,
    /// Report rate of the channel this message arrived on.
    #[prost(enumeration = "ReportFrequency", tag = "5")]
    pub report_frequency: i32,
    /// Present once the controller's KCP endpoint is up.
    #[prost(message, optional, tag = "6")]
    pub kcp_server_status: Option<KcpServerStatus>,
    /// Diagnostic log line; usually means something went wrong.
    #[prost(string, optional, tag = "7")]
    pub log: Option<String>,
    /// Device status.
    #[prost(oneof = "api_up::Status", tags = "10")]
    pub status: Option<api_up::Status>,
}

/// Nested types of [`ApiUp`].
pub mod api_up {
    /// Device status variants.
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Status {
        /// Mobile base status.
        #[prost(message, tag = "10")]
        BaseStatus(super::BaseStatus),
    }
}

/// Controller-side KCP endpoint.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct KcpServerStatus {
    /// UDP port the controller listens on.
    #[prost(uint32, tag = "1")]
    pub server_port: u32,
    /// Tuning the controller applied.
    #[prost(message, optional, tag = "2")]
    pub kcp_config: Option<KcpConfig>,
}

/// KCP tuning as carried on the wire.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct KcpConfig {
    /// Send window in segments.
    #[prost(uint32, tag = "1")]
    pub window_size_snd_wnd: u32,
    /// Receive window in segments.
    #[prost(uint32, tag = "2")]
    pub window_size_rcv_wnd: u32,
    /// Internal update interval in milliseconds.
    #[prost(uint32, tag = "3")]
    pub interval_ms: u32,
    /// No-delay mode.
    #[prost(bool, tag = "4")]
    pub no_delay: bool,
    /// Congestion control disabled.
    #[prost(bool, tag = "5")]
    pub nc: bool,
    /// Fast-retransmit trigger.
    #[prost(uint32, tag = "6")]
    pub resend: u32,
}

/// Mobile base status.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct BaseStatus {
    /// Odometry estimated by the base.
    #[prost(message, optional, tag = "1")]
    pub estimated_odometry: Option<Odometry>,
}

/// Planar pose and velocity.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct Odometry {
    /// X position in meters.
    #[prost(float, tag = "1")]
    pub pos_x: f32,
    /// Y position in meters.
    #[prost(float, tag = "2")]
    pub pos_y: f32,
    /// Heading in radians.
    #[prost(float, tag = "3")]
    pub pos_z: f32,
    /// X velocity in m/s.
    #[prost(float, tag = "4")]
    pub speed_x: f32,
    /// Y velocity in m/s.
    #[prost(float, tag = "5")]
    pub speed_y: f32,
    /// Angular velocity in rad/s.
    #[prost(float, tag = "6")]
    pub speed_z: f32,
}

/// Downstream message: client to controller.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ApiDown {
    /// Payload.
    #[prost(oneof = "api_down::Down", tags = "1, 2, 3, 4")]
    pub down: Option<api_down::Down>,
}

/// Nested types of [`ApiDown`].
pub mod api_down {
    /// Downstream payload variants.
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Down {
        /// Ask the controller to open its KCP endpoint.
        #[prost(message, tag = "1")]
        EnableKcp(super::EnableKcp),
        /// No-op.
        #[prost(bool, tag = "2")]
        PlaceholderMessage(bool),
        /// Change the report rate of the channel this message travels on.
        #[prost(enumeration = "super::ReportFrequency", tag = "3")]
        SetReportFrequency(i32),
        /// Mobile base command.
        #[prost(message, tag = "4")]
        BaseCommand(super::BaseCommand),
    }
}

/// Request to open the controller's KCP endpoint towards the client.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct EnableKcp {
    /// Client's data-plane UDP port.
    #[prost(uint32, tag = "1")]
    pub client_peer_port: u32,
    /// Desired tuning.
    #[prost(message, optional, tag = "2")]
    pub kcp_config: Option<KcpConfig>,
}

/// Mobile base command.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct BaseCommand {
    /// Command.
    #[prost(oneof = "base_command::Command", tags = "1, 2")]
    pub command: Option<base_command::Command>,
}

/// Nested types of [`BaseCommand`].
pub mod base_command {
    /// Base command variants.
    #[derive(Clone, Copy, PartialEq, prost::Oneof)]
    pub enum Command {
        /// Acquire (`true`) or release (`false`) API control.
        #[prost(bool, tag = "1")]
        ApiControlInitialize(bool),
        /// Velocity command.
        #[prost(message, tag = "2")]
        SimpleMoveCommand(super::SimpleBaseMoveCommand),
    }
}

/// Simple velocity command.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct SimpleBaseMoveCommand {
    /// Command.
    #[prost(oneof = "simple_base_move_command::Command", tags = "1")]
    pub command: Option<simple_base_move_command::Command>,
}

/// Nested types of [`SimpleBaseMoveCommand`].
pub mod simple_base_move_command {
    /// Move command variants.
    #[derive(Clone, Copy, PartialEq, prost::Oneof)]
    pub enum Command {
        /// Body-frame velocity.
        #[prost(message, tag = "1")]
        XyzSpeed(super::XyzSpeed),
    }
}

/// Body-frame velocity.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct XyzSpeed {
    /// Forward speed in m/s.
    #[prost(float, tag = "1")]
    pub speed_x: f32,
    /// Lateral speed in m/s.
    #[prost(float, tag = "2")]
    pub speed_y: f32,
    /// Angular speed in rad/s.
    #[prost(float, tag = "3")]
    pub speed_z: f32,
}

/// Device kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum RobotType {
    /// Unknown device.
    RtUnknown = 0,
    /// Mobile base.
    RtBase = 1,
    /// Arm.
    RtArm = 2,
    /// Linear lift.
    RtLinearLift = 3,
    /// Rotational lift.
    RtRotateLift = 4,
}

impl RobotType {
    /// Name as written in the `.proto` file.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::RtUnknown => "RT_UNKNOWN",
            Self::RtBase => "RT_BASE",
            Self::RtArm => "RT_ARM",
            Self::RtLinearLift => "RT_LINEAR_LIFT",
            Self::RtRotateLift => "RT_ROTATE_LIFT",
        }
    }
}

/// Status-report rates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ReportFrequency {
    /// 1000 Hz.
    Rf1000Hz = 0,
    /// 500 Hz.
    Rf500Hz = 1,
    /// 250 Hz.
    Rf250Hz = 2,
    /// 100 Hz.
    Rf100Hz = 3,
    /// 50 Hz.
    Rf50Hz = 4,
    /// 1 Hz.
    Rf1Hz = 5,
}

impl ReportFrequency {
    /// Name as written in the `.proto` file.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Rf1000Hz => "RF_1000HZ",
            Self::Rf500Hz => "RF_500HZ",
            Self::Rf250Hz => "RF_250HZ",
            Self::Rf100Hz => "RF_100HZ",
            Self::Rf50Hz => "RF_50HZ",
            Self::Rf1Hz => "RF_1HZ",
        }
    }
}

impl From<crate::core::ReportFrequency> for ReportFrequency {
    fn from(freq: crate::core::ReportFrequency) -> Self {
        use crate::core::ReportFrequency as Rf;
        match freq {
            Rf::Rf1Hz => Self::Rf1Hz,
            Rf::Rf50Hz => Self::Rf50Hz,
            Rf::Rf100Hz => Self::Rf100Hz,
            Rf::Rf250Hz => Self::Rf250Hz,
            Rf::Rf500Hz => Self::Rf500Hz,
            Rf::Rf1000Hz => Self::Rf1000Hz,
        }
    }
}
