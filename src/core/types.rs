//! Plain data shared by every layer: tuning, negotiation records, policies.

use thiserror::Error;
use tracing::warn;

use super::constants::{
    DEFAULT_FAST_RETRANSMIT, DEFAULT_INTERVAL_MS, DEFAULT_MTU, DEFAULT_RECV_WINDOW,
    DEFAULT_SEND_WINDOW, MAX_WINDOW,
};
use super::error::VersionMismatch;

/// Tuning rejected by [`TunnelConfig::validate`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TuningError {
    /// A window of zero segments.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// A window larger than the primitive can express.
    #[error("{field} of {value} exceeds the maximum of {max}")]
    TooLarge {
        /// Offending field.
        field: &'static str,
        /// Value supplied.
        value: u32,
        /// Largest accepted value.
        max: u32,
    },
}

/// Reliable-transport tuning.
///
/// Populated from local defaults and optionally overridden field-by-field by
/// what the controller returns during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TunnelConfig {
    /// Send window in segments.
    pub send_window: u32,
    /// Receive window in segments.
    pub recv_window: u32,
    /// Internal update interval of the primitive.
    pub interval_ms: u32,
    /// No-delay mode.
    pub no_delay: bool,
    /// Duplicate-ACK count that triggers fast retransmit (0 disables).
    pub fast_retransmit_count: u32,
    /// Disable congestion control.
    pub congestion_control_disabled: bool,
    /// MTU handed to the primitive.
    pub mtu: usize,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            send_window: DEFAULT_SEND_WINDOW,
            recv_window: DEFAULT_RECV_WINDOW,
            interval_ms: DEFAULT_INTERVAL_MS,
            no_delay: true,
            fast_retransmit_count: DEFAULT_FAST_RETRANSMIT,
            congestion_control_disabled: true,
            mtu: DEFAULT_MTU,
        }
    }
}

impl TunnelConfig {
    /// Check protocol-safe minimums. Values are never clamped.
    pub fn validate(&self) -> Result<(), TuningError> {
        if self.send_window == 0 {
            return Err(TuningError::Zero("send_window"));
        }
        if self.recv_window == 0 {
            return Err(TuningError::Zero("recv_window"));
        }
        if self.interval_ms == 0 {
            return Err(TuningError::Zero("interval_ms"));
        }
        for (field, value) in [
            ("send_window", self.send_window),
            ("recv_window", self.recv_window),
        ] {
            if value > MAX_WINDOW {
                return Err(TuningError::TooLarge {
                    field,
                    value,
                    max: MAX_WINDOW,
                });
            }
        }
        Ok(())
    }

    /// Apply a remote proposal field-by-field.
    ///
    /// Numeric fields win when present and nonzero; boolean fields win when present.
    pub fn apply_override(&mut self, proposal: &TuningOverride) {
        fn nonzero(value: Option<u32>) -> Option<u32> {
            value.filter(|v| *v != 0)
        }

        if let Some(v) = nonzero(proposal.send_window) {
            self.send_window = v;
        }
        if let Some(v) = nonzero(proposal.recv_window) {
            self.recv_window = v;
        }
        if let Some(v) = nonzero(proposal.interval_ms) {
            self.interval_ms = v;
        }
        if let Some(v) = proposal.no_delay {
            self.no_delay = v;
        }
        if let Some(v) = nonzero(proposal.fast_retransmit_count) {
            self.fast_retransmit_count = v;
        }
        if let Some(v) = proposal.congestion_control_disabled {
            self.congestion_control_disabled = v;
        }
    }

    /// Return a copy with `proposal` applied.
    pub fn merged(mut self, proposal: &TuningOverride) -> Self {
        self.apply_override(proposal);
        self
    }
}

/// Tuning the controller proposes in its data-plane status. Absent fields keep
/// the local value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TuningOverride {
    /// Proposed send window.
    pub send_window: Option<u32>,
    /// Proposed receive window.
    pub recv_window: Option<u32>,
    /// Proposed update interval.
    pub interval_ms: Option<u32>,
    /// Proposed no-delay mode.
    pub no_delay: Option<bool>,
    /// Proposed fast-retransmit trigger.
    pub fast_retransmit_count: Option<u32>,
    /// Proposed congestion-control switch.
    pub congestion_control_disabled: Option<bool>,
}

impl TuningOverride {
    /// True when no field is present.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Data-plane status reported by the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataPlaneStatus {
    /// Controller's data-plane UDP port (0 = not yet assigned).
    pub remote_port: u16,
    /// Negotiated tuning, if the controller returned any.
    pub tuning: Option<TuningOverride>,
}

/// Discrete status-report rates the controller understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportFrequency {
    /// 1 Hz.
    Rf1Hz,
    /// 50 Hz.
    Rf50Hz,
    /// 100 Hz.
    Rf100Hz,
    /// 250 Hz.
    Rf250Hz,
    /// 500 Hz.
    Rf500Hz,
    /// 1000 Hz.
    Rf1000Hz,
}

impl ReportFrequency {
    /// Rate in hertz.
    pub fn hz(self) -> u32 {
        match self {
            Self::Rf1Hz => 1,
            Self::Rf50Hz => 50,
            Self::Rf100Hz => 100,
            Self::Rf250Hz => 250,
            Self::Rf500Hz => 500,
            Self::Rf1000Hz => 1000,
        }
    }
}

/// What to do when the peer declares a different protocol major version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VersionPolicy {
    /// Log a warning and keep the session.
    #[default]
    Warn,
    /// Terminate the session.
    Strict,
}

/// Applies a [`VersionPolicy`] to the protocol versions a peer declares.
#[derive(Debug, Clone, Copy)]
pub struct VersionGate {
    expected: u32,
    policy: VersionPolicy,
    warned: bool,
}

impl VersionGate {
    /// Gate expecting `expected` under `policy`.
    pub fn new(expected: u32, policy: VersionPolicy) -> Self {
        Self {
            expected,
            policy,
            warned: false,
        }
    }

    /// Version this gate expects.
    pub fn expected(&self) -> u32 {
        self.expected
    }

    /// Accept `actual` unless it differs and the policy is strict.
    ///
    /// Under [`VersionPolicy::Warn`] the first mismatch is logged once.
    pub fn check(&mut self, actual: u32) -> Result<(), VersionMismatch> {
        if actual == self.expected {
            return Ok(());
        }
        let mismatch = VersionMismatch {
            expected: self.expected,
            actual,
        };
        match self.policy {
            VersionPolicy::Strict => Err(mismatch),
            VersionPolicy::Warn => {
                if !self.warned {
                    warn!(error = %mismatch, "continuing anyway; consider upgrading the controller firmware");
                    self.warned = true;
                }
                Ok(())
            }
        }
    }
}
