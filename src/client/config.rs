//! Client configuration.

use std::net::{Ipv6Addr, SocketAddr};
use std::time::Duration;

use crate::core::constants::{
    DATA_PLANE_TIMEOUT, DEFAULT_CONTROL_PORT, DEFAULT_INBOUND_QUEUE, DEFAULT_MAX_FRAME_PAYLOAD,
    DEFAULT_REASSEMBLY_CAPACITY, DEFAULT_TICK_INTERVAL, EXPECTED_PROTOCOL_MAJOR_VERSION,
    HEARTBEAT_INTERVAL, RELEASE_TIMEOUT, SESSION_TIMEOUT,
};
use crate::core::{ReportFrequency, TunnelConfig, VersionPolicy};
use crate::transport::TunnelOptions;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Controller host name or address. IPv6 literals may carry a zone id.
    pub host: String,

    /// Controller WebSocket port.
    pub control_port: u16,

    /// Local data-plane bind address. Defaults to an ephemeral port on the
    /// unspecified address of the controller's family.
    pub bind_addr: Option<SocketAddr>,

    /// Desired data-plane tuning, before controller overrides.
    pub tuning: TunnelConfig,

    /// Negotiate a data plane. When off, everything flows over the control plane.
    pub data_plane_enabled: bool,

    /// Maximum wait for the session id.
    pub session_timeout: Duration,

    /// Maximum wait for the controller's data-plane port.
    pub data_plane_timeout: Duration,

    /// Maximum wait for the control-released message to flush.
    pub release_timeout: Duration,

    /// Control-plane heartbeat period in steady state.
    pub heartbeat_interval: Duration,

    /// Tick period of the data-plane primitive.
    pub tick_interval: Duration,

    /// Data-plane reassembly buffer capacity.
    pub reassembly_capacity: usize,

    /// Largest outgoing data-plane payload.
    pub max_frame_payload: usize,

    /// Decoded data-plane messages buffered for the caller.
    pub inbound_queue: usize,

    /// Protocol major version this client expects.
    pub expected_protocol_major_version: u32,

    /// What to do on a version mismatch.
    pub version_policy: VersionPolicy,

    /// Control-plane report rate requested while negotiating.
    pub bootstrap_report_frequency: ReportFrequency,

    /// Control-plane report rate once the data plane carries status.
    pub steady_report_frequency: ReportFrequency,

    /// Data-plane report rate.
    pub data_plane_report_frequency: ReportFrequency,

    /// Acquire control of the robot when entering steady state.
    pub initialize_control: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            control_port: DEFAULT_CONTROL_PORT,
            bind_addr: None,
            tuning: TunnelConfig::default(),
            data_plane_enabled: true,
            session_timeout: SESSION_TIMEOUT,
            data_plane_timeout: DATA_PLANE_TIMEOUT,
            release_timeout: RELEASE_TIMEOUT,
            heartbeat_interval: HEARTBEAT_INTERVAL,
            tick_interval: DEFAULT_TICK_INTERVAL,
            reassembly_capacity: DEFAULT_REASSEMBLY_CAPACITY,
            max_frame_payload: DEFAULT_MAX_FRAME_PAYLOAD,
            inbound_queue: DEFAULT_INBOUND_QUEUE,
            expected_protocol_major_version: EXPECTED_PROTOCOL_MAJOR_VERSION,
            version_policy: VersionPolicy::Warn,
            bootstrap_report_frequency: ReportFrequency::Rf50Hz,
            steady_report_frequency: ReportFrequency::Rf1Hz,
            data_plane_report_frequency: ReportFrequency::Rf250Hz,
            initialize_control: true,
        }
    }
}

impl ClientConfig {
    /// WebSocket URL of the controller.
    pub fn control_url(&self) -> String {
        let host = self.host.as_str();
        let bare = host.split('%').next().unwrap_or(host);
        if !host.starts_with('[') && bare.parse::<Ipv6Addr>().is_ok() {
            format!("ws://[{}]:{}", host, self.control_port)
        } else {
            format!("ws://{}:{}", host, self.control_port)
        }
    }

    /// Tunnel options derived from this configuration.
    pub fn tunnel_options(&self) -> TunnelOptions {
        TunnelOptions {
            tick_interval: self.tick_interval,
            reassembly_capacity: self.reassembly_capacity,
            max_frame_payload: self.max_frame_payload,
            inbound_queue: self.inbound_queue,
            expected_version: self.expected_protocol_major_version,
            version_policy: self.version_policy,
        }
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Start from defaults, targeting `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            config: ClientConfig {
                host: host.into(),
                ..ClientConfig::default()
            },
        }
    }

    /// Set the controller WebSocket port.
    pub fn control_port(mut self, port: u16) -> Self {
        self.config.control_port = port;
        self
    }

    /// Bind the data plane to a specific local address.
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = Some(addr);
        self
    }

    /// Set the desired data-plane tuning.
    pub fn tuning(mut self, tuning: TunnelConfig) -> Self {
        self.config.tuning = tuning;
        self
    }

    /// Enable or disable the data plane.
    pub fn data_plane(mut self, enabled: bool) -> Self {
        self.config.data_plane_enabled = enabled;
        self
    }

    /// Set the session-id and data-plane wait limits.
    pub fn handshake_timeouts(mut self, session: Duration, data_plane: Duration) -> Self {
        self.config.session_timeout = session;
        self.config.data_plane_timeout = data_plane;
        self
    }

    /// Set the wait limit for releasing control.
    pub fn release_timeout(mut self, timeout: Duration) -> Self {
        self.config.release_timeout = timeout;
        self
    }

    /// Set the control-plane heartbeat period.
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.heartbeat_interval = interval;
        self
    }

    /// Set the primitive's tick period.
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.config.tick_interval = interval;
        self
    }

    /// Set the data-plane buffer limits.
    pub fn buffers(mut self, reassembly_capacity: usize, max_frame_payload: usize) -> Self {
        self.config.reassembly_capacity = reassembly_capacity;
        self.config.max_frame_payload = max_frame_payload;
        self
    }

    /// Set the expected protocol major version and the mismatch policy.
    pub fn version(mut self, expected: u32, policy: VersionPolicy) -> Self {
        self.config.expected_protocol_major_version = expected;
        self.config.version_policy = policy;
        self
    }

    /// Set the bootstrap, steady-state and data-plane report rates.
    pub fn report_frequencies(
        mut self,
        bootstrap: ReportFrequency,
        steady: ReportFrequency,
        data_plane: ReportFrequency,
    ) -> Self {
        self.config.bootstrap_report_frequency = bootstrap;
        self.config.steady_report_frequency = steady;
        self.config.data_plane_report_frequency = data_plane;
        self
    }

    /// Acquire control on entering steady state, or leave it to the caller.
    pub fn initialize_control(mut self, enabled: bool) -> Self {
        self.config.initialize_control = enabled;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.control_port, 8439);
        assert_eq!(config.session_timeout, Duration::from_secs(5));
        assert_eq!(config.tick_interval, Duration::from_millis(5));
        assert_eq!(config.reassembly_capacity, 4096);
        assert_eq!(config.version_policy, VersionPolicy::Warn);
        assert!(config.data_plane_enabled);
        assert!(config.initialize_control);
    }

    #[test]
    fn test_control_url() {
        let v4 = ClientConfigBuilder::new("192.168.1.10").build();
        assert_eq!(v4.control_url(), "ws://192.168.1.10:8439");

        let v6 = ClientConfigBuilder::new("fe80::1%3").control_port(9000).build();
        assert_eq!(v6.control_url(), "ws://[fe80::1%3]:9000");

        let bracketed = ClientConfigBuilder::new("[::1]").build();
        assert_eq!(bracketed.control_url(), "ws://[::1]:8439");

        let name = ClientConfigBuilder::new("robot.local").build();
        assert_eq!(name.control_url(), "ws://robot.local:8439");
    }

    #[test]
    fn test_builder_overrides() {
        let config = ClientConfigBuilder::new("10.0.0.2")
            .data_plane(false)
            .version(2, VersionPolicy::Strict)
            .buffers(8192, 1024)
            .handshake_timeouts(Duration::from_secs(1), Duration::from_secs(2))
            .build();

        assert!(!config.data_plane_enabled);
        let options = config.tunnel_options();
        assert_eq!(options.expected_version, 2);
        assert_eq!(options.version_policy, VersionPolicy::Strict);
        assert_eq!(options.reassembly_capacity, 8192);
        assert_eq!(options.max_frame_payload, 1024);
        assert_eq!(config.data_plane_timeout, Duration::from_secs(2));
    }
}
