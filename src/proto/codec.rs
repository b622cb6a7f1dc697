//! [`MessageCodec`] for the controller's protobuf API.

use prost::Message;

use super::messages::{
    ApiDown, ApiUp, BaseCommand, BaseStatus, EnableKcp, KcpConfig, Odometry,
    SimpleBaseMoveCommand, XyzSpeed, api_down, api_up, base_command, simple_base_move_command,
};
use crate::core::{
    DataPlaneStatus, DecodeError, DownMessage, MessageCodec, ReportFrequency, TunnelConfig,
    TuningOverride, UpMessage,
};

/// Protobuf codec: [`ApiDown`] out, [`ApiUp`] in.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtoCodec;

impl MessageCodec for ProtoCodec {
    type Up = ApiUp;
    type Down = ApiDown;

    fn encode(&self, msg: &ApiDown) -> Vec<u8> {
        msg.encode_to_vec()
    }

    fn decode(&self, bytes: &[u8]) -> Result<ApiUp, DecodeError> {
        ApiUp::decode(bytes).map_err(|e| DecodeError::InvalidEncoding(e.to_string()))
    }
}

impl From<&KcpConfig> for TuningOverride {
    /// Proto3 scalars carry no presence, so zero and `false` both mean "not set".
    fn from(cfg: &KcpConfig) -> Self {
        let nonzero = |v: u32| (v != 0).then_some(v);
        TuningOverride {
            send_window: nonzero(cfg.window_size_snd_wnd),
            recv_window: nonzero(cfg.window_size_rcv_wnd),
            interval_ms: nonzero(cfg.interval_ms),
            no_delay: cfg.no_delay.then_some(true),
            fast_retransmit_count: nonzero(cfg.resend),
            congestion_control_disabled: cfg.nc.then_some(true),
        }
    }
}

impl From<&TunnelConfig> for KcpConfig {
    fn from(tuning: &TunnelConfig) -> Self {
        KcpConfig {
            window_size_snd_wnd: tuning.send_window,
            window_size_rcv_wnd: tuning.recv_window,
            interval_ms: tuning.interval_ms,
            no_delay: tuning.no_delay,
            nc: tuning.congestion_control_disabled,
            resend: tuning.fast_retransmit_count,
        }
    }
}

impl UpMessage for ApiUp {
    fn session_id(&self) -> u64 {
        self.session_id
    }

    fn protocol_major_version(&self) -> u32 {
        self.protocol_major_version
    }

    fn data_plane_status(&self) -> Option<DataPlaneStatus> {
        let status = self.kcp_server_status.as_ref()?;
        Some(DataPlaneStatus {
            // Out-of-range ports are treated as unassigned.
            remote_port: u16::try_from(status.server_port).unwrap_or(0),
            tuning: status
                .kcp_config
                .as_ref()
                .map(TuningOverride::from)
                .filter(|o| !o.is_empty()),
        })
    }

    fn peer_log(&self) -> Option<&str> {
        self.log.as_deref()
    }

    fn peer_kind(&self) -> Option<&str> {
        Some(self.robot_type().as_str_name())
    }
}

impl ApiUp {
    /// Mobile base status, if this message carries one.
    pub fn base_status(&self) -> Option<&BaseStatus> {
        match &self.status {
            Some(api_up::Status::BaseStatus(status)) => Some(status),
            None => None,
        }
    }

    /// Estimated odometry of the mobile base.
    pub fn odometry(&self) -> Option<Odometry> {
        self.base_status()?.estimated_odometry
    }
}

impl DownMessage for ApiDown {
    fn set_report_frequency(frequency: ReportFrequency) -> Self {
        let wire = super::messages::ReportFrequency::from(frequency);
        ApiDown {
            down: Some(api_down::Down::SetReportFrequency(wire as i32)),
        }
    }

    fn enable_data_plane(local_port: u16, tuning: &TunnelConfig) -> Self {
        ApiDown {
            down: Some(api_down::Down::EnableKcp(EnableKcp {
                client_peer_port: u32::from(local_port),
                kcp_config: Some(KcpConfig::from(tuning)),
            })),
        }
    }

    fn placeholder() -> Self {
        ApiDown {
            down: Some(api_down::Down::PlaceholderMessage(true)),
        }
    }

    fn control_initialize(active: bool) -> Self {
        Self::base_command(base_command::Command::ApiControlInitialize(active))
    }
}

impl ApiDown {
    /// Wrap a mobile base command.
    pub fn base_command(command: base_command::Command) -> Self {
        ApiDown {
            down: Some(api_down::Down::BaseCommand(BaseCommand {
                command: Some(command),
            })),
        }
    }

    /// Body-frame velocity command for the mobile base.
    pub fn base_move(speed_x: f32, speed_y: f32, speed_z: f32) -> Self {
        Self::base_command(base_command::Command::SimpleMoveCommand(
            SimpleBaseMoveCommand {
                command: Some(simple_base_move_command::Command::XyzSpeed(XyzSpeed {
                    speed_x,
                    speed_y,
                    speed_z,
                })),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::messages::{KcpServerStatus, RobotType};

    #[test]
    fn test_base_move_decodes_back() {
        let bytes = ProtoCodec.encode(&ApiDown::base_move(0.1, 0.0, -0.5));
        let decoded = ApiDown::decode(bytes.as_slice()).unwrap();
        let Some(api_down::Down::BaseCommand(BaseCommand {
            command: Some(base_command::Command::SimpleMoveCommand(mv)),
        })) = decoded.down
        else {
            panic!("unexpected message: {decoded:?}");
        };
        assert_eq!(
            mv.command,
            Some(simple_base_move_command::Command::XyzSpeed(XyzSpeed {
                speed_x: 0.1,
                speed_y: 0.0,
                speed_z: -0.5,
            }))
        );
    }

    #[test]
    fn test_enable_data_plane_carries_port_and_tuning() {
        let tuning = TunnelConfig::default();
        let msg = ApiDown::enable_data_plane(40123, &tuning);
        let Some(api_down::Down::EnableKcp(enable)) = msg.down else {
            panic!("expected EnableKcp");
        };
        assert_eq!(enable.client_peer_port, 40123);
        let cfg = enable.kcp_config.unwrap();
        assert_eq!(cfg.window_size_snd_wnd, 64);
        assert_eq!(cfg.window_size_rcv_wnd, 64);
        assert_eq!(cfg.interval_ms, 10);
        assert_eq!(cfg.resend, 2);
        assert!(cfg.no_delay);
        assert!(cfg.nc);
    }

    #[test]
    fn test_up_fields_extracted() {
        let up = ApiUp {
            protocol_major_version: 1,
            session_id: 7,
            robot_type: RobotType::RtBase as i32,
            kcp_server_status: Some(KcpServerStatus {
                server_port: 9000,
                kcp_config: None,
            }),
            log: Some("motor fault".into()),
            ..Default::default()
        };
        let decoded = ProtoCodec.decode(&up.encode_to_vec()).unwrap();

        assert_eq!(decoded.session_id(), 7);
        assert_eq!(decoded.protocol_major_version(), 1);
        assert_eq!(decoded.peer_log(), Some("motor fault"));
        assert_eq!(decoded.peer_kind(), Some("RT_BASE"));
        assert_eq!(
            decoded.data_plane_status(),
            Some(DataPlaneStatus {
                remote_port: 9000,
                tuning: None,
            })
        );
    }

    #[test]
    fn test_zero_fields_do_not_override() {
        let cfg = KcpConfig {
            window_size_snd_wnd: 32,
            ..Default::default()
        };
        let proposal = TuningOverride::from(&cfg);
        assert_eq!(proposal.send_window, Some(32));
        assert_eq!(proposal.recv_window, None);
        assert_eq!(proposal.interval_ms, None);
        assert_eq!(proposal.fast_retransmit_count, None);
        assert_eq!(proposal.no_delay, None);
        assert_eq!(TunnelConfig::default().merged(&proposal).send_window, 32);
    }

    #[test]
    fn test_out_of_range_port_is_unassigned() {
        let up = ApiUp {
            kcp_server_status: Some(KcpServerStatus {
                server_port: 70_000,
                kcp_config: None,
            }),
            ..Default::default()
        };
        assert_eq!(up.data_plane_status().unwrap().remote_port, 0);
    }

    #[test]
    fn test_odometry_accessor() {
        let odom = Odometry {
            pos_x: 1.5,
            speed_z: 0.1,
            ..Default::default()
        };
        let up = ApiUp {
            status: Some(api_up::Status::BaseStatus(BaseStatus {
                estimated_odometry: Some(odom),
            })),
            ..Default::default()
        };
        assert_eq!(up.odometry(), Some(odom));
        assert_eq!(ApiUp::default().odometry(), None);
    }

    #[test]
    fn test_garbage_is_decode_error() {
        assert!(matches!(
            ProtoCodec.decode(&[0xFF]),
            Err(DecodeError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_report_frequency_mapping() {
        let msg = ApiDown::set_report_frequency(ReportFrequency::Rf250Hz);
        assert_eq!(
            msg.down,
            Some(api_down::Down::SetReportFrequency(
                crate::proto::ReportFrequency::Rf250Hz as i32
            ))
        );
        assert_eq!(hex::encode(ProtoCodec.encode(&ApiDown::placeholder())), "1001");
    }
}
