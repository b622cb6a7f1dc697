//! Minimal codec used by unit tests that don't need protobuf.
//!
//! Upstream wire form: `[version, body...]`. Downstream `Raw` bytes are sent as
//! they are, so a `Raw` starting with a version byte decodes as a `TestUp` on
//! the other side.

use crate::core::{
    DataPlaneStatus, DecodeError, DownMessage, MessageCodec, ReportFrequency, TunnelConfig,
    UpMessage,
};

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TestCodec;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TestUp {
    pub version: u32,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TestDown {
    Raw(Vec<u8>),
    ReportFrequency(ReportFrequency),
    EnableDataPlane(u16, TunnelConfig),
    Placeholder,
    ControlInitialize(bool),
}

impl UpMessage for TestUp {
    fn session_id(&self) -> u64 {
        0
    }

    fn protocol_major_version(&self) -> u32 {
        self.version
    }

    fn data_plane_status(&self) -> Option<DataPlaneStatus> {
        None
    }
}

impl DownMessage for TestDown {
    fn set_report_frequency(frequency: ReportFrequency) -> Self {
        TestDown::ReportFrequency(frequency)
    }

    fn enable_data_plane(local_port: u16, tuning: &TunnelConfig) -> Self {
        TestDown::EnableDataPlane(local_port, *tuning)
    }

    fn placeholder() -> Self {
        TestDown::Placeholder
    }

    fn control_initialize(active: bool) -> Self {
        TestDown::ControlInitialize(active)
    }
}

impl MessageCodec for TestCodec {
    type Up = TestUp;
    type Down = TestDown;

    fn encode(&self, msg: &TestDown) -> Vec<u8> {
        match msg {
            TestDown::Raw(bytes) => bytes.clone(),
            other => {
                let mut bytes = vec![1];
                bytes.extend_from_slice(format!("{other:?}").as_bytes());
                bytes
            }
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<TestUp, DecodeError> {
        let (&version, body) = bytes.split_first().ok_or(DecodeError::UnexpectedEof)?;
        Ok(TestUp {
            version: u32::from(version),
            body: body.to_vec(),
        })
    }
}
