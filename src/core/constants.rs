//! Protocol constants for the teleoperation link.
//!
//! Wire values are fixed by the controller firmware and MUST NOT be changed.
//! Timing values are defaults; most are overridable through client configuration.

use std::time::Duration;

// =============================================================================
// FRAME HEADERS (data-plane payload layer)
// =============================================================================

/// CStyle header length: `[lead, 0x00, len_lo, len_hi]`.
pub const CSTYLE_HEADER_LEN: usize = 4;

/// CompactStyle header length: `[discriminator, len as LE u32]`.
pub const COMPACT_HEADER_LEN: usize = 5;

/// Smallest lead byte recognized as a CStyle header.
pub const CSTYLE_LEAD_MIN: u8 = 0x80;

/// Largest lead byte recognized as a CompactStyle discriminator.
pub const COMPACT_LEAD_MAX: u8 = 5;

/// Lead byte emitted on egress: final-fragment bit plus the binary opcode.
pub const CSTYLE_BINARY_LEAD: u8 = CSTYLE_LEAD_MIN | OPCODE_BINARY;

/// Opcode carried in the low nibble of a CStyle lead byte for binary app messages.
pub const OPCODE_BINARY: u8 = 0x02;

/// Largest payload a CStyle header can describe.
pub const MAX_CSTYLE_PAYLOAD: usize = u16::MAX as usize;

/// Default per-frame payload budget for outgoing frames.
pub const DEFAULT_MAX_FRAME_PAYLOAD: usize = 2048;

/// Default reassembly buffer capacity.
pub const DEFAULT_REASSEMBLY_CAPACITY: usize = 4096;

// =============================================================================
// RELIABLE TRANSPORT DEFAULTS
// =============================================================================

/// Default send window (segments).
pub const DEFAULT_SEND_WINDOW: u32 = 64;

/// Default receive window (segments).
pub const DEFAULT_RECV_WINDOW: u32 = 64;

/// Default internal update interval of the primitive.
pub const DEFAULT_INTERVAL_MS: u32 = 10;

/// Default fast-retransmit trigger (duplicate ACK count).
pub const DEFAULT_FAST_RETRANSMIT: u32 = 2;

/// Default MTU handed to the primitive.
pub const DEFAULT_MTU: usize = 1400;

/// Largest window the primitive accepts.
pub const MAX_WINDOW: u32 = u16::MAX as u32;

/// Period of the tick driver.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(5);

/// UDP receive buffer size.
pub const UDP_RECV_BUFFER_SIZE: usize = 65535;

/// Decoded messages buffered between the receive driver and the consumer.
pub const DEFAULT_INBOUND_QUEUE: usize = 256;

// =============================================================================
// CONTROL PLANE
// =============================================================================

/// Controller WebSocket port.
pub const DEFAULT_CONTROL_PORT: u16 = 8439;

/// Maximum wait for the WebSocket connection to open.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Protocol major version this client speaks.
pub const EXPECTED_PROTOCOL_MAJOR_VERSION: u32 = 1;

/// Maximum wait for the controller to assign a session id.
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum wait for the controller to report its data-plane port.
pub const DATA_PLANE_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum wait for the control-released message to flush.
pub const RELEASE_TIMEOUT: Duration = Duration::from_secs(2);

/// Control-plane heartbeat period during steady state.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// Control-plane events buffered between the reader task and the consumer.
pub const CONTROL_EVENT_QUEUE: usize = 64;
