//! Controller API schema and its codec.
//!
//! [`ProtoCodec`] is the [`MessageCodec`](crate::core::MessageCodec) used to
//! talk to the controller. [`ApiDown::base_move`] builds the velocity commands
//! a teleoperation loop streams over the data plane.

mod codec;
mod messages;

pub use codec::ProtoCodec;
pub use messages::*;
