//! Core types for the teleoperation link.
//!
//! Always compiled: constants, the error taxonomy, tuning and negotiation
//! records, and the message-codec interface.

pub mod constants;
mod error;
mod traits;
mod types;

pub use error::*;
pub use traits::*;
pub use types::*;
