//! Data-plane message framing.
//!
//! Pure and runtime-independent: [`encode`] builds one CStyle frame, [`scan`]
//! extracts every complete frame from a buffer with header auto-detection and
//! single-byte resynchronization, and [`ReassemblyBuffer`] holds the bytes
//! between scans.

mod frame;
mod reassembly;

pub use frame::*;
pub use reassembly::*;
