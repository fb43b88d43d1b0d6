//! Shared primitives used throughout the simulator.
//!
//! 1. **Bit packing**: encode/decode bit fields within a 32-bit word.
//! 2. **Error kinds**: the four error kinds the design distinguishes.

pub mod bits;
pub mod error;

pub use error::{ProgramStatus, SimError, SimResult};
