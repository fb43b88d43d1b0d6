//! The five pipeline stages: fetch, decode, dispatch, execute, commit.
//!
//! Each stage is a small struct holding only its own local state (a program
//! counter, a unit count, a width); the structures they read and write
//! (channels, the RS/ROB/RAT, the register file and memory banks) are
//! borrowed for the duration of a single `tick` call, the same shape already
//! used by [`fetch::Fetch`] and [`decode::Decode`].

pub mod commit;
pub mod decode;
pub mod dispatch;
pub mod execute;
pub mod fetch;

pub use commit::Commit;
pub use decode::Decode;
pub use dispatch::Dispatch;
pub use execute::Execute;
pub use fetch::Fetch;
