//! Error kinds for the simulator.
//!
//! This module defines the four error kinds the design distinguishes:
//! input, decode, and execution errors, all of which terminate the run, plus
//! the non-error end-of-program signal represented separately so it can never
//! be mistaken for a failure.

use thiserror::Error;

/// Errors that can occur while assembling, configuring, or running a program.
#[derive(Debug, Error)]
pub enum SimError {
    /// Malformed assembly, a bad configuration file, or a missing input file.
    /// Reported to the user and terminates the process before simulation starts.
    #[error("input error: {0}")]
    Input(String),

    /// An unknown opcode or the wrong operand arity reached the decoder.
    #[error("decode error at address {address:#010x}: word {word:#010x} ({reason})")]
    Decode {
        /// Byte address the offending word was fetched from.
        address: u32,
        /// The raw 32-bit word that failed to decode.
        word: u32,
        /// Human-readable reason.
        reason: String,
    },

    /// An invalid opcode/type combination reached a functional unit. This is
    /// a bug in the simulator itself, not in the simulated program.
    #[error("execution error: {0}")]
    Execution(String),
}

/// Result alias for fallible simulator operations.
pub type SimResult<T> = Result<T, SimError>;

/// Outcome of running the clock to completion. End-of-program is explicitly
/// not an error: it is signalled by the fetcher reading the sentinel byte and
/// only ever flows through this type, never through [`SimError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramStatus {
    /// The program is still running.
    Running,
    /// The fetcher reached the end-of-program sentinel and the pipeline has
    /// drained (`fetched_count == completed_count` and no speculative jumps
    /// remain).
    Finished,
    /// The configured `--max-cycles` budget was exhausted before the program
    /// finished.
    CycleLimitReached,
}
