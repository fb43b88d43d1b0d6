//! `procsim-core`: a cycle-accurate simulator of a superscalar, pipelined,
//! out-of-order processor.
//!
//! The simulator is tick-driven rather than thread-driven: every pipeline
//! stage is a plain struct with a `tick` method, and [`core::processor::Processor`]
//! calls each one once per cycle in a fixed order (fetch, decode, dispatch,
//! execute, commit). [`channel::BoundedChannel`] is the only synchronization
//! primitive between stages, a non-blocking stand-in for the blocking queues
//! in the design this crate implements.
//!
//! Module map:
//! - [`common`]: bit packing and error kinds shared everywhere.
//! - [`isa`]: the instruction-set catalog and 32-bit encoding.
//! - [`channel`] / [`clock`]: the two cross-stage primitives.
//! - [`config`]: JSON-loadable simulator configuration.
//! - [`memory`] / [`registers`]: the byte-addressable storage model.
//! - [`stats`]: run-wide counters and the per-operation stage timeline.
//! - [`core`]: the pipeline stages and the Tomasulo-style execution core.

pub mod common;
pub mod isa;

pub mod channel;
pub mod clock;
pub mod config;
pub mod memory;
pub mod registers;
pub mod stats;

pub mod core;
