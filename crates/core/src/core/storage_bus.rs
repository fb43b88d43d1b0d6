//! The shared data bus, expressed as a trait implemented twice: once by the
//! ROB (speculative reads/writes visible before commit) and once by the
//! committed architectural state (used only at commit).
//!
//! This is the Rust realization of the "record of closures" shared bus in
//! the source material: a narrow interface, not a shared mutable struct, so
//! neither side needs a back-reference to the other.

/// Speculative or committed access to registers, data memory, and the PC.
pub trait StorageBus {
    /// Value of register `r` as visible to operation `op_ceiling` (for the
    /// committed bus, `op_ceiling` is ignored).
    fn load_register(&self, op_ceiling: u64, r: u32) -> u32;
    /// Records that operation `op_id` writes `v` to register `r` at `cycle`.
    fn store_register(&mut self, op_id: u64, r: u32, v: u32, cycle: u64);
    /// Value at data address `addr` as visible to operation `op_ceiling`.
    fn load_data(&self, op_ceiling: u64, addr: u32) -> u32;
    /// Records that operation `op_id` writes `v` to data address `addr` at
    /// `cycle`.
    fn store_data(&mut self, op_id: u64, addr: u32, v: u32, cycle: u64);
    /// Records that operation `op_id` sets the PC to the absolute address
    /// `abs` at `cycle`.
    fn set_pc(&mut self, op_id: u64, abs: u32, cycle: u64);
    /// Records that operation `op_id` advances the PC by the signed offset
    /// `off` at `cycle`.
    fn increment_pc(&mut self, op_id: u64, off: i32, cycle: u64);
}
