//! Reorder buffer: in-order commit, speculative state, and misprediction
//! detection.
//!
//! Maintains a map `op_id -> entry`. Entries are allocated with just a
//! destination *kind* (the register index is known from decode, but a
//! store's effective address or a branch's PC semantics aren't resolved
//! until execute) and finalized by one of the four speculative writes once
//! the owning functional unit completes.

use std::collections::HashMap;

use crate::registers::RegisterFile;
use crate::memory::MemoryBank;
use super::storage_bus::StorageBus;

/// Which program-counter semantics a control-flow entry carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcSemantic {
    /// `value` is the absolute target address.
    Absolute,
    /// `value` (reinterpreted as `i32`) is added to the PC.
    Offset,
}

/// What kind of destination an entry targets, fixed at allocation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobKind {
    /// Writes an architectural register.
    Register(u32),
    /// Writes a data-memory address, resolved at execute time.
    Memory,
    /// Updates the architectural PC, directly or by offset.
    ProgramCounter(PcSemantic),
}

/// One reorder-buffer entry.
#[derive(Debug, Clone, Copy)]
pub struct RobEntry {
    /// Operation id this entry belongs to.
    pub op_id: u64,
    /// Destination kind, fixed at allocation.
    pub kind: RobKind,
    /// Resolved memory address, for `RobKind::Memory` entries, once written.
    pub address: u32,
    /// The 32-bit value (register/memory data, or PC absolute/offset amount).
    pub value: u32,
    /// The cycle this entry's value was written, once the owning unit
    /// completes. `None` while still in flight.
    pub written_cycle: Option<u64>,
}

impl RobEntry {
    fn new(op_id: u64, kind: RobKind) -> Self {
        Self { op_id, kind, address: 0, value: 0, written_cycle: None }
    }

    /// Whether at least one cycle has elapsed since this entry was written —
    /// the commit eligibility rule in the design.
    #[must_use]
    pub fn committable_at(&self, current_cycle: u64) -> bool {
        self.written_cycle.is_some_and(|w| current_cycle > w)
    }
}

/// The reorder buffer.
#[derive(Debug)]
pub struct Rob {
    entries: HashMap<u64, RobEntry>,
    capacity: usize,
    next_commit_id: u64,
}

impl Rob {
    /// Creates an empty ROB with the given entry capacity, ready to allocate
    /// starting at operation id `start_op_id`.
    #[must_use]
    pub fn new(capacity: usize, start_op_id: u64) -> Self {
        Self { entries: HashMap::new(), capacity, next_commit_id: start_op_id }
    }

    /// Configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ROB holds no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Free entry slots.
    #[must_use]
    pub fn free_slots(&self) -> usize {
        self.capacity.saturating_sub(self.entries.len())
    }

    /// Whether the ROB is at capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.free_slots() == 0
    }

    /// The next operation id eligible to commit.
    #[must_use]
    pub fn next_commit_id(&self) -> u64 {
        self.next_commit_id
    }

    /// Allocates a new entry for `op_id`. Returns `false` (and allocates
    /// nothing) if the ROB is full.
    pub fn allocate(&mut self, op_id: u64, kind: RobKind) -> bool {
        if self.is_full() {
            return false;
        }
        self.entries.insert(op_id, RobEntry::new(op_id, kind));
        true
    }

    /// Looks up a live entry by operation id.
    #[must_use]
    pub fn entry(&self, op_id: u64) -> Option<&RobEntry> {
        self.entries.get(&op_id)
    }

    fn write(&mut self, op_id: u64, address: u32, value: u32, cycle: u64) -> bool {
        if let Some(entry) = self.entries.get_mut(&op_id) {
            entry.address = address;
            entry.value = value;
            entry.written_cycle = Some(cycle);
            true
        } else {
            false
        }
    }

    /// Youngest live entry (by op id) with op id `<= op_ceiling` that writes
    /// register `r` and has already been written. `None` if no such entry is
    /// live; the caller falls back to the committed register file.
    #[must_use]
    pub fn find_register(&self, op_ceiling: u64, r: u32) -> Option<u32> {
        self.entries
            .values()
            .filter(|e| e.op_id <= op_ceiling && e.written_cycle.is_some())
            .filter(|e| matches!(e.kind, RobKind::Register(reg) if reg == r))
            .max_by_key(|e| e.op_id)
            .map(|e| e.value)
    }

    /// Youngest live entry (by op id) with op id `<= op_ceiling` that writes
    /// register `r`, written or not. Used when the register alias table is
    /// disabled (or bypassed, for register 0): without renaming, a consumer
    /// still needs to find which in-flight operation owns its source
    /// register to either read its value or wait on its broadcast.
    #[must_use]
    pub fn youngest_register_entry(&self, op_ceiling: u64, r: u32) -> Option<&RobEntry> {
        self.entries
            .values()
            .filter(|e| e.op_id <= op_ceiling)
            .filter(|e| matches!(e.kind, RobKind::Register(reg) if reg == r))
            .max_by_key(|e| e.op_id)
    }

    /// Youngest live entry (by op id) with op id `<= op_ceiling` that writes
    /// data address `addr` and has already been written.
    #[must_use]
    pub fn find_data(&self, op_ceiling: u64, addr: u32) -> Option<u32> {
        self.entries
            .values()
            .filter(|e| e.op_id <= op_ceiling && e.written_cycle.is_some())
            .filter(|e| matches!(e.kind, RobKind::Memory) && e.address == addr)
            .max_by_key(|e| e.op_id)
            .map(|e| e.value)
    }

    /// Commits the entry for the next-expected operation id, if it exists
    /// and has been written for at least one full cycle. Removes the entry
    /// and advances `next_commit_id` on success.
    pub fn commit_next(&mut self, current_cycle: u64) -> Option<RobEntry> {
        let entry = self.entries.get(&self.next_commit_id)?;
        if !entry.committable_at(current_cycle) {
            return None;
        }
        let entry = self.entries.remove(&self.next_commit_id)?;
        self.next_commit_id += 1;
        Some(entry)
    }

    /// Discards every live entry. Used when a flush has no operations worth
    /// preserving (the full-pipeline recovery case).
    pub fn flush_all(&mut self) {
        self.entries.clear();
    }

    /// Discards every entry with operation id strictly greater than
    /// `keep_op_id`. `next_commit_id` is left untouched — recovery resets it
    /// separately via [`Self::reset_to`].
    pub fn flush_after(&mut self, keep_op_id: u64) {
        self.entries.retain(|&id, _| id <= keep_op_id);
    }

    /// Re-initializes the ROB for a fresh pipeline incarnation starting at
    /// `start_op_id`, discarding all entries.
    pub fn reset_to(&mut self, start_op_id: u64) {
        self.entries.clear();
        self.next_commit_id = start_op_id;
    }
}

/// The ROB-backed, speculative [`StorageBus`]: reads consult live ROB
/// entries first and fall back to committed state; writes finalize an
/// allocated entry.
pub struct RobBus<'a> {
    rob: &'a mut Rob,
    registers: &'a RegisterFile,
    data: &'a MemoryBank,
}

impl<'a> RobBus<'a> {
    /// Borrows the ROB plus the committed register file and data memory to
    /// fall back to.
    pub fn new(rob: &'a mut Rob, registers: &'a RegisterFile, data: &'a MemoryBank) -> Self {
        Self { rob, registers, data }
    }
}

impl StorageBus for RobBus<'_> {
    fn load_register(&self, op_ceiling: u64, r: u32) -> u32 {
        self.rob.find_register(op_ceiling, r).unwrap_or_else(|| self.registers.read(r))
    }

    fn store_register(&mut self, op_id: u64, r: u32, v: u32, cycle: u64) {
        self.rob.write(op_id, r, v, cycle);
    }

    fn load_data(&self, op_ceiling: u64, addr: u32) -> u32 {
        self.rob.find_data(op_ceiling, addr).unwrap_or_else(|| self.data.read_u32(addr))
    }

    fn store_data(&mut self, op_id: u64, addr: u32, v: u32, cycle: u64) {
        self.rob.write(op_id, addr, v, cycle);
    }

    fn set_pc(&mut self, op_id: u64, abs: u32, cycle: u64) {
        self.rob.write(op_id, 0, abs, cycle);
    }

    fn increment_pc(&mut self, op_id: u64, off: i32, cycle: u64) {
        self.rob.write(op_id, 0, off as u32, cycle);
    }
}

/// The committed, non-speculative [`StorageBus`]: writes directly to the
/// architectural register file, data memory, and PC. Used only by the
/// commit stage.
pub struct CommittedBus<'a> {
    /// Architectural register file.
    pub registers: &'a mut RegisterFile,
    /// Architectural data memory.
    pub data: &'a mut MemoryBank,
    /// Architectural program counter.
    pub pc: &'a mut u32,
}

impl StorageBus for CommittedBus<'_> {
    fn load_register(&self, _op_ceiling: u64, r: u32) -> u32 {
        self.registers.read(r)
    }

    fn store_register(&mut self, _op_id: u64, r: u32, v: u32, _cycle: u64) {
        self.registers.write(r, v);
    }

    fn load_data(&self, _op_ceiling: u64, addr: u32) -> u32 {
        self.data.read_u32(addr)
    }

    fn store_data(&mut self, _op_id: u64, addr: u32, v: u32, _cycle: u64) {
        self.data.write_u32(addr, v);
    }

    fn set_pc(&mut self, _op_id: u64, abs: u32, _cycle: u64) {
        *self.pc = abs;
    }

    fn increment_pc(&mut self, _op_id: u64, off: i32, _cycle: u64) {
        *self.pc = (*self.pc as i64 + i64::from(off)) as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_and_commit_round_trips() {
        let mut rob = Rob::new(4, 0);
        assert!(rob.allocate(0, RobKind::Register(3)));
        assert!(rob.write(0, 3, 42, 1));
        assert!(rob.commit_next(2).is_some());
        assert_eq!(rob.next_commit_id(), 1);
    }

    #[test]
    fn commit_fails_same_cycle_as_write() {
        let mut rob = Rob::new(4, 0);
        rob.allocate(0, RobKind::Register(3));
        rob.write(0, 3, 42, 5);
        assert!(rob.commit_next(5).is_none());
        assert!(rob.commit_next(6).is_some());
    }

    #[test]
    fn commit_fails_when_not_yet_written() {
        let mut rob = Rob::new(4, 0);
        rob.allocate(0, RobKind::Register(3));
        assert!(rob.commit_next(10).is_none());
    }

    #[test]
    fn full_rob_rejects_further_allocation() {
        let mut rob = Rob::new(1, 0);
        assert!(rob.allocate(0, RobKind::Register(1)));
        assert!(!rob.allocate(1, RobKind::Register(2)));
    }

    #[test]
    fn find_register_returns_youngest_matching_entry() {
        let mut rob = Rob::new(8, 0);
        rob.allocate(0, RobKind::Register(3));
        rob.write(0, 3, 10, 1);
        rob.allocate(1, RobKind::Register(3));
        rob.write(1, 3, 20, 2);
        assert_eq!(rob.find_register(5, 3), Some(20));
    }

    #[test]
    fn find_register_respects_op_ceiling() {
        let mut rob = Rob::new(8, 0);
        rob.allocate(0, RobKind::Register(3));
        rob.write(0, 3, 10, 1);
        rob.allocate(1, RobKind::Register(3));
        rob.write(1, 3, 20, 2);
        assert_eq!(rob.find_register(0, 3), Some(10));
    }

    #[test]
    fn find_register_ignores_unwritten_entries() {
        let mut rob = Rob::new(8, 0);
        rob.allocate(0, RobKind::Register(3));
        assert_eq!(rob.find_register(5, 3), None);
    }

    #[test]
    fn youngest_register_entry_finds_unwritten_producer() {
        let mut rob = Rob::new(8, 0);
        rob.allocate(0, RobKind::Register(3));
        let entry = rob.youngest_register_entry(5, 3).expect("live entry");
        assert_eq!(entry.op_id, 0);
        assert!(entry.written_cycle.is_none());
    }

    #[test]
    fn youngest_register_entry_respects_op_ceiling() {
        let mut rob = Rob::new(8, 0);
        rob.allocate(0, RobKind::Register(3));
        rob.allocate(1, RobKind::Register(3));
        assert_eq!(rob.youngest_register_entry(0, 3).map(|e| e.op_id), Some(0));
    }

    #[test]
    fn flush_after_keeps_prefix_and_discards_rest() {
        let mut rob = Rob::new(8, 0);
        rob.allocate(0, RobKind::Register(1));
        rob.allocate(1, RobKind::Register(2));
        rob.allocate(2, RobKind::Register(3));
        rob.flush_after(0);
        assert!(rob.entry(0).is_some());
        assert!(rob.entry(1).is_none());
        assert!(rob.entry(2).is_none());
    }

    #[test]
    fn reset_to_clears_entries_and_rebases_commit_cursor() {
        let mut rob = Rob::new(8, 0);
        rob.allocate(0, RobKind::Register(1));
        rob.reset_to(5);
        assert!(rob.is_empty());
        assert_eq!(rob.next_commit_id(), 5);
    }

    #[test]
    fn program_counter_offset_entry_round_trips_negative_values() {
        let mut rob = Rob::new(4, 0);
        rob.allocate(0, RobKind::ProgramCounter(PcSemantic::Offset));
        rob.write(0, 0, (-4i32) as u32, 1);
        let entry = rob.entry(0).expect("entry present");
        assert_eq!(entry.value as i32, -4);
    }

    #[test]
    fn committed_bus_writes_go_straight_through() {
        let mut registers = RegisterFile::new();
        let mut data = MemoryBank::new(16);
        let mut pc = 0u32;
        let mut bus = CommittedBus { registers: &mut registers, data: &mut data, pc: &mut pc };
        bus.store_register(0, 2, 99, 0);
        assert_eq!(bus.load_register(0, 2), 99);
        bus.increment_pc(0, 4, 0);
        assert_eq!(*bus.pc, 4);
    }

    #[test]
    fn rob_bus_falls_back_to_committed_register_when_no_live_entry() {
        let mut registers = RegisterFile::new();
        registers.write(9, 123);
        let data = MemoryBank::new(16);
        let mut rob = Rob::new(4, 0);
        let bus = RobBus::new(&mut rob, &registers, &data);
        assert_eq!(bus.load_register(100, 9), 123);
    }
}
