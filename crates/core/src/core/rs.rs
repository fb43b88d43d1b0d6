//! Reservation station: holds dispatched operations until every source
//! operand is ready, then hands them to an idle functional unit.
//!
//! An operand is either already resolved (a literal value, read from the
//! committed register file, the ROB, or an immediate) or waiting on another
//! in-flight operation's result. [`Rs::broadcast`] is the CDB: it resolves
//! every waiting operand tagged with the completed operation's id, the way
//! every functional unit's writeback fans out to every station entry.

use crate::isa::catalog::Category;

/// One source operand: either resolved, or waiting on another operation's
/// broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// Already known.
    Ready(u32),
    /// Not yet known; will be resolved by a [`Rs::broadcast`] of this
    /// operation id.
    Waiting(u64),
}

impl Operand {
    /// Whether this operand no longer depends on anything in flight.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Operand::Ready(_))
    }
}

/// One reservation-station entry.
#[derive(Debug, Clone)]
pub struct RsEntry {
    /// Operation id, used both to identify this entry and as the broadcast
    /// tag other entries wait on.
    pub op_id: u64,
    /// Functional-unit category this entry must be issued to.
    pub category: Category,
    /// Source operands, in encoding order (`rs` then `rt`, when both
    /// apply). Zero, one, or two entries depending on the instruction shape.
    pub operands: Vec<Operand>,
}

impl RsEntry {
    /// Whether every source operand is resolved and this entry can issue.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.operands.iter().all(Operand::is_ready)
    }

    /// The resolved operand values, in order. Panics if called before
    /// [`Self::is_ready`] — callers are expected to check readiness first,
    /// mirroring the invariant that issue only ever inspects ready entries.
    #[must_use]
    pub fn values(&self) -> Vec<u32> {
        self.operands
            .iter()
            .map(|op| match op {
                Operand::Ready(v) => *v,
                Operand::Waiting(_) => unreachable!("values() called on a non-ready entry"),
            })
            .collect()
    }
}

/// The reservation station.
#[derive(Debug)]
pub struct Rs {
    entries: Vec<RsEntry>,
    capacity: usize,
    /// Hard cap on issues per `dispatch_latency`-cycle window, shared across
    /// every functional-unit category. `usize::MAX` (the default) means
    /// unlimited, matching stations built via [`Self::new`] directly.
    dispatch_cap: usize,
    /// Width, in cycles, of the window `dispatch_cap` is enforced over.
    dispatch_latency: u64,
    issued_in_window: usize,
    window_start: u64,
}

impl Rs {
    /// Creates an empty station with room for `capacity` entries and no
    /// issue-rate limit.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
            dispatch_cap: usize::MAX,
            dispatch_latency: 1,
            issued_in_window: 0,
            window_start: 0,
        }
    }

    /// Configures the issue-rate limit: at most `cap` entries may issue
    /// (across every functional-unit category combined) within any
    /// `latency`-cycle window, mirroring the dispatched-instructions stack
    /// the original reservation station resets periodically.
    pub fn set_dispatch_limit(&mut self, cap: usize, latency: u64) {
        self.dispatch_cap = cap;
        self.dispatch_latency = latency.max(1);
    }

    /// Claims one issue slot for `cycle`, rolling the window over first if
    /// `dispatch_latency` cycles have passed since it last reset. Returns
    /// `false` (claiming nothing) once `dispatch_cap` issues have already
    /// happened in the current window.
    fn try_take_issue_slot(&mut self, cycle: u64) -> bool {
        if cycle.wrapping_sub(self.window_start) >= self.dispatch_latency {
            self.window_start = cycle;
            self.issued_in_window = 0;
        }
        if self.issued_in_window >= self.dispatch_cap {
            return false;
        }
        self.issued_in_window += 1;
        true
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

    /// Whether the station holds no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Free entry slots.
    #[must_use]
    pub fn free_slots(&self) -> usize {
        self.capacity.saturating_sub(self.entries.len())
    }

    /// Whether the station is at capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.free_slots() == 0
    }

    /// Inserts a newly dispatched entry. Returns `false` (without inserting)
    /// if the station is full.
    pub fn insert(&mut self, entry: RsEntry) -> bool {
        if self.is_full() {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Resolves every operand waiting on `op_id` to `value`, the CDB
    /// broadcast fan-out. Entries are otherwise left untouched.
    pub fn broadcast(&mut self, op_id: u64, value: u32) {
        for entry in &mut self.entries {
            for operand in &mut entry.operands {
                if matches!(operand, Operand::Waiting(waiting_id) if *waiting_id == op_id) {
                    *operand = Operand::Ready(value);
                }
            }
        }
    }

    /// Operation ids of every entry that is fully ready to issue, in the
    /// order they were dispatched (oldest first) — the selection policy a
    /// unit-assignment pass should prefer, favoring program order among
    /// equally-ready entries.
    #[must_use]
    pub fn ready_ids(&self) -> Vec<u64> {
        self.entries.iter().filter(|e| e.is_ready()).map(|e| e.op_id).collect()
    }

    /// Borrows the entry for `op_id`, if live.
    #[must_use]
    pub fn entry(&self, op_id: u64) -> Option<&RsEntry> {
        self.entries.iter().find(|e| e.op_id == op_id)
    }

    /// Removes and returns the entry for `op_id` once a unit has issued it,
    /// freeing its slot. `cycle` is checked against the configured
    /// dispatch-rate window (see [`Self::set_dispatch_limit`]); once that
    /// window's cap is spent, `None` is returned and the entry stays put
    /// regardless of readiness, to be retried once the window resets.
    pub fn issue(&mut self, op_id: u64, cycle: u64) -> Option<RsEntry> {
        if !self.try_take_issue_slot(cycle) {
            return None;
        }
        let index = self.entries.iter().position(|e| e.op_id == op_id)?;
        Some(self.entries.remove(index))
    }

    /// Discards every entry with operation id strictly greater than
    /// `keep_op_id`, mirroring the ROB/RAT flush behavior on recovery.
    pub fn flush_after(&mut self, keep_op_id: u64) {
        self.entries.retain(|e| e.op_id <= keep_op_id);
    }

    /// Discards every live entry.
    pub fn flush_all(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(op_id: u64, operands: Vec<Operand>) -> RsEntry {
        RsEntry { op_id, category: Category::Arithmetic, operands }
    }

    #[test]
    fn fully_resolved_entry_is_ready_immediately() {
        let e = entry(0, vec![Operand::Ready(1), Operand::Ready(2)]);
        assert!(e.is_ready());
        assert_eq!(e.values(), vec![1, 2]);
    }

    #[test]
    fn entry_with_waiting_operand_is_not_ready() {
        let e = entry(0, vec![Operand::Ready(1), Operand::Waiting(7)]);
        assert!(!e.is_ready());
    }

    #[test]
    fn broadcast_resolves_matching_waiting_operands_only() {
        let mut rs = Rs::new(4);
        rs.insert(entry(0, vec![Operand::Waiting(9), Operand::Waiting(10)]));
        rs.broadcast(9, 42);
        let e = rs.entry(0).expect("entry present");
        assert_eq!(e.operands[0], Operand::Ready(42));
        assert_eq!(e.operands[1], Operand::Waiting(10));
    }

    #[test]
    fn entry_becomes_ready_once_all_operands_broadcast() {
        let mut rs = Rs::new(4);
        rs.insert(entry(0, vec![Operand::Waiting(1), Operand::Waiting(2)]));
        rs.broadcast(1, 10);
        assert!(rs.ready_ids().is_empty());
        rs.broadcast(2, 20);
        assert_eq!(rs.ready_ids(), vec![0]);
    }

    #[test]
    fn full_station_rejects_further_inserts() {
        let mut rs = Rs::new(1);
        assert!(rs.insert(entry(0, vec![])));
        assert!(!rs.insert(entry(1, vec![])));
    }

    #[test]
    fn issue_removes_the_entry_and_frees_a_slot() {
        let mut rs = Rs::new(1);
        rs.insert(entry(0, vec![]));
        assert!(rs.is_full());
        let issued = rs.issue(0, 1).expect("entry present");
        assert_eq!(issued.op_id, 0);
        assert!(!rs.is_full());
    }

    #[test]
    fn issue_is_capped_per_dispatch_window() {
        let mut rs = Rs::new(4);
        rs.insert(entry(0, vec![]));
        rs.insert(entry(1, vec![]));
        rs.set_dispatch_limit(1, 2);

        assert!(rs.issue(0, 10).is_some());
        assert!(rs.issue(1, 10).is_none(), "cap already spent this window");
        assert!(rs.issue(1, 11).is_none(), "window has not rolled over yet");
        assert!(rs.issue(1, 12).is_some(), "window reset after dispatch_latency cycles");
    }

    #[test]
    fn ready_ids_preserve_dispatch_order() {
        let mut rs = Rs::new(4);
        rs.insert(entry(5, vec![]));
        rs.insert(entry(2, vec![]));
        rs.insert(entry(9, vec![]));
        assert_eq!(rs.ready_ids(), vec![5, 2, 9]);
    }

    #[test]
    fn flush_after_keeps_prefix_and_discards_rest() {
        let mut rs = Rs::new(4);
        rs.insert(entry(0, vec![]));
        rs.insert(entry(1, vec![]));
        rs.insert(entry(2, vec![]));
        rs.flush_after(0);
        assert_eq!(rs.len(), 1);
        assert!(rs.entry(0).is_some());
    }
}
