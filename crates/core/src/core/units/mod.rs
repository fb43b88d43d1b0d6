//! Execution units: the four functional-unit categories plus the
//! latency-tracking slot pool shared by all of them.
//!
//! Each category module exposes a pure `compute` function; [`LatencyUnit`]
//! is the tick-driven occupancy model common to all of them — an operation
//! occupies a slot for its catalog latency, then becomes available for
//! writeback, mirroring how [`crate::channel::BoundedChannel`] holds a
//! credit for the full lifetime of an in-flight item rather than just until
//! dequeue.

pub mod alu;
pub mod branch;
pub mod fpu;
pub mod lsu;

/// One in-flight operation occupying a unit slot.
#[derive(Debug, Clone)]
struct InFlight<T> {
    op_id: u64,
    slot: usize,
    issued_cycle: u64,
    remaining_cycles: u32,
    payload: T,
}

/// A pool of `parallelism` identical functional units, each tracking its own
/// in-flight operations by remaining latency.
#[derive(Debug)]
pub struct LatencyUnit<T> {
    parallelism: usize,
    in_flight: Vec<InFlight<T>>,
}

impl<T> LatencyUnit<T> {
    /// Creates a pool with `parallelism` concurrent slots.
    #[must_use]
    pub fn new(parallelism: usize) -> Self {
        Self { parallelism: parallelism.max(1), in_flight: Vec::new() }
    }

    /// Number of slots currently occupied.
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether a new operation can begin this cycle.
    #[must_use]
    pub fn has_free_slot(&self) -> bool {
        self.in_flight.len() < self.parallelism
    }

    /// Begins executing `op_id` for `latency` cycles (latency 0 or 1 both
    /// complete on the next tick, matching a single-cycle functional unit),
    /// issued on `cycle`. Returns the slot index assigned (the lowest index
    /// not already held by another in-flight operation), or `None` without
    /// effect if every slot is occupied.
    pub fn begin(&mut self, op_id: u64, latency: u32, payload: T, cycle: u64) -> Option<usize> {
        if !self.has_free_slot() {
            return None;
        }
        let slot = (0..self.parallelism).find(|s| !self.in_flight.iter().any(|e| e.slot == *s))?;
        self.in_flight.push(InFlight { op_id, slot, issued_cycle: cycle, remaining_cycles: latency.max(1), payload });
        Some(slot)
    }

    /// Advances every in-flight operation by one cycle and returns those
    /// that have just completed, as `(op_id, slot, issued_cycle, payload)`
    /// (their slot remains occupied until the caller also calls
    /// [`Self::retire`] once the result has been broadcast, so a full unit
    /// still reports itself as full on the completing cycle).
    pub fn tick(&mut self) -> Vec<(u64, usize, u64, T)>
    where
        T: Clone,
    {
        let mut completed = Vec::new();
        for entry in &mut self.in_flight {
            entry.remaining_cycles = entry.remaining_cycles.saturating_sub(1);
        }
        for entry in self.in_flight.iter().filter(|e| e.remaining_cycles == 0) {
            completed.push((entry.op_id, entry.slot, entry.issued_cycle, entry.payload.clone()));
        }
        completed
    }

    /// Frees the slot held by `op_id` once its result has been broadcast.
    pub fn retire(&mut self, op_id: u64) {
        self.in_flight.retain(|e| e.op_id != op_id);
    }

    /// Discards every in-flight operation with id strictly greater than
    /// `keep_op_id`, mirroring the ROB/RS flush behavior on recovery.
    pub fn flush_after(&mut self, keep_op_id: u64) {
        self.in_flight.retain(|e| e.op_id <= keep_op_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_cycle_latency_completes_on_first_tick() {
        let mut unit: LatencyUnit<u32> = LatencyUnit::new(1);
        unit.begin(0, 1, 42, 0);
        assert_eq!(unit.tick(), vec![(0, 0, 0, 42)]);
    }

    #[test]
    fn multi_cycle_latency_completes_only_after_enough_ticks() {
        let mut unit: LatencyUnit<u32> = LatencyUnit::new(1);
        unit.begin(0, 3, 42, 0);
        assert!(unit.tick().is_empty());
        assert!(unit.tick().is_empty());
        assert_eq!(unit.tick(), vec![(0, 0, 0, 42)]);
    }

    #[test]
    fn slot_stays_occupied_until_explicit_retire() {
        let mut unit: LatencyUnit<u32> = LatencyUnit::new(1);
        unit.begin(0, 1, 42, 0);
        unit.tick();
        assert!(!unit.has_free_slot());
        unit.retire(0);
        assert!(unit.has_free_slot());
    }

    #[test]
    fn pool_rejects_new_work_once_every_slot_is_busy() {
        let mut unit: LatencyUnit<u32> = LatencyUnit::new(1);
        assert!(unit.begin(0, 4, 1, 0).is_some());
        assert!(unit.begin(1, 4, 2, 0).is_none());
    }

    #[test]
    fn second_slot_is_assigned_the_next_free_index() {
        let mut unit: LatencyUnit<u32> = LatencyUnit::new(2);
        assert_eq!(unit.begin(0, 4, 1, 0), Some(0));
        assert_eq!(unit.begin(1, 4, 2, 0), Some(1));
        unit.retire(0);
        assert_eq!(unit.begin(2, 4, 3, 0), Some(0));
    }

    #[test]
    fn flush_after_discards_younger_in_flight_operations() {
        let mut unit: LatencyUnit<u32> = LatencyUnit::new(4);
        unit.begin(0, 4, 1, 0);
        unit.begin(1, 4, 2, 0);
        unit.flush_after(0);
        assert_eq!(unit.occupied(), 1);
    }
}
