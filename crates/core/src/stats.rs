//! Global statistics: the processor orchestrator's own counters, plus the
//! per-operation stage timeline used to render the pipeline-occupancy
//! diagram.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::time::Instant;

/// A single stage occupancy event: which stage an operation was in, and for
/// which cycle range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageEvent {
    /// Short stage identifier, e.g. `FE0`, `DE1`, `AL0`, `BR0`, `WB0`. Most
    /// labels are lane/slot-indexed at runtime (`format!("AL{slot}")`), so
    /// this borrows a literal where possible and owns the string otherwise.
    pub stage_id: Cow<'static, str>,
    /// First cycle (inclusive) the operation occupied this stage.
    pub start_cycle: u64,
    /// Last cycle (inclusive) the operation occupied this stage.
    pub end_cycle: u64,
}

/// Global, run-wide statistics owned by the processor orchestrator.
#[derive(Debug, Clone)]
pub struct GlobalStats {
    start_time: Instant,
    /// Total cycles executed.
    pub cycles: u64,
    /// Total operations fetched.
    pub fetched_count: u64,
    /// Operation ids that have committed, in commit order.
    pub completed: Vec<u64>,
    /// Conditional branches resolved (type-I control instructions).
    pub conditional_branches: u64,
    /// Unconditional branches resolved (`j`).
    pub unconditional_branches: u64,
    /// Branches whose predicted address disagreed with the committed
    /// outcome.
    pub mispredicted_branches: u64,
    /// Per-operation stage occupancy timeline, keyed by operation id.
    pub timeline: BTreeMap<u64, Vec<StageEvent>>,
}

impl GlobalStats {
    /// Creates a fresh, zeroed statistics block.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            cycles: 0,
            fetched_count: 0,
            completed: Vec::new(),
            conditional_branches: 0,
            unconditional_branches: 0,
            mispredicted_branches: 0,
            timeline: BTreeMap::new(),
        }
    }

    /// Records that operation `op_id` occupied `stage_id` for
    /// `[start_cycle, end_cycle]`.
    pub fn record_stage_event(
        &mut self,
        op_id: u64,
        stage_id: impl Into<Cow<'static, str>>,
        start_cycle: u64,
        end_cycle: u64,
    ) {
        self.timeline.entry(op_id).or_default().push(StageEvent { stage_id: stage_id.into(), start_cycle, end_cycle });
    }

    /// Records a completed operation in commit order.
    pub fn record_completion(&mut self, op_id: u64) {
        self.completed.push(op_id);
    }

    /// Truncates statistics back to (but not including) `op_id`, used when a
    /// flush recovers from a misprediction: the timeline and completed list
    /// must not retain entries for operations the flush discarded.
    pub fn trim_to(&mut self, op_id: u64) {
        self.completed.retain(|&id| id < op_id);
        self.timeline.retain(|&id, _| id < op_id);
        self.fetched_count = self.fetched_count.min(op_id);
    }

    /// The fraction of fetched operations that have completed, guarding
    /// against division by zero before anything has been fetched.
    #[must_use]
    pub fn completion_ratio(&self) -> f64 {
        if self.fetched_count == 0 {
            return 0.0;
        }
        self.completed.len() as f64 / self.fetched_count as f64
    }

    /// Instructions committed per cycle, guarding against division by zero
    /// before the clock has ticked.
    #[must_use]
    pub fn instructions_per_cycle(&self) -> f64 {
        if self.cycles == 0 {
            return 0.0;
        }
        self.completed.len() as f64 / self.cycles as f64
    }

    /// Wall-clock time spent running the simulation (not simulated time —
    /// see `Clock::duration_ms` for that).
    #[must_use]
    pub fn elapsed_wall_time(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Renders a human-readable summary, the basis for the `output.log`
    /// artifact's statistics section.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "cycles={} fetched={} completed={} conditional={} unconditional={} mispredicted={} ipc={:.3}",
            self.cycles,
            self.fetched_count,
            self.completed.len(),
            self.conditional_branches,
            self.unconditional_branches,
            self.mispredicted_branches,
            self.instructions_per_cycle(),
        )
    }
}

impl Default for GlobalStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_ratio_is_zero_before_any_fetch() {
        let stats = GlobalStats::new();
        assert_eq!(stats.completion_ratio(), 0.0);
    }

    #[test]
    fn completion_ratio_reflects_completed_over_fetched() {
        let mut stats = GlobalStats::new();
        stats.fetched_count = 4;
        stats.record_completion(0);
        stats.record_completion(1);
        assert_eq!(stats.completion_ratio(), 0.5);
    }

    #[test]
    fn trim_to_drops_entries_at_or_after_the_flush_point() {
        let mut stats = GlobalStats::new();
        stats.fetched_count = 5;
        stats.record_completion(0);
        stats.record_completion(1);
        stats.record_completion(2);
        stats.record_stage_event(3, "FE0", 1, 1);
        stats.trim_to(2);
        assert_eq!(stats.completed, vec![0, 1]);
        assert!(!stats.timeline.contains_key(&3));
        assert_eq!(stats.fetched_count, 2);
    }

    #[test]
    fn instructions_per_cycle_guards_zero_cycles() {
        let stats = GlobalStats::new();
        assert_eq!(stats.instructions_per_cycle(), 0.0);
    }

    #[test]
    fn record_stage_event_appends_to_operations_timeline() {
        let mut stats = GlobalStats::new();
        stats.record_stage_event(7, "FE0", 1, 1);
        stats.record_stage_event(7, "DE0", 2, 2);
        assert_eq!(stats.timeline[&7].len(), 2);
    }
}
