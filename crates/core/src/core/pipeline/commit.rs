//! Commit stage: retires reorder-buffer entries in order, applies their
//! effect to architectural state, and detects branch mispredictions.
//!
//! Every committed entry's kind-specific effect is applied, then the PC is
//! unconditionally advanced by 4. `j`'s entry stores `target - 4` because
//! [`CommittedBus::set_pc`] assigns the PC outright, so the stored value
//! must cancel the blanket `+4` itself. A taken conditional branch's entry
//! stores its raw taken offset: [`CommittedBus::increment_pc`] adds onto
//! the PC the branch left un-advanced, and the blanket `+4` already
//! supplies the "instruction after the branch" base the offset is relative
//! to, so no pre-compensation is needed there.

use std::collections::HashMap;

use super::super::branch_predictor::BranchPredictor;
use super::super::operation::Operation;
use super::super::rat::Rat;
use super::super::rob::{CommittedBus, PcSemantic, Rob, RobKind};
use crate::memory::MemoryBank;
use crate::registers::RegisterFile;
use crate::stats::GlobalStats;

/// What the processor must do to recover from a misprediction detected
/// while committing: redirect fetch and discard every younger operation.
#[derive(Debug, Clone, Copy)]
pub struct Recovery {
    /// The correct next fetch address.
    pub pc: u32,
    /// The operation id the recovered pipeline should resume numbering at.
    pub next_op_id: u64,
}

/// Retires up to `width` reorder-buffer entries per cycle, in order.
#[derive(Debug, Default)]
pub struct Commit {
    width: usize,
}

impl Commit {
    /// Creates a committer that retires up to `width` operations per cycle.
    #[must_use]
    pub fn new(width: usize) -> Self {
        Self { width: width.max(1) }
    }

    /// Advances commit by one cycle. Returns [`Recovery`] the moment a
    /// committed branch's actual outcome disagrees with what fetch
    /// predicted; the caller must stop calling `tick` again this cycle and
    /// flush every younger operation before resuming.
    #[allow(clippy::too_many_arguments)]
    pub fn tick(
        &mut self,
        rob: &mut Rob,
        rat: &mut Rat,
        registers: &mut RegisterFile,
        data: &mut MemoryBank,
        pc: &mut u32,
        pending_status: &mut HashMap<u64, u32>,
        in_flight: &mut HashMap<u64, Operation>,
        predictor: &mut dyn BranchPredictor,
        stats: &mut GlobalStats,
        cycle: u64,
    ) -> Option<Recovery> {
        for lane in 0..self.width {
            let Some(entry) = rob.commit_next(cycle) else { return None };
            let op_id = entry.op_id;
            let operation = in_flight.remove(&op_id);

            {
                let mut bus = CommittedBus { registers, data, pc };
                match entry.kind {
                    RobKind::Register(r) => bus.store_register(op_id, r, entry.value, cycle),
                    RobKind::Memory => bus.store_data(op_id, entry.address, entry.value, cycle),
                    RobKind::ProgramCounter(PcSemantic::Absolute) => bus.set_pc(op_id, entry.value, cycle),
                    RobKind::ProgramCounter(PcSemantic::Offset) => {
                        bus.increment_pc(op_id, entry.value as i32, cycle);
                    }
                }
                if let Some(status) = pending_status.remove(&op_id) {
                    bus.store_register(op_id, 0, status, cycle);
                }
            }
            *pc = pc.wrapping_add(4);
            rat.release(op_id);
            stats.record_completion(op_id);
            stats.record_stage_event(op_id, format!("WB{lane}"), cycle, cycle);

            if let RobKind::ProgramCounter(semantic) = entry.kind {
                let taken = operation.as_ref().and_then(|op| op.branch_taken).unwrap_or(false);
                let predicted = operation.as_ref().and_then(|op| op.predicted_address);
                let branch_address = operation.as_ref().map_or(*pc, |op| op.address);
                predictor.resolve(branch_address, taken);
                match semantic {
                    PcSemantic::Absolute => stats.unconditional_branches += 1,
                    PcSemantic::Offset => stats.conditional_branches += 1,
                }
                // `predicted` is `None` only for a conditional branch fetched
                // under a policy that never speculates (Stall); fetch
                // already blocked until this branch resolved, so there is
                // nothing to recover from.
                if let Some(predicted) = predicted {
                    if predicted != *pc {
                        stats.mispredicted_branches += 1;
                        return Some(Recovery { pc: *pc, next_op_id: op_id + 1 });
                    }
                }
            }
        }
        None
    }
}
