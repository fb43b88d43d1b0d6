//! Fetch stage: reads raw words from instruction memory, peeks at control
//! instructions to drive branch prediction, and hands fetched operations to
//! decode.

use crate::channel::BoundedChannel;
use crate::isa::catalog::{self, Category, EncodingType};
use crate::isa::encoding::{self, OperandForm};
use crate::memory::MemoryBank;
use crate::stats::GlobalStats;

use super::super::branch_predictor::BranchPredictor;
use super::super::operation::Operation;
use super::super::units::branch;

/// Fetches [`crate::isa::catalog::CATALOG`]-encoded words from instruction
/// memory and speculatively steers its own next address past control
/// instructions using the configured [`BranchPredictor`].
#[derive(Debug)]
pub struct Fetch {
    pc: u32,
    next_id: u64,
    width: usize,
    /// Set once the end-of-program sentinel is fetched; fetch stops
    /// producing further operations, but earlier ones still drain normally.
    pub stopped: bool,
    /// Set after fetching a conditional branch under a policy that never
    /// speculates (e.g. [`super::super::branch_predictor::Stall`]). Fetch
    /// produces no further operations until every op fetched so far has
    /// committed.
    stalled: bool,
}

impl Fetch {
    /// Creates a fetch stage starting at `start_pc`, issuing up to `width`
    /// words per cycle.
    #[must_use]
    pub fn new(start_pc: u32, width: usize) -> Self {
        Self { pc: start_pc, next_id: 0, width: width.max(1), stopped: false, stalled: false }
    }

    /// Current fetch-speculative program counter.
    #[must_use]
    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// The id the next fetched operation will receive, equivalently the
    /// total count of operations fetched since the last redirect.
    #[must_use]
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Redirects the fetch PC, e.g. on a misprediction recovery.
    pub fn redirect(&mut self, pc: u32, next_id: u64) {
        self.pc = pc;
        self.next_id = next_id;
        self.stopped = false;
        self.stalled = false;
    }

    /// Advances fetch by one cycle: reads up to `width` words, pushing a
    /// fetched [`Operation`] for each into `out`. Stops early if `out` has
    /// no free credit, the end-of-program sentinel is reached, or a
    /// conditional branch was just fetched under a never-speculate policy.
    /// In the latter case fetch produces nothing further until
    /// `completed_count` catches up with `fetched_count`, at which point it
    /// resumes from `committed_pc` (the architectural PC, now guaranteed
    /// correct since nothing is still in flight). Each word read this cycle
    /// records a `FE<lane>` stage event spanning the single cycle it was
    /// fetched in, `lane` being its position within this cycle's packet
    /// (0-indexed).
    pub fn tick(
        &mut self,
        instructions: &MemoryBank,
        predictor: &mut dyn BranchPredictor,
        out: &mut BoundedChannel<Operation>,
        stats: &mut GlobalStats,
        cycle: u64,
        committed_pc: u32,
    ) {
        if self.stalled {
            if stats.completed.len() as u64 != self.next_id {
                return;
            }
            self.stalled = false;
            self.pc = committed_pc;
        }

        for lane in 0..self.width {
            if self.stopped || self.stalled {
                return;
            }
            let word = instructions.read_u32(self.pc);
            if word == catalog::END_OF_PROGRAM_WORD {
                self.stopped = true;
                return;
            }
            let id = self.next_id;
            let mut op = Operation::fetched(id, self.pc, word);
            let next_pc = self.steer(word, predictor, &mut op);
            if out.try_add(op).is_err() {
                // No room downstream; roll back and retry next cycle.
                return;
            }
            stats.record_stage_event(id, format!("FE{lane}"), cycle, cycle);
            self.next_id += 1;
            if self.stalled {
                return;
            }
            self.pc = next_pc;
        }
    }

    fn steer(&mut self, word: u32, predictor: &mut dyn BranchPredictor, op: &mut Operation) -> u32 {
        let fall_through = self.pc.wrapping_add(4);
        let Some(instruction) = encoding::decode(word) else {
            return fall_through;
        };
        if instruction.info.category != Category::Control {
            return fall_through;
        }
        match instruction.info.encoding {
            EncodingType::J => {
                let OperandForm::J { address } = instruction.operands else { unreachable!() };
                let target = branch::jump_target(address);
                predictor.predict(self.pc, target, true);
                op.predicted_address = Some(target);
                target
            }
            EncodingType::I => {
                let OperandForm::I { immediate, .. } = instruction.operands else { unreachable!() };
                if predictor.needs_stall() {
                    self.stalled = true;
                    // No prediction attached: commit must not treat this as
                    // a misprediction once it resolves, either way.
                    return fall_through;
                }
                // Offsets are assembled relative to the instruction *after*
                // the branch (the standard PC+4-relative convention), not
                // the branch's own address.
                let target = fall_through.wrapping_add(branch::taken_offset(immediate) as u32);
                let taken = predictor.predict(self.pc, target, false);
                let predicted = if taken { target } else { fall_through };
                op.predicted_address = Some(predicted);
                predicted
            }
            EncodingType::R => fall_through,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::branch_predictor::{NeverTaken, Stall};
    use crate::isa::catalog;
    use crate::isa::encoding::{encode, Instruction};

    fn word_for(mnemonic: &str, operands: OperandForm) -> u32 {
        let info = catalog::lookup_by_mnemonic(mnemonic).expect("mnemonic in catalog");
        encode(&Instruction { info, operands })
    }

    #[test]
    fn fetch_stops_on_sentinel_word() {
        let mem = MemoryBank::filled(16, catalog::END_OF_PROGRAM_SENTINEL_BYTE);
        let mut fetch = Fetch::new(0, 1);
        let mut predictor = NeverTaken;
        let mut out = BoundedChannel::new(4);
        let mut stats = crate::stats::GlobalStats::new();
        fetch.tick(&mem, &mut predictor, &mut out, &mut stats, 1, 0);
        assert!(fetch.stopped);
        assert!(out.is_empty());
    }

    #[test]
    fn fetch_advances_pc_by_four_for_non_control_instructions() {
        let mut mem = MemoryBank::filled(16, catalog::END_OF_PROGRAM_SENTINEL_BYTE);
        let word = word_for("add", OperandForm::R { rd: 1, rs: 2, rt: 3, shamt: 0, funct: 0 });
        mem.write_u32(0, word);
        let mut fetch = Fetch::new(0, 1);
        let mut predictor = NeverTaken;
        let mut out = BoundedChannel::new(4);
        let mut stats = crate::stats::GlobalStats::new();
        fetch.tick(&mem, &mut predictor, &mut out, &mut stats, 1, 0);
        assert_eq!(fetch.pc(), 4);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn fetch_follows_unconditional_jump_target() {
        let mut mem = MemoryBank::filled(64, catalog::END_OF_PROGRAM_SENTINEL_BYTE);
        let word = word_for("j", OperandForm::J { address: 0x10 });
        mem.write_u32(0, word);
        let mut fetch = Fetch::new(0, 1);
        let mut predictor = NeverTaken;
        let mut out = BoundedChannel::new(4);
        let mut stats = crate::stats::GlobalStats::new();
        fetch.tick(&mem, &mut predictor, &mut out, &mut stats, 1, 0);
        assert_eq!(fetch.pc(), 0x40);
    }

    #[test]
    fn fetch_respects_downstream_channel_backpressure() {
        let mut mem = MemoryBank::filled(16, catalog::END_OF_PROGRAM_SENTINEL_BYTE);
        let word = word_for("add", OperandForm::R { rd: 1, rs: 2, rt: 3, shamt: 0, funct: 0 });
        mem.write_u32(0, word);
        mem.write_u32(4, word);
        let mut fetch = Fetch::new(0, 2);
        let mut predictor = NeverTaken;
        let mut out = BoundedChannel::new(1);
        let mut stats = crate::stats::GlobalStats::new();
        fetch.tick(&mem, &mut predictor, &mut out, &mut stats, 1, 0);
        assert_eq!(out.len(), 1);
        assert_eq!(fetch.pc(), 4);
    }

    #[test]
    fn redirect_resets_pc_id_and_stopped_flag() {
        let mem = MemoryBank::filled(16, catalog::END_OF_PROGRAM_SENTINEL_BYTE);
        let mut fetch = Fetch::new(0, 1);
        let mut predictor = NeverTaken;
        let mut out = BoundedChannel::new(4);
        let mut stats = crate::stats::GlobalStats::new();
        fetch.tick(&mem, &mut predictor, &mut out, &mut stats, 1, 0);
        assert!(fetch.stopped);
        fetch.redirect(0x20, 5);
        assert_eq!(fetch.pc(), 0x20);
        assert!(!fetch.stopped);
    }

    #[test]
    fn stall_policy_blocks_fetch_on_a_conditional_branch() {
        let mut mem = MemoryBank::filled(64, catalog::END_OF_PROGRAM_SENTINEL_BYTE);
        let branch = word_for("beq", OperandForm::I { rd: 1, rs: 2, immediate: 4 });
        let after = word_for("add", OperandForm::R { rd: 1, rs: 2, rt: 3, shamt: 0, funct: 0 });
        mem.write_u32(0, branch);
        mem.write_u32(4, after);
        let mut fetch = Fetch::new(0, 2);
        let mut predictor = Stall;
        let mut out = BoundedChannel::new(4);
        let mut stats = crate::stats::GlobalStats::new();

        fetch.tick(&mem, &mut predictor, &mut out, &mut stats, 1, 0);
        assert_eq!(out.len(), 1, "only the branch itself should be fetched this cycle");
        let fetched = out.iter().next().expect("the branch was fetched this cycle");
        assert!(fetched.predicted_address.is_none());

        fetch.tick(&mem, &mut predictor, &mut out, &mut stats, 2, 0);
        assert_eq!(out.len(), 1, "still stalled: the branch has not completed yet");

        stats.record_completion(0);
        fetch.tick(&mem, &mut predictor, &mut out, &mut stats, 3, 4);
        assert_eq!(out.len(), 2, "resumes from the architectural pc once the branch commits");
        assert_eq!(fetch.pc(), 8);
    }
}
