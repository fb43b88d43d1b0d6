//! Execute stage: one [`LatencyUnit`] pool per functional-unit category,
//! fed from the reservation station and writing back through the
//! speculative [`RobBus`].
//!
//! A completed arithmetic operation also updates the status register
//! (register 0), but the reorder buffer holds one entry per operation id, so
//! that update can't live in the same entry as the destination register
//! write. It is instead carried out-of-band in `pending_status` and applied
//! by the commit stage alongside the primary write — still only ever
//! touching architectural state at commit, just not through the ROB.

use std::collections::HashMap;

use crate::common::bits;
use crate::isa::catalog::Category;
use crate::isa::encoding::{Instruction, OperandForm};
use crate::memory::MemoryBank;
use crate::registers::RegisterFile;
use crate::stats::GlobalStats;

use super::super::operation::Operation;
use super::super::rob::{Rob, RobBus, RobKind};
use super::super::rs::Rs;
use super::super::units::{alu, branch, fpu, lsu, LatencyUnit};

/// The pipeline-diagram label prefix for a functional-unit category, e.g.
/// `AL0` for ALU slot 0. Matches the `FE`/`DE`/`WB` convention fetch, decode,
/// and commit use for their own lanes.
fn category_prefix(category: Category) -> &'static str {
    match category {
        Category::Arithmetic => "AL",
        Category::FloatingPoint => "FP",
        Category::LoadStore => "LS",
        Category::Control => "BR",
    }
}

/// The operand pair (plus shift amount, for arithmetic) an execute helper
/// needs, independent of whether the source instruction was R- or I-type.
fn arithmetic_operands(instruction: &Instruction, values: &[u32]) -> (u32, u32, u32) {
    match instruction.operands {
        OperandForm::R { shamt, .. } => (values[0], values[1], shamt),
        OperandForm::I { immediate, .. } => {
            let imm = u32::from(immediate);
            match instruction.info.mnemonic {
                "shli" | "shri" => (values[0], 0, imm & 0x1F),
                "addi" | "subi" => (values[0], bits::sign_extend(imm, 16) as u32, 0),
                _ => (values[0], imm, 0),
            }
        }
        OperandForm::J { .. } => unreachable!("arithmetic instructions are never J-type"),
    }
}

fn destination_register(rob: &Rob, op_id: u64) -> u32 {
    match rob.entry(op_id).map(|e| e.kind) {
        Some(RobKind::Register(r)) => r,
        other => unreachable!("expected a register destination, found {other:?}"),
    }
}

/// Issues every ready entry of `category` into `pool`'s free slots.
/// `rs.issue` enforces one issue-rate cap shared across all four categories
/// (see [`Rs::set_dispatch_limit`]), so once that cap is spent for this
/// cycle's window every remaining ready entry, in any category, is left in
/// the station to retry once it resets.
fn issue_ready(
    rs: &mut Rs,
    pool: &mut LatencyUnit<Vec<u32>>,
    latencies: &HashMap<u64, u32>,
    category: Category,
    ready: &[u64],
    cycle: u64,
) {
    for &op_id in ready {
        let Some(entry_category) = rs.entry(op_id).map(|e| e.category) else { continue };
        if entry_category != category {
            continue;
        }
        if !pool.has_free_slot() {
            break;
        }
        let Some(entry) = rs.issue(op_id, cycle) else { break };
        let latency = latencies.get(&op_id).copied().unwrap_or(1);
        pool.begin(op_id, latency, entry.values(), cycle);
    }
}

/// The four functional-unit pools and their completion/issue logic.
#[derive(Debug)]
pub struct Execute {
    alu: LatencyUnit<Vec<u32>>,
    fpu: LatencyUnit<Vec<u32>>,
    load_store: LatencyUnit<Vec<u32>>,
    branch: LatencyUnit<Vec<u32>>,
}

impl Execute {
    /// Creates an execute stage with the configured parallel unit counts.
    #[must_use]
    pub fn new(alu_units: usize, fpu_units: usize, load_store_units: usize, branch_units: usize) -> Self {
        Self {
            alu: LatencyUnit::new(alu_units),
            fpu: LatencyUnit::new(fpu_units),
            load_store: LatencyUnit::new(load_store_units),
            branch: LatencyUnit::new(branch_units),
        }
    }

    /// Advances execute by one cycle: completes in-flight work (writing
    /// back through the ROB and broadcasting on the CDB), then issues newly
    /// ready reservation-station entries into the slots that just freed.
    #[allow(clippy::too_many_arguments)]
    pub fn tick(
        &mut self,
        rs: &mut Rs,
        rob: &mut Rob,
        registers: &RegisterFile,
        data: &MemoryBank,
        in_flight: &mut HashMap<u64, Operation>,
        pending_status: &mut HashMap<u64, u32>,
        stats: &mut GlobalStats,
        cycle: u64,
    ) {
        self.complete_alu(rs, rob, registers, data, in_flight, pending_status, stats, cycle);
        self.complete_fpu(rs, rob, registers, data, in_flight, stats, cycle);
        self.complete_load_store(rs, rob, registers, data, in_flight, stats, cycle);
        self.complete_branch(rob, registers, data, in_flight, stats, cycle);

        let ready = rs.ready_ids();
        let latencies: HashMap<u64, u32> =
            in_flight.iter().filter_map(|(&id, op)| op.decoded.map(|d| (id, d.info.latency))).collect();
        issue_ready(rs, &mut self.alu, &latencies, Category::Arithmetic, &ready, cycle);
        issue_ready(rs, &mut self.fpu, &latencies, Category::FloatingPoint, &ready, cycle);
        issue_ready(rs, &mut self.load_store, &latencies, Category::LoadStore, &ready, cycle);
        issue_ready(rs, &mut self.branch, &latencies, Category::Control, &ready, cycle);
    }

    #[allow(clippy::too_many_arguments)]
    fn complete_alu(
        &mut self,
        rs: &mut Rs,
        rob: &mut Rob,
        registers: &RegisterFile,
        data: &MemoryBank,
        in_flight: &HashMap<u64, Operation>,
        pending_status: &mut HashMap<u64, u32>,
        stats: &mut GlobalStats,
        cycle: u64,
    ) {
        for (op_id, slot, issued_cycle, values) in self.alu.tick() {
            if let Some(instruction) = in_flight.get(&op_id).and_then(|op| op.decoded.as_ref()) {
                let (a, b, shamt) = arithmetic_operands(instruction, &values);
                let result = alu::execute(instruction.info.mnemonic, a, b, shamt);
                let dest = destination_register(rob, op_id);
                RobBus::new(rob, registers, data).store_register(op_id, dest, result.value, cycle);
                rs.broadcast(op_id, result.value);
                pending_status.insert(op_id, result.status);
                stats.record_stage_event(op_id, format!("{}{slot}", category_prefix(Category::Arithmetic)), issued_cycle, cycle);
            }
            self.alu.retire(op_id);
        }
    }

    fn complete_fpu(
        &mut self,
        rs: &mut Rs,
        rob: &mut Rob,
        registers: &RegisterFile,
        data: &MemoryBank,
        in_flight: &HashMap<u64, Operation>,
        stats: &mut GlobalStats,
        cycle: u64,
    ) {
        for (op_id, slot, issued_cycle, values) in self.fpu.tick() {
            if let Some(instruction) = in_flight.get(&op_id).and_then(|op| op.decoded.as_ref()) {
                let value = fpu::execute(instruction.info.mnemonic, values[0], values[1]);
                let dest = destination_register(rob, op_id);
                RobBus::new(rob, registers, data).store_register(op_id, dest, value, cycle);
                rs.broadcast(op_id, value);
                stats.record_stage_event(op_id, format!("{}{slot}", category_prefix(Category::FloatingPoint)), issued_cycle, cycle);
            }
            self.fpu.retire(op_id);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn complete_load_store(
        &mut self,
        rs: &mut Rs,
        rob: &mut Rob,
        registers: &RegisterFile,
        data: &MemoryBank,
        in_flight: &HashMap<u64, Operation>,
        stats: &mut GlobalStats,
        cycle: u64,
    ) {
        for (op_id, slot, issued_cycle, values) in self.load_store.tick() {
            if let Some(instruction) = in_flight.get(&op_id).and_then(|op| op.decoded.as_ref()) {
                let OperandForm::I { immediate, .. } = instruction.operands else {
                    unreachable!("load/store instructions are always I-type")
                };
                let mnemonic = instruction.info.mnemonic;
                stats.record_stage_event(op_id, format!("{}{slot}", category_prefix(Category::LoadStore)), issued_cycle, cycle);
                match mnemonic {
                    "lw" => {
                        let addr = lsu::effective_address(values[0], immediate);
                        let dest = destination_register(rob, op_id);
                        let mut bus = RobBus::new(rob, registers, data);
                        let value = bus.load_data(op_id, addr);
                        bus.store_register(op_id, dest, value, cycle);
                        rs.broadcast(op_id, value);
                    }
                    "sw" => {
                        let addr = lsu::effective_address(values[1], immediate);
                        RobBus::new(rob, registers, data).store_data(op_id, addr, values[0], cycle);
                    }
                    "lli" | "lui" => {
                        let dest = destination_register(rob, op_id);
                        let value = lsu::merge_immediate(mnemonic, values[0], immediate);
                        RobBus::new(rob, registers, data).store_register(op_id, dest, value, cycle);
                        rs.broadcast(op_id, value);
                    }
                    "sli" | "sui" => {
                        // Address is Rd's value directly (no offset); the
                        // merged-in value is this instruction's own
                        // immediate, the memory-side counterpart of lli/lui.
                        let addr = values[0];
                        let mut bus = RobBus::new(rob, registers, data);
                        let existing = bus.load_data(op_id, addr);
                        let merged = lsu::merge_store(mnemonic, existing, u32::from(immediate));
                        bus.store_data(op_id, addr, merged, cycle);
                    }
                    other => unreachable!("unrecognized load/store mnemonic: {other}"),
                }
            }
            self.load_store.retire(op_id);
        }
    }

    fn complete_branch(
        &mut self,
        rob: &mut Rob,
        registers: &RegisterFile,
        data: &MemoryBank,
        in_flight: &mut HashMap<u64, Operation>,
        stats: &mut GlobalStats,
        cycle: u64,
    ) {
        for (op_id, slot, issued_cycle, values) in self.branch.tick() {
            if let Some(instruction) = in_flight.get(&op_id).and_then(|op| op.decoded) {
                stats.record_stage_event(op_id, format!("{}{slot}", category_prefix(Category::Control)), issued_cycle, cycle);
                let mnemonic = instruction.info.mnemonic;
                let mut bus = RobBus::new(rob, registers, data);
                let taken = match instruction.operands {
                    OperandForm::I { immediate, .. } => {
                        let taken = branch::resolve(mnemonic, values[0], values[1]);
                        // The offset is relative to the instruction after
                        // the branch; commit's uniform +4 already supplies
                        // that "+4", so no pre-compensation is needed here
                        // (unlike `j`'s absolute target, which bypasses the
                        // running PC entirely and must cancel the +4 itself).
                        let offset = if taken { branch::taken_offset(immediate) } else { 0 };
                        bus.increment_pc(op_id, offset, cycle);
                        taken
                    }
                    OperandForm::J { address } => {
                        let target = branch::jump_target(address);
                        bus.set_pc(op_id, target.wrapping_sub(4), cycle);
                        true
                    }
                    OperandForm::R { .. } => unreachable!("control instructions are never R-type"),
                };
                if let Some(op) = in_flight.get_mut(&op_id) {
                    op.branch_taken = Some(taken);
                }
            }
            self.branch.retire(op_id);
        }
    }

    /// Discards every in-flight operation with id strictly greater than
    /// `keep_op_id` across all four pools, mirroring the ROB/RS/RAT flush
    /// behavior on recovery.
    pub fn flush_after(&mut self, keep_op_id: u64) {
        self.alu.flush_after(keep_op_id);
        self.fpu.flush_after(keep_op_id);
        self.load_store.flush_after(keep_op_id);
        self.branch.flush_after(keep_op_id);
    }

    /// Whether every functional-unit pool is empty.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.alu.occupied() == 0 && self.fpu.occupied() == 0 && self.load_store.occupied() == 0 && self.branch.occupied() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::catalog;
    use crate::isa::encoding::{decode, encode, Instruction};

    fn make_op(id: u64, mnemonic: &str, operands: OperandForm) -> Operation {
        let info = catalog::lookup_by_mnemonic(mnemonic).expect("mnemonic in catalog");
        let raw = encode(&Instruction { info, operands });
        let mut op = Operation::fetched(id, id * 4, raw);
        op.decoded = Some(decode(raw).expect("decodes"));
        op
    }

    #[test]
    fn add_completes_and_broadcasts_the_sum() {
        let mut execute = Execute::new(1, 1, 1, 1);
        let mut rs = Rs::new(4);
        let mut rob = Rob::new(4, 0);
        let registers = RegisterFile::new();
        let data = MemoryBank::new(16);
        let mut in_flight = HashMap::new();
        let mut pending_status = HashMap::new();
        let mut stats = GlobalStats::new();

        rob.allocate(0, RobKind::Register(3));
        in_flight.insert(0, make_op(0, "add", OperandForm::R { rd: 3, rs: 1, rt: 2, shamt: 0, funct: 0 }));
        rs.insert(crate::core::rs::RsEntry {
            op_id: 0,
            category: Category::Arithmetic,
            operands: vec![crate::core::rs::Operand::Ready(2), crate::core::rs::Operand::Ready(3)],
        });

        execute.tick(&mut rs, &mut rob, &registers, &data, &mut in_flight, &mut pending_status, &mut stats, 1);
        assert!(execute.alu.occupied() == 1);
        execute.tick(&mut rs, &mut rob, &registers, &data, &mut in_flight, &mut pending_status, &mut stats, 2);

        let entry = rob.entry(0).expect("entry still live until commit");
        assert_eq!(entry.value, 5);
        assert!(entry.written_cycle.is_some());
        assert_eq!(pending_status.get(&0), Some(&alu::execute("add", 2, 3, 0).status));
        assert_eq!(stats.timeline[&0][0].stage_id.as_ref(), "AL0");
    }

    #[test]
    fn taken_conditional_branch_writes_an_offset_that_composes_with_the_blanket_increment() {
        let mut execute = Execute::new(1, 1, 1, 1);
        let mut rob = Rob::new(4, 0);
        let registers = RegisterFile::new();
        let data = MemoryBank::new(16);
        let mut in_flight = HashMap::new();

        rob.allocate(0, RobKind::ProgramCounter(crate::core::rob::PcSemantic::Offset));
        in_flight.insert(0, make_op(0, "beq", OperandForm::I { rd: 1, rs: 2, immediate: 2 }));
        execute.branch.begin(0, 1, vec![5, 5], 0);
        let mut stats = GlobalStats::new();

        execute.complete_branch(&mut rob, &registers, &data, &mut in_flight, &mut stats, 1);

        let entry = rob.entry(0).expect("entry still live");
        assert_eq!(entry.value as i32, 8);
        assert_eq!(in_flight.get(&0).and_then(|op| op.branch_taken), Some(true));
    }

    #[test]
    fn jump_writes_a_pre_compensated_absolute_target() {
        let mut execute = Execute::new(1, 1, 1, 1);
        let mut rob = Rob::new(4, 0);
        let registers = RegisterFile::new();
        let data = MemoryBank::new(16);
        let mut in_flight = HashMap::new();

        rob.allocate(0, RobKind::ProgramCounter(crate::core::rob::PcSemantic::Absolute));
        in_flight.insert(0, make_op(0, "j", OperandForm::J { address: 0x10 }));
        execute.branch.begin(0, 1, vec![], 0);
        let mut stats = GlobalStats::new();

        execute.complete_branch(&mut rob, &registers, &data, &mut in_flight, &mut stats, 1);

        let entry = rob.entry(0).expect("entry still live");
        assert_eq!(entry.value, 0x40 - 4);
    }
}
