//! Dispatch stage: allocates reorder-buffer and register-rename state for a
//! decoded operation, resolves its source operands against the in-flight
//! window, and hands it to the reservation station.
//!
//! Register 0 (the status register) is never renamed, per the bypass rule
//! in [`super::super::rat`]; a read of it is always satisfied from the
//! committed register file directly, never from an in-flight write. This
//! means a program that reads register 0 expecting to observe the
//! not-yet-committed status flags of an in-flight arithmetic instruction
//! will see the last committed value instead — the status register is
//! modeled as committed-only state, not a renamed one.

use std::collections::HashMap;

use crate::channel::BoundedChannel;
use crate::isa::catalog::Category;
use crate::isa::encoding::OperandForm;
use crate::registers::RegisterFile;
use crate::stats::GlobalStats;

use super::super::operation::Operation;
use super::super::rat::Rat;
use super::super::rob::{PcSemantic, Rob, RobKind};
use super::super::rs::{Operand, Rs, RsEntry};

/// Resolves operand `register` as seen by operation `consumer_id`: already
/// known, waiting on an in-flight producer, or read straight from committed
/// state.
fn resolve_operand(consumer_id: u64, register: u32, rat: &Rat, rob: &Rob, registers: &RegisterFile) -> Operand {
    if register == 0 {
        return Operand::Ready(registers.read(0));
    }
    if rat.is_enabled() {
        return match rat.resolve(consumer_id, register) {
            Some(producer) => match rob.entry(producer) {
                Some(entry) if entry.written_cycle.is_some() => Operand::Ready(entry.value),
                Some(entry) => Operand::Waiting(entry.op_id),
                None => Operand::Ready(registers.read(register)),
            },
            None => Operand::Ready(registers.read(register)),
        };
    }
    match rob.youngest_register_entry(consumer_id, register) {
        Some(entry) if entry.written_cycle.is_some() => Operand::Ready(entry.value),
        Some(entry) => Operand::Waiting(entry.op_id),
        None => Operand::Ready(registers.read(register)),
    }
}

/// The destination kind plus the ordered list of source registers to
/// resolve, for one decoded instruction.
struct Shape {
    kind: RobKind,
    /// Architectural register this operation renames, if it writes one.
    dest_register: Option<u32>,
    sources: Vec<u32>,
}

fn shape_for(instruction: &crate::isa::encoding::Instruction) -> Shape {
    let mnemonic = instruction.info.mnemonic;
    match instruction.info.category {
        Category::Arithmetic => {
            let (rd, sources) = match instruction.operands {
                OperandForm::R { rd, rs, rt, .. } => (rd, vec![rs, rt]),
                OperandForm::I { rd, rs, .. } => (rd, vec![rs]),
                OperandForm::J { .. } => unreachable!("arithmetic instructions are never J-type"),
            };
            Shape { kind: RobKind::Register(rd), dest_register: Some(rd), sources }
        }
        Category::FloatingPoint => {
            let OperandForm::R { rd, rs, rt, .. } = instruction.operands else {
                unreachable!("floating-point instructions are always R-type");
            };
            Shape { kind: RobKind::Register(rd), dest_register: Some(rd), sources: vec![rs, rt] }
        }
        Category::LoadStore => {
            let OperandForm::I { rd, rs, .. } = instruction.operands else {
                unreachable!("load/store instructions are always I-type");
            };
            match mnemonic {
                "lw" => Shape { kind: RobKind::Register(rd), dest_register: Some(rd), sources: vec![rs] },
                "sw" => Shape { kind: RobKind::Memory, dest_register: None, sources: vec![rd, rs] },
                "lli" | "lui" => {
                    Shape { kind: RobKind::Register(rd), dest_register: Some(rd), sources: vec![rd] }
                }
                // sli/sui address memory directly through Rd (no base+offset
                // composition); the value merged in is the instruction's own
                // immediate, not a second register, so only Rd is a source.
                "sli" | "sui" => Shape { kind: RobKind::Memory, dest_register: None, sources: vec![rd] },
                other => unreachable!("unrecognized load/store mnemonic: {other}"),
            }
        }
        Category::Control => match instruction.operands {
            OperandForm::I { rd, rs, .. } => {
                Shape { kind: RobKind::ProgramCounter(PcSemantic::Offset), dest_register: None, sources: vec![rd, rs] }
            }
            OperandForm::J { .. } => {
                Shape { kind: RobKind::ProgramCounter(PcSemantic::Absolute), dest_register: None, sources: vec![] }
            }
            OperandForm::R { .. } => unreachable!("control instructions are never R-type"),
        },
    }
}

/// Dispatches decoded operations: allocates ROB/RAT state and releases them
/// into the reservation station once room exists for both.
#[derive(Debug, Default)]
pub struct Dispatch {
    width: usize,
}

impl Dispatch {
    /// Creates a dispatcher that may release up to `width` operations per
    /// cycle.
    #[must_use]
    pub fn new(width: usize) -> Self {
        Self { width: width.max(1) }
    }

    /// Advances dispatch by one cycle. Each released operation records a
    /// `DI<lane>` stage event, `lane` being its position within this
    /// cycle's release batch (0-indexed).
    #[allow(clippy::too_many_arguments)]
    pub fn tick(
        &mut self,
        inbound: &mut BoundedChannel<Operation>,
        rs: &mut Rs,
        rob: &mut Rob,
        rat: &mut Rat,
        registers: &RegisterFile,
        in_flight: &mut HashMap<u64, Operation>,
        stats: &mut GlobalStats,
        cycle: u64,
    ) {
        for lane in 0..self.width {
            if rob.is_full() || rs.is_full() {
                return;
            }
            let Some(peeked) = inbound.iter().next() else { return };
            let Some(instruction) = peeked.decoded else {
                unreachable!("dispatch only sees decoded operations")
            };
            let shape = shape_for(&instruction);

            if let Some(dest) = shape.dest_register {
                // Register 0 is never renamed, so a RAT at capacity never
                // blocks an operation that only writes it.
                if dest != 0 && rat.is_enabled() && rat.len() >= rat.capacity() {
                    // No free rename slot: stall this lane rather than let
                    // the write dispatch unrenamed, which would leave later
                    // readers of `dest` observing stale committed state
                    // instead of waiting on this operation's result.
                    return;
                }
            }

            let Some(mut op) = inbound.try_take() else {
                unreachable!("the operation just peeked must still be at the front of the channel")
            };

            rob.allocate(op.id, shape.kind);
            let operands =
                shape.sources.iter().map(|&r| resolve_operand(op.id, r, rat, rob, registers)).collect::<Vec<_>>();
            if let Some(dest) = shape.dest_register {
                if rat.allocate(op.id, dest) {
                    op.renamed_dest = Some(dest);
                }
            }
            let category = instruction.info.category;
            let inserted = rs.insert(RsEntry { op_id: op.id, category, operands });
            debug_assert!(inserted, "reservation station room already checked above");

            stats.record_stage_event(op.id, format!("DI{lane}"), cycle, cycle);
            inbound.release();
            in_flight.insert(op.id, op);
        }
    }
}
