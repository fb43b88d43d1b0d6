//! 32-bit instruction encoding: the R/I/J bit layouts and the decoded
//! instruction representation that flows through the pipeline.

use crate::common::bits;
use crate::isa::catalog::{self, EncodingType, InstructionInfo};

/// Number of architectural registers. Register 0 doubles as the status
/// register written by the ALU (parity/zero/sign/overflow flags).
pub const REGISTER_COUNT: usize = 32;

const OPCODE_SHIFT: u32 = 26;
const OPCODE_WIDTH: u32 = 6;
const RD_SHIFT: u32 = 21;
const RD_WIDTH: u32 = 5;
const RS_SHIFT: u32 = 16;
const RS_WIDTH: u32 = 5;
const RT_SHIFT: u32 = 11;
const RT_WIDTH: u32 = 5;
const SHAMT_SHIFT: u32 = 6;
const SHAMT_WIDTH: u32 = 5;
const FUNCT_SHIFT: u32 = 0;
const FUNCT_WIDTH: u32 = 6;
const IMMEDIATE_SHIFT: u32 = 0;
const IMMEDIATE_WIDTH: u32 = 16;
const ADDRESS_SHIFT: u32 = 0;
const ADDRESS_WIDTH: u32 = 26;

/// The decoded operand fields, one variant per encoding shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandForm {
    /// `Rd, Rs, Rt` three-register form plus an unused shift amount/funct,
    /// reserved for instructions the catalog may later distinguish by funct.
    R {
        /// Destination register index.
        rd: u32,
        /// First source register index.
        rs: u32,
        /// Second source register index.
        rt: u32,
        /// Shift amount (only meaningful for shift instructions).
        shamt: u32,
        /// Function sub-code (unused by the current catalog, reserved).
        funct: u32,
    },
    /// `Rd, Rs, Immediate` form: arithmetic-immediate, load/store base +
    /// offset, and conditional branch offset.
    I {
        /// Destination register index (or, for stores/branches, the value
        /// register being stored/compared).
        rd: u32,
        /// Source/base register index.
        rs: u32,
        /// Raw 16-bit immediate field, as encoded (not yet sign-extended).
        immediate: u16,
    },
    /// `Address` form: the unconditional jump target.
    J {
        /// Raw 26-bit word address field.
        address: u32,
    },
}

/// A fully decoded instruction: catalog metadata plus its operand fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// Catalog row describing this instruction's shape and timing.
    pub info: &'static InstructionInfo,
    /// The decoded operand fields.
    pub operands: OperandForm,
}

/// Decodes a raw 32-bit word into an [`Instruction`].
///
/// Returns `None` if the top 6 bits don't match any catalog opcode; the
/// caller (the decode stage) turns that into a `SimError::Decode`.
#[must_use]
pub fn decode(word: u32) -> Option<Instruction> {
    let opcode = bits::extract(word, OPCODE_SHIFT, OPCODE_WIDTH);
    let info = catalog::lookup_by_opcode(opcode)?;
    let operands = match info.encoding {
        EncodingType::R => OperandForm::R {
            rd: bits::extract(word, RD_SHIFT, RD_WIDTH),
            rs: bits::extract(word, RS_SHIFT, RS_WIDTH),
            rt: bits::extract(word, RT_SHIFT, RT_WIDTH),
            shamt: bits::extract(word, SHAMT_SHIFT, SHAMT_WIDTH),
            funct: bits::extract(word, FUNCT_SHIFT, FUNCT_WIDTH),
        },
        EncodingType::I => OperandForm::I {
            rd: bits::extract(word, RD_SHIFT, RD_WIDTH),
            rs: bits::extract(word, RS_SHIFT, RS_WIDTH),
            immediate: bits::extract(word, IMMEDIATE_SHIFT, IMMEDIATE_WIDTH) as u16,
        },
        EncodingType::J => OperandForm::J {
            address: bits::extract(word, ADDRESS_SHIFT, ADDRESS_WIDTH),
        },
    };
    Some(Instruction { info, operands })
}

/// Encodes an [`Instruction`] back into its raw 32-bit word. Used by the
/// assembler and by the round-trip property tests.
#[must_use]
pub fn encode(instruction: &Instruction) -> u32 {
    let mut word = bits::insert(0, OPCODE_SHIFT, OPCODE_WIDTH, instruction.info.opcode);
    word = match instruction.operands {
        OperandForm::R { rd, rs, rt, shamt, funct } => {
            let w = bits::insert(word, RD_SHIFT, RD_WIDTH, rd);
            let w = bits::insert(w, RS_SHIFT, RS_WIDTH, rs);
            let w = bits::insert(w, RT_SHIFT, RT_WIDTH, rt);
            let w = bits::insert(w, SHAMT_SHIFT, SHAMT_WIDTH, shamt);
            bits::insert(w, FUNCT_SHIFT, FUNCT_WIDTH, funct)
        }
        OperandForm::I { rd, rs, immediate } => {
            let w = bits::insert(word, RD_SHIFT, RD_WIDTH, rd);
            let w = bits::insert(w, RS_SHIFT, RS_WIDTH, rs);
            bits::insert(w, IMMEDIATE_SHIFT, IMMEDIATE_WIDTH, u32::from(immediate))
        }
        OperandForm::J { address } => bits::insert(word, ADDRESS_SHIFT, ADDRESS_WIDTH, address),
    };
    word
}

/// Sign-extends a type-I immediate (a branch offset in words) to a byte
/// offset: sign-extend to 32 bits then left-shift by 2, per the external
/// encoding rules for conditional branches.
#[must_use]
pub fn branch_byte_offset(immediate: u16) -> i32 {
    bits::sign_extend(u32::from(immediate), IMMEDIATE_WIDTH) << 2
}

/// Converts a type-J 26-bit word address field into a byte address: left
/// shift by 2 (words -> bytes). Jump targets are absolute, not relative.
#[must_use]
pub fn jump_byte_address(address: u32) -> u32 {
    (address & ((1 << ADDRESS_WIDTH) - 1)) << 2
}
