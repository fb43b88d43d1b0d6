//! The instruction-set catalog: the single source of truth mapping an
//! opcode to its mnemonic, category, encoding type, and latency.
//!
//! The assembler and the decoder both consult this table rather than each
//! hand-deriving a notion of "what shape is this instruction" — that
//! consistency is the whole point of having one catalog instead of two.

/// Which functional-unit category an instruction belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Integer ALU operations.
    Arithmetic,
    /// Floating-point ALU operations.
    FloatingPoint,
    /// Memory loads and stores.
    LoadStore,
    /// Conditional and unconditional control transfer.
    Control,
}

/// Which of the three 32-bit layouts an instruction uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingType {
    /// `opcode[31:26] Rd[25:21] Rs[20:16] Rt[15:11] Shamt[10:6] Funct[5:0]`
    R,
    /// `opcode[31:26] Rd[25:21] Rs[20:16] Immediate[15:0]`
    I,
    /// `opcode[31:26] Address[25:0]`
    J,
}

/// One row of the instruction-set catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionInfo {
    /// The 6-bit opcode value.
    pub opcode: u32,
    /// The assembler mnemonic, lowercase, as it appears in source.
    pub mnemonic: &'static str,
    /// Functional-unit category.
    pub category: Category,
    /// Bit layout of the 32-bit word.
    pub encoding: EncodingType,
    /// Cycles the owning functional unit spends executing this instruction.
    pub latency: u32,
}

macro_rules! row {
    ($opcode:expr, $mnemonic:expr, $category:ident, $encoding:ident, $latency:expr) => {
        InstructionInfo {
            opcode: $opcode,
            mnemonic: $mnemonic,
            category: Category::$category,
            encoding: EncodingType::$encoding,
            latency: $latency,
        }
    };
}

/// The full catalog, ordered by opcode within each range for readability;
/// lookup does not depend on this ordering.
pub const CATALOG: &[InstructionInfo] = &[
    // Arithmetic: 0x00-0x10
    row!(0x00, "add", Arithmetic, R, 2),
    row!(0x01, "addu", Arithmetic, R, 2),
    row!(0x02, "addi", Arithmetic, I, 2),
    row!(0x03, "addiu", Arithmetic, I, 2),
    row!(0x04, "sub", Arithmetic, R, 2),
    row!(0x05, "subi", Arithmetic, I, 2),
    row!(0x06, "subu", Arithmetic, R, 2),
    row!(0x07, "mul", Arithmetic, R, 4),
    row!(0x08, "shl", Arithmetic, R, 2),
    row!(0x09, "shli", Arithmetic, I, 2),
    row!(0x0A, "shr", Arithmetic, R, 2),
    row!(0x0B, "shri", Arithmetic, I, 2),
    row!(0x0C, "and", Arithmetic, R, 2),
    row!(0x0D, "andi", Arithmetic, I, 2),
    row!(0x0E, "or", Arithmetic, R, 2),
    row!(0x0F, "ori", Arithmetic, I, 2),
    row!(0x10, "cmp", Arithmetic, R, 2),
    // FloatingPoint: 0x12-0x15
    row!(0x12, "fadd", FloatingPoint, R, 8),
    row!(0x13, "fsub", FloatingPoint, R, 8),
    row!(0x14, "fmul", FloatingPoint, R, 8),
    row!(0x15, "fdiv", FloatingPoint, R, 8),
    // LoadStore: 0x20-0x25
    row!(0x20, "lw", LoadStore, I, 1),
    row!(0x21, "sw", LoadStore, I, 1),
    row!(0x22, "lli", LoadStore, I, 1),
    row!(0x23, "sli", LoadStore, I, 1),
    row!(0x24, "lui", LoadStore, I, 1),
    row!(0x25, "sui", LoadStore, I, 1),
    // Control: 0x30-0x34
    row!(0x30, "beq", Control, I, 1),
    row!(0x31, "bne", Control, I, 1),
    row!(0x32, "blt", Control, I, 1),
    row!(0x33, "bgt", Control, I, 1),
    row!(0x34, "j", Control, J, 1),
];

/// Byte value that marks the end of the program in instruction memory; a
/// fetched word equal to this sentinel repeated across all four bytes
/// terminates fetching without being treated as an error.
pub const END_OF_PROGRAM_SENTINEL_BYTE: u8 = 0x77;

/// A fetched word made entirely of the sentinel byte, i.e. what an
/// untouched, sentinel-filled region of instruction memory decodes to.
pub const END_OF_PROGRAM_WORD: u32 = u32::from_be_bytes([
    END_OF_PROGRAM_SENTINEL_BYTE,
    END_OF_PROGRAM_SENTINEL_BYTE,
    END_OF_PROGRAM_SENTINEL_BYTE,
    END_OF_PROGRAM_SENTINEL_BYTE,
]);

/// Looks up catalog info by opcode.
#[must_use]
pub fn lookup_by_opcode(opcode: u32) -> Option<&'static InstructionInfo> {
    CATALOG.iter().find(|row| row.opcode == opcode)
}

/// Looks up catalog info by mnemonic (case-sensitive, lowercase as written).
#[must_use]
pub fn lookup_by_mnemonic(mnemonic: &str) -> Option<&'static InstructionInfo> {
    CATALOG.iter().find(|row| row.mnemonic == mnemonic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mnemonic_is_unique() {
        let mut seen = std::collections::HashSet::new();
        for row in CATALOG {
            assert!(seen.insert(row.mnemonic), "duplicate mnemonic {}", row.mnemonic);
        }
    }

    #[test]
    fn every_opcode_is_unique() {
        let mut seen = std::collections::HashSet::new();
        for row in CATALOG {
            assert!(seen.insert(row.opcode), "duplicate opcode {:#x}", row.opcode);
        }
    }

    #[test]
    fn lookup_by_opcode_finds_add() {
        let info = lookup_by_opcode(0x00).expect("add should be in the catalog");
        assert_eq!(info.mnemonic, "add");
        assert_eq!(info.category, Category::Arithmetic);
    }

    #[test]
    fn lookup_by_mnemonic_finds_jump() {
        let info = lookup_by_mnemonic("j").expect("j should be in the catalog");
        assert_eq!(info.encoding, EncodingType::J);
        assert_eq!(info.category, Category::Control);
    }

    #[test]
    fn unknown_opcode_is_none() {
        assert!(lookup_by_opcode(0xFF).is_none());
    }

    #[test]
    fn end_of_program_word_is_four_sentinel_bytes() {
        assert_eq!(END_OF_PROGRAM_WORD, 0x7777_7777);
    }
}
