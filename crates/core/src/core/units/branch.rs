//! Control unit: branch condition resolution plus target computation.
//!
//! For `beq`/`bne`/`blt`/`bgt`, `a` is the value held in the instruction's
//! `rd` field and `b` the value in its `rs` field — the operand layout
//! shared with stores, where `rd` is "the other value" rather than a
//! destination. `j` carries no condition; it is always taken.

use crate::isa::encoding;

/// Resolves whether a conditional branch mnemonic is taken, comparing `a`
/// (the `rd` operand) against `b` (the `rs` operand) as signed 32-bit
/// values.
///
/// # Panics
///
/// Panics if `mnemonic` isn't a recognized conditional-branch mnemonic.
#[must_use]
pub fn resolve(mnemonic: &str, a: u32, b: u32) -> bool {
    let (a, b) = (a as i32, b as i32);
    match mnemonic {
        "beq" => a == b,
        "bne" => a != b,
        "blt" => a < b,
        "bgt" => a > b,
        other => unreachable!("not a conditional branch mnemonic: {other}"),
    }
}

/// The signed byte offset a taken conditional branch adds to the PC.
#[must_use]
pub fn taken_offset(immediate: u16) -> i32 {
    encoding::branch_byte_offset(immediate)
}

/// The absolute byte address `j` jumps to.
#[must_use]
pub fn jump_target(address_field: u32) -> u32 {
    encoding::jump_byte_address(address_field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beq_is_taken_on_equal_operands() {
        assert!(resolve("beq", 5, 5));
        assert!(!resolve("beq", 5, 6));
    }

    #[test]
    fn bne_is_taken_on_differing_operands() {
        assert!(resolve("bne", 5, 6));
        assert!(!resolve("bne", 5, 5));
    }

    #[test]
    fn blt_bgt_compare_as_signed_values() {
        assert!(resolve("blt", (-1i32) as u32, 0));
        assert!(!resolve("blt", 0, (-1i32) as u32));
        assert!(resolve("bgt", 0, (-1i32) as u32));
    }

    #[test]
    fn jump_target_is_word_shifted_and_absolute() {
        assert_eq!(jump_target(0x10), 0x40);
    }

    #[test]
    fn taken_offset_sign_extends_negative_immediates() {
        assert_eq!(taken_offset(0xFFFF), -4);
    }
}
