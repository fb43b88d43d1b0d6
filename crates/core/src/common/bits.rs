//! Bit-field packing and extraction within a 32-bit word.
//!
//! Every instruction field (opcode, register indices, immediates, shift
//! amounts, jump addresses) is packed into specific bit ranges of a single
//! `u32`. This module is the one place that knows how to slice and splice
//! those ranges so the rest of the crate works in terms of named fields
//! instead of shifts and masks.

/// Extracts `width` bits starting at bit `shift` from `word` as an unsigned
/// value right-aligned in the result.
#[inline]
#[must_use]
pub fn extract(word: u32, shift: u32, width: u32) -> u32 {
    debug_assert!(width > 0 && width <= 32);
    let mask = mask_for_width(width);
    (word >> shift) & mask
}

/// Inserts `value`'s low `width` bits into `word` at bit `shift`, returning
/// the updated word. Bits outside the target field are left untouched.
#[inline]
#[must_use]
pub fn insert(word: u32, shift: u32, width: u32, value: u32) -> u32 {
    debug_assert!(width > 0 && width <= 32);
    let mask = mask_for_width(width);
    let cleared = word & !(mask << shift);
    cleared | ((value & mask) << shift)
}

/// Sign-extends the low `width` bits of `value` to a full `i32`.
#[inline]
#[must_use]
pub fn sign_extend(value: u32, width: u32) -> i32 {
    debug_assert!(width > 0 && width <= 32);
    if width == 32 {
        return value as i32;
    }
    let shift = 32 - width;
    ((value << shift) as i32) >> shift
}

/// Round-trip helper used by the bit-packer property tests: packs `value`'s
/// low `width` bits into a fresh word (field starting at bit 0), matching
/// the `to_u32`/`from_u32` pair described for the bit packer.
#[inline]
#[must_use]
pub fn to_u32(value: u32, width: u32) -> u32 {
    value & mask_for_width(width)
}

/// Inverse of [`to_u32`]: identity for the masked-off low `width` bits.
#[inline]
#[must_use]
pub fn from_u32(word: u32, width: u32) -> u32 {
    word & mask_for_width(width)
}

#[inline]
fn mask_for_width(width: u32) -> u32 {
    if width >= 32 {
        u32::MAX
    } else {
        (1u32 << width) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn extract_pulls_out_a_mid_word_field() {
        let word = 0b1111_0000_1010_0000_0000_0000_0000_0000u32;
        assert_eq!(extract(word, 27, 5), 0b11110);
    }

    #[test]
    fn insert_replaces_only_the_target_field() {
        let word = 0xFFFF_FFFFu32;
        let updated = insert(word, 8, 4, 0b0000);
        assert_eq!(updated, 0xFFFF_F0FFu32);
    }

    #[test]
    fn sign_extend_negative_16_bit_immediate() {
        assert_eq!(sign_extend(0xFFFF, 16), -1);
        assert_eq!(sign_extend(0x8000, 16), -32768);
        assert_eq!(sign_extend(0x7FFF, 16), 32767);
    }

    #[test]
    fn sign_extend_positive_stays_positive() {
        assert_eq!(sign_extend(0x0001, 16), 1);
    }

    proptest! {
        #[test]
        fn from_u32_is_identity_on_masked_bits(value in any::<u32>(), width in 1u32..=32) {
            let packed = to_u32(value, width);
            prop_assert_eq!(from_u32(packed, width), packed);
        }

        #[test]
        fn insert_then_extract_round_trips(word in any::<u32>(), shift in 0u32..28, value in any::<u32>()) {
            let width = 4u32;
            let updated = insert(word, shift, width, value);
            prop_assert_eq!(extract(updated, shift, width), value & mask_for_width(width));
        }
    }
}
