//! Floating-point unit: `fadd`/`fsub`/`fmul`/`fdiv` over IEEE-754 single
//! precision values carried as raw `u32` bit patterns through registers.

/// Executes a catalog floating-point mnemonic over two operands, each the
/// raw bit pattern of an `f32`, returning the raw bit pattern of the result.
///
/// # Panics
///
/// Panics if `mnemonic` isn't a recognized floating-point mnemonic.
#[must_use]
pub fn execute(mnemonic: &str, a_bits: u32, b_bits: u32) -> u32 {
    let a = f32::from_bits(a_bits);
    let b = f32::from_bits(b_bits);
    let result = match mnemonic {
        "fadd" => a + b,
        "fsub" => a - b,
        "fmul" => a * b,
        "fdiv" => a / b,
        other => unreachable!("not a floating-point mnemonic: {other}"),
    };
    result.to_bits()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fadd_adds_the_decoded_floats() {
        let result = execute("fadd", 1.5f32.to_bits(), 2.25f32.to_bits());
        assert_eq!(f32::from_bits(result), 3.75);
    }

    #[test]
    fn fsub_subtracts_the_decoded_floats() {
        let result = execute("fsub", 5.0f32.to_bits(), 2.0f32.to_bits());
        assert_eq!(f32::from_bits(result), 3.0);
    }

    #[test]
    fn fmul_multiplies_the_decoded_floats() {
        let result = execute("fmul", 2.0f32.to_bits(), 3.0f32.to_bits());
        assert_eq!(f32::from_bits(result), 6.0);
    }

    #[test]
    fn fdiv_by_zero_produces_infinity_not_a_panic() {
        let result = execute("fdiv", 1.0f32.to_bits(), 0.0f32.to_bits());
        assert!(f32::from_bits(result).is_infinite());
    }
}
