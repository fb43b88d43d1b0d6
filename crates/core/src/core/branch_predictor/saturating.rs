//! Per-address saturating-counter predictors: 1-bit and 2-bit variants of
//! the same scheme, distinguished only by how many states the counter
//! saturates across.

use std::collections::HashMap;

use super::BranchPredictor;

/// A saturating counter predictor keyed by branch address. Each address
/// gets its own counter, initialized to the weakest not-taken state; it
/// moves one step toward "taken" on a taken outcome and one step toward
/// "not taken" otherwise, saturating at either end.
#[derive(Debug, Default)]
pub struct SaturatingCounterPredictor {
    max_state: u8,
    counters: HashMap<u32, u8>,
}

impl SaturatingCounterPredictor {
    /// The classic 1-bit counter: two states, flips on every misprediction.
    #[must_use]
    pub fn one_bit() -> Self {
        Self { max_state: 1, counters: HashMap::new() }
    }

    /// The classic 2-bit counter: four states, requires two consecutive
    /// disagreeing outcomes to flip the prediction.
    #[must_use]
    pub fn two_bit() -> Self {
        Self { max_state: 3, counters: HashMap::new() }
    }

    fn state_for(&mut self, address: u32) -> u8 {
        *self.counters.entry(address).or_insert(0)
    }

    fn taken_threshold(&self) -> u8 {
        self.max_state.div_ceil(2)
    }
}

impl BranchPredictor for SaturatingCounterPredictor {
    fn predict(&mut self, address: u32, _target: u32, is_unconditional: bool) -> bool {
        if is_unconditional {
            return true;
        }
        let threshold = self.taken_threshold();
        self.state_for(address) >= threshold
    }

    fn resolve(&mut self, address: u32, taken: bool) {
        let max_state = self.max_state;
        let state = self.counters.entry(address).or_insert(0);
        if taken {
            *state = (*state + 1).min(max_state);
        } else {
            *state = state.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_bit_flips_prediction_after_a_single_disagreement() {
        let mut p = SaturatingCounterPredictor::one_bit();
        assert!(!p.predict(0x10, 0x0, false));
        p.resolve(0x10, true);
        assert!(p.predict(0x10, 0x0, false));
        p.resolve(0x10, false);
        assert!(!p.predict(0x10, 0x0, false));
    }

    #[test]
    fn two_bit_requires_two_consecutive_outcomes_to_flip() {
        let mut p = SaturatingCounterPredictor::two_bit();
        assert!(!p.predict(0x10, 0x0, false));
        p.resolve(0x10, true);
        assert!(!p.predict(0x10, 0x0, false));
        p.resolve(0x10, true);
        assert!(p.predict(0x10, 0x0, false));
    }

    #[test]
    fn counters_saturate_instead_of_overflowing() {
        let mut p = SaturatingCounterPredictor::two_bit();
        for _ in 0..10 {
            p.resolve(0x10, true);
        }
        assert!(p.predict(0x10, 0x0, false));
        for _ in 0..10 {
            p.resolve(0x10, false);
        }
        assert!(!p.predict(0x10, 0x0, false));
    }

    #[test]
    fn counters_are_independent_per_address() {
        let mut p = SaturatingCounterPredictor::two_bit();
        p.resolve(0x10, true);
        p.resolve(0x10, true);
        assert!(p.predict(0x10, 0x0, false));
        assert!(!p.predict(0x20, 0x0, false));
    }

    #[test]
    fn unconditional_branches_are_always_predicted_taken() {
        let mut p = SaturatingCounterPredictor::one_bit();
        assert!(p.predict(0x10, 0x0, true));
    }
}
