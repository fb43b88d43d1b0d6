//! Branch prediction: a trait plus the seven policies configurable via
//! [`crate::config::BranchPredictorType`].
//!
//! A predictor sees every control instruction at fetch time (address plus
//! the statically-known branch-taken target) and must say whether to follow
//! the target or fall through. [`BranchPredictor::resolve`] is called once
//! the branch actually executes, so counter-based policies can adapt.

mod saturating;
mod simple;

pub use saturating::SaturatingCounterPredictor;
pub use simple::{AlwaysTaken, BackwardTaken, ForwardTaken, NeverTaken, Stall};

use crate::config::BranchPredictorType;

/// A branch predictor: guesses whether a control instruction is taken, and
/// is told the true outcome once it resolves.
pub trait BranchPredictor: std::fmt::Debug {
    /// Predicts whether the control instruction fetched at `address`, whose
    /// statically-known branch-taken target is `target`, will be taken.
    /// `is_unconditional` is set for `j`, which is always taken.
    fn predict(&mut self, address: u32, target: u32, is_unconditional: bool) -> bool;

    /// Informs the predictor of a branch's true outcome, once resolved at
    /// execute. Policies with no adaptive state ignore this.
    fn resolve(&mut self, address: u32, taken: bool);

    /// Whether fetch must stop speculating past a conditional branch and
    /// instead wait for it to resolve. Every policy but [`Stall`] always
    /// predicts instead, so the default is `false`; unconditional jumps
    /// never stall regardless of policy, since their target is fully known
    /// at fetch time.
    fn needs_stall(&self) -> bool {
        false
    }
}

/// Builds the predictor named by `kind`.
#[must_use]
pub fn build(kind: BranchPredictorType) -> Box<dyn BranchPredictor> {
    match kind {
        BranchPredictorType::Stall => Box::new(Stall),
        BranchPredictorType::AlwaysTaken => Box::new(AlwaysTaken),
        BranchPredictorType::NeverTaken => Box::new(NeverTaken),
        BranchPredictorType::BackwardTaken => Box::new(BackwardTaken),
        BranchPredictorType::ForwardTaken => Box::new(ForwardTaken),
        BranchPredictorType::OneBit => Box::new(SaturatingCounterPredictor::one_bit()),
        BranchPredictorType::TwoBit => Box::new(SaturatingCounterPredictor::two_bit()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_dispatches_every_configured_kind() {
        for kind in [
            BranchPredictorType::Stall,
            BranchPredictorType::AlwaysTaken,
            BranchPredictorType::NeverTaken,
            BranchPredictorType::BackwardTaken,
            BranchPredictorType::ForwardTaken,
            BranchPredictorType::OneBit,
            BranchPredictorType::TwoBit,
        ] {
            let mut predictor = build(kind);
            let _ = predictor.predict(0x100, 0x200, false);
        }
    }
}
