//! Stateless branch predictors: policies whose guess depends only on the
//! static shape of the branch (its direction, or nothing at all), never on
//! history.

use super::BranchPredictor;

/// Never speculates: the fetch stage must wait for the branch to resolve
/// before fetching past it.
#[derive(Debug, Default, Clone, Copy)]
pub struct Stall;

impl BranchPredictor for Stall {
    fn predict(&mut self, _address: u32, _target: u32, is_unconditional: bool) -> bool {
        is_unconditional
    }

    fn resolve(&mut self, _address: u32, _taken: bool) {}

    fn needs_stall(&self) -> bool {
        true
    }
}

/// Always guesses the branch is taken.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysTaken;

impl BranchPredictor for AlwaysTaken {
    fn predict(&mut self, _address: u32, _target: u32, _is_unconditional: bool) -> bool {
        true
    }

    fn resolve(&mut self, _address: u32, _taken: bool) {}
}

/// Always guesses fall-through, except unconditional jumps which are always
/// taken regardless of policy.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverTaken;

impl BranchPredictor for NeverTaken {
    fn predict(&mut self, _address: u32, _target: u32, is_unconditional: bool) -> bool {
        is_unconditional
    }

    fn resolve(&mut self, _address: u32, _taken: bool) {}
}

/// Guesses taken iff the target lies behind the branch (the common
/// loop-closing shape).
#[derive(Debug, Default, Clone, Copy)]
pub struct BackwardTaken;

impl BranchPredictor for BackwardTaken {
    fn predict(&mut self, address: u32, target: u32, is_unconditional: bool) -> bool {
        is_unconditional || target <= address
    }

    fn resolve(&mut self, _address: u32, _taken: bool) {}
}

/// Guesses taken iff the target lies ahead of the branch.
#[derive(Debug, Default, Clone, Copy)]
pub struct ForwardTaken;

impl BranchPredictor for ForwardTaken {
    fn predict(&mut self, address: u32, target: u32, is_unconditional: bool) -> bool {
        is_unconditional || target > address
    }

    fn resolve(&mut self, _address: u32, _taken: bool) {}
}
