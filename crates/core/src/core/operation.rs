//! The operation: the unit that flows through every pipeline stage.

use crate::isa::Instruction;

/// One in-flight instance of an instruction, from fetch through commit (or
/// flush). Moves by value between stage queues rather than by shared
/// reference — the pipeline is single-threaded and tick-driven, so there is
/// never more than one owner at a time, matching the single-writer policy in
/// the concurrency model.
#[derive(Debug, Clone)]
pub struct Operation {
    /// Monotonically increasing id, assigned at fetch.
    pub id: u64,
    /// Byte address this operation was fetched from.
    pub address: u32,
    /// Raw 4-byte word, set by fetch.
    pub raw: u32,
    /// Decoded form, set by decode.
    pub decoded: Option<Instruction>,
    /// Architectural register this operation's rename owns, set by dispatch
    /// when the register alias table is enabled and the instruction writes a
    /// register. Register 0 (the status register) is never renamed — see
    /// the bypass rule in the design notes.
    pub renamed_dest: Option<u32>,
    /// Predicted next address, attached by fetch so the ROB can later detect
    /// a misprediction. `None` for non-control instructions.
    pub predicted_address: Option<u32>,
    /// Whether the branch, once resolved, was taken. Set by the branch
    /// execution unit.
    pub branch_taken: Option<bool>,
}

impl Operation {
    /// Creates a freshly fetched operation: only the id, address, and raw
    /// word are known; everything decode/dispatch/execute fill in later is
    /// `None`.
    #[must_use]
    pub fn fetched(id: u64, address: u32, raw: u32) -> Self {
        Self {
            id,
            address,
            raw,
            decoded: None,
            renamed_dest: None,
            predicted_address: None,
            branch_taken: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetched_operation_has_no_decoded_form_yet() {
        let op = Operation::fetched(3, 0x10, 0xDEAD_BEEF);
        assert_eq!(op.id, 3);
        assert_eq!(op.address, 0x10);
        assert!(op.decoded.is_none());
        assert!(op.renamed_dest.is_none());
    }
}
