//! Decode stage: turns each fetched operation's raw word into a decoded
//! [`crate::isa::encoding::Instruction`], or reports a decode error.

use crate::channel::BoundedChannel;
use crate::common::{SimError, SimResult};
use crate::isa::encoding;
use crate::stats::GlobalStats;

use super::super::operation::Operation;

/// Decodes operations drawn from `inbound`, pushing successfully decoded
/// ones to `outbound`. A word that doesn't match any catalog opcode is
/// reported as a [`SimError::Decode`] rather than silently dropped.
#[derive(Debug, Default)]
pub struct Decode {
    units: usize,
}

impl Decode {
    /// Creates a decode stage with `units` parallel decoders.
    #[must_use]
    pub fn new(units: usize) -> Self {
        Self { units: units.max(1) }
    }

    /// Advances decode by one cycle, decoding up to `units` operations. Each
    /// decoded operation records a `DE<lane>` stage event, `lane` being the
    /// decoder instance (0-indexed) that serviced it this cycle.
    pub fn tick(
        &mut self,
        inbound: &mut BoundedChannel<Operation>,
        outbound: &mut BoundedChannel<Operation>,
        stats: &mut GlobalStats,
        cycle: u64,
    ) -> SimResult<()> {
        for lane in 0..self.units {
            if outbound.is_full() {
                return Ok(());
            }
            let Some(mut op) = inbound.try_take() else { return Ok(()) };
            inbound.release();
            let decoded = encoding::decode(op.raw).ok_or_else(|| SimError::Decode {
                address: op.address,
                word: op.raw,
                reason: "opcode not present in the instruction catalog".to_string(),
            })?;
            op.decoded = Some(decoded);
            stats.record_stage_event(op.id, format!("DE{lane}"), cycle, cycle);
            outbound.try_add(op).expect("checked is_full above");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::catalog;
    use crate::isa::encoding::{encode, Instruction, OperandForm};

    fn add_word() -> u32 {
        let info = catalog::lookup_by_mnemonic("add").expect("add in catalog");
        encode(&Instruction { info, operands: OperandForm::R { rd: 1, rs: 2, rt: 3, shamt: 0, funct: 0 } })
    }

    #[test]
    fn decode_fills_in_the_decoded_form() {
        let mut inbound = BoundedChannel::new(4);
        let mut outbound = BoundedChannel::new(4);
        inbound.try_add(Operation::fetched(0, 0, add_word())).expect("add");
        let mut decode = Decode::new(1);
        let mut stats = GlobalStats::new();
        decode.tick(&mut inbound, &mut outbound, &mut stats, 1).expect("decodes");
        let op = outbound.try_take().expect("decoded op present");
        assert!(op.decoded.is_some());
        assert_eq!(stats.timeline[&0][0].stage_id.as_ref(), "DE0");
    }

    #[test]
    fn decode_reports_unknown_opcode_as_error() {
        let mut inbound = BoundedChannel::new(4);
        let mut outbound = BoundedChannel::new(4);
        inbound.try_add(Operation::fetched(0, 0, 0xFFFF_FFFF)).expect("add");
        let mut decode = Decode::new(1);
        let mut stats = GlobalStats::new();
        let result = decode.tick(&mut inbound, &mut outbound, &mut stats, 1);
        assert!(matches!(result, Err(SimError::Decode { .. })));
    }

    #[test]
    fn decode_stalls_when_outbound_channel_is_full() {
        let mut inbound = BoundedChannel::new(4);
        let mut outbound = BoundedChannel::new(1);
        outbound.try_add(Operation::fetched(9, 0, add_word())).expect("prefill");
        inbound.try_add(Operation::fetched(0, 0, add_word())).expect("add");
        let mut decode = Decode::new(1);
        let mut stats = GlobalStats::new();
        decode.tick(&mut inbound, &mut outbound, &mut stats, 1).expect("no error, just stalls");
        assert_eq!(inbound.len(), 1);
    }
}
