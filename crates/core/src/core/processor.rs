//! The processor: wires the five pipeline stages, the Tomasulo structures,
//! and the architectural state together and drives one cycle at a time.

use std::collections::HashMap;

use crate::channel::BoundedChannel;
use crate::clock::Clock;
use crate::common::{ProgramStatus, SimResult};
use crate::config::Config;
use crate::isa::catalog;
use crate::memory::MemoryBank;
use crate::registers::RegisterFile;
use crate::stats::GlobalStats;

use super::branch_predictor::{self, BranchPredictor};
use super::operation::Operation;
use super::pipeline::{Commit, Decode, Dispatch, Execute, Fetch};
use super::rat::Rat;
use super::rob::Rob;
use super::rs::Rs;

/// The full out-of-order processor: owns every piece of architectural and
/// microarchitectural state and advances it one cycle per [`Self::step`]
/// call.
#[derive(Debug)]
pub struct Processor {
    config: Config,
    clock: Clock,
    pc: u32,

    instructions: MemoryBank,
    data: MemoryBank,
    registers: RegisterFile,
    predictor: Box<dyn BranchPredictor>,

    fetch: Fetch,
    decode: Decode,
    dispatch: Dispatch,
    execute: Execute,
    commit: Commit,

    fetch_to_decode: BoundedChannel<Operation>,
    decode_to_dispatch: BoundedChannel<Operation>,

    rs: Rs,
    rob: Rob,
    rat: Rat,
    in_flight: HashMap<u64, Operation>,
    pending_status: HashMap<u64, u32>,

    stats: GlobalStats,
}

impl Processor {
    /// Builds a processor from `config`, loading `program` (an already
    /// assembled hex image) into instruction memory at address 0. The rest
    /// of instruction memory is pre-filled with the end-of-program
    /// sentinel, so a program that never reaches its own halt still
    /// terminates cleanly once fetch runs past it.
    #[must_use]
    pub fn new(config: Config, program: &[u8]) -> Self {
        let mut instructions =
            MemoryBank::filled(config.memory.instructions_memory_size, catalog::END_OF_PROGRAM_SENTINEL_BYTE);
        instructions.load(program, 0);

        let mut rs = Rs::new(config.pipeline.reservation_station_entries);
        rs.set_dispatch_limit(config.pipeline.instructions_dispatched_per_cycle, config.pipeline.dispatch_latency);

        Self {
            clock: Clock::new(config.general.cycle_period_ms),
            pc: 0,
            data: MemoryBank::new(config.memory.data_memory_size),
            registers: RegisterFile::new(),
            predictor: branch_predictor::build(config.branch_predictor_type),
            fetch: Fetch::new(0, config.pipeline.instructions_fetched_per_cycle),
            decode: Decode::new(config.units.decoder_units),
            dispatch: Dispatch::new(config.pipeline.instructions_dispatched_per_cycle),
            execute: Execute::new(
                config.units.alu_units,
                config.units.fpu_units,
                config.units.load_store_units,
                config.units.branch_units,
            ),
            commit: Commit::new(config.pipeline.instructions_written_per_cycle),
            fetch_to_decode: BoundedChannel::new(config.pipeline.instructions_queue),
            decode_to_dispatch: BoundedChannel::new(config.pipeline.instructions_decoded_queue),
            rs,
            rob: Rob::new(config.pipeline.reorder_buffer_entries, 0),
            rat: Rat::new(config.pipeline.register_alias_table_entries),
            in_flight: HashMap::new(),
            pending_status: HashMap::new(),
            stats: GlobalStats::new(),
            instructions,
            config,
        }
    }

    /// Committed architectural registers.
    #[must_use]
    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Data memory.
    #[must_use]
    pub fn data_memory(&self) -> &MemoryBank {
        &self.data
    }

    /// Preloads a big-endian 32-bit word into data memory at `address`,
    /// mirroring the `@0x<hex>:` assembly directive's storage order. Used by
    /// the assembler before the first `step`/`run` call; has no effect on
    /// architectural state once the pipeline is running.
    pub fn preload_data(&mut self, address: u32, value: u32) {
        self.data.write_u32_be(address, value);
    }

    /// Instruction memory, as loaded (plus any self-modifying writes,
    /// though the catalog has no mnemonic that produces one).
    #[must_use]
    pub fn instructions_memory(&self) -> &MemoryBank {
        &self.instructions
    }

    /// The architectural program counter.
    #[must_use]
    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// Cycles executed so far.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.clock.cycles()
    }

    /// Run-wide statistics.
    #[must_use]
    pub fn stats(&self) -> &GlobalStats {
        &self.stats
    }

    /// Advances the simulation by one cycle, ticking every stage in fixed
    /// order (fetch, decode, dispatch, execute, commit) and recovering
    /// immediately if commit detects a misprediction.
    pub fn step(&mut self) -> SimResult<ProgramStatus> {
        let cycle = self.clock.tick();

        self.fetch.tick(
            &self.instructions,
            self.predictor.as_mut(),
            &mut self.fetch_to_decode,
            &mut self.stats,
            cycle,
            self.pc,
        );
        self.decode.tick(&mut self.fetch_to_decode, &mut self.decode_to_dispatch, &mut self.stats, cycle)?;
        self.dispatch.tick(
            &mut self.decode_to_dispatch,
            &mut self.rs,
            &mut self.rob,
            &mut self.rat,
            &self.registers,
            &mut self.in_flight,
            &mut self.stats,
            cycle,
        );
        self.execute.tick(
            &mut self.rs,
            &mut self.rob,
            &self.registers,
            &self.data,
            &mut self.in_flight,
            &mut self.pending_status,
            &mut self.stats,
            cycle,
        );
        let recovery = self.commit.tick(
            &mut self.rob,
            &mut self.rat,
            &mut self.registers,
            &mut self.data,
            &mut self.pc,
            &mut self.pending_status,
            &mut self.in_flight,
            self.predictor.as_mut(),
            &mut self.stats,
            cycle,
        );

        if let Some(recovery) = recovery {
            self.recover(recovery);
        }

        self.stats.cycles = cycle;
        self.stats.fetched_count = self.fetch.next_id();

        if self.fetch.stopped && self.stats.completed.len() as u64 == self.stats.fetched_count {
            self.clock.mark_finished();
            return Ok(ProgramStatus::Finished);
        }
        Ok(ProgramStatus::Running)
    }

    /// Discards every operation younger than the one committed this cycle
    /// and redirects fetch to the correct address — the reaction to a
    /// [`super::pipeline::commit::Recovery`] reported by [`Commit::tick`].
    fn recover(&mut self, recovery: super::pipeline::commit::Recovery) {
        let keep = recovery.next_op_id.saturating_sub(1);
        self.fetch_to_decode.reset();
        self.decode_to_dispatch.reset();
        self.rob.flush_after(keep);
        self.rs.flush_after(keep);
        self.rat.flush_after(keep);
        self.execute.flush_after(keep);
        self.in_flight.retain(|&id, _| id < recovery.next_op_id);
        self.pending_status.retain(|&id, _| id < recovery.next_op_id);
        self.fetch.redirect(recovery.pc, recovery.next_op_id);
        self.stats.trim_to(recovery.next_op_id);
    }

    /// Runs until the program finishes or `max_cycles` is reached (if
    /// given), ticking one cycle at a time.
    pub fn run(&mut self, max_cycles: Option<u64>) -> SimResult<ProgramStatus> {
        loop {
            let status = self.step()?;
            if status != ProgramStatus::Running {
                return Ok(status);
            }
            if let Some(limit) = max_cycles {
                if self.clock.cycles() >= limit {
                    return Ok(ProgramStatus::CycleLimitReached);
                }
            }
        }
    }
}
