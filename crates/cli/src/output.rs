//! Output artifact writers: `memory.dat`, `registers.dat`, `pipeline.dat`,
//! and `output.log`. `assembly.hex` is rendered by
//! [`crate::assembler::Assembled::hex_image`]; `debug.log` is written by the
//! `tracing-subscriber` file layer installed in `main`, not by this module.

use procsim_core::config::Config;
use procsim_core::memory::MemoryBank;
use procsim_core::stats::GlobalStats;

/// Renders a plain-text hex dump of `bank` in four-word rows, matching the
/// `memory.dat`/`registers.dat` artifact format: a header row of byte-offset
/// column labels, then one row per 16 bytes of the bank.
#[must_use]
pub fn memory_dump(bank: &MemoryBank) -> String {
    let mut out = String::new();
    out.push_str("\t   0x00\t\t   0x04\t\t   0x08\t\t   0x0C\n");
    for (row_index, row) in bank.rows().enumerate() {
        out.push_str(&format!(
            "0x{:02X}\t0x{:08X}\t0x{:08X}\t0x{:08X}\t0x{:08X}\n",
            row_index * 16,
            row[0],
            row[1],
            row[2],
            row[3],
        ));
    }
    out
}

/// Renders the pipeline-occupancy diagram: one row per retired operation, one
/// column per cycle it was ever recorded in, each cell the stage id that
/// occupied that (operation, cycle) pair.
#[must_use]
pub fn pipeline_flow(stats: &GlobalStats) -> String {
    let Some(&max_cycle) = stats.timeline.values().flatten().map(|e| &e.end_cycle).max() else {
        return String::new();
    };
    let Some(&min_cycle) = stats.timeline.values().flatten().map(|e| &e.start_cycle).min() else {
        return String::new();
    };

    let mut out = String::new();
    out.push_str("op  |");
    for cycle in min_cycle..=max_cycle {
        out.push_str(&format!(" {cycle:^5}|"));
    }
    out.push('\n');

    for &op_id in &stats.completed {
        let Some(events) = stats.timeline.get(&op_id) else { continue };
        out.push_str(&format!("{op_id:<4}|"));
        for cycle in min_cycle..=max_cycle {
            let cell = events
                .iter()
                .find(|e| cycle >= e.start_cycle && cycle <= e.end_cycle)
                .map_or("", |e| e.stage_id.as_ref());
            out.push_str(&format!(" {cell:^5}|"));
        }
        out.push('\n');
    }
    out
}

/// Renders the `output.log` artifact: a human-readable dump of the
/// simulation's configuration followed by its run statistics.
#[must_use]
pub fn run_log(config: &Config, stats: &GlobalStats) -> String {
    let mut out = String::new();
    out.push_str(" Processor Config:\n\n");
    out.push_str(&format!(" => Cycle period: {} ms\n", config.general.cycle_period_ms));
    out.push_str(&format!(" => Registers memory size: {} bytes\n", config.memory.registers_memory_size));
    out.push_str(&format!(" => Instructions memory size: {} bytes\n", config.memory.instructions_memory_size));
    out.push_str(&format!(" => Data memory size: {} bytes\n", config.memory.data_memory_size));
    out.push_str(&format!(" => Branch predictor: {:?}\n", config.branch_predictor_type));
    out.push_str(&format!(" => Instructions fetched per cycle: {}\n", config.pipeline.instructions_fetched_per_cycle));
    out.push_str(&format!(" => Instructions dispatched per cycle: {}\n", config.pipeline.instructions_dispatched_per_cycle));
    out.push_str(&format!(" => Instructions written per cycle: {}\n", config.pipeline.instructions_written_per_cycle));
    out.push_str(&format!(" => Reservation station entries: {}\n", config.pipeline.reservation_station_entries));
    out.push_str(&format!(" => Reorder buffer entries: {}\n", config.pipeline.reorder_buffer_entries));
    out.push_str(&format!(" => Register alias table entries: {}\n", config.pipeline.register_alias_table_entries));
    out.push_str(&format!(" => Decoder units: {}\n", config.units.decoder_units));
    out.push_str(&format!(" => ALU units: {}\n", config.units.alu_units));
    out.push_str(&format!(" => FPU units: {}\n", config.units.fpu_units));
    out.push_str(&format!(" => Load/store units: {}\n", config.units.load_store_units));
    out.push_str(&format!(" => Branch units: {}\n", config.units.branch_units));

    out.push_str("\n Program Stats:\n\n");
    out.push_str(&format!(" => Instructions fetched: {}\n", stats.fetched_count));
    out.push_str(&format!(" => Instructions completed: {}\n", stats.completed.len()));
    out.push_str(&format!(" => Cycles: {}\n", stats.cycles));
    out.push_str(&format!(" => Instructions per cycle: {:.3}\n", stats.instructions_per_cycle()));
    out.push_str(&format!(" => Unconditional branches: {}\n", stats.unconditional_branches));
    out.push_str(&format!(" => Conditional branches: {}\n", stats.conditional_branches));
    out.push_str(&format!(" => Mispredicted branches: {}\n", stats.mispredicted_branches));
    out.push_str(&format!(" => Wall time: {:.3} ms\n", stats.elapsed_wall_time().as_secs_f64() * 1000.0));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_dump_has_a_header_row_and_one_row_per_sixteen_bytes() {
        let bank = MemoryBank::new(32);
        let dump = memory_dump(&bank);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("0x00"));
        assert!(lines[1].starts_with("0x00\t"));
        assert!(lines[2].starts_with("0x10\t"));
    }

    #[test]
    fn pipeline_flow_is_empty_for_an_untouched_timeline() {
        let stats = GlobalStats::new();
        assert_eq!(pipeline_flow(&stats), String::new());
    }

    #[test]
    fn pipeline_flow_places_a_stage_id_in_its_recorded_cycle_column() {
        let mut stats = GlobalStats::new();
        stats.record_stage_event(0, "WB0", 3, 3);
        stats.record_completion(0);
        let flow = pipeline_flow(&stats);
        assert!(flow.contains("WB0"));
    }

    #[test]
    fn run_log_includes_config_and_stats_sections() {
        let config = Config::default();
        let stats = GlobalStats::new();
        let log = run_log(&config, &stats);
        assert!(log.contains("Processor Config"));
        assert!(log.contains("Program Stats"));
    }
}
