//! Simulator configuration, loaded from JSON.
//!
//! Every field is individually defaulted, so a partial JSON document — or no
//! document at all, falling back to [`Config::default`] — is always valid.
//!
//! # Examples
//!
//! ```
//! use procsim_core::config::Config;
//!
//! let config = Config::default();
//! assert_eq!(config.general.cycle_period_ms, 1);
//! assert_eq!(config.pipeline.reorder_buffer_entries, 16);
//! ```
//!
//! ```
//! use procsim_core::config::{BranchPredictorType, Config};
//!
//! let json = r#"{
//!     "general": { "cycle_period_ms": 5 },
//!     "branch_predictor_type": "two_bit"
//! }"#;
//! let config: Config = serde_json::from_str(json).unwrap();
//! assert_eq!(config.general.cycle_period_ms, 5);
//! assert_eq!(config.branch_predictor_type, BranchPredictorType::TwoBit);
//! // Unspecified sections still fall back to their defaults.
//! assert_eq!(config.units.alu_units, 2);
//! ```

use serde::Deserialize;

mod defaults {
    pub const CYCLE_PERIOD_MS: u64 = 1;
    pub const PIPELINED: bool = true;

    pub const REGISTERS_MEMORY_SIZE: usize = 128;
    pub const INSTRUCTIONS_MEMORY_SIZE: usize = 4096;
    pub const DATA_MEMORY_SIZE: usize = 4096;

    pub const INSTRUCTIONS_FETCHED_PER_CYCLE: usize = 1;
    pub const INSTRUCTIONS_QUEUE: usize = 8;
    pub const INSTRUCTIONS_DECODED_QUEUE: usize = 8;
    pub const INSTRUCTIONS_DISPATCHED_PER_CYCLE: usize = 1;
    pub const INSTRUCTIONS_WRITTEN_PER_CYCLE: usize = 1;
    pub const RESERVATION_STATION_ENTRIES: usize = 16;
    pub const REORDER_BUFFER_ENTRIES: usize = 16;
    pub const REGISTER_ALIAS_TABLE_ENTRIES: usize = 32;
    pub const DISPATCH_LATENCY: u64 = 1;

    pub const DECODER_UNITS: usize = 1;
    pub const BRANCH_UNITS: usize = 1;
    pub const LOAD_STORE_UNITS: usize = 1;
    pub const ALU_UNITS: usize = 2;
    pub const FPU_UNITS: usize = 1;
}

/// Branch predictor selection. See `core::branch_predictor` for the
/// semantics of each policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchPredictorType {
    /// Never speculate; always wait for resolution.
    Stall,
    /// Always guess the branch target.
    AlwaysTaken,
    /// Always guess fall-through (PC+4).
    #[default]
    NeverTaken,
    /// Guess taken iff the offset is negative (loop-closing branches).
    BackwardTaken,
    /// Guess taken iff the offset is positive.
    ForwardTaken,
    /// Per-address 1-bit saturating counter.
    #[serde(rename = "one_bit")]
    OneBit,
    /// Per-address 2-bit saturating counter.
    #[serde(rename = "two_bit")]
    TwoBit,
}

/// Top-level simulation timing and compatibility flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct GeneralConfig {
    /// Real-time milliseconds represented by one simulated cycle. Used only
    /// for `duration_ms` reporting (see `Clock`), never to pace execution.
    #[serde(default = "GeneralConfig::default_cycle_period_ms")]
    pub cycle_period_ms: u64,
    /// Legacy flag, retained for configuration-file compatibility. The
    /// simulator is always pipelined; this field has no effect.
    #[serde(default = "GeneralConfig::default_pipelined")]
    pub pipelined: bool,
}

impl GeneralConfig {
    fn default_cycle_period_ms() -> u64 {
        defaults::CYCLE_PERIOD_MS
    }
    fn default_pipelined() -> bool {
        defaults::PIPELINED
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cycle_period_ms: Self::default_cycle_period_ms(),
            pipelined: Self::default_pipelined(),
        }
    }
}

/// Sizes, in bytes, of the three memory banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MemoryConfig {
    /// Size of the architectural register file's backing bank
    /// (`register_count * 4` is the minimum useful value).
    #[serde(default = "MemoryConfig::default_registers_memory_size")]
    pub registers_memory_size: usize,
    /// Size of instruction memory.
    #[serde(default = "MemoryConfig::default_instructions_memory_size")]
    pub instructions_memory_size: usize,
    /// Size of data memory.
    #[serde(default = "MemoryConfig::default_data_memory_size")]
    pub data_memory_size: usize,
}

impl MemoryConfig {
    fn default_registers_memory_size() -> usize {
        defaults::REGISTERS_MEMORY_SIZE
    }
    fn default_instructions_memory_size() -> usize {
        defaults::INSTRUCTIONS_MEMORY_SIZE
    }
    fn default_data_memory_size() -> usize {
        defaults::DATA_MEMORY_SIZE
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            registers_memory_size: Self::default_registers_memory_size(),
            instructions_memory_size: Self::default_instructions_memory_size(),
            data_memory_size: Self::default_data_memory_size(),
        }
    }
}

/// Widths of the fetch stage, the inter-stage channels, dispatch, and
/// commit, plus the RS/ROB/RAT buffer depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PipelineConfig {
    /// Words read from instruction memory per fetch cycle.
    #[serde(default = "PipelineConfig::default_instructions_fetched_per_cycle")]
    pub instructions_fetched_per_cycle: usize,
    /// Capacity of the fetch -> decode channel.
    #[serde(default = "PipelineConfig::default_instructions_queue")]
    pub instructions_queue: usize,
    /// Capacity of the decode -> dispatch channel.
    #[serde(default = "PipelineConfig::default_instructions_decoded_queue")]
    pub instructions_decoded_queue: usize,
    /// Operations the dispatcher may release into the RS per cycle.
    #[serde(default = "PipelineConfig::default_instructions_dispatched_per_cycle")]
    pub instructions_dispatched_per_cycle: usize,
    /// Entries the commit loop may retire per cycle.
    #[serde(default = "PipelineConfig::default_instructions_written_per_cycle")]
    pub instructions_written_per_cycle: usize,
    /// Reservation station depth.
    #[serde(default = "PipelineConfig::default_reservation_station_entries")]
    pub reservation_station_entries: usize,
    /// Reorder buffer depth.
    #[serde(default = "PipelineConfig::default_reorder_buffer_entries")]
    pub reorder_buffer_entries: usize,
    /// Register alias table depth. `0` disables renaming.
    #[serde(default = "PipelineConfig::default_register_alias_table_entries")]
    pub register_alias_table_entries: usize,
    /// Cycles the reservation station's dispatched-this-window counter holds
    /// before resetting, re-enabling `instructions_dispatched_per_cycle`
    /// worth of fresh issues even if the station has been issuing flat out.
    #[serde(default = "PipelineConfig::default_dispatch_latency")]
    pub dispatch_latency: u64,
}

impl PipelineConfig {
    fn default_instructions_fetched_per_cycle() -> usize {
        defaults::INSTRUCTIONS_FETCHED_PER_CYCLE
    }
    fn default_instructions_queue() -> usize {
        defaults::INSTRUCTIONS_QUEUE
    }
    fn default_instructions_decoded_queue() -> usize {
        defaults::INSTRUCTIONS_DECODED_QUEUE
    }
    fn default_instructions_dispatched_per_cycle() -> usize {
        defaults::INSTRUCTIONS_DISPATCHED_PER_CYCLE
    }
    fn default_instructions_written_per_cycle() -> usize {
        defaults::INSTRUCTIONS_WRITTEN_PER_CYCLE
    }
    fn default_reservation_station_entries() -> usize {
        defaults::RESERVATION_STATION_ENTRIES
    }
    fn default_reorder_buffer_entries() -> usize {
        defaults::REORDER_BUFFER_ENTRIES
    }
    fn default_register_alias_table_entries() -> usize {
        defaults::REGISTER_ALIAS_TABLE_ENTRIES
    }
    fn default_dispatch_latency() -> u64 {
        defaults::DISPATCH_LATENCY
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            instructions_fetched_per_cycle: Self::default_instructions_fetched_per_cycle(),
            instructions_queue: Self::default_instructions_queue(),
            instructions_decoded_queue: Self::default_instructions_decoded_queue(),
            instructions_dispatched_per_cycle: Self::default_instructions_dispatched_per_cycle(),
            instructions_written_per_cycle: Self::default_instructions_written_per_cycle(),
            reservation_station_entries: Self::default_reservation_station_entries(),
            reorder_buffer_entries: Self::default_reorder_buffer_entries(),
            register_alias_table_entries: Self::default_register_alias_table_entries(),
            dispatch_latency: Self::default_dispatch_latency(),
        }
    }
}

/// Parallel functional/decoder unit counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct UnitsConfig {
    /// Number of decoder instances.
    #[serde(default = "UnitsConfig::default_decoder_units")]
    pub decoder_units: usize,
    /// Number of branch execution units.
    #[serde(default = "UnitsConfig::default_branch_units")]
    pub branch_units: usize,
    /// Number of load/store execution units.
    #[serde(default = "UnitsConfig::default_load_store_units")]
    pub load_store_units: usize,
    /// Number of ALU execution units.
    #[serde(default = "UnitsConfig::default_alu_units")]
    pub alu_units: usize,
    /// Number of FPU execution units.
    #[serde(default = "UnitsConfig::default_fpu_units")]
    pub fpu_units: usize,
}

impl UnitsConfig {
    fn default_decoder_units() -> usize {
        defaults::DECODER_UNITS
    }
    fn default_branch_units() -> usize {
        defaults::BRANCH_UNITS
    }
    fn default_load_store_units() -> usize {
        defaults::LOAD_STORE_UNITS
    }
    fn default_alu_units() -> usize {
        defaults::ALU_UNITS
    }
    fn default_fpu_units() -> usize {
        defaults::FPU_UNITS
    }
}

impl Default for UnitsConfig {
    fn default() -> Self {
        Self {
            decoder_units: Self::default_decoder_units(),
            branch_units: Self::default_branch_units(),
            load_store_units: Self::default_load_store_units(),
            alu_units: Self::default_alu_units(),
            fpu_units: Self::default_fpu_units(),
        }
    }
}

/// Root simulator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Clock and compatibility settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Memory bank sizes.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Stage widths and RS/ROB/RAT depths.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Parallel unit counts.
    #[serde(default)]
    pub units: UnitsConfig,
    /// Branch prediction policy.
    #[serde(default)]
    pub branch_predictor_type: BranchPredictorType,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            memory: MemoryConfig::default(),
            pipeline: PipelineConfig::default(),
            units: UnitsConfig::default(),
            branch_predictor_type: BranchPredictorType::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = Config::default();
        assert_eq!(config.general.cycle_period_ms, 1);
        assert_eq!(config.pipeline.reorder_buffer_entries, 16);
        assert_eq!(config.pipeline.dispatch_latency, 1);
        assert_eq!(config.units.alu_units, 2);
        assert_eq!(config.branch_predictor_type, BranchPredictorType::NeverTaken);
    }

    #[test]
    fn partial_json_fills_in_remaining_defaults() {
        let json = r#"{ "pipeline": { "reorder_buffer_entries": 4 } }"#;
        let config: Config = serde_json::from_str(json).expect("valid json");
        assert_eq!(config.pipeline.reorder_buffer_entries, 4);
        assert_eq!(config.pipeline.reservation_station_entries, 16);
        assert_eq!(config.memory.data_memory_size, 4096);
    }

    #[test]
    fn branch_predictor_type_parses_snake_case_tokens() {
        for (token, expected) in [
            ("stall", BranchPredictorType::Stall),
            ("always_taken", BranchPredictorType::AlwaysTaken),
            ("never_taken", BranchPredictorType::NeverTaken),
            ("backward_taken", BranchPredictorType::BackwardTaken),
            ("forward_taken", BranchPredictorType::ForwardTaken),
            ("one_bit", BranchPredictorType::OneBit),
            ("two_bit", BranchPredictorType::TwoBit),
        ] {
            let json = format!(r#"{{ "branch_predictor_type": "{token}" }}"#);
            let config: Config = serde_json::from_str(&json).expect("valid json");
            assert_eq!(config.branch_predictor_type, expected, "token {token}");
        }
    }

    #[test]
    fn empty_object_yields_full_default_config() {
        let config: Config = serde_json::from_str("{}").expect("valid json");
        assert_eq!(config, Config::default());
    }
}
