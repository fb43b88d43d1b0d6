//! `simulator`: the command-line driver. Assembles a source file, runs it on
//! the `procsim-core` processor model, and writes the six output artifacts.

mod assembler;
mod output;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use procsim_core::common::{ProgramStatus, SimError, SimResult};
use procsim_core::config::Config;
use procsim_core::core::Processor;
use tracing_subscriber::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "simulator", about = "A cycle-accurate out-of-order processor simulator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Assembles and runs a program, writing the output artifacts.
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Path to the assembly source file.
    assembly_file: PathBuf,

    /// Pause after every cycle, accepting R/D (dump registers/memory) or E (exit).
    #[arg(short, long)]
    step: bool,

    /// Mirror the debug log to stderr as the simulation runs.
    #[arg(short, long)]
    verbose: bool,

    /// Directory the six output artifacts are written into.
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// JSON configuration file; unspecified fields fall back to their defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop the run after this many cycles even if the program hasn't finished.
    #[arg(long)]
    max_cycles: Option<u64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("simulator: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: &Command) -> SimResult<()> {
    let Command::Run(args) = command;

    fs::create_dir_all(&args.output)
        .map_err(|e| SimError::Input(format!("cannot create output directory {}: {e}", args.output.display())))?;
    install_tracing(&args.output, args.verbose)?;

    let config = load_config(args.config.as_deref())?;
    let source = fs::read_to_string(&args.assembly_file)
        .map_err(|e| SimError::Input(format!("cannot read {}: {e}", args.assembly_file.display())))?;
    let assembled = assembler::assemble(&source)?;
    fs::write(args.output.join("assembly.hex"), assembled.hex_image())
        .map_err(|e| SimError::Input(format!("cannot write assembly.hex: {e}")))?;

    let mut processor = Processor::new(config, &assembled.image_bytes());
    for preload in &assembled.preloads {
        processor.preload_data(preload.address, preload.value);
    }

    let status =
        if args.step { run_step_mode(&mut processor, args.max_cycles)? } else { processor.run(args.max_cycles)? };
    tracing::info!(cycles = processor.cycles(), ?status, "run finished");

    write_artifacts(&args.output, &config, &processor)
}

/// Installs a `tracing` subscriber with a file layer writing `debug.log`
/// (always on) and, when `-v` is given, a second layer mirroring the same
/// events to stderr.
fn install_tracing(output_dir: &Path, verbose: bool) -> SimResult<()> {
    let debug_log_path = output_dir.join("debug.log");
    let file = fs::File::create(&debug_log_path)
        .map_err(|e| SimError::Input(format!("cannot create {}: {e}", debug_log_path.display())))?;
    let file_layer = tracing_subscriber::fmt::layer().with_writer(std::sync::Mutex::new(file)).with_ansi(false);
    let stderr_layer = verbose.then(|| tracing_subscriber::fmt::layer().with_writer(io::stderr));
    tracing_subscriber::registry().with(file_layer).with(stderr_layer).init();
    Ok(())
}

fn load_config(path: Option<&Path>) -> SimResult<Config> {
    let Some(path) = path else { return Ok(Config::default()) };
    let text = fs::read_to_string(path)
        .map_err(|e| SimError::Input(format!("cannot read config {}: {e}", path.display())))?;
    serde_json::from_str(&text).map_err(|e| SimError::Input(format!("invalid config {}: {e}", path.display())))
}

/// Runs one cycle at a time, pausing for a keypress after each: `R`/`D` dump
/// registers/memory to stdout, `E` stops stepping early, anything else
/// continues. An early `E` is not end-of-program; the caller still writes
/// whatever artifacts reflect the state reached so far.
fn run_step_mode(processor: &mut Processor, max_cycles: Option<u64>) -> SimResult<ProgramStatus> {
    loop {
        let status = processor.step()?;
        if status != ProgramStatus::Running {
            return Ok(status);
        }
        if let Some(limit) = max_cycles {
            if processor.cycles() >= limit {
                return Ok(ProgramStatus::CycleLimitReached);
            }
        }

        print!("cycle {} [R/D/E/enter] > ", processor.cycles());
        io::stdout().flush().map_err(|e| SimError::Input(format!("stdout closed: {e}")))?;
        let mut line = String::new();
        if io::stdin().read_line(&mut line).unwrap_or(0) == 0 {
            return Ok(ProgramStatus::Running);
        }
        match line.trim().chars().next() {
            Some('R' | 'r') => println!("{}", output::memory_dump(processor.registers().bank())),
            Some('D' | 'd') => println!("{}", output::memory_dump(processor.data_memory())),
            Some('E' | 'e') => return Ok(ProgramStatus::Running),
            _ => {}
        }
    }
}

fn write_artifacts(output_dir: &Path, config: &Config, processor: &Processor) -> SimResult<()> {
    let write = |name: &str, contents: String| -> SimResult<()> {
        fs::write(output_dir.join(name), contents)
            .map_err(|e| SimError::Input(format!("cannot write {name}: {e}")))
    };
    write("memory.dat", output::memory_dump(processor.data_memory()))?;
    write("registers.dat", output::memory_dump(processor.registers().bank()))?;
    write("pipeline.dat", output::pipeline_flow(processor.stats()))?;
    write("output.log", output::run_log(config, processor.stats()))
}
