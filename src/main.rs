/*
SPDX-License-Identifier: MIT
*/

//! schedsim – command-line entry point.
//!
//! Parses the options, loads the optional settings file, reads the job
//! descriptors and runs the simulation. The three output files
//! (`scheduler.log`, `scheduler.perf`, `memory.log`) are overwritten per run.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use schedsim::config::SimConfig;
use schedsim::input;
use schedsim::memory::MemoryManager;
use schedsim::report::{Accountant, MemoryLog};
use schedsim::scheduler::Policy;
use schedsim::sim::Simulator;

#[derive(Debug, Parser)]
#[command(
    name = "schedsim",
    about = "Discrete-time process scheduler and buddy memory manager simulator"
)]
struct Cli {
    /// Scheduling policy: rr, hpf or srtn.
    #[arg(short = 's', long = "scheduler")]
    scheduler: Policy,

    /// Job descriptor file.
    #[arg(short = 'f', long = "file", default_value = "processes.txt")]
    file: PathBuf,

    /// Round-robin quantum in ticks (rr only).
    #[arg(short = 'q', long = "quantum", default_value_t = 2,
          value_parser = clap::value_parser!(u64).range(1..))]
    quantum: u64,

    /// Optional YAML settings file (arena size, output paths).
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => SimConfig::load_from_file(path)?,
        None => SimConfig::default(),
    };

    info!(
        policy = %cli.scheduler,
        input = %cli.file.display(),
        quantum = cli.quantum,
        arena_size = cfg.arena_size,
        "schedsim starting"
    );

    let jobs = input::read_jobs(&cli.file)?;

    let accountant = Accountant::create(&cfg.event_log)
        .with_context(|| format!("cannot open event log: {}", cfg.event_log.display()))?;
    let memory_log = MemoryLog::create(&cfg.memory_log)
        .with_context(|| format!("cannot open memory log: {}", cfg.memory_log.display()))?;
    let memory = MemoryManager::new(cfg.arena_size, memory_log);

    let mut sim = Simulator::new(cli.scheduler, cli.quantum, jobs, memory, accountant);
    let summary = sim.run()?;

    let mut perf = File::create(&cfg.perf_log)
        .with_context(|| format!("cannot open summary file: {}", cfg.perf_log.display()))?;
    write!(perf, "{summary}")
        .with_context(|| format!("cannot write summary file: {}", cfg.perf_log.display()))?;

    info!(
        cpu_utilization = summary.cpu_utilization,
        avg_wta = summary.avg_wta,
        "run complete"
    );
    Ok(())
}
