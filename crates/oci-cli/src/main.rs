//! Op-Code Interpreters - CLI
//!
//! Command-line interface to run, disassemble and benchmark genetic strings.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oci_core::machines::{build, Instrumentation, MachineKind};
use oci_core::{MachineConfig, Oci};

#[derive(Parser, Debug)]
#[command(name = "oci")]
#[command(about = "Op-code interpreters for genetic strings")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a genome file and interpret it
    Run {
        /// Genome file (raw bytes in the machine's layout)
        genome: PathBuf,

        #[command(flatten)]
        machine: MachineArgs,

        /// Write the raw output bytes to stdout instead of a hex dump
        #[arg(long)]
        raw: bool,

        /// Run exactly this many instructions, ignoring every budget
        #[arg(long)]
        steps: Option<u64>,
    },

    /// Print the decoded program segment of a genome
    Disasm {
        genome: PathBuf,

        #[command(flatten)]
        machine: MachineArgs,
    },

    /// Interpret a batch of random genomes and report throughput
    Bench {
        #[command(flatten)]
        machine: MachineArgs,

        /// Number of genomes to interpret
        #[arg(long, default_value = "10000")]
        genomes: u64,

        /// Seed for the genome generator
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Run exactly this many instructions per genome instead of `interpret`
        #[arg(long)]
        steps: Option<u64>,
    },
}

#[derive(Args, Debug)]
struct MachineArgs {
    /// Machine variant
    #[arg(long, value_enum, default_value = "von-neumann")]
    machine: MachineArg,

    /// RAM (or combined/stack segment) size in words, a power of two
    #[arg(long, default_value = "256")]
    ram: usize,

    /// ROM size in words for the Harvard machine, a power of two
    #[arg(long, default_value = "256")]
    rom: usize,

    /// Instructions per `interpret` run
    #[arg(long, default_value = "10000")]
    max_commands: u64,

    /// Output bytes after which `interpret` stops
    #[arg(long, default_value = "4096")]
    max_output: usize,

    /// Record halt instructions without stopping
    #[arg(long)]
    no_halt: bool,

    /// Count memory touches and instruction occurrences
    #[arg(long)]
    instrument: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MachineArg {
    VonNeumann,
    Harvard,
    Stack,
    Register,
}

impl From<MachineArg> for MachineKind {
    fn from(arg: MachineArg) -> Self {
        match arg {
            MachineArg::VonNeumann => MachineKind::VonNeumann,
            MachineArg::Harvard => MachineKind::Harvard,
            MachineArg::Stack => MachineKind::Stack,
            MachineArg::Register => MachineKind::Register,
        }
    }
}

impl MachineArgs {
    fn config(&self) -> MachineConfig {
        MachineConfig::new()
            .with_ram_size(self.ram)
            .with_rom_size(self.rom)
            .with_max_commands(self.max_commands)
            .with_max_output_bytes(self.max_output)
            .with_allow_halt(!self.no_halt)
    }

    fn build(&self) -> Result<Box<dyn Oci>> {
        let kind = MachineKind::from(self.machine);
        let instrumentation = if self.instrument {
            Instrumentation::On
        } else {
            Instrumentation::Off
        };
        build(kind, self.config(), instrumentation)
            .with_context(|| format!("cannot build {} machine", kind))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oci=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            genome,
            machine,
            raw,
            steps,
        } => run(&genome, &machine, raw, steps),
        Command::Disasm { genome, machine } => disasm(&genome, &machine),
        Command::Bench {
            machine,
            genomes,
            seed,
            steps,
        } => bench(&machine, genomes, seed, steps),
    }
}

fn load(path: &Path, machine: &MachineArgs) -> Result<Box<dyn Oci>> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut oci = machine.build()?;
    if bytes.len() > oci.genetic_string_size() {
        warn!(
            expected = oci.genetic_string_size(),
            actual = bytes.len(),
            "genome longer than the machine layout; extra bytes ignored"
        );
    }
    oci.set_from_genetic_string(&bytes)
        .with_context(|| format!("invalid genome {}", path.display()))?;
    debug!(machine = oci.name(), bytes = bytes.len(), "genome loaded");
    Ok(oci)
}

fn run(path: &Path, machine: &MachineArgs, raw: bool, steps: Option<u64>) -> Result<()> {
    let mut oci = load(path, machine)?;

    match steps {
        Some(n) => {
            oci.interpret_n(n);
            info!(machine = oci.name(), steps = n, output = oci.output().len(), "run finished");
        }
        None => {
            let summary = oci.interpret();
            info!(
                machine = oci.name(),
                commands = summary.commands,
                reason = ?summary.reason,
                output = oci.output().len(),
                halted = oci.halted(),
                "run finished"
            );
        }
    }

    if !oci.occurrences().is_empty() {
        info!(occurrences = ?oci.occurrences(), "instruction histogram");
    }

    let mut stdout = io::stdout().lock();
    if raw {
        stdout.write_all(oci.output())?;
    } else {
        for line in oci.output().chunks(16) {
            let hex: Vec<String> = line.iter().map(|b| format!("{:02x}", b)).collect();
            writeln!(stdout, "{}", hex.join(" "))?;
        }
    }
    Ok(())
}

fn disasm(path: &Path, machine: &MachineArgs) -> Result<()> {
    let oci = load(path, machine)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "; {} pc={}", oci.name(), oci.pc())?;
    stdout.write_all(oci.disassemble().as_bytes())?;
    Ok(())
}

fn bench(machine: &MachineArgs, genomes: u64, seed: u64, steps: Option<u64>) -> Result<()> {
    let mut oci = machine.build()?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut genome = vec![0u8; oci.genetic_string_size()];

    let mut instructions = 0u64;
    let mut output_bytes = 0u64;
    let start = Instant::now();

    for _ in 0..genomes {
        rng.fill_bytes(&mut genome);
        oci.set_from_genetic_string(&genome)?;
        instructions += match steps {
            Some(n) => {
                oci.interpret_n(n);
                n
            }
            None => oci.interpret().commands,
        };
        output_bytes += oci.output().len() as u64;
    }

    let elapsed = start.elapsed().as_secs_f64();
    info!(
        machine = oci.name(),
        genomes,
        instructions,
        output_bytes,
        seconds = elapsed,
        "bench finished"
    );
    let rate = if elapsed > 0.0 {
        instructions as f64 / elapsed
    } else {
        0.0
    };
    println!(
        "{} genomes, {} instructions, {} output bytes in {:.3}s ({:.1} Minstr/s)",
        genomes,
        instructions,
        output_bytes,
        elapsed,
        rate / 1e6
    );
    Ok(())
}
