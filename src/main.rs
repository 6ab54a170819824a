//! runacovea - driver for the ACOVEA genetic algorithm.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod console;

use acovea::{
    AcoveaError, EvolutionConfig, OptimizationMode, SubprocessRunner, World,
};
use clap::Parser;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

/// Find compiler flag combinations that minimize a measured cost.
#[derive(Parser, Debug)]
#[command(name = "runacovea")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Target configuration file (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Benchmark source file to compile and measure
    #[arg(short, long)]
    input: PathBuf,

    /// Number of populations to create
    #[arg(short = 'n', long, default_value = "5")]
    populations: usize,

    /// Size of each population
    #[arg(short = 'p', long, default_value = "40")]
    population_size: usize,

    /// Number of generations to run
    #[arg(short, long, default_value = "20")]
    generations: usize,

    /// Survival rate (between 0.0 and 1.0)
    #[arg(long, default_value = "0.10")]
    survival_rate: f64,

    /// Migration rate (between 0.0 and 0.9)
    #[arg(long, default_value = "0.05")]
    migration_rate: f64,

    /// Mutation rate (between 0.0 and 0.95)
    #[arg(long, default_value = "0.01")]
    mutation_rate: f64,

    /// Crossover rate (between 0.0 and 1.0)
    #[arg(long, default_value = "1.0")]
    crossover_rate: f64,

    /// Disable sigma fitness scaling
    #[arg(long)]
    no_scaling: bool,

    /// Optimize for artifact size instead of speed
    #[arg(long, conflicts_with = "retval")]
    size: bool,

    /// Optimize for benchmark exit status instead of speed
    #[arg(long)]
    retval: bool,

    /// Random number seed (default: system time)
    #[arg(short, long)]
    seed: Option<u64>,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // Help and version requests are not errors.
            if e.use_stderr() {
                let _ = e.print();
                return ExitCode::FAILURE;
            }
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), AcoveaError> {
    println!(
        "\nAcovea {}\nEvolving Better Software\n",
        env!("CARGO_PKG_VERSION")
    );

    let seed = args.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(42)
    });

    // One seeded source covers target construction and the whole run.
    let mut rng = SmallRng::seed_from_u64(seed);
    let target = acovea::config::load_target(&args.config, &mut rng)?;

    let mode = if args.size {
        OptimizationMode::Size
    } else if args.retval {
        OptimizationMode::Retval
    } else {
        OptimizationMode::Speed
    };

    let config = EvolutionConfig {
        num_populations: args.populations,
        population_size: args.population_size,
        generations: args.generations,
        survival_rate: args.survival_rate,
        migration_rate: args.migration_rate,
        mutation_rate: args.mutation_rate,
        crossover_rate: args.crossover_rate,
        use_scaling: !args.no_scaling,
        seed,
    };

    let mut listener = console::ConsoleListener::new();
    let mut world = World::with_rng(
        &target,
        args.input,
        mode,
        SubprocessRunner::new(),
        config,
        rng,
    );

    world.run(&mut listener).map(|_| ())
}
