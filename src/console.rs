//! Console listener for the runacovea binary.

// The star graph truncates on purpose
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use acovea::{Listener, OptionZScore, TestResult};
use chrono::Local;
use std::io::Write as _;
use std::thread;
use std::time::Duration;

/// Z-score magnitude above which an option is called out.
const ZSCORE_THRESHOLD: f64 = 1.5;

/// Width of the relative fitness graph, in stars.
const GRAPH_WIDTH: f64 = 50.0;

/// Renders engine progress to stdout/stderr, the way a terminal user
/// wants to watch a multi-hour run: a banner per generation, one dot
/// per completed trial, and a summary graph at the end.
#[derive(Debug, Default)]
pub(crate) struct ConsoleListener;

impl ConsoleListener {
    pub(crate) fn new() -> Self {
        Self
    }
}

impl Listener for ConsoleListener {
    fn ping_generation_begin(&mut self, generation: usize) {
        println!("------------------------------------------------------------");
        println!("generation {generation} begins");
    }

    fn ping_population_begin(&mut self, population: usize) {
        print!("\npopulation {population:2}: ");
        let _ = std::io::stdout().flush();
    }

    fn ping_fitness_test_end(&mut self, _organism: usize) {
        print!(".");
        let _ = std::io::stdout().flush();
    }

    fn report(&mut self, text: &str) {
        print!("{text}");
    }

    fn report_error(&mut self, text: &str) {
        eprint!("{text}");
    }

    fn report_config(&mut self, text: &str) {
        print!("{text}");
    }

    fn report_generation(&mut self, generation: usize, avg_fitness: f64) {
        println!("\n\ngeneration {generation} complete, average fitness: {avg_fitness}");
    }

    fn report_final(&mut self, results: &[TestResult], zscores: &[OptionZScore]) {
        println!(
            "\nAcovea completed its analysis at {}",
            Local::now().format("%Y %b %d %X")
        );

        print_flagged(zscores, "Optimistic", |z| z >= ZSCORE_THRESHOLD);
        print_flagged(zscores, "Pessimistic", |z| z <= -ZSCORE_THRESHOLD);

        for result in results {
            println!("\n{}:\n{}", result.description, result.detail);
        }

        if results.is_empty() {
            return;
        }

        let worst = results
            .iter()
            .map(|r| r.fitness)
            .fold(f64::MIN, f64::max)
            .max(f64::MIN_POSITIVE);

        println!("\n\nA relative graph of fitnesses:");
        for result in results {
            let stars = (result.fitness / worst * (GRAPH_WIDTH + 0.1)) as usize;
            println!(
                "\n{:>30}: {} ({})",
                result.description,
                "*".repeat(stars),
                result.fitness
            );
        }
    }

    fn run_complete(&mut self) {
        println!("\n\nAcovea is done.\n");
    }

    fn yield_now(&mut self) {
        // Children are polled, not blocked on; sleep instead of spinning.
        thread::sleep(Duration::from_millis(50));
    }
}

fn print_flagged(zscores: &[OptionZScore], label: &str, keep: impl Fn(f64) -> bool) {
    println!("\n{label} options:\n");

    let mut any = false;
    for z in zscores.iter().filter(|z| keep(z.zscore)) {
        any = true;
        println!("{:>40}  ({})", z.name, z.zscore);
    }

    if !any {
        println!("        none");
    }
}
