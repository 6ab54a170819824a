//! The generational loop: evaluation, selection, reproduction,
//! mutation, and cross-population migration.
//!
//! A [`World`] owns `P` parallel populations and runs them for `G`
//! generations. Within one generation every organism is measured by the
//! runner, the population is sorted and truncated to its survivors, and
//! the next generation is refilled by roulette-wheel reproduction over
//! the survivors' scaled weights. The single best organism of each
//! population (the elite) carries over unmodified. Between generations,
//! random organisms are swapped between populations.

// Rate arithmetic uses intentional casts
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use super::organism::Organism;
use super::reporter::Reporter;
use super::scaling::Scaler;
use super::selection::{survivor_count, RouletteWheel};
use crate::error::{AcoveaError, AcoveaResult};
use crate::listener::Listener;
use crate::runner::{OptimizationMode, Runner, BOGUS_FITNESS};
use crate::target::Target;
use chrono::Local;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::fmt::Write as _;
use std::path::PathBuf;

/// Bounded retries when resampling a distinct second parent; a wheel
/// dominated by a single survivor would otherwise spin forever.
const DISTINCT_PARENT_RETRIES: usize = 32;

/// Evolutionary hyperparameters.
///
/// Out-of-range values are silently clamped at world construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvolutionConfig {
    /// Number of parallel populations; at least 1.
    pub num_populations: usize,
    /// Organisms per population; at least 2.
    pub population_size: usize,
    /// Generations to run; at least 1.
    pub generations: usize,
    /// Fraction of each population retained by truncation, in [0, 1].
    pub survival_rate: f64,
    /// Fraction of each population swapped between populations each
    /// generation, in [0, 0.9].
    pub migration_rate: f64,
    /// Per-gene mutation probability, in [0, 0.95].
    pub mutation_rate: f64,
    /// Probability a child is bred from two parents rather than cloned,
    /// in [0, 1].
    pub crossover_rate: f64,
    /// Use sigma scaling instead of plain inversion.
    pub use_scaling: bool,
    /// Seed for the run's random source.
    pub seed: u64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            num_populations: 5,
            population_size: 40,
            generations: 20,
            survival_rate: 0.10,
            migration_rate: 0.05,
            mutation_rate: 0.01,
            crossover_rate: 1.00,
            use_scaling: true,
            seed: 42,
        }
    }
}

impl EvolutionConfig {
    /// Clamp every hyperparameter into its legal range.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.num_populations = self.num_populations.max(1);
        self.population_size = self.population_size.max(2);
        self.generations = self.generations.max(1);
        self.survival_rate = self.survival_rate.clamp(0.0, 1.0);
        self.migration_rate = self.migration_rate.clamp(0.0, 0.9);
        self.mutation_rate = self.mutation_rate.clamp(0.0, 0.95);
        self.crossover_rate = self.crossover_rate.clamp(0.0, 1.0);
        self
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Generations actually evaluated.
    pub generations_run: usize,
    /// Fitness of the best organism at the final generation, or
    /// [`BOGUS_FITNESS`] when every trial failed.
    pub best_fitness: f64,
    /// Rendered options of that organism.
    pub best_options: Vec<String>,
}

/// The populations, their ecology, and the generational loop.
pub struct World<'a, R: Runner> {
    target: &'a Target,
    input: PathBuf,
    mode: OptimizationMode,
    runner: R,
    config: EvolutionConfig,
    scaler: Scaler,
    rng: SmallRng,
    populations: Vec<Vec<Organism>>,
    reporter: Reporter,
}

impl<'a, R: Runner> World<'a, R> {
    /// Create a world seeded from `config.seed`.
    #[must_use]
    pub fn new(
        target: &'a Target,
        input: impl Into<PathBuf>,
        mode: OptimizationMode,
        runner: R,
        config: EvolutionConfig,
    ) -> Self {
        let rng = SmallRng::seed_from_u64(config.seed);
        Self::with_rng(target, input, mode, runner, config, rng)
    }

    /// Create a world continuing an existing random source, so target
    /// construction and evolution share one seeded stream.
    #[must_use]
    pub fn with_rng(
        target: &'a Target,
        input: impl Into<PathBuf>,
        mode: OptimizationMode,
        runner: R,
        config: EvolutionConfig,
        mut rng: SmallRng,
    ) -> Self {
        let config = config.clamped();

        let populations = (0..config.num_populations)
            .map(|_| {
                (0..config.population_size)
                    .map(|_| Organism::random(target, &mut rng))
                    .collect()
            })
            .collect();

        let reporter = Reporter::new(target, config.num_populations);
        let scaler = if config.use_scaling {
            Scaler::Sigma
        } else {
            Scaler::Null
        };

        Self {
            target,
            input: input.into(),
            mode,
            runner,
            config,
            scaler,
            rng,
            populations,
            reporter,
        }
    }

    /// Run the algorithm to completion.
    ///
    /// The final report is emitted on every path, including an abort
    /// requested by the listener.
    ///
    /// # Errors
    ///
    /// Returns [`AcoveaError::Aborted`] when the listener requested
    /// termination, and [`AcoveaError::ShapeMismatch`] on the
    /// programmer error of breeding mismatched chromosomes.
    pub fn run(&mut self, listener: &mut dyn Listener) -> AcoveaResult<RunSummary> {
        let header = self.config_header(listener);
        listener.report_config(&header);

        let mut aborted = false;
        let mut generations_run = 0;

        for generation in 1..=self.config.generations {
            if listener.should_abort() {
                listener.report_error("run aborted\n");
                aborted = true;
                break;
            }

            listener.ping_generation_begin(generation);
            self.evaluate_all(listener);

            let avg_fitness = self.reporter.observe(&self.populations);
            listener.report_generation(generation, avg_fitness);
            listener.ping_generation_end(generation);
            generations_run = generation;

            if generation < self.config.generations {
                self.next_generation()?;
                self.migrate();
            }
        }

        let zscores = self.reporter.zscores();
        let tests = self.reporter.final_tests(
            self.target,
            &self.input,
            self.mode,
            &mut self.runner,
            listener,
        );
        listener.report_final(&tests, &zscores);
        listener.run_complete();

        if aborted {
            return Err(AcoveaError::Aborted);
        }

        let (best_fitness, best_options) = match self.reporter.best_of_best() {
            Some(best) => (best.fitness, best.chromosome.render_enabled()),
            None => (BOGUS_FITNESS, Vec::new()),
        };

        Ok(RunSummary {
            generations_run,
            best_fitness,
            best_options,
        })
    }

    /// Measure every organism in every population.
    fn evaluate_all(&mut self, listener: &mut dyn Listener) {
        for p in 0..self.populations.len() {
            listener.ping_population_begin(p);

            for o in 0..self.populations[p].len() {
                listener.ping_fitness_test_begin(o);

                let artifact = self.runner.scratch_path();
                let command = self.target.prime_command(
                    &self.input,
                    &artifact,
                    &self.populations[p][o].chromosome,
                );
                let fitness = self.runner.evaluate(&command, &artifact, self.mode, listener);
                self.populations[p][o].fitness = fitness;

                listener.ping_fitness_test_end(o);
                listener.yield_now();
            }

            listener.ping_population_end(p);
        }
    }

    /// Advance one population through selection, reproduction, and
    /// mutation. The elite (slot 0 after the sort) is never mutated.
    fn next_generation(&mut self) -> AcoveaResult<()> {
        for p in 0..self.populations.len() {
            let mut population = std::mem::take(&mut self.populations[p]);
            population.sort_by(|a, b| a.fitness.total_cmp(&b.fitness));

            // Costs go in sorted, so the survivor prefix of the weight
            // vector lines up with the truncated population.
            let costs: Vec<f64> = population.iter().map(|o| o.fitness).collect();
            let weights = self.scaler.weights(&costs);

            let survivors = survivor_count(population.len(), self.config.survival_rate);
            population.truncate(survivors);
            let wheel = RouletteWheel::new(&weights[..survivors]);

            while population.len() < self.config.population_size {
                let first = wheel.spin(&mut self.rng);

                let child = if self.rng.gen_bool(self.config.crossover_rate) && survivors > 1 {
                    let second = self.distinct_parent(&wheel, first);
                    let genes = self.target.breed(
                        &population[first].chromosome,
                        &population[second].chromosome,
                        &mut self.rng,
                    )?;
                    Organism::new(genes)
                } else {
                    population[first].clone()
                };

                population.push(child);
            }

            for org in &mut population[1..] {
                self.target
                    .mutate(&mut org.chromosome, self.config.mutation_rate, &mut self.rng);
            }

            self.populations[p] = population;
        }

        Ok(())
    }

    /// Draw a second parent distinct from `first`, falling back to a
    /// uniform pick when the wheel keeps returning the same survivor.
    fn distinct_parent(&mut self, wheel: &RouletteWheel, first: usize) -> usize {
        for _ in 0..DISTINCT_PARENT_RETRIES {
            let second = wheel.spin(&mut self.rng);
            if second != first {
                return second;
            }
        }

        let offset = self.rng.gen_range(1..wheel.len());
        (first + offset) % wheel.len()
    }

    /// Swap random organisms between populations, once per generation.
    /// Pure exchange: population sizes and the overall organism multiset
    /// are unchanged.
    fn migrate(&mut self) {
        let pop_count = self.populations.len();
        if pop_count < 2 {
            return;
        }

        let migrants =
            (self.config.population_size as f64 * self.config.migration_rate).ceil() as usize;

        for p in 0..pop_count {
            for _ in 0..migrants {
                let i = self.rng.gen_range(0..self.populations[p].len());

                // Any population but this one.
                let mut q = self.rng.gen_range(0..pop_count - 1);
                if q >= p {
                    q += 1;
                }
                let j = self.rng.gen_range(0..self.populations[q].len());

                swap_between(&mut self.populations, p, i, q, j);
            }
        }
    }

    /// Build the run-header text sent through `report_config`.
    fn config_header(&mut self, listener: &mut dyn Listener) -> String {
        let version_text = match self.target.version_probe_command() {
            Some(command) => self
                .runner
                .probe_version(command, listener)
                .unwrap_or_else(|| "unavailable".to_string()),
            None => "not requested".to_string(),
        };

        let survivors = survivor_count(self.config.population_size, self.config.survival_rate);
        let migrants =
            (self.config.population_size as f64 * self.config.migration_rate).ceil() as usize;

        let mut text = String::new();
        let _ = write!(
            text,
            "\n   test application: {}\
             \n config description: {} (version {})\
             \n     acovea version: {}\
             \napplication version: {} {}\
             \n   # of populations: {}\
             \n    population size: {}\
             \n      survival rate: {}% ({})\
             \n     migration rate: {}% ({})\
             \n      mutation rate: {}%\
             \n     crossover rate: {}%\
             \n    fitness scaling: {}\
             \n generations to run: {}\
             \n random number seed: {}\
             \n       testing mode: {}\
             \n    test start time: {}\n\n",
            self.input.display(),
            self.target.description(),
            self.target.config_version(),
            env!("CARGO_PKG_VERSION"),
            self.target.prime().command,
            version_text,
            self.config.num_populations,
            self.config.population_size,
            self.config.survival_rate * 100.0,
            survivors,
            self.config.migration_rate * 100.0,
            migrants,
            self.config.mutation_rate * 100.0,
            self.config.crossover_rate * 100.0,
            self.scaler.name(),
            self.config.generations,
            self.config.seed,
            self.mode.name(),
            Local::now().format("%Y %b %d %X"),
        );
        text
    }
}

fn swap_between(populations: &mut [Vec<Organism>], p: usize, i: usize, q: usize, j: usize) {
    debug_assert_ne!(p, q);
    let (a, b) = if p < q {
        let (left, right) = populations.split_at_mut(q);
        (&mut left[p][i], &mut right[0][j])
    } else {
        let (left, right) = populations.split_at_mut(p);
        (&mut right[0][i], &mut left[q][j])
    };
    std::mem::swap(a, b);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::NullListener;
    use std::path::Path;

    /// Deterministic runner: one flat cost for everything.
    struct FlatRunner;

    impl Runner for FlatRunner {
        fn scratch_path(&mut self) -> PathBuf {
            PathBuf::from("/tmp/ACOVEA_TEST")
        }

        fn evaluate(
            &mut self,
            _command: &[String],
            _artifact: &Path,
            _mode: OptimizationMode,
            _listener: &mut dyn Listener,
        ) -> f64 {
            1.0
        }
    }

    fn small_target(rng: &mut SmallRng) -> Target {
        Target::builder()
            .prime("gcc", "-o ACOVEA_OUTPUT ACOVEA_OPTIONS ACOVEA_INPUT")
            .simple_gene("-fgcse")
            .simple_gene("-ffast-math")
            .simple_gene("-funroll-loops")
            .build(rng)
            .unwrap()
    }

    fn small_config() -> EvolutionConfig {
        EvolutionConfig {
            num_populations: 3,
            population_size: 6,
            generations: 2,
            ..EvolutionConfig::default()
        }
    }

    #[test]
    fn test_config_clamps() {
        let config = EvolutionConfig {
            num_populations: 0,
            population_size: 0,
            generations: 0,
            survival_rate: -1.0,
            migration_rate: 2.0,
            mutation_rate: 0.99,
            crossover_rate: 7.0,
            use_scaling: false,
            seed: 1,
        }
        .clamped();

        assert_eq!(config.num_populations, 1);
        assert_eq!(config.population_size, 2);
        assert_eq!(config.generations, 1);
        assert_eq!(config.survival_rate, 0.0);
        assert_eq!(config.migration_rate, 0.9);
        assert_eq!(config.mutation_rate, 0.95);
        assert_eq!(config.crossover_rate, 1.0);
    }

    #[test]
    fn test_migration_conserves_organisms() {
        let mut rng = SmallRng::seed_from_u64(42);
        let target = small_target(&mut rng);
        let mut world = World::new(
            &target,
            "bench.c",
            OptimizationMode::Speed,
            FlatRunner,
            EvolutionConfig {
                migration_rate: 0.5,
                ..small_config()
            },
        );

        // Tag each organism with a distinct fitness marker.
        let mut marker = 0.0;
        for population in &mut world.populations {
            for org in population.iter_mut() {
                org.fitness = marker;
                marker += 1.0;
            }
        }

        let mut before: Vec<f64> = world
            .populations
            .iter()
            .flatten()
            .map(|o| o.fitness)
            .collect();
        let sizes: Vec<usize> = world.populations.iter().map(Vec::len).collect();

        world.migrate();

        let mut after: Vec<f64> = world
            .populations
            .iter()
            .flatten()
            .map(|o| o.fitness)
            .collect();
        before.sort_by(f64::total_cmp);
        after.sort_by(f64::total_cmp);

        assert_eq!(before, after, "migration must be a pure swap");
        assert_eq!(
            sizes,
            world.populations.iter().map(Vec::len).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_no_crossover_children_are_clones() {
        let mut rng = SmallRng::seed_from_u64(42);
        let target = small_target(&mut rng);
        let mut world = World::new(
            &target,
            "bench.c",
            OptimizationMode::Speed,
            FlatRunner,
            EvolutionConfig {
                crossover_rate: 0.0,
                mutation_rate: 0.0,
                ..small_config()
            },
        );

        for (n, population) in world.populations.iter_mut().enumerate() {
            for (o, org) in population.iter_mut().enumerate() {
                org.fitness = (n * 10 + o) as f64;
            }
        }
        let survivors: Vec<Vec<Organism>> = world.populations.clone();

        world.next_generation().unwrap();

        for (population, old) in world.populations.iter().zip(&survivors) {
            assert_eq!(population.len(), 6);
            for org in population {
                assert!(
                    old.iter().any(|s| s.chromosome == org.chromosome),
                    "every child must be an exact clone of a parent"
                );
            }
        }
    }

    #[test]
    fn test_elite_survives_unmutated() {
        let mut rng = SmallRng::seed_from_u64(42);
        let target = small_target(&mut rng);
        let mut world = World::new(
            &target,
            "bench.c",
            OptimizationMode::Speed,
            FlatRunner,
            EvolutionConfig {
                mutation_rate: 0.95,
                ..small_config()
            },
        );

        for population in &mut world.populations {
            for (o, org) in population.iter_mut().enumerate() {
                org.fitness = o as f64;
            }
        }
        let elites: Vec<_> = world
            .populations
            .iter()
            .map(|p| p[0].chromosome.clone())
            .collect();

        world.next_generation().unwrap();

        for (population, elite) in world.populations.iter().zip(&elites) {
            assert_eq!(
                &population[0].chromosome, elite,
                "slot zero must carry the elite unmodified"
            );
        }
    }

    #[test]
    fn test_minimal_population_with_zero_survival() {
        let mut rng = SmallRng::seed_from_u64(42);
        let target = small_target(&mut rng);
        let mut world = World::new(
            &target,
            "bench.c",
            OptimizationMode::Speed,
            FlatRunner,
            EvolutionConfig {
                num_populations: 1,
                population_size: 2,
                survival_rate: 0.0,
                generations: 2,
                ..EvolutionConfig::default()
            },
        );

        let mut listener = NullListener;
        let summary = world.run(&mut listener).unwrap();
        assert_eq!(summary.generations_run, 2);
    }

    #[test]
    fn test_zero_gene_template_runs() {
        let mut rng = SmallRng::seed_from_u64(42);
        let target = Target::builder()
            .prime("/bin/true", "ACOVEA_OPTIONS")
            .build(&mut rng)
            .unwrap();

        let mut world = World::new(
            &target,
            "bench.c",
            OptimizationMode::Speed,
            FlatRunner,
            small_config(),
        );

        let mut listener = NullListener;
        let summary = world.run(&mut listener).unwrap();
        assert_eq!(summary.generations_run, 2);
        assert!(summary.best_options.is_empty());
    }

    #[test]
    fn test_abort_before_first_generation() {
        struct AbortingListener;
        impl Listener for AbortingListener {
            fn should_abort(&self) -> bool {
                true
            }
        }

        let mut rng = SmallRng::seed_from_u64(42);
        let target = small_target(&mut rng);
        let mut world = World::new(
            &target,
            "bench.c",
            OptimizationMode::Speed,
            FlatRunner,
            small_config(),
        );

        let mut listener = AbortingListener;
        let result = world.run(&mut listener);
        assert!(matches!(result, Err(AcoveaError::Aborted)));
    }
}
