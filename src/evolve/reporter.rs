//! Statistics accumulation and the final report.
//!
//! The reporter watches each generation, counting which option tokens
//! the per-population best organisms enable. At the end of the run it
//! turns the cross-population totals into z-scores (flagging optimistic
//! and pessimistic options) and measures the evolved winners head to
//! head against the target's baseline configurations.

// Statistics use intentional precision-losing casts
#![allow(clippy::cast_precision_loss)]

use super::organism::Organism;
use crate::chromosome::Chromosome;
use crate::listener::{Listener, OptionZScore, TestResult};
use crate::runner::{OptimizationMode, Runner, BOGUS_FITNESS};
use crate::target::Target;
use std::path::Path;

/// Accumulates per-population best-organism gene frequencies.
#[derive(Debug)]
pub struct Reporter {
    num_populations: usize,
    /// Flattened report tokens: one per simple/tuning gene, one per
    /// enum choice, in gene order.
    token_names: Vec<String>,
    /// Flat token index of each gene position's first token.
    gene_base: Vec<usize>,
    /// Per token: counts for populations `0..P`, cross-population total
    /// at index `P`.
    counts: Vec<Vec<u64>>,
    /// Best organism of each population at the most recent generation.
    latest_bests: Vec<Option<Organism>>,
}

impl Reporter {
    /// Build the token catalog for a target.
    #[must_use]
    pub fn new(target: &Target, num_populations: usize) -> Self {
        let mut token_names = Vec::new();
        let mut gene_base = Vec::new();

        for gene in target.template().genes() {
            gene_base.push(token_names.len());
            token_names.extend(gene.report_tokens());
        }

        let counts = vec![vec![0u64; num_populations + 1]; token_names.len()];

        Self {
            num_populations,
            token_names,
            gene_base,
            counts,
            latest_bests: vec![None; num_populations],
        }
    }

    /// Record one completed generation.
    ///
    /// Counts the enabled tokens of each population's best organism
    /// (failed trials are ignored) and returns the average fitness over
    /// all measured organisms, or [`BOGUS_FITNESS`] when every trial in
    /// the generation failed.
    pub fn observe(&mut self, populations: &[Vec<Organism>]) -> f64 {
        let mut sum = 0.0;
        let mut measured = 0usize;

        for (p, population) in populations.iter().enumerate() {
            let mut best: Option<&Organism> = None;

            for org in population {
                if org.is_measured() {
                    sum += org.fitness;
                    measured += 1;
                    if best.is_none_or(|b| org.fitness < b.fitness) {
                        best = Some(org);
                    }
                }
            }

            if let Some(best) = best {
                self.accumulate(&best.chromosome, p);
                self.latest_bests[p] = Some(best.clone());
            } else {
                self.latest_bests[p] = None;
            }
        }

        if measured == 0 {
            BOGUS_FITNESS
        } else {
            sum / measured as f64
        }
    }

    /// The best organism across all populations at the latest
    /// generation, if any trial succeeded.
    #[must_use]
    pub fn best_of_best(&self) -> Option<&Organism> {
        self.latest_bests
            .iter()
            .flatten()
            .min_by(|a, b| a.fitness.total_cmp(&b.fitness))
    }

    fn accumulate(&mut self, options: &Chromosome, population: usize) {
        for (n, gene) in options.genes().iter().enumerate() {
            if gene.is_enabled() {
                let flat = self.gene_base[n] + gene.setting();
                self.counts[flat][population] += 1;
                self.counts[flat][self.num_populations] += 1;
            }
        }
    }

    /// Z-scores of every token's cross-population total.
    ///
    /// A degenerate distribution (σ = 0, e.g. a single token) reports
    /// zero for every token.
    #[must_use]
    pub fn zscores(&self) -> Vec<OptionZScore> {
        let totals: Vec<f64> = self
            .counts
            .iter()
            .map(|c| c[self.num_populations] as f64)
            .collect();

        let count = totals.len().max(1) as f64;
        let mean = totals.iter().sum::<f64>() / count;
        let variance = totals.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / count;
        let sigma = variance.sqrt();

        self.token_names
            .iter()
            .zip(&totals)
            .map(|(name, total)| OptionZScore {
                name: name.clone(),
                zscore: if sigma == 0.0 {
                    0.0
                } else {
                    round_sig((total - mean) / sigma, 4)
                },
            })
            .collect()
    }

    /// Run the final head-to-head measurements.
    ///
    /// Best-of-best and (for multiple populations) common-options trials
    /// run only when some organism actually measured; baselines always
    /// run, with an all-disabled chromosome for placeholder substitution.
    pub fn final_tests<R: Runner>(
        &self,
        target: &Target,
        input: &Path,
        mode: OptimizationMode,
        runner: &mut R,
        listener: &mut dyn Listener,
    ) -> Vec<TestResult> {
        let mut tests = Vec::new();

        if let Some(best) = self.best_of_best() {
            tests.push(run_prime_test(
                target,
                input,
                mode,
                runner,
                listener,
                "Acovea's Best-of-the-Best",
                &best.chromosome,
            ));

            if self.num_populations > 1 {
                let common = self.common_options(&best.chromosome);
                tests.push(run_prime_test(
                    target,
                    input,
                    mode,
                    runner,
                    listener,
                    "Acovea's Common Options",
                    &common,
                ));
            }
        }

        let empty = all_disabled(target);
        for baseline in target.baselines() {
            let artifact = runner.scratch_path();
            let command = target.command(baseline, input, &artifact, &empty);
            let fitness = runner.evaluate(&command, &artifact, mode, listener);
            tests.push(TestResult {
                description: baseline.description.clone(),
                detail: command.join(" "),
                fitness,
                acovea_generated: false,
            });
        }

        tests
    }

    /// Intersection of the per-population bests: a gene stays enabled
    /// only when every population's best enabled it.
    fn common_options(&self, seed: &Chromosome) -> Chromosome {
        let mut common = seed.clone();

        for (n, gene) in common.genes_mut().iter_mut().enumerate() {
            let everywhere = self.latest_bests.iter().all(|best| {
                best.as_ref()
                    .is_some_and(|b| b.chromosome.genes()[n].is_enabled())
            });
            gene.set_enabled(everywhere);
        }

        common
    }
}

fn run_prime_test<R: Runner>(
    target: &Target,
    input: &Path,
    mode: OptimizationMode,
    runner: &mut R,
    listener: &mut dyn Listener,
    description: &str,
    options: &Chromosome,
) -> TestResult {
    let artifact = runner.scratch_path();
    let command = target.prime_command(input, &artifact, options);
    let fitness = runner.evaluate(&command, &artifact, mode, listener);

    TestResult {
        description: description.to_string(),
        detail: command.join(" "),
        fitness,
        acovea_generated: true,
    }
}

fn all_disabled(target: &Target) -> Chromosome {
    let mut chromosome = target.template().clone();
    for gene in chromosome.genes_mut() {
        gene.set_enabled(false);
    }
    chromosome
}

/// Round to `digits` significant digits.
fn round_sig(value: f64, digits: i32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }

    let magnitude = value.abs().log10().floor() as i32;
    let factor = 10f64.powi(digits - 1 - magnitude);
    (value * factor).round() / factor
}
