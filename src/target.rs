//! Target description: what program to run and which flags to evolve.
//!
//! A target is the immutable catalog handed to the engine: the prime
//! command template, optional baselines and version probe, and the
//! template chromosome from which all organisms descend. It is also the
//! factory for chromosomes (random, bred, mutated) so that every
//! chromosome in a run shares the template's shape.
//!
//! Command templates are whitespace-split token lists with three
//! placeholders substituted at materialization time: `ACOVEA_INPUT`
//! (source path), `ACOVEA_OUTPUT` (scratch artifact path), and
//! `ACOVEA_OPTIONS` (the rendered, enabled genes).

use crate::chromosome::Chromosome;
use crate::error::{AcoveaError, AcoveaResult};
use crate::gene::Gene;
use rand::Rng;
use std::path::Path;

/// Placeholder replaced with the source-file path.
pub const ACOVEA_INPUT: &str = "ACOVEA_INPUT";
/// Placeholder replaced with the scratch artifact path.
pub const ACOVEA_OUTPUT: &str = "ACOVEA_OUTPUT";
/// Placeholder replaced with the rendered options.
pub const ACOVEA_OPTIONS: &str = "ACOVEA_OPTIONS";

/// One command template: a program plus a flags string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    /// Human-readable label ("Prime", or a baseline description).
    pub description: String,
    /// Program to invoke.
    pub command: String,
    /// Whitespace-split argument template with placeholders.
    pub flags: String,
}

/// Immutable description of the program under test and its flag catalog.
#[derive(Debug, Clone)]
pub struct Target {
    description: String,
    config_version: String,
    quoted_options: bool,
    prime: CommandTemplate,
    baselines: Vec<CommandTemplate>,
    version_probe: Option<Vec<String>>,
    template: Chromosome,
}

impl Target {
    /// Start building a target.
    #[must_use]
    pub fn builder() -> TargetBuilder {
        TargetBuilder::default()
    }

    /// Description string from the configuration.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Version string of the configuration itself.
    #[must_use]
    pub fn config_version(&self) -> &str {
        &self.config_version
    }

    /// The prime command template.
    #[must_use]
    pub fn prime(&self) -> &CommandTemplate {
        &self.prime
    }

    /// Baseline command templates, in configuration order.
    #[must_use]
    pub fn baselines(&self) -> &[CommandTemplate] {
        &self.baselines
    }

    /// The version-probe command, already whitespace-split.
    #[must_use]
    pub fn version_probe_command(&self) -> Option<&[String]> {
        self.version_probe.as_deref()
    }

    /// The template chromosome all organisms descend from.
    #[must_use]
    pub fn template(&self) -> &Chromosome {
        &self.template
    }

    /// Number of genes in the catalog.
    #[must_use]
    pub fn chromosome_length(&self) -> usize {
        self.template.len()
    }

    /// A fresh chromosome: template shape, randomized genes.
    #[must_use]
    pub fn random_chromosome<R: Rng>(&self, rng: &mut R) -> Chromosome {
        Chromosome::random_from(&self.template, rng)
    }

    /// Breed two chromosomes from this target.
    ///
    /// # Errors
    ///
    /// Returns [`AcoveaError::ShapeMismatch`] when the parents have
    /// different lengths.
    pub fn breed<R: Rng>(
        &self,
        parent1: &Chromosome,
        parent2: &Chromosome,
        rng: &mut R,
    ) -> AcoveaResult<Chromosome> {
        Chromosome::breed(parent1, parent2, rng)
    }

    /// Mutate a chromosome in place at the given per-gene rate.
    pub fn mutate<R: Rng>(&self, chromosome: &mut Chromosome, rate: f64, rng: &mut R) {
        chromosome.mutate(rate, rng);
    }

    /// Materialize the prime command for one trial.
    #[must_use]
    pub fn prime_command(
        &self,
        input: &Path,
        output: &Path,
        options: &Chromosome,
    ) -> Vec<String> {
        self.command(&self.prime, input, output, options)
    }

    /// Materialize any command template for one trial.
    ///
    /// Tokens are passed through verbatim except for placeholder
    /// substitution. With `quoted_options` the rendered options are
    /// spliced into the token carrying `ACOVEA_OPTIONS`; without it that
    /// token is dropped and each rendered option becomes its own argv
    /// entry at the same position.
    #[must_use]
    pub fn command(
        &self,
        template: &CommandTemplate,
        input: &Path,
        output: &Path,
        options: &Chromosome,
    ) -> Vec<String> {
        let input = input.display().to_string();
        let output = output.display().to_string();

        let mut argv = vec![template.command.clone()];

        for token in template.flags.split_whitespace() {
            let mut token = token.replace(ACOVEA_INPUT, &input);
            token = token.replace(ACOVEA_OUTPUT, &output);

            if token.contains(ACOVEA_OPTIONS) {
                if self.quoted_options {
                    let rendered = options.render_enabled().join(" ");
                    argv.push(token.replace(ACOVEA_OPTIONS, &rendered));
                } else {
                    argv.extend(options.render_enabled());
                }
            } else {
                argv.push(token);
            }
        }

        argv
    }
}

/// Builder used by configuration loaders to register genes positionally
/// and validate the resulting template.
#[derive(Debug, Default)]
pub struct TargetBuilder {
    description: String,
    config_version: String,
    quoted_options: bool,
    prime: Option<(String, String)>,
    baselines: Vec<CommandTemplate>,
    version_probe: Option<String>,
    genes: Vec<GeneSpec>,
}

/// Deferred gene description; construction-time randomization happens in
/// [`TargetBuilder::build`], where the run's RNG is available.
#[derive(Debug, Clone)]
enum GeneSpec {
    Simple {
        token: String,
    },
    Enum {
        choices: Vec<String>,
    },
    Tuning {
        name: String,
        default: i64,
        min: i64,
        max: i64,
        step: i64,
        separator: char,
    },
}

impl TargetBuilder {
    /// Set the configuration description.
    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    /// Set the configuration version string.
    #[must_use]
    pub fn config_version(mut self, version: impl Into<String>) -> Self {
        self.config_version = version.into();
        self
    }

    /// Splice options inside the placeholder token instead of as
    /// separate argv entries.
    #[must_use]
    pub fn quoted_options(mut self, quoted: bool) -> Self {
        self.quoted_options = quoted;
        self
    }

    /// Set the prime command and flags template.
    #[must_use]
    pub fn prime(mut self, command: impl Into<String>, flags: impl Into<String>) -> Self {
        self.prime = Some((command.into(), flags.into()));
        self
    }

    /// Add a baseline command for the final comparison.
    #[must_use]
    pub fn baseline(
        mut self,
        description: impl Into<String>,
        command: impl Into<String>,
        flags: impl Into<String>,
    ) -> Self {
        self.baselines.push(CommandTemplate {
            description: description.into(),
            command: command.into(),
            flags: flags.into(),
        });
        self
    }

    /// Set the command probed once at engine start for a version line.
    #[must_use]
    pub fn version_probe(mut self, command: impl Into<String>) -> Self {
        self.version_probe = Some(command.into());
        self
    }

    /// Register a simple gene at the next position.
    #[must_use]
    pub fn simple_gene(mut self, token: impl Into<String>) -> Self {
        self.genes.push(GeneSpec::Simple {
            token: token.into(),
        });
        self
    }

    /// Register an enum gene from a pipe-delimited choice list.
    #[must_use]
    pub fn enum_gene(mut self, choices: impl AsRef<str>) -> Self {
        self.genes.push(GeneSpec::Enum {
            choices: choices
                .as_ref()
                .split('|')
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
        });
        self
    }

    /// Register a tuning gene at the next position.
    #[must_use]
    pub fn tuning_gene(
        mut self,
        name: impl Into<String>,
        default: i64,
        min: i64,
        max: i64,
        step: i64,
        separator: char,
    ) -> Self {
        self.genes.push(GeneSpec::Tuning {
            name: name.into(),
            default,
            min,
            max,
            step,
            separator,
        });
        self
    }

    /// Validate and construct the target.
    ///
    /// Genes are constructed here, with their construction-time
    /// randomization drawn from `rng`: enum selections start at a random
    /// choice and tuning values carry their initial jitter.
    ///
    /// # Errors
    ///
    /// Returns [`AcoveaError::ConfigInvalid`] when no prime command was
    /// set or an enum gene has no choices.
    pub fn build<R: Rng>(self, rng: &mut R) -> AcoveaResult<Target> {
        let (command, flags) = self.prime.ok_or_else(|| {
            AcoveaError::ConfigInvalid("no prime command defined".to_string())
        })?;

        if command.is_empty() {
            return Err(AcoveaError::ConfigInvalid(
                "prime command is empty".to_string(),
            ));
        }

        let mut genes = Vec::with_capacity(self.genes.len());
        for spec in self.genes {
            match spec {
                GeneSpec::Simple { token } => genes.push(Gene::simple(token, false)),
                GeneSpec::Enum { choices } => {
                    if choices.is_empty() {
                        return Err(AcoveaError::ConfigInvalid(
                            "enum gene has no choices".to_string(),
                        ));
                    }
                    genes.push(Gene::enumerated(choices, false, rng));
                }
                GeneSpec::Tuning {
                    name,
                    default,
                    min,
                    max,
                    step,
                    separator,
                } => genes.push(Gene::tuning(
                    name, false, default, min, max, step, separator, rng,
                )),
            }
        }

        Ok(Target {
            description: self.description,
            config_version: self.config_version,
            quoted_options: self.quoted_options,
            prime: CommandTemplate {
                description: "Prime".to_string(),
                command,
                flags,
            },
            baselines: self.baselines,
            version_probe: self
                .version_probe
                .map(|probe| probe.split_whitespace().map(str::to_string).collect()),
            template: Chromosome::new(genes),
        })
    }
}
