//! Target-configuration loading.
//!
//! Configurations are JSON documents describing the command under test
//! and its flag catalog (see the repository's `configs/` directory for
//! examples). Parsing lands in plain serde structs, which then feed the
//! [`TargetBuilder`] so the same validation applies no matter where a
//! target comes from.

use crate::error::{AcoveaError, AcoveaResult};
use crate::target::Target;
use rand::Rng;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// On-disk form of a target configuration.
#[derive(Debug, Deserialize)]
struct TargetFile {
    #[serde(default)]
    description: String,
    #[serde(default)]
    config_version: String,
    #[serde(default)]
    quoted_options: bool,
    prime: CommandSpec,
    #[serde(default)]
    baselines: Vec<BaselineSpec>,
    #[serde(default)]
    version_probe: Option<String>,
    #[serde(default)]
    genes: Vec<GeneEntry>,
}

#[derive(Debug, Deserialize)]
struct CommandSpec {
    command: String,
    #[serde(default)]
    flags: String,
}

#[derive(Debug, Deserialize)]
struct BaselineSpec {
    #[serde(default)]
    description: String,
    command: String,
    #[serde(default)]
    flags: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum GeneEntry {
    Simple {
        value: String,
    },
    /// `value` is a pipe-delimited choice list, e.g. `"-O1|-O2|-O3"`.
    Enum {
        value: String,
    },
    Tuning {
        value: String,
        #[serde(default)]
        default: i64,
        #[serde(default)]
        min: i64,
        #[serde(default)]
        max: i64,
        #[serde(default)]
        step: i64,
        #[serde(default = "default_separator")]
        separator: char,
    },
}

fn default_separator() -> char {
    '='
}

/// Load and validate a target configuration from a JSON file.
///
/// Gene construction draws from `rng`, so the caller's seeded source
/// covers the template's construction-time randomization.
///
/// # Errors
///
/// Returns [`AcoveaError::ConfigMissing`] when the file cannot be read
/// and [`AcoveaError::ConfigInvalid`] when it cannot be parsed or
/// validated.
pub fn load_target<R: Rng>(path: &Path, rng: &mut R) -> AcoveaResult<Target> {
    let text =
        fs::read_to_string(path).map_err(|_| AcoveaError::ConfigMissing(path.to_path_buf()))?;
    parse_target(&text, rng)
}

/// Parse a target configuration from JSON text.
///
/// # Errors
///
/// Returns [`AcoveaError::ConfigInvalid`] on malformed JSON or a catalog
/// the builder rejects.
pub fn parse_target<R: Rng>(json: &str, rng: &mut R) -> AcoveaResult<Target> {
    let file: TargetFile =
        serde_json::from_str(json).map_err(|e| AcoveaError::ConfigInvalid(e.to_string()))?;

    let mut builder = Target::builder()
        .description(file.description)
        .config_version(file.config_version)
        .quoted_options(file.quoted_options)
        .prime(file.prime.command, file.prime.flags);

    if let Some(probe) = file.version_probe {
        builder = builder.version_probe(probe);
    }

    for baseline in file.baselines {
        builder = builder.baseline(baseline.description, baseline.command, baseline.flags);
    }

    for gene in file.genes {
        builder = match gene {
            GeneEntry::Simple { value } => builder.simple_gene(value),
            GeneEntry::Enum { value } => builder.enum_gene(value),
            GeneEntry::Tuning {
                value,
                default,
                min,
                max,
                step,
                separator,
            } => builder.tuning_gene(value, default, min, max, step, separator),
        };
    }

    builder.build(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gene::Gene;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::path::PathBuf;

    const SAMPLE: &str = r#"{
        "description": "gcc 13 on x86_64",
        "config_version": "1.1",
        "quoted_options": false,
        "prime": {
            "command": "gcc",
            "flags": "-o ACOVEA_OUTPUT ACOVEA_OPTIONS ACOVEA_INPUT -lm"
        },
        "version_probe": "gcc -dumpversion",
        "baselines": [
            {
                "description": "-O2 baseline",
                "command": "gcc",
                "flags": "-O2 -o ACOVEA_OUTPUT ACOVEA_INPUT -lm"
            }
        ],
        "genes": [
            { "type": "simple", "value": "-fgcse" },
            { "type": "enum", "value": "-O1|-O2|-O3" },
            {
                "type": "tuning",
                "value": "-finline-limit",
                "default": 600,
                "min": 100,
                "max": 1000,
                "step": 50,
                "separator": "="
            }
        ]
    }"#;

    #[test]
    fn test_parse_full_configuration() {
        let mut rng = SmallRng::seed_from_u64(42);
        let target = parse_target(SAMPLE, &mut rng).unwrap();

        assert_eq!(target.description(), "gcc 13 on x86_64");
        assert_eq!(target.config_version(), "1.1");
        assert_eq!(target.chromosome_length(), 3);
        assert_eq!(target.baselines().len(), 1);
        assert!(target.version_probe_command().is_some());

        let genes = target.template().genes();
        assert!(matches!(&genes[0], Gene::Simple { token, .. } if token == "-fgcse"));
        assert!(matches!(&genes[1], Gene::Enum { choices, .. } if choices.len() == 3));
        assert!(matches!(
            &genes[2],
            Gene::Tuning { separator: '=', step: 50, .. }
        ));
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        let mut rng = SmallRng::seed_from_u64(42);
        let result = parse_target("{ not json", &mut rng);
        assert!(matches!(result, Err(AcoveaError::ConfigInvalid(_))));
    }

    #[test]
    fn test_parse_rejects_missing_prime() {
        let mut rng = SmallRng::seed_from_u64(42);
        let result = parse_target(r#"{ "genes": [] }"#, &mut rng);
        assert!(matches!(result, Err(AcoveaError::ConfigInvalid(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let mut rng = SmallRng::seed_from_u64(42);
        let path = PathBuf::from("/nonexistent/acovea.json");
        let result = load_target(&path, &mut rng);
        assert!(matches!(result, Err(AcoveaError::ConfigMissing(_))));
    }

    #[test]
    fn test_genes_default_to_disabled() {
        let mut rng = SmallRng::seed_from_u64(42);
        let target = parse_target(SAMPLE, &mut rng).unwrap();
        assert!(target.template().genes().iter().all(|g| !g.is_enabled()));
    }
}
