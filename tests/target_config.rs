//! Integration tests for loading target configurations from disk.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use acovea::{AcoveaError, Gene};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::io::Write;
use std::path::PathBuf;

const GCC_CONFIG: &str = r#"{
    "description": "gcc 13 baseline sweep",
    "config_version": "1.0",
    "quoted_options": false,
    "prime": {
        "command": "gcc",
        "flags": "-lrt -lm -std=gnu99 -o ACOVEA_OUTPUT ACOVEA_OPTIONS ACOVEA_INPUT"
    },
    "version_probe": "gcc -dumpversion",
    "baselines": [
        {
            "description": "gcc -O1",
            "command": "gcc",
            "flags": "-lrt -lm -std=gnu99 -O1 -o ACOVEA_OUTPUT ACOVEA_INPUT"
        },
        {
            "description": "gcc -O2",
            "command": "gcc",
            "flags": "-lrt -lm -std=gnu99 -O2 -o ACOVEA_OUTPUT ACOVEA_INPUT"
        },
        {
            "description": "gcc -O3",
            "command": "gcc",
            "flags": "-lrt -lm -std=gnu99 -O3 -o ACOVEA_OUTPUT ACOVEA_INPUT"
        }
    ],
    "genes": [
        { "type": "simple", "value": "-fno-guess-branch-probability" },
        { "type": "simple", "value": "-fgcse" },
        { "type": "simple", "value": "-ffast-math" },
        { "type": "enum", "value": "-O1|-O2|-O3" },
        {
            "type": "tuning",
            "value": "-finline-limit",
            "default": 600,
            "min": 100,
            "max": 10000,
            "step": 100,
            "separator": "="
        }
    ]
}"#;

#[test]
fn test_load_target_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gcc13.json");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(GCC_CONFIG.as_bytes()).unwrap();

    let mut rng = SmallRng::seed_from_u64(42);
    let target = acovea::config::load_target(&path, &mut rng).unwrap();

    assert_eq!(target.description(), "gcc 13 baseline sweep");
    assert_eq!(target.chromosome_length(), 5);
    assert_eq!(target.baselines().len(), 3);
    assert_eq!(target.baselines()[1].description, "gcc -O2");

    // Every catalog gene starts disabled; randomization happens per
    // organism, not in the template's enabled bits.
    assert!(target.template().genes().iter().all(|g| !g.is_enabled()));

    // The tuning gene's jitter stays within its declared range.
    match &target.template().genes()[4] {
        Gene::Tuning {
            min, max, value, ..
        } => {
            assert_eq!((*min, *max), (100, 10000));
            assert!(value >= min && value <= max);
        }
        other => panic!("expected tuning gene, got {other:?}"),
    }
}

#[test]
fn test_load_target_missing_file() {
    let mut rng = SmallRng::seed_from_u64(42);
    let result = acovea::config::load_target(&PathBuf::from("/no/such/config.json"), &mut rng);
    assert!(matches!(result, Err(AcoveaError::ConfigMissing(_))));
}

#[test]
fn test_load_target_rejects_garbage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "<xml-was-last-century/>").unwrap();

    let mut rng = SmallRng::seed_from_u64(42);
    let result = acovea::config::load_target(&path, &mut rng);
    assert!(matches!(result, Err(AcoveaError::ConfigInvalid(_))));
}

#[test]
fn test_same_seed_builds_identical_templates() {
    let build = || {
        let mut rng = SmallRng::seed_from_u64(99);
        acovea::config::parse_target(GCC_CONFIG, &mut rng).unwrap()
    };

    let a = build();
    let b = build();
    assert_eq!(a.template(), b.template());
}
