// Allow unwrap in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! ACOVEA: Analysis of Compiler Options Via Evolution Algorithm.
//!
//! Searches the combinatorial space of compiler (or any command-line
//! tool) flag settings for combinations that minimize a measured cost:
//! the wall-clock runtime of a compiled benchmark, the artifact's size,
//! or its exit status.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │        Evolution Engine             │
//! ├─────────────────────────────────────┤
//! │  Target Description │ Gene Model    │
//! ├─────────────────────────────────────┤
//! │   Trial Runner (compile + measure)  │
//! ├─────────────────────────────────────┤
//! │   Listener (all progress I/O)       │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use acovea::{EvolutionConfig, OptimizationMode, SubprocessRunner, World};
//!
//! let mut rng = rand::rngs::SmallRng::seed_from_u64(42);
//! let target = acovea::config::load_target("gcc.json".as_ref(), &mut rng)?;
//! let mut world = World::with_rng(
//!     &target,
//!     "almabench.c",
//!     OptimizationMode::Speed,
//!     SubprocessRunner::new(),
//!     EvolutionConfig::default(),
//!     rng,
//! );
//! let summary = world.run(&mut listener)?;
//! ```

pub mod chromosome;
pub mod config;
pub mod error;
pub mod evolve;
pub mod gene;
pub mod listener;
pub mod runner;
pub mod target;

pub use chromosome::Chromosome;
pub use error::{AcoveaError, AcoveaResult};
pub use evolve::{EvolutionConfig, Organism, RunSummary, World};
pub use gene::Gene;
pub use listener::{Listener, NullListener, OptionZScore, TestResult};
pub use runner::{OptimizationMode, Runner, SubprocessRunner, BOGUS_FITNESS};
pub use target::{CommandTemplate, Target, TargetBuilder};
