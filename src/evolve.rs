//! The evolutionary engine.
//!
//! This module orchestrates the search: multi-population generational
//! evolution over flag chromosomes, with scaled roulette selection,
//! elitism, migration, and statistical reporting.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            Generation Loop              │
//! ├─────────────────────────────────────────┤
//! │  Scaling │ Selection │ Breeding │ Mutation │
//! ├─────────────────────────────────────────┤
//! │       Migration (across populations)    │
//! ├─────────────────────────────────────────┤
//! │   Fitness Trials (compile + measure)    │
//! └─────────────────────────────────────────┘
//! ```

mod engine;
mod organism;
mod reporter;
mod scaling;
mod selection;

pub use engine::{EvolutionConfig, RunSummary, World};
pub use organism::Organism;
pub use reporter::Reporter;
pub use scaling::Scaler;
pub use selection::{survivor_count, RouletteWheel};
