//! An organism: one candidate flag set plus its measured cost.

use crate::chromosome::Chromosome;
use crate::runner::BOGUS_FITNESS;
use crate::target::Target;
use rand::Rng;

/// A chromosome paired with a fitness.
///
/// Fitness is an opaque cost, lower is better; [`BOGUS_FITNESS`] marks
/// a failed trial. Organisms start at `BOGUS_FITNESS` and must be
/// evaluated before they participate in selection.
#[derive(Debug, Clone)]
pub struct Organism {
    /// The candidate flag set.
    pub chromosome: Chromosome,
    /// Measured cost; lower is better.
    pub fitness: f64,
}

impl Organism {
    /// Wrap a chromosome with an unmeasured fitness.
    #[must_use]
    pub fn new(chromosome: Chromosome) -> Self {
        Self {
            chromosome,
            fitness: BOGUS_FITNESS,
        }
    }

    /// A fresh organism with randomized genes from the target's template.
    #[must_use]
    pub fn random<R: Rng>(target: &Target, rng: &mut R) -> Self {
        Self::new(target.random_chromosome(rng))
    }

    /// Whether the last trial produced a usable measurement.
    #[must_use]
    pub fn is_measured(&self) -> bool {
        self.fitness < BOGUS_FITNESS
    }
}
