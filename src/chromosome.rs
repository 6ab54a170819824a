//! Chromosome: an owned, ordered sequence of genes.
//!
//! One chromosome is one candidate flag set. Chromosomes created from
//! the same target share a shape (length and per-position gene variant),
//! which is what makes positional crossover well-defined. Breeding two
//! chromosomes of different shapes is a programming error and fails with
//! [`AcoveaError::ShapeMismatch`].

use crate::error::{AcoveaError, AcoveaResult};
use crate::gene::Gene;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Ordered sequence of genes comprising one candidate flag set.
///
/// Owns its genes exclusively; `clone` is a deep copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chromosome {
    genes: Vec<Gene>,
}

impl Chromosome {
    /// Create a chromosome from a gene sequence.
    #[must_use]
    pub fn new(genes: Vec<Gene>) -> Self {
        Self { genes }
    }

    /// Number of genes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// Whether the chromosome carries no genes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Read access to the gene sequence.
    #[must_use]
    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    /// Mutable access to the gene sequence.
    pub fn genes_mut(&mut self) -> &mut [Gene] {
        &mut self.genes
    }

    /// Produce a same-shape chromosome with every gene randomized.
    #[must_use]
    pub fn random_from<R: Rng>(template: &Chromosome, rng: &mut R) -> Self {
        let mut child = template.clone();
        for gene in &mut child.genes {
            gene.randomize(rng);
        }
        child
    }

    /// Uniform crossover: each position is a clone of the corresponding
    /// gene from one parent, chosen by a fair coin.
    ///
    /// # Errors
    ///
    /// Returns [`AcoveaError::ShapeMismatch`] when the parents have
    /// different lengths.
    pub fn breed<R: Rng>(
        parent1: &Chromosome,
        parent2: &Chromosome,
        rng: &mut R,
    ) -> AcoveaResult<Self> {
        if parent1.len() != parent2.len() {
            return Err(AcoveaError::ShapeMismatch {
                left: parent1.len(),
                right: parent2.len(),
            });
        }

        let genes = parent1
            .genes
            .iter()
            .zip(&parent2.genes)
            .map(|(a, b)| if rng.gen_bool(0.5) { a.clone() } else { b.clone() })
            .collect();

        Ok(Self { genes })
    }

    /// Mutate each gene independently with probability `rate`.
    pub fn mutate<R: Rng>(&mut self, rate: f64, rng: &mut R) {
        for gene in &mut self.genes {
            if rng.gen_bool(rate.clamp(0.0, 1.0)) {
                gene.mutate(rng);
            }
        }
    }

    /// Rendered tokens of all enabled genes, in gene order.
    #[must_use]
    pub fn render_enabled(&self) -> Vec<String> {
        self.genes.iter().filter_map(Gene::render).collect()
    }
}
