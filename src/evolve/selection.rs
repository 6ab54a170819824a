//! Selection: truncation survivors and the roulette wheel.
//!
//! Populations are sorted by cost and truncated to the survivor count;
//! the single best survivor is the elite. Parents for reproduction are
//! then drawn fitness-proportionately from the survivors' scaled
//! weights.

// Survivor arithmetic uses intentional casts
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use rand::Rng;

/// Number of organisms retained by truncation selection.
///
/// `⌈pop_size · survival_rate⌉`, floored at one so the elite always
/// survives, and capped at the population size.
#[must_use]
pub fn survivor_count(pop_size: usize, survival_rate: f64) -> usize {
    let count = (pop_size as f64 * survival_rate.clamp(0.0, 1.0)).ceil() as usize;
    count.clamp(1, pop_size.max(1))
}

/// Fitness-proportionate selection over non-negative weights.
///
/// Weights are bigger-is-better, as produced by the scaling stage. A
/// wheel whose weights sum to zero degenerates to a uniform pick.
#[derive(Debug, Clone)]
pub struct RouletteWheel {
    cumulative: Vec<f64>,
    total: f64,
}

impl RouletteWheel {
    /// Build a wheel from selection weights.
    #[must_use]
    pub fn new(weights: &[f64]) -> Self {
        let mut cumulative = Vec::with_capacity(weights.len());
        let mut total = 0.0;
        for w in weights {
            total += w.max(0.0);
            cumulative.push(total);
        }
        Self { cumulative, total }
    }

    /// Number of slots on the wheel.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cumulative.len()
    }

    /// Whether the wheel has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }

    /// Draw one index, proportionally to weight.
    ///
    /// # Panics
    ///
    /// Panics when the wheel is empty.
    pub fn spin<R: Rng>(&self, rng: &mut R) -> usize {
        assert!(!self.is_empty(), "cannot spin an empty wheel");

        if self.total <= 0.0 {
            return rng.gen_range(0..self.cumulative.len());
        }

        let spin = rng.gen_range(0.0..self.total);
        // First slot whose cumulative weight exceeds the spin; zero-weight
        // slots share a cumulative value with their predecessor and are
        // never landed on.
        let index = self.cumulative.partition_point(|&c| c <= spin);
        index.min(self.cumulative.len() - 1)
    }
}
