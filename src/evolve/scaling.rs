//! Fitness scaling: costs in, selection weights out.
//!
//! Fitness throughout the engine is a cost (lower is better), but the
//! roulette wheel consumes non-negative weights (higher is better). The
//! scaling stage owns that sign flip: everything upstream of
//! [`Scaler::weights`] speaks cost, everything downstream speaks weight.

// Statistics use intentional precision-losing casts
#![allow(clippy::cast_precision_loss)]

use crate::runner::BOGUS_FITNESS;

/// Sigma-truncation coefficient: weights keep roughly two standard
/// deviations of headroom below the mean before clamping to zero.
const SIGMA_COEFF: f64 = 2.0;

/// Transforms a population's costs into selection weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scaler {
    /// Inversion only; weights are raw distances from the worst cost.
    Null,
    /// Sigma truncation over the inverted weights, stabilizing selection
    /// pressure as the population converges.
    Sigma,
}

impl Scaler {
    /// Scaler name for the run header.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Scaler::Null => "none",
            Scaler::Sigma => "sigma",
        }
    }

    /// Map costs (lower better) to weights (higher better, `>= 0`).
    ///
    /// Failed trials (`BOGUS_FITNESS`) always map to zero weight. When
    /// every weight comes out zero — all trials failed, or all costs are
    /// identical — the roulette wheel falls back to a uniform pick.
    #[must_use]
    pub fn weights(self, costs: &[f64]) -> Vec<f64> {
        let inverted = invert(costs);
        match self {
            Scaler::Null => inverted,
            Scaler::Sigma => sigma_truncate(&inverted),
        }
    }
}

/// Invert costs into weights: distance below the worst finite cost.
/// Monotone decreasing in cost; `BOGUS_FITNESS` maps to zero.
fn invert(costs: &[f64]) -> Vec<f64> {
    let worst = costs
        .iter()
        .copied()
        .filter(|f| *f < BOGUS_FITNESS)
        .fold(f64::NEG_INFINITY, f64::max);

    costs
        .iter()
        .map(|&f| {
            if f < BOGUS_FITNESS && worst.is_finite() {
                worst - f
            } else {
                0.0
            }
        })
        .collect()
}

/// Sigma truncation: `w' = max(0, w - (mean - 2σ))`.
///
/// Linear in the input, so relative ordering is preserved; subtracting
/// the sigma-adjusted mean keeps the spread meaningful even when all
/// weights cluster far from zero.
fn sigma_truncate(weights: &[f64]) -> Vec<f64> {
    if weights.is_empty() {
        return Vec::new();
    }

    let mean = weights.iter().sum::<f64>() / weights.len() as f64;
    let variance =
        weights.iter().map(|w| (w - mean).powi(2)).sum::<f64>() / weights.len() as f64;
    let sigma = variance.sqrt();

    let floor = mean - SIGMA_COEFF * sigma;
    weights.iter().map(|&w| (w - floor).max(0.0)).collect()
}
