//! Gene model: the unit of variation in a flag set.
//!
//! A gene is one command-line option with its own mutation rules. Three
//! variants cover every flag shape a target catalogs: a bare token, a
//! choice between mutually exclusive tokens, and a named integer with
//! bounds and a step. Genes render themselves into command-line tokens
//! when enabled and contribute nothing when disabled.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A single option or switch undergoing evolution.
///
/// Every variant carries an enabled bit; a disabled gene renders nothing
/// regardless of its other state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gene {
    /// A fixed token, included verbatim when enabled.
    Simple {
        /// The command-line token.
        token: String,
        /// Whether the token appears on the command line.
        enabled: bool,
    },
    /// One of several mutually exclusive tokens.
    Enum {
        /// Ordered token choices; never empty.
        choices: Vec<String>,
        /// Index of the selected choice, in `[0, choices.len())`.
        index: usize,
        /// Whether the selected token appears on the command line.
        enabled: bool,
    },
    /// A named integer setting rendered as `name`, separator, value.
    Tuning {
        /// Option name, e.g. `-finline-limit`.
        name: String,
        /// Separator between name and value.
        separator: char,
        /// Lower bound, inclusive.
        min: i64,
        /// Upper bound, inclusive.
        max: i64,
        /// Magnitude of a single value mutation; at least 1.
        step: i64,
        /// Value the catalog declares as the option's default.
        default: i64,
        /// Current value, always in `[min, max]`.
        value: i64,
        /// Whether the rendered setting appears on the command line.
        enabled: bool,
    },
}

impl Gene {
    /// Create a simple gene.
    #[must_use]
    pub fn simple(token: impl Into<String>, enabled: bool) -> Self {
        Gene::Simple {
            token: token.into(),
            enabled,
        }
    }

    /// Create an enum gene with an initially random selection.
    ///
    /// Empty choice lists are rejected by the target builder before this
    /// runs; a single choice is legal.
    #[must_use]
    pub fn enumerated<R: Rng>(choices: Vec<String>, enabled: bool, rng: &mut R) -> Self {
        let index = rng.gen_range(0..choices.len().max(1));
        Gene::Enum {
            choices,
            index,
            enabled,
        }
    }

    /// Create a tuning gene.
    ///
    /// Inverted bounds are swapped and the step is clamped to at least 1.
    /// The starting value is jittered: with equal probability it stays at
    /// the default, gains a step, or loses a step, then is clamped into
    /// range. The jitter spreads initial populations over the value axis.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn tuning<R: Rng>(
        name: impl Into<String>,
        enabled: bool,
        default: i64,
        min: i64,
        max: i64,
        step: i64,
        separator: char,
        rng: &mut R,
    ) -> Self {
        let (min, max) = if min > max { (max, min) } else { (min, max) };
        let step = step.max(1);

        let value = match rng.gen_range(0..3u8) {
            0 => default.saturating_add(step),
            1 => default.saturating_sub(step),
            _ => default,
        };

        Gene::Tuning {
            name: name.into(),
            separator,
            min,
            max,
            step,
            default,
            value: value.clamp(min, max),
            enabled,
        }
    }

    /// Whether this gene contributes to the command line.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        match self {
            Gene::Simple { enabled, .. }
            | Gene::Enum { enabled, .. }
            | Gene::Tuning { enabled, .. } => *enabled,
        }
    }

    /// Set the enabled bit.
    pub fn set_enabled(&mut self, on: bool) {
        match self {
            Gene::Simple { enabled, .. }
            | Gene::Enum { enabled, .. }
            | Gene::Tuning { enabled, .. } => *enabled = on,
        }
    }

    /// Render the command-line token, or `None` when disabled.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        if !self.is_enabled() {
            return None;
        }

        match self {
            Gene::Simple { token, .. } => Some(token.clone()),
            Gene::Enum { choices, index, .. } => choices.get(*index).cloned(),
            Gene::Tuning {
                name,
                separator,
                value,
                ..
            } => Some(format!("{name}{separator}{value}")),
        }
    }

    /// Report tokens this gene can produce, for statistics accumulation.
    ///
    /// Simple and tuning genes contribute one token each; enum genes
    /// contribute every choice.
    #[must_use]
    pub fn report_tokens(&self) -> Vec<String> {
        match self {
            Gene::Simple { token, .. } => vec![token.clone()],
            Gene::Enum { choices, .. } => choices.clone(),
            Gene::Tuning { name, .. } => vec![name.clone()],
        }
    }

    /// Index of the currently selected report token.
    ///
    /// Zero for simple and tuning genes; the choice index for enums.
    #[must_use]
    pub fn setting(&self) -> usize {
        match self {
            Gene::Enum { index, .. } => *index,
            Gene::Simple { .. } | Gene::Tuning { .. } => 0,
        }
    }

    /// Randomize this gene for a fresh organism.
    ///
    /// The enabled bit is resampled at even odds. Enum genes also resample
    /// their selection; tuning genes keep their value, which was already
    /// jittered at construction.
    pub fn randomize<R: Rng>(&mut self, rng: &mut R) {
        match self {
            Gene::Simple { enabled, .. } => {
                *enabled = rng.gen_bool(0.5);
            }
            Gene::Enum {
                choices,
                index,
                enabled,
            } => {
                *enabled = rng.gen_bool(0.5);
                *index = rng.gen_range(0..choices.len().max(1));
            }
            Gene::Tuning { enabled, .. } => {
                *enabled = rng.gen_bool(0.5);
            }
        }
    }

    /// Mutate one axis of this gene.
    ///
    /// Simple genes toggle. Enum and tuning genes toggle at even odds,
    /// otherwise change their setting: an enum picks a different choice
    /// (a straight swap when there are exactly two), a tuning value moves
    /// one step up or down and is clamped back into range.
    pub fn mutate<R: Rng>(&mut self, rng: &mut R) {
        match self {
            Gene::Simple { enabled, .. } => {
                *enabled = !*enabled;
            }
            Gene::Enum {
                choices,
                index,
                enabled,
            } => {
                if rng.gen_bool(0.5) {
                    *enabled = !*enabled;
                } else if choices.len() == 2 {
                    *index = 1 - *index;
                } else if choices.len() > 2 {
                    let mut new_index = *index;
                    while new_index == *index {
                        new_index = rng.gen_range(0..choices.len());
                    }
                    *index = new_index;
                }
                // A single choice has no alternative setting to flip to.
            }
            Gene::Tuning {
                min,
                max,
                step,
                value,
                enabled,
                ..
            } => {
                if rng.gen_bool(0.5) {
                    *enabled = !*enabled;
                } else {
                    if rng.gen_bool(0.5) {
                        *value = value.saturating_sub(*step);
                    } else {
                        *value = value.saturating_add(*step);
                    }
                    *value = (*value).clamp(*min, *max);
                }
            }
        }
    }
}
