//! Error types for the ACOVEA core.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors surfaced by the ACOVEA core.
///
/// Per-trial failures (compile or run) are not errors: they are absorbed
/// as `BOGUS` fitness and reported through the listener. Only
/// construction-time problems and an abort request stop a run.
#[derive(Debug)]
pub enum AcoveaError {
    /// Target configuration file does not exist or cannot be read.
    ConfigMissing(PathBuf),
    /// Target configuration exists but cannot be parsed or validated.
    ConfigInvalid(String),
    /// Crossover was attempted between chromosomes of unequal length.
    ///
    /// Chromosomes bred together must come from the same target; this
    /// indicates a programming error, not bad input.
    ShapeMismatch {
        /// Length of the first parent.
        left: usize,
        /// Length of the second parent.
        right: usize,
    },
    /// The listener requested termination.
    Aborted,
    /// File I/O error.
    Io(io::Error),
}

impl fmt::Display for AcoveaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcoveaError::ConfigMissing(path) => {
                write!(f, "configuration not found: {}", path.display())
            }
            AcoveaError::ConfigInvalid(detail) => {
                write!(f, "invalid configuration: {detail}")
            }
            AcoveaError::ShapeMismatch { left, right } => {
                write!(
                    f,
                    "incompatible chromosomes in breeding (lengths {left} and {right})"
                )
            }
            AcoveaError::Aborted => write!(f, "run aborted"),
            AcoveaError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for AcoveaError {}

impl From<io::Error> for AcoveaError {
    fn from(e: io::Error) -> Self {
        AcoveaError::Io(e)
    }
}

/// Result type for ACOVEA operations.
pub type AcoveaResult<T> = Result<T, AcoveaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_display() {
        let e = AcoveaError::ShapeMismatch { left: 5, right: 6 };
        let text = e.to_string();
        assert!(text.contains('5'));
        assert!(text.contains('6'));
    }

    #[test]
    fn test_io_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let e = AcoveaError::from(io_err);
        assert!(matches!(e, AcoveaError::Io(_)));
    }
}
