//! Error taxonomy for the analysis pipeline.
//!
//! Every failure is an operator-correctable condition (bad file, bad
//! parameter choice); there is no retry logic anywhere in the crate.

use std::io;
use std::path::PathBuf;

/// Errors surfaced by pipeline stages and reporting.
#[derive(Debug)]
pub enum AnalysisError {
    /// Input file unreadable, not decodable, or a parameter out of range.
    InvalidInput(String),
    /// Threshold-method name is not one of mean/triangle/li/yen.
    UnsupportedMethod(String),
    /// Thresholding produced an all-foreground or all-background mask.
    DegenerateMask {
        /// Foreground pixel count of the offending mask.
        foreground: usize,
        /// Total pixel count.
        total: usize,
    },
    /// A zero-area region reached diameter computation.
    DegenerateRegion {
        /// Label of the offending region.
        label: u32,
    },
    /// Too few diameters for the requested statistic.
    InsufficientSamples {
        /// Number of samples available.
        got: usize,
        /// Minimum required.
        needed: usize,
    },
    /// Output file could not be created or written.
    OutputWrite {
        /// Path of the file being written.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            Self::UnsupportedMethod(name) => write!(
                f,
                "unsupported threshold method '{}' (expected mean, triangle, li or yen)",
                name
            ),
            Self::DegenerateMask { foreground, total } => write!(
                f,
                "degenerate mask: {} of {} pixels foreground; adjust the threshold and rerun",
                foreground, total
            ),
            Self::DegenerateRegion { label } => {
                write!(f, "region {} has zero area", label)
            }
            Self::InsufficientSamples { got, needed } => write!(
                f,
                "insufficient samples: need {}, got {}",
                needed, got
            ),
            Self::OutputWrite { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::OutputWrite { source, .. } => Some(source),
            _ => None,
        }
    }
}
