//! # Error Module
//!
//! Every analysis call either produces a complete result or fails with one of
//! these errors. Failures are deterministic: retrying with the same input
//! fails the same way.

use thiserror::Error;

/// Errors produced by the analysis core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// The input buffer or configuration cannot be analysed.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// The transform length is too short for a meaningful peak search.
    #[error("degenerate spectrum: transform length {transform_len} is below 4")]
    DegenerateSpectrum { transform_len: usize },
}

impl AnalysisError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
