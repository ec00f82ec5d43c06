//! Error types for tonestag filters.

use thiserror::Error;

/// Errors that can occur during tone processing operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToneError {
    /// Invalid parameters or malformed input data
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Image without pixels
    #[error("empty image: no pixels to process")]
    EmptyImage,

    /// Channel layout not supported by the operation
    #[error("unsupported channel layout: expected {expected}, got {actual}")]
    ChannelMismatch { expected: &'static str, actual: usize },

    /// Quantization segment that holds no pixels
    #[error(
        "degenerate segment {segment} ({lower}..={upper}) at iteration {iteration}: no pixel mass"
    )]
    DegenerateSegment {
        segment: usize,
        lower: u8,
        upper: u8,
        iteration: usize,
    },
}

impl ToneError {
    /// True for every flavour of rejected input (bad parameters, empty image,
    /// wrong channel count).
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            ToneError::InvalidInput(_) | ToneError::EmptyImage | ToneError::ChannelMismatch { .. }
        )
    }
}

/// Result type for tone operations
pub type ToneResult<T> = Result<T, ToneError>;
