//! Error types for axon.

use thiserror::Error;

/// Construction-time configuration failures.
///
/// There are no recoverable runtime errors in steady-state prediction or
/// training; a misconfigured predictor is simply never constructed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The history length must be at least one outcome.
    #[error("history length must be nonzero")]
    ZeroHistoryLength,

    /// The table must contain at least one perceptron.
    #[error("table size must be nonzero")]
    ZeroTableSize,

    /// Masked indexing requires a power-of-two table size.
    #[error("table size {0} is not a power of two")]
    TableSizeNotPowerOfTwo(usize),

    /// Weights saturate at a positive magnitude.
    #[error("weight limit must be positive")]
    NonPositiveWeightLimit,
}
