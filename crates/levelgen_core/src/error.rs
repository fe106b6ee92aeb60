//! Error types for the generation pipeline.
//!
//! Only configuration-contract violations and cancellation are errors.
//! Placement shortfalls are reported as [`crate::placement::PlacementWarning`]
//! values and validation findings as [`crate::validation::ValidationResult`].

use thiserror::Error;

/// Result type alias using [`GenerationError`].
pub type Result<T> = std::result::Result<T, GenerationError>;

/// Top-level error type for all pipeline failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    /// The configured algorithm tag names no known terrain generator.
    #[error("Unsupported terrain algorithm: '{0}'")]
    UnsupportedAlgorithm(String),

    /// Grid dimensions are below what the generator can work with.
    #[error(
        "Invalid dimensions {width}x{height} for '{algorithm}' (minimum {min_width}x{min_height})"
    )]
    InvalidDimensions {
        /// Algorithm tag that rejected the dimensions.
        algorithm: String,
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
        /// Smallest width the algorithm accepts.
        min_width: u32,
        /// Smallest height the algorithm accepts.
        min_height: u32,
    },

    /// An algorithm parameter is non-finite or outside its accepted range.
    #[error("Invalid parameter '{name}' = {value} for '{algorithm}': {reason}")]
    InvalidParameter {
        /// Algorithm tag the parameter belongs to.
        algorithm: String,
        /// Parameter name as written in the config.
        name: String,
        /// Offending value.
        value: f64,
        /// Accepted range, in words.
        reason: String,
    },

    /// Assembler received a grid whose size disagrees with the config.
    #[error(
        "Grid is {grid_width}x{grid_height} but config requests {config_width}x{config_height}"
    )]
    DimensionMismatch {
        /// Width of the grid handed over.
        grid_width: u32,
        /// Height of the grid handed over.
        grid_height: u32,
        /// Width in the config.
        config_width: u32,
        /// Height in the config.
        config_height: u32,
    },

    /// A level could not be encoded.
    #[error("Failed to serialize level: {0}")]
    Serialization(String),

    /// The run was cancelled between stages; partial output was discarded.
    #[error("Generation cancelled after {stage} stage")]
    Cancelled {
        /// Last stage that completed before the cancellation was observed.
        stage: &'static str,
    },
}

impl GenerationError {
    /// True for errors caused by the caller's configuration.
    #[must_use]
    pub const fn is_contract_violation(&self) -> bool {
        !matches!(self, Self::Cancelled { .. } | Self::Serialization(_))
    }
}
