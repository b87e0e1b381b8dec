//! Error types for the morph core.

use thiserror::Error;

/// A landmark frame that cannot be classified.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    #[error("expected {expected} landmarks, got {got}")]
    LandmarkCount { expected: usize, got: usize },

    #[error("landmark {index} has a non-finite coordinate")]
    NonFinite { index: usize },
}

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be a positive finite number (got {value})")]
    NotPositive { field: String, value: f32 },

    #[error("{field} must lie in [0, 1] (got {value})")]
    OutOfUnitRange { field: String, value: f32 },

    #[error("{field} must be a non-negative finite number (got {value})")]
    Negative { field: String, value: f32 },

    #[error("{field} must be finite (got {value})")]
    NotFinite { field: String, value: f32 },

    #[error("fist spread threshold {fist} must be below open-palm threshold {open}")]
    SpreadOrder { fist: f32, open: f32 },

    #[error("{group} count must be at least 1")]
    EmptyGroup { group: &'static str },

    #[error("active photo index {index} is out of range for {count} photos")]
    ActivePhoto { index: usize, count: usize },
}
