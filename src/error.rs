//! Error types.
//!
//! Only configuration problems surface as errors. Domain violations,
//! numerical degeneracy in operator weighting and reef extinction are
//! prevented structurally by the engine and never reach the caller.

use thiserror::Error;

/// Error raised when a component is constructed with invalid parameters.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// A parameter is present but outside its valid range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// A required parameter was not supplied.
    #[error("missing required parameter `{0}`")]
    MissingParameter(String),

    /// An operator pool was supplied without any operator.
    #[error("operator pool must contain at least one operator")]
    EmptyOperatorPool,

    /// A method name did not match any known variant.
    #[error("unknown {kind} method `{name}`")]
    UnknownMethod { kind: &'static str, name: String },

    /// The population (or reef) would be too small to evolve.
    #[error("population size {size} is too small (minimum {min})")]
    PopulationTooSmall { size: usize, min: usize },
}

impl ConfigError {
    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result alias for fallible construction.
pub type EvoResult<T> = Result<T, ConfigError>;
