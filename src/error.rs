use std::fmt;
use thiserror::Error;

use crate::parameter::prior::PriorError;
use crate::parameter::spline::SplineError;

/// Error types for the mixfx-rs library.
#[derive(Error, Debug)]
pub enum MixFxError {
    /// A variable is malformed for its intended use.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The supplied dataset does not fit what a variable needs.
    #[error("Compatibility error: {0}")]
    Compatibility(String),

    /// A shape invariant was violated after assembly.
    #[error("Consistency error: {0}")]
    Consistency(String),

    /// Malformed prior vectors.
    #[error("Prior error: {0}")]
    Prior(#[from] PriorError),

    /// Malformed spline configuration.
    #[error("Spline error: {0}")]
    Spline(#[from] SplineError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MixFxError {
    /// Whether this error reports a misconfigured variable.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Prior(_) | Self::Spline(_))
    }

    /// Whether this error reports a dataset that does not fit the variables.
    pub fn is_compatibility(&self) -> bool {
        matches!(self, Self::Compatibility(_))
    }

    /// Whether this error reports a violated post-assembly invariant.
    pub fn is_consistency(&self) -> bool {
        matches!(self, Self::Consistency(_))
    }

    /// Prefix the message with where the error was raised.
    pub(crate) fn context(self, ctx: impl fmt::Display) -> Self {
        match self {
            Self::Configuration(msg) => Self::Configuration(format!("{}: {}", ctx, msg)),
            Self::Compatibility(msg) => Self::Compatibility(format!("{}: {}", ctx, msg)),
            Self::Consistency(msg) => Self::Consistency(format!("{}: {}", ctx, msg)),
            other => other,
        }
    }
}

/// Result type alias for mixfx-rs operations.
pub type Result<T> = std::result::Result<T, MixFxError>;
