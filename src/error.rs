//! Error types for protein-spatial.
//!
//! Geometry never fails: bad points are dropped and degenerate maths reports
//! "no hit". The errors here only cover configuration and light setup.

use glam::Vec3;
use thiserror::Error;

/// Errors raised while validating or loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A length-like setting must be finite and strictly positive.
    #[error("{name} must be finite and positive, got {value}")]
    NonPositive {
        /// Setting name.
        name: &'static str,
        /// Offending value.
        value: f32,
    },

    /// A count-like setting must be at least `minimum`.
    #[error("{name} must be at least {minimum}, got {value}")]
    TooSmall {
        /// Setting name.
        name: &'static str,
        /// Smallest accepted value.
        minimum: usize,
        /// Offending value.
        value: usize,
    },

    /// Settings JSON could not be parsed.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised by the shadow engine.
#[derive(Debug, Clone, Error)]
pub enum ShadowError {
    /// The light direction has no usable length.
    #[error("light direction {0} is zero-length or not finite")]
    DegenerateLight(Vec3),
}

/// Checks that `value` is finite and strictly positive.
pub(crate) fn ensure_positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

/// Checks that `value` is at least `minimum`.
pub(crate) fn ensure_at_least(
    name: &'static str,
    value: usize,
    minimum: usize,
) -> Result<(), ConfigError> {
    if value >= minimum {
        Ok(())
    } else {
        Err(ConfigError::TooSmall { name, minimum, value })
    }
}
