// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for trust_verification.

use thiserror::Error;

/// Result type for verification setup.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Out-of-range verification parameters, rejected at construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A probability, rate or confidence lies outside `[0, 1]`.
    #[error("{field} must lie in [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f64 },

    /// A field that must be non-negative is negative.
    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    /// A field that must be strictly positive is zero or negative.
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_field_and_value() {
        let err = ConfigError::OutOfUnitRange {
            field: "verify.sampling_rate",
            value: 1.2,
        };
        let msg = err.to_string();
        assert!(msg.contains("verify.sampling_rate"));
        assert!(msg.contains("1.2"));
    }
}
