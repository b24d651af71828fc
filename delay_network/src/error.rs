// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for delay_network.

use thiserror::Error;

/// Result type for delay_network operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Out-of-range configuration, rejected at construction time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A `[min, max]` pair is inverted.
    #[error("invalid range for {field}: min {min} > max {max}")]
    InvalidRange {
        field: &'static str,
        min: f64,
        max: f64,
    },

    /// A field that must be non-negative is negative.
    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    /// A field that must be strictly positive is zero or negative.
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    /// A probability or rate lies outside `[0, 1]`.
    #[error("{field} must lie in [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_range_display() {
        let err = ConfigError::InvalidRange {
            field: "base delay",
            min: 0.08,
            max: 0.02,
        };
        let msg = err.to_string();
        assert!(msg.contains("base delay"));
        assert!(msg.contains("0.08"));
    }

    #[test]
    fn test_unit_range_display() {
        let err = ConfigError::OutOfUnitRange {
            field: "targeting fraction",
            value: 1.5,
        };
        assert!(err.to_string().contains("[0, 1]"));
    }
}
