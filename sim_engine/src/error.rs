// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for sim_engine.

use thiserror::Error;

/// Result type for scheduler operations.
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors that can occur when scheduling events.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Attempted to schedule an event before the current virtual time.
    #[error("invalid event time {requested:.6}: clock is already at {now:.6}")]
    InvalidTime { requested: f64, now: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_time_display() {
        let err = SimError::InvalidTime {
            requested: -1.0,
            now: 2.5,
        };
        let msg = err.to_string();
        assert!(msg.contains("invalid event time"));
        assert!(msg.contains("2.5"));
    }
}
