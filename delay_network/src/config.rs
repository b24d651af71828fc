// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration for the statistical delay model.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Parameters of the per-packet delay process.
///
/// The base path delay is piecewise constant: a new value is drawn uniformly
/// from `[base_min, base_max]` at each transition of a Poisson process with
/// rate `transition_rate`. Legitimate jitter is log-normal with parameters
/// `(legit_mu, legit_sigma)`. Malicious delay, applied only to targeted
/// packets, is uniform on `[malicious_min, malicious_max]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayConfig {
    /// Lower bound of the uniform base-delay support (seconds).
    pub base_min: f64,
    /// Upper bound of the uniform base-delay support (seconds).
    pub base_max: f64,
    /// Rate of the Poisson process generating base-delay transitions.
    pub transition_rate: f64,
    /// Log-normal location parameter for legitimate jitter.
    pub legit_mu: f64,
    /// Log-normal scale parameter for legitimate jitter.
    pub legit_sigma: f64,
    /// Lower bound of the uniform malicious-delay support (seconds).
    pub malicious_min: f64,
    /// Upper bound of the uniform malicious-delay support (seconds).
    pub malicious_max: f64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        // mu = -4.6, sigma = 0.8 gives median ~10ms, mean ~14ms,
        // 99th percentile ~64ms.
        Self {
            base_min: 0.020,
            base_max: 0.080,
            transition_rate: 0.05,
            legit_mu: -4.6,
            legit_sigma: 0.8,
            malicious_min: 0.100,
            malicious_max: 0.200,
        }
    }
}

impl DelayConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn base_range(mut self, min: f64, max: f64) -> Self {
        self.base_min = min;
        self.base_max = max;
        self
    }

    #[must_use]
    pub const fn transition_rate(mut self, rate: f64) -> Self {
        self.transition_rate = rate;
        self
    }

    #[must_use]
    pub const fn legit_params(mut self, mu: f64, sigma: f64) -> Self {
        self.legit_mu = mu;
        self.legit_sigma = sigma;
        self
    }

    #[must_use]
    pub const fn malicious_range(mut self, min: f64, max: f64) -> Self {
        self.malicious_min = min;
        self.malicious_max = max;
        self
    }

    /// Check every parameter against its admissible range.
    ///
    /// # Errors
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.base_min < 0.0 {
            return Err(ConfigError::Negative {
                field: "delay.base_min",
                value: self.base_min,
            });
        }
        if self.base_min > self.base_max {
            return Err(ConfigError::InvalidRange {
                field: "delay.base",
                min: self.base_min,
                max: self.base_max,
            });
        }
        if !(self.transition_rate > 0.0) {
            return Err(ConfigError::NonPositive {
                field: "delay.transition_rate",
                value: self.transition_rate,
            });
        }
        if self.legit_sigma < 0.0 {
            return Err(ConfigError::Negative {
                field: "delay.legit_sigma",
                value: self.legit_sigma,
            });
        }
        if self.malicious_min < 0.0 {
            return Err(ConfigError::Negative {
                field: "delay.mal_min",
                value: self.malicious_min,
            });
        }
        if self.malicious_min > self.malicious_max {
            return Err(ConfigError::InvalidRange {
                field: "delay.mal",
                min: self.malicious_min,
                max: self.malicious_max,
            });
        }
        Ok(())
    }
}
