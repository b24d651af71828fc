// SPDX-License-Identifier: MIT OR Apache-2.0
//! Piecewise-constant base delay process plus per-packet noise components.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::config::DelayConfig;
use crate::error::Result;

/// A point where the base path delay changes.
///
/// Transitions are sorted strictly by time; the first transition is at
/// `time = 0`. On `[time_i, time_{i+1})` the base delay is `base_delay_i`,
/// and the last value holds forever after.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathTransition {
    pub time: f64,
    pub base_delay: f64,
}

/// Per-packet delay decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayComponents {
    pub base: f64,
    pub legit: f64,
    pub malicious: f64,
    pub total: f64,
    /// The physical floor for this packet, equal to its base delay.
    pub min_possible: f64,
}

/// Samples per-packet latencies from the base-path process plus legitimate
/// and malicious noise.
///
/// All sampling goes through an explicit RNG handle so that trials with
/// independent seeds are fully reproducible.
#[derive(Debug, Clone)]
pub struct DelayModel {
    config: DelayConfig,
    transitions: Vec<PathTransition>,
    initialised: bool,
}

impl DelayModel {
    /// Build a model from a validated configuration.
    ///
    /// # Errors
    /// Returns `ConfigError` when any parameter is out of range.
    pub fn new(config: DelayConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            transitions: Vec::new(),
            initialised: false,
        })
    }

    /// The configuration this model was built with.
    #[must_use]
    pub fn config(&self) -> &DelayConfig {
        &self.config
    }

    fn sample_base<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.random_range(self.config.base_min..=self.config.base_max)
    }

    /// Build the transition sequence covering `[0, duration)`.
    ///
    /// The first transition sits at time zero; subsequent transition times
    /// are generated by a Poisson process with the configured rate. `U` is
    /// sampled in `[0, 1)` so `1 - U` stays away from zero.
    pub fn initialise<R: Rng + ?Sized>(&mut self, duration: f64, rng: &mut R) {
        self.transitions.clear();
        self.transitions.push(PathTransition {
            time: 0.0,
            base_delay: self.sample_base(rng),
        });

        let mut t = 0.0;
        loop {
            let u: f64 = rng.random();
            let inter_arrival = -(1.0 - u).ln() / self.config.transition_rate;
            t += inter_arrival;
            if t >= duration {
                break;
            }
            let base_delay = self.sample_base(rng);
            self.transitions.push(PathTransition {
                time: t,
                base_delay,
            });
        }

        self.initialised = true;
    }

    /// Base delay in effect at time `t`.
    ///
    /// Before `initialise` (or on an empty transition list) this returns a
    /// fresh uniform sample without touching the transition list; that is a
    /// calling-contract escape, not an expected path during verification.
    pub fn base_at<R: Rng + ?Sized>(&self, t: f64, rng: &mut R) -> f64 {
        if !self.initialised || self.transitions.is_empty() {
            return self.sample_base(rng);
        }

        let idx = self.transitions.partition_point(|tr| tr.time <= t);
        if idx == 0 {
            return self.transitions[0].base_delay;
        }
        self.transitions[idx - 1].base_delay
    }

    /// One draw of legitimate jitter: `exp(mu + sigma * Z)`, `Z ~ N(0, 1)`.
    pub fn sample_legit<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let z: f64 = StandardNormal.sample(rng);
        (self.config.legit_mu + self.config.legit_sigma * z).exp()
    }

    /// One draw of malicious delay, uniform on the configured support.
    pub fn sample_malicious<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.random_range(self.config.malicious_min..=self.config.malicious_max)
    }

    /// Compute the full delay decomposition for a packet sent at
    /// `send_time`.
    pub fn compute<R: Rng + ?Sized>(
        &self,
        send_time: f64,
        is_targeted: bool,
        rng: &mut R,
    ) -> DelayComponents {
        let base = self.base_at(send_time, rng);
        let legit = self.sample_legit(rng);
        let malicious = if is_targeted {
            self.sample_malicious(rng)
        } else {
            0.0
        };

        DelayComponents {
            base,
            legit,
            malicious,
            total: base + legit + malicious,
            min_possible: base,
        }
    }

    /// Number of transitions generated so far.
    #[must_use]
    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// The generated transition sequence.
    #[must_use]
    pub fn transitions(&self) -> &[PathTransition] {
        &self.transitions
    }

    /// Whether `initialise` has run since construction or the last reset.
    #[must_use]
    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    /// Drop the transition sequence and return to the uninitialised state.
    pub fn reset(&mut self) {
        self.transitions.clear();
        self.initialised = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn model() -> DelayModel {
        DelayModel::new(DelayConfig::default()).unwrap()
    }

    #[test]
    fn test_base_at_before_initialise_stays_in_support_and_does_not_mutate() {
        let model = model();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..100 {
            let base = model.base_at(3.0, &mut rng);
            assert!(base >= 0.020 && base <= 0.080);
        }
        assert_eq!(model.transition_count(), 0);
        assert!(!model.is_initialised());
    }

    #[test]
    fn test_initialise_starts_at_zero_and_stays_sorted() {
        let mut model = model();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        model.initialise(500.0, &mut rng);

        let transitions = model.transitions();
        assert!(model.is_initialised());
        assert!(!transitions.is_empty());
        assert_eq!(transitions[0].time, 0.0);
        for pair in transitions.windows(2) {
            assert!(pair[0].time < pair[1].time);
            assert!(pair[1].time < 500.0);
        }
    }

    #[test]
    fn test_base_is_piecewise_constant_between_transitions() {
        let mut model = model();
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        // Long horizon so several transitions exist at rate 0.05.
        model.initialise(400.0, &mut rng);
        let transitions = model.transitions().to_vec();
        assert!(transitions.len() >= 2, "expected multiple transitions");

        for pair in transitions.windows(2) {
            let midpoint = (pair[0].time + pair[1].time) / 2.0;
            assert_eq!(model.base_at(midpoint, &mut rng), pair[0].base_delay);
            // At the transition time itself the new value applies.
            assert_eq!(model.base_at(pair[1].time, &mut rng), pair[1].base_delay);
        }

        // After the last transition the last value holds.
        let last = transitions.last().unwrap();
        assert_eq!(model.base_at(last.time + 1_000.0, &mut rng), last.base_delay);
    }

    #[test]
    fn test_components_are_nonnegative_and_sum_exactly() {
        let mut model = model();
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        model.initialise(100.0, &mut rng);

        for i in 0..200 {
            let targeted = i % 3 == 0;
            let c = model.compute(i as f64 * 0.5, targeted, &mut rng);
            assert!(c.base >= 0.0);
            assert!(c.legit >= 0.0);
            assert!(c.malicious >= 0.0);
            assert_eq!(c.total, c.base + c.legit + c.malicious);
            assert_eq!(c.min_possible, c.base);
        }
    }

    #[test]
    fn test_targeting_iff_malicious_component() {
        let mut model = model();
        let mut rng = ChaCha8Rng::seed_from_u64(19);
        model.initialise(50.0, &mut rng);

        for i in 0..100 {
            let targeted = i % 2 == 0;
            let c = model.compute(1.0, targeted, &mut rng);
            assert_eq!(c.malicious > 0.0, targeted);
            if targeted {
                assert!(c.malicious >= 0.100 && c.malicious <= 0.200);
            }
        }
    }

    #[test]
    fn test_legit_sample_matches_log_normal_shape() {
        let model = model();
        let mut rng = ChaCha8Rng::seed_from_u64(23);

        let n = 20_000;
        let mut below_median = 0usize;
        for _ in 0..n {
            let legit = model.sample_legit(&mut rng);
            assert!(legit > 0.0);
            // Median of exp(mu + sigma Z) is exp(mu) ~ 10ms.
            if legit < (-4.6f64).exp() {
                below_median += 1;
            }
        }
        let frac = below_median as f64 / n as f64;
        assert!((frac - 0.5).abs() < 0.02, "median fraction was {frac}");
    }

    #[test]
    fn test_reset_returns_to_uninitialised() {
        let mut model = model();
        let mut rng = ChaCha8Rng::seed_from_u64(29);
        model.initialise(100.0, &mut rng);
        assert!(model.is_initialised());

        model.reset();
        assert!(!model.is_initialised());
        assert_eq!(model.transition_count(), 0);
    }

    #[test]
    fn test_same_seed_reproduces_transitions() {
        let mut a = model();
        let mut b = model();
        let mut rng_a = ChaCha8Rng::seed_from_u64(31);
        let mut rng_b = ChaCha8Rng::seed_from_u64(31);
        a.initialise(200.0, &mut rng_a);
        b.initialise(200.0, &mut rng_b);
        assert_eq!(a.transitions(), b.transitions());
    }
}
