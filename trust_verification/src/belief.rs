// SPDX-License-Identifier: MIT OR Apache-2.0
//! Belief tracking: a three-hypothesis Bayesian tracker, a sequential
//! probability ratio test, and an advisory detection-odds model.
//!
//! Evidence is extracted per response and folded into the posterior over
//! `{honest, incompetent, malicious}`. Only *auditable* responses carry
//! evidence: comparisons whose send times fall within the temporal window.
//! Out-of-window responses tell the temporal machinery nothing, so
//! conditioning on them would only launder a mostly-quiet attacker back
//! towards honesty. Definitive proof short-circuits regardless of window.

use serde::{Deserialize, Serialize};

use crate::contradiction::DetectionSignal;
use crate::error::{ConfigError, Result};

/// Likelihoods are clamped here before use so a zero entry can never poison
/// the posterior.
const LIKELIHOOD_FLOOR: f64 = 1e-9;

/// Suspicion above this level marks an observation as suspicious.
pub const SUSPICION_THRESHOLD: f64 = 0.3;

/// Evidence class extracted from one processed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Evidence {
    Consistent,
    WeakInconsistency,
    StrongContradiction,
    DefinitiveProof,
}

impl Evidence {
    /// Likelihoods `(L(E|honest), L(E|incompetent), L(E|malicious))`.
    const fn likelihoods(self) -> [f64; 3] {
        match self {
            Self::Consistent => [0.80, 0.50, 0.50],
            Self::WeakInconsistency => [0.10, 0.80, 0.40],
            Self::StrongContradiction => [1e-4, 0.20, 0.80],
            Self::DefinitiveProof => [1e-5, 0.05, 0.95],
        }
    }
}

/// Posterior over the three operator hypotheses. Components sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeliefState {
    pub honest: f64,
    pub incompetent: f64,
    pub malicious: f64,
}

impl BeliefState {
    /// The neutral prior used when the flag-rate pre-check passes.
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            honest: 0.33,
            incompetent: 0.33,
            malicious: 0.34,
        }
    }

    /// The prior used when the flag rate already looks suspicious.
    #[must_use]
    pub const fn flag_biased() -> Self {
        Self {
            honest: 0.20,
            incompetent: 0.20,
            malicious: 0.60,
        }
    }

    fn sum(&self) -> f64 {
        self.honest + self.incompetent + self.malicious
    }
}

/// Bayesian tracker over the three hypotheses.
#[derive(Debug, Clone)]
pub struct HypothesisTracker {
    state: BeliefState,
    terminal: bool,
}

impl HypothesisTracker {
    #[must_use]
    pub fn new(prior: BeliefState) -> Self {
        Self {
            state: prior,
            terminal: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> BeliefState {
        self.state
    }

    /// Whether definitive proof has collapsed the posterior.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Fold one piece of evidence into the posterior.
    ///
    /// Definitive proof short-circuits to `(0, 0, 1)` and marks the tracker
    /// terminal. A numerically collapsed update (zero normaliser) leaves the
    /// state unchanged.
    pub fn update(&mut self, evidence: Evidence) -> BeliefState {
        if self.terminal {
            return self.state;
        }
        if evidence == Evidence::DefinitiveProof {
            self.state = BeliefState {
                honest: 0.0,
                incompetent: 0.0,
                malicious: 1.0,
            };
            self.terminal = true;
            return self.state;
        }

        let [l_h, l_i, l_m] = evidence.likelihoods();
        let candidate = BeliefState {
            honest: self.state.honest * l_h.max(LIKELIHOOD_FLOOR),
            incompetent: self.state.incompetent * l_i.max(LIKELIHOOD_FLOOR),
            malicious: self.state.malicious * l_m.max(LIKELIHOOD_FLOOR),
        };
        let normaliser = candidate.sum();
        if normaliser > 0.0 && normaliser.is_finite() {
            self.state = BeliefState {
                honest: candidate.honest / normaliser,
                incompetent: candidate.incompetent / normaliser,
                malicious: candidate.malicious / normaliser,
            };
        }
        self.state
    }
}

/// Outcome of the sequential test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SprtDecision {
    /// The null hypothesis (honest) is accepted.
    Accept,
    /// The null hypothesis is rejected: the operator looks dishonest.
    Reject,
}

/// Wald sequential probability ratio test over suspicious observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprt {
    alpha: f64,
    beta: f64,
    /// Suspicious-observation rate under the honest null.
    p0: f64,
    /// Suspicious-observation rate when querying a lied-about packet.
    p1: f64,
    log_lr: f64,
    n_queries: u64,
    decision: Option<SprtDecision>,
}

impl Sprt {
    /// Standard error rates and the default alternative rate.
    #[must_use]
    pub fn new() -> Self {
        Self {
            alpha: 0.05,
            beta: 0.05,
            p0: 0.05,
            p1: 0.40,
            log_lr: 0.0,
            n_queries: 0,
            decision: None,
        }
    }

    /// Custom error rates and alternative rate.
    ///
    /// # Errors
    /// Returns `ConfigError` when any rate leaves `(0, 1)`.
    pub fn with_rates(alpha: f64, beta: f64, p0: f64, p1: f64) -> Result<Self> {
        for (field, value) in [
            ("sprt.alpha", alpha),
            ("sprt.beta", beta),
            ("sprt.p0", p0),
            ("sprt.p1", p1),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(ConfigError::OutOfUnitRange { field, value });
            }
        }
        Ok(Self {
            alpha,
            beta,
            p0,
            p1,
            log_lr: 0.0,
            n_queries: 0,
            decision: None,
        })
    }

    /// Upper boundary in log space: cross it and the null is rejected.
    #[must_use]
    pub fn log_upper(&self) -> f64 {
        ((1.0 - self.beta) / self.alpha).ln()
    }

    /// Lower boundary in log space: cross it and the null is accepted.
    #[must_use]
    pub fn log_lower(&self) -> f64 {
        (self.beta / (1.0 - self.alpha)).ln()
    }

    /// Update on a query that involved a believed-suspicious packet. Queries
    /// that involve no suspicious packet leave the test untouched.
    pub fn update(
        &mut self,
        involves_suspicious: bool,
        observed_suspicious: bool,
    ) -> Option<SprtDecision> {
        if !involves_suspicious || self.decision.is_some() {
            return self.decision;
        }

        let increment = if observed_suspicious {
            (self.p1 / self.p0).ln()
        } else {
            ((1.0 - self.p1) / (1.0 - self.p0)).ln()
        };
        self.log_lr += increment;
        self.n_queries += 1;

        if self.log_lr >= self.log_upper() {
            self.decision = Some(SprtDecision::Reject);
        } else if self.log_lr <= self.log_lower() {
            self.decision = Some(SprtDecision::Accept);
        }
        self.decision
    }

    #[must_use]
    pub fn log_likelihood_ratio(&self) -> f64 {
        self.log_lr
    }

    #[must_use]
    pub fn queries(&self) -> u64 {
        self.n_queries
    }

    #[must_use]
    pub fn decision(&self) -> Option<SprtDecision> {
        self.decision
    }
}

impl Default for Sprt {
    fn default() -> Self {
        Self::new()
    }
}

/// Advisory model: how likely is a single comparison to catch a lie, given
/// `lied` compromised packets among `total` queried ones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionOdds {
    pub lied: usize,
    pub total: usize,
    /// Probability that a query touching a lied-about packet shows up as
    /// inconsistent.
    pub p_inconsistent: f64,
}

impl DetectionOdds {
    #[must_use]
    pub fn new(lied: usize, total: usize, p_inconsistent: f64) -> Self {
        Self {
            lied,
            total,
            p_inconsistent,
        }
    }

    /// `P(one comparison involves a lie) * p_inconsistent`.
    #[must_use]
    pub fn single_query_catch(&self) -> f64 {
        let k = self.lied as f64;
        let m = self.total as f64;
        if self.total <= 1 || self.lied == 0 {
            return 0.0;
        }
        let p_involves = 1.0 - ((m - k) / m) * ((m - k - 1.0) / (m - 1.0));
        p_involves * self.p_inconsistent
    }

    /// Probability of at least one catch in `n` queries.
    #[must_use]
    pub fn detect_after(&self, n: u64) -> f64 {
        1.0 - (1.0 - self.single_query_catch()).powi(n as i32)
    }

    /// Queries needed to reach the given detection confidence, if detection
    /// is possible at all.
    #[must_use]
    pub fn queries_needed(&self, confidence: f64) -> Option<u64> {
        let p = self.single_query_catch();
        if p <= 0.0 || !(0.0..1.0).contains(&confidence) {
            return None;
        }
        let n = ((1.0 - confidence).ln() / (1.0 - p).ln()).ceil();
        if n < 0.0 {
            return None;
        }
        Some(n as u64)
    }
}

/// The belief engine: tracker + SPRT + counters, fed one detection signal
/// per executed query.
#[derive(Debug, Clone)]
pub struct BeliefEngine {
    tracker: HypothesisTracker,
    sprt: Sprt,
    queries_processed: u64,
    contradictions_found: u64,
}

impl BeliefEngine {
    #[must_use]
    pub fn new(prior: BeliefState) -> Self {
        Self {
            tracker: HypothesisTracker::new(prior),
            sprt: Sprt::new(),
            queries_processed: 0,
            contradictions_found: 0,
        }
    }

    /// Classify a detection signal. Returns `None` for responses that carry
    /// no evidence (out-of-window and nothing definitive).
    #[must_use]
    pub fn classify(signal: &DetectionSignal) -> Option<Evidence> {
        if signal.definitive {
            return Some(Evidence::DefinitiveProof);
        }
        if !signal.in_window {
            return None;
        }
        if signal.contradiction {
            return Some(Evidence::StrongContradiction);
        }
        if signal.suspicion > SUSPICION_THRESHOLD {
            return Some(Evidence::WeakInconsistency);
        }
        Some(Evidence::Consistent)
    }

    /// Fold one detection signal into the posterior and the SPRT.
    pub fn process(&mut self, signal: &DetectionSignal) {
        self.queries_processed += 1;
        if signal.contradiction || signal.definitive {
            self.contradictions_found += 1;
        }
        if let Some(evidence) = Self::classify(signal) {
            self.tracker.update(evidence);
        }
        if signal.in_window {
            self.sprt.update(
                signal.involves_suspicious,
                signal.suspicion > SUSPICION_THRESHOLD,
            );
        }
    }

    #[must_use]
    pub fn state(&self) -> BeliefState {
        self.tracker.state()
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.tracker.is_terminal()
    }

    #[must_use]
    pub fn sprt(&self) -> &Sprt {
        &self.sprt
    }

    #[must_use]
    pub fn queries_processed(&self) -> u64 {
        self.queries_processed
    }

    #[must_use]
    pub fn contradictions_found(&self) -> u64 {
        self.contradictions_found
    }

    /// Stopping rule polled after the query floor: confident either way.
    #[must_use]
    pub fn should_stop(&self, target_confidence: f64) -> bool {
        let state = self.tracker.state();
        state.honest >= target_confidence || state.malicious >= target_confidence
    }
}
