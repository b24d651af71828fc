// SPDX-License-Identifier: MIT OR Apache-2.0
//! The verifier: samples records, interrogates the oracle, and renders a
//! verdict.
//!
//! The verifier holds no ground truth beyond what a client legitimately
//! observes: packet ids, send times, end-to-end latencies, fingerprint
//! commitments, and the oracle's published congestion flags. Record
//! selection uses a keyed hash with a per-trial secret, so the oracle cannot
//! know at transmission time which records will be audited.

use std::collections::{HashMap, HashSet};

use delay_network::TransmissionRecord;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::belief::{BeliefEngine, BeliefState, SprtDecision};
use crate::contradiction::{Contradiction, ContradictionDetector, DetectorConfig};
use crate::error::{ConfigError, Result};
use crate::query::{Query, QueryAnswerer};

/// Cap on contradictions carried in a report, for display.
const REPORT_CONTRADICTION_CAP: usize = 10;

/// How the verifier generates comparison queries over the sampled records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryStrategy {
    /// Every unordered pair independently with probability 0.3.
    Random,
    /// Top third by observed delay against random low-delay partners, plus
    /// all high-high pairs.
    Targeted,
    /// Union of `Targeted` and a 50% subsample of `Random`.
    Adaptive,
    /// All unordered pairs.
    Exhaustive,
}

/// Verification protocol parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Fraction of records selected for auditing.
    pub sampling_rate: f64,
    /// Hard cap on executed queries.
    pub max_queries: usize,
    /// Queries executed before the stopping rule is polled.
    pub min_queries: usize,
    /// Posterior threshold for confident verdicts.
    pub target_confidence: f64,
    /// Baseline flag rate an honest operator may report.
    pub expected_flag_rate: f64,
    /// Additive slack on the baseline before the flag rate is suspicious.
    pub flag_tolerance: f64,
    pub query_strategy: QueryStrategy,
    /// Per-trial secret keying the sampling hash.
    pub sampling_secret: String,
    pub detector: DetectorConfig,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            sampling_rate: 0.20,
            max_queries: 500,
            min_queries: 100,
            target_confidence: 0.95,
            expected_flag_rate: 0.05,
            flag_tolerance: 0.05,
            query_strategy: QueryStrategy::Adaptive,
            sampling_secret: String::from("trial-secret"),
            detector: DetectorConfig::default(),
        }
    }
}

impl VerifierConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn sampling_rate(mut self, rate: f64) -> Self {
        self.sampling_rate = rate;
        self
    }

    #[must_use]
    pub const fn max_queries(mut self, max: usize) -> Self {
        self.max_queries = max;
        self
    }

    #[must_use]
    pub const fn min_queries(mut self, min: usize) -> Self {
        self.min_queries = min;
        self
    }

    #[must_use]
    pub const fn target_confidence(mut self, target: f64) -> Self {
        self.target_confidence = target;
        self
    }

    #[must_use]
    pub const fn flag_thresholds(mut self, expected: f64, tolerance: f64) -> Self {
        self.expected_flag_rate = expected;
        self.flag_tolerance = tolerance;
        self
    }

    #[must_use]
    pub const fn query_strategy(mut self, strategy: QueryStrategy) -> Self {
        self.query_strategy = strategy;
        self
    }

    #[must_use]
    pub fn sampling_secret(mut self, secret: impl Into<String>) -> Self {
        self.sampling_secret = secret.into();
        self
    }

    #[must_use]
    pub fn detector(mut self, detector: DetectorConfig) -> Self {
        self.detector = detector;
        self
    }

    /// Check every parameter against its admissible range.
    ///
    /// # Errors
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.sampling_rate) {
            return Err(ConfigError::OutOfUnitRange {
                field: "verify.sampling_rate",
                value: self.sampling_rate,
            });
        }
        if !(self.target_confidence > 0.0 && self.target_confidence <= 1.0) {
            return Err(ConfigError::OutOfUnitRange {
                field: "verify.target_confidence",
                value: self.target_confidence,
            });
        }
        for (field, value) in [
            ("verify.expected_flag_rate", self.expected_flag_rate),
            ("verify.flag_tolerance", self.flag_tolerance),
        ] {
            if !(value >= 0.0) {
                return Err(ConfigError::Negative { field, value });
            }
        }
        self.detector.validate()
    }
}

/// The verifier's conclusion about the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// A definitive contradiction was found.
    MaliciousProven,
    /// The flag rate alone is beyond what an honest operator reports.
    SuspiciousFlagRate,
    /// The posterior indicts the operator.
    Malicious,
    /// The response stream looks noisy rather than adversarial.
    Incompetent,
    /// The operator is confidently consistent.
    HonestLikely,
    /// Not enough signal either way.
    Inconclusive,
    /// Fewer than two records to verify.
    InsufficientData,
}

/// User-visible outcome of one verification run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictReport {
    pub verdict: Verdict,
    pub confidence: f64,
    pub trustworthy: bool,
    pub records_ingested: usize,
    pub sampled: usize,
    pub flag_rate: f64,
    pub suspicious_flag: bool,
    pub queries_executed: usize,
    pub contradictions_found: usize,
    pub definitive_count: usize,
    /// At most ten contradictions, in detection order.
    pub contradictions: Vec<Contradiction>,
    pub belief: BeliefState,
    pub sprt_log_likelihood_ratio: f64,
    pub sprt_queries: u64,
    pub sprt_decision: Option<SprtDecision>,
}

/// Deterministic record selection: a record is sampled iff the normalised
/// keyed hash of `(id, sent_time, secret)` falls below the sampling rate.
#[must_use]
pub fn is_sampled(id: u64, sent_time: f64, secret: &str, sampling_rate: f64) -> bool {
    let digest = Sha256::digest(format!("{id}|{sent_time:.6}|{secret}").as_bytes());
    let word = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    (f64::from(word) / f64::from(u32::MAX)) < sampling_rate
}

/// Interrogates the oracle over sampled records and renders a verdict.
pub struct Verifier {
    config: VerifierConfig,
    records: Vec<TransmissionRecord>,
    by_id: HashMap<u64, usize>,
    sampled: Vec<u64>,
    flag_rate: f64,
    suspicious_flag: bool,
    detector: ContradictionDetector,
    belief: BeliefEngine,
}

impl Verifier {
    /// Build a verifier from a validated configuration.
    ///
    /// # Errors
    /// Returns `ConfigError` when any parameter is out of range.
    pub fn new(config: VerifierConfig) -> Result<Self> {
        config.validate()?;
        let detector = ContradictionDetector::new(config.detector.clone())?;
        Ok(Self {
            config,
            records: Vec::new(),
            by_id: HashMap::new(),
            sampled: Vec::new(),
            flag_rate: 0.0,
            suspicious_flag: false,
            detector,
            belief: BeliefEngine::new(BeliefState::neutral()),
        })
    }

    #[must_use]
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// The detector, exposed for post-run inspection.
    #[must_use]
    pub fn detector(&self) -> &ContradictionDetector {
        &self.detector
    }

    /// Ingest the trial's records plus the oracle's published flag set.
    ///
    /// Runs the flag-rate pre-check (suspicious flag rates bias the prior),
    /// selects the audited sample, registers fingerprint commitments, and
    /// applies the physical floor to every sampled observation.
    pub fn ingest(&mut self, records: Vec<TransmissionRecord>, flagged: HashSet<u64>) {
        self.records = records;
        self.by_id = self
            .records
            .iter()
            .enumerate()
            .map(|(idx, r)| (r.id, idx))
            .collect();

        let flagged_count = self
            .records
            .iter()
            .filter(|r| flagged.contains(&r.id))
            .count();
        self.flag_rate = if self.records.is_empty() {
            0.0
        } else {
            flagged_count as f64 / self.records.len() as f64
        };
        self.suspicious_flag =
            self.flag_rate > self.config.expected_flag_rate + self.config.flag_tolerance;

        let prior = if self.suspicious_flag {
            BeliefState::flag_biased()
        } else {
            BeliefState::neutral()
        };
        self.belief = BeliefEngine::new(prior);
        self.detector.set_flagged(flagged);

        self.sampled.clear();
        for record in &self.records {
            self.detector.register_commitment(&record.fingerprint);
            if is_sampled(
                record.id,
                record.sent_time,
                &self.config.sampling_secret,
                self.config.sampling_rate,
            ) {
                self.sampled.push(record.id);
                self.detector
                    .check_observed_delay(record.id, record.observed_by_client);
            }
        }
        debug!(
            records = self.records.len(),
            sampled = self.sampled.len(),
            flag_rate = self.flag_rate,
            suspicious = self.suspicious_flag,
            "records ingested"
        );
    }

    /// Ids selected for auditing, in ingestion order.
    #[must_use]
    pub fn sampled_ids(&self) -> &[u64] {
        &self.sampled
    }

    fn observed(&self, id: u64) -> Option<f64> {
        self.by_id
            .get(&id)
            .map(|&idx| self.records[idx].observed_by_client)
    }

    fn generate_random_pairs<R: Rng>(&self, rng: &mut R) -> Vec<Query> {
        let mut queries = Vec::new();
        for (i, &a) in self.sampled.iter().enumerate() {
            for &b in &self.sampled[i + 1..] {
                if rng.random_bool(0.3) {
                    queries.push(Query::compare(a, b));
                }
            }
        }
        queries
    }

    fn generate_targeted_pairs<R: Rng>(&self, rng: &mut R) -> Vec<Query> {
        let mut queries = Vec::new();
        let mut by_delay: Vec<u64> = self.sampled.clone();
        by_delay.sort_by(|&a, &b| {
            let obs_a = self.observed(a).unwrap_or(0.0);
            let obs_b = self.observed(b).unwrap_or(0.0);
            obs_b.total_cmp(&obs_a).then_with(|| a.cmp(&b))
        });

        let high_count = by_delay.len().div_ceil(3);
        let (highs, lows) = by_delay.split_at(high_count);

        for &high in highs {
            if lows.is_empty() {
                break;
            }
            for _ in 0..10 {
                let low = lows[rng.random_range(0..lows.len())];
                queries.push(Query::compare(high, low));
            }
        }
        for (i, &a) in highs.iter().enumerate() {
            for &b in &highs[i + 1..] {
                queries.push(Query::compare(a, b));
            }
        }
        queries
    }

    fn generate_queries<R: Rng>(&self, rng: &mut R) -> Vec<Query> {
        match self.config.query_strategy {
            QueryStrategy::Random => self.generate_random_pairs(rng),
            QueryStrategy::Targeted => self.generate_targeted_pairs(rng),
            QueryStrategy::Adaptive => {
                let mut queries = self.generate_targeted_pairs(rng);
                queries.extend(
                    self.generate_random_pairs(rng)
                        .into_iter()
                        .filter(|_| rng.random_bool(0.5)),
                );
                queries
            },
            QueryStrategy::Exhaustive => {
                let mut queries = Vec::new();
                for (i, &a) in self.sampled.iter().enumerate() {
                    for &b in &self.sampled[i + 1..] {
                        queries.push(Query::compare(a, b));
                    }
                }
                queries
            },
        }
    }

    /// Execute the verification protocol against the oracle and render the
    /// verdict. Never panics on adversarial responses.
    pub fn run<O, R>(&mut self, oracle: &mut O, rng: &mut R) -> VerdictReport
    where
        O: QueryAnswerer + ?Sized,
        R: Rng,
    {
        if self.records.len() < 2 {
            return self.render(Verdict::InsufficientData, 0);
        }

        let mut executed = 0usize;
        let proven_at_ingest = !self.detector.definitive_contradictions().is_empty();
        if !proven_at_ingest && self.config.max_queries > 0 {
            let mut queries = self.generate_queries(rng);
            queries.shuffle(rng);

            for query in queries {
                if executed >= self.config.max_queries {
                    break;
                }
                let response = oracle.answer(&query, rng);

                let (rec_a, rec_b) = match query {
                    Query::Compare { pkt_a, pkt_b } => (
                        self.by_id.get(&pkt_a).map(|&idx| &self.records[idx]),
                        self.by_id.get(&pkt_b).map(|&idx| &self.records[idx]),
                    ),
                    _ => (None, None),
                };
                let in_window = match (rec_a, rec_b) {
                    (Some(a), Some(b)) => {
                        (a.sent_time - b.sent_time).abs() <= self.config.detector.comparison_window
                    },
                    _ => false,
                };

                let signal = self
                    .detector
                    .process_response(&response, rec_a, rec_b, in_window);
                self.belief.process(&signal);
                executed += 1;

                if signal.definitive {
                    debug!(executed, "definitive contradiction, stopping");
                    break;
                }
                if executed >= self.config.min_queries
                    && self.belief.should_stop(self.config.target_confidence)
                {
                    debug!(executed, "belief threshold reached, stopping");
                    break;
                }
            }
        }

        let verdict = self.decide();
        self.render(verdict, executed)
    }

    fn decide(&self) -> Verdict {
        let state = self.belief.state();
        if !self.detector.definitive_contradictions().is_empty() {
            Verdict::MaliciousProven
        } else if self.suspicious_flag && state.honest > 0.5 {
            Verdict::SuspiciousFlagRate
        } else if state.malicious > 0.90 {
            Verdict::Malicious
        } else if state.incompetent > 0.90 {
            Verdict::Incompetent
        } else if state.honest >= self.config.target_confidence {
            Verdict::HonestLikely
        } else {
            Verdict::Inconclusive
        }
    }

    fn render(&self, verdict: Verdict, executed: usize) -> VerdictReport {
        let state = self.belief.state();
        let (confidence, trustworthy) = match verdict {
            Verdict::MaliciousProven => (1.0, false),
            Verdict::SuspiciousFlagRate => (0.90, false),
            Verdict::Malicious => (state.malicious, false),
            Verdict::Incompetent => (state.incompetent, false),
            Verdict::HonestLikely => (state.honest, true),
            Verdict::Inconclusive => (0.5, state.honest >= 0.5),
            Verdict::InsufficientData => (0.0, true),
        };

        let all = self.detector.all_contradictions();
        VerdictReport {
            verdict,
            confidence,
            trustworthy,
            records_ingested: self.records.len(),
            sampled: self.sampled.len(),
            flag_rate: self.flag_rate,
            suspicious_flag: self.suspicious_flag,
            queries_executed: executed,
            contradictions_found: all.len(),
            definitive_count: self.detector.definitive_contradictions().len(),
            contradictions: all.iter().take(REPORT_CONTRADICTION_CAP).cloned().collect(),
            belief: state,
            sprt_log_likelihood_ratio: self.belief.sprt().log_likelihood_ratio(),
            sprt_queries: self.belief.sprt().queries(),
            sprt_decision: self.belief.sprt().decision(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{AnsweringStrategy, FlaggingStrategy, Oracle};
    use delay_network::{Commitment, DelayComponents, TransmissionObserver};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn record(id: u64, sent: f64, base: f64, legit: f64, malicious: f64) -> TransmissionRecord {
        let components = DelayComponents {
            base,
            legit,
            malicious,
            total: base + legit + malicious,
            min_possible: base,
        };
        TransmissionRecord::new(
            id,
            sent,
            &components,
            malicious > 0.0,
            Commitment::new(id, "uplink", sent),
        )
    }

    fn oracle_over(
        records: &[TransmissionRecord],
        flagging: FlaggingStrategy,
        answering: AnsweringStrategy,
        rng: &mut ChaCha8Rng,
    ) -> Oracle {
        let mut oracle = Oracle::new(flagging, answering).unwrap();
        for r in records {
            oracle.observe(r);
        }
        oracle.flag_packets(rng);
        oracle
    }

    fn audit_all() -> VerifierConfig {
        // Sample everything and poll the stopping rule early so small test
        // populations behave like full-size trials.
        VerifierConfig::new()
            .sampling_rate(1.0)
            .min_queries(40)
            .query_strategy(QueryStrategy::Targeted)
    }

    #[test]
    fn test_config_defaults_are_valid() {
        assert!(VerifierConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_rejects_out_of_range_sampling() {
        let err = Verifier::new(VerifierConfig::new().sampling_rate(1.5));
        assert!(matches!(err, Err(ConfigError::OutOfUnitRange { .. })));
    }

    #[test]
    fn test_sampling_is_deterministic_and_secret_keyed() {
        for id in 0..50u64 {
            let t = id as f64 * 0.37;
            assert_eq!(
                is_sampled(id, t, "secret-a", 0.2),
                is_sampled(id, t, "secret-a", 0.2)
            );
        }

        let picked =
            |secret: &str| -> Vec<u64> {
                (0..200u64)
                    .filter(|&id| is_sampled(id, id as f64 * 0.25, secret, 0.2))
                    .collect()
            };
        assert_ne!(picked("secret-a"), picked("secret-b"));
    }

    #[test]
    fn test_sampling_rate_is_roughly_honoured() {
        let hits = (0..10_000u64)
            .filter(|&id| is_sampled(id, id as f64 * 0.1, "secret", 0.2))
            .count();
        let rate = hits as f64 / 10_000.0;
        assert!((rate - 0.2).abs() < 0.02, "rate was {rate}");
    }

    #[test]
    fn test_insufficient_data_below_two_records() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let records = vec![record(0, 0.0, 0.05, 0.01, 0.0)];
        let mut oracle = oracle_over(
            &records,
            FlaggingStrategy::None,
            AnsweringStrategy::Honest,
            &mut rng,
        );

        let mut verifier = Verifier::new(audit_all()).unwrap();
        verifier.ingest(records, HashSet::new());
        let report = verifier.run(&mut oracle, &mut rng);

        assert_eq!(report.verdict, Verdict::InsufficientData);
        assert!(report.trustworthy);
        assert_eq!(report.queries_executed, 0);
    }

    #[test]
    fn test_zero_query_budget_is_inconclusive_without_contact() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let records: Vec<_> = (0..10u64)
            .map(|i| record(i, i as f64 * 0.5, 0.05, 0.01, 0.0))
            .collect();
        let mut oracle = oracle_over(
            &records,
            FlaggingStrategy::None,
            AnsweringStrategy::Honest,
            &mut rng,
        );

        let mut verifier = Verifier::new(audit_all().max_queries(0)).unwrap();
        verifier.ingest(records, HashSet::new());
        let report = verifier.run(&mut oracle, &mut rng);

        assert_eq!(report.verdict, Verdict::Inconclusive);
        assert_eq!(report.queries_executed, 0);
        assert_eq!(oracle.stats().queries, 0);
    }

    #[test]
    fn test_honest_oracle_is_confirmed() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        // One base segment: honest comparisons are all Equal.
        let records: Vec<_> = (0..24u64)
            .map(|i| record(i, i as f64 * 0.4, 0.05, 0.005 + 0.001 * (i % 7) as f64, 0.0))
            .collect();
        let mut oracle = oracle_over(
            &records,
            FlaggingStrategy::None,
            AnsweringStrategy::Honest,
            &mut rng,
        );

        let mut verifier = Verifier::new(audit_all()).unwrap();
        verifier.ingest(records, HashSet::new());
        let report = verifier.run(&mut oracle, &mut rng);

        assert_eq!(report.verdict, Verdict::HonestLikely);
        assert!(report.trustworthy);
        assert_eq!(report.definitive_count, 0);
        assert!(report.belief.honest >= 0.95);
    }

    #[test]
    fn test_claim_lower_observed_attacker_is_indicted() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        // 30 packets over 6 seconds; six targeted ones observed far beyond
        // the legitimate envelope, none of them flagged.
        let records: Vec<_> = (0..30u64)
            .map(|i| {
                let malicious = if i % 5 == 0 { 0.18 } else { 0.0 };
                record(i, i as f64 * 0.2, 0.05, 0.01, malicious)
            })
            .collect();
        let mut oracle = oracle_over(
            &records,
            FlaggingStrategy::None,
            AnsweringStrategy::ClaimLowerObserved,
            &mut rng,
        );

        let mut verifier = Verifier::new(audit_all()).unwrap();
        verifier.ingest(records, HashSet::new());
        let report = verifier.run(&mut oracle, &mut rng);

        assert_eq!(report.verdict, Verdict::Malicious);
        assert!(!report.trustworthy);
        assert!(report.belief.malicious > 0.90);
        assert!(report.contradictions_found > 0);
    }

    #[test]
    fn test_excessive_flag_rate_is_flagged_suspicious() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let records: Vec<_> = (0..24u64)
            .map(|i| record(i, i as f64 * 0.4, 0.05, 0.008, 0.0))
            .collect();
        let mut oracle = oracle_over(
            &records,
            FlaggingStrategy::Random(0.5),
            AnsweringStrategy::Honest,
            &mut rng,
        );

        let mut verifier = Verifier::new(audit_all()).unwrap();
        verifier.ingest(records.clone(), oracle.flagged_ids());
        let report = verifier.run(&mut oracle, &mut rng);

        assert!(report.suspicious_flag);
        assert_eq!(report.verdict, Verdict::SuspiciousFlagRate);
        assert!(!report.trustworthy);
        assert!((report.confidence - 0.90).abs() < 1e-12);
    }

    #[test]
    fn test_physical_floor_at_ingestion_proves_malice() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut records: Vec<_> = (0..10u64)
            .map(|i| record(i, i as f64 * 0.5, 0.05, 0.01, 0.0))
            .collect();
        // One observed delay below the 10ms physical floor.
        records.push(record(99, 5.5, 0.0005, 0.0005, 0.0));
        let mut oracle = oracle_over(
            &records,
            FlaggingStrategy::None,
            AnsweringStrategy::Honest,
            &mut rng,
        );

        let mut verifier = Verifier::new(audit_all()).unwrap();
        verifier.ingest(records, HashSet::new());
        let report = verifier.run(&mut oracle, &mut rng);

        assert_eq!(report.verdict, Verdict::MaliciousProven);
        assert_eq!(report.confidence, 1.0);
        assert!(!report.trustworthy);
        assert!(report.definitive_count >= 1);
        // Proven at ingestion: no query budget was spent.
        assert_eq!(report.queries_executed, 0);
    }

    #[test]
    fn test_report_caps_contradiction_list() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        // Random answering on near-simultaneous packets with wild observed
        // gaps piles up contradictions quickly.
        let records: Vec<_> = (0..40u64)
            .map(|i| {
                let malicious = if i % 2 == 0 { 0.19 } else { 0.0 };
                record(i, i as f64 * 0.05, 0.05, 0.01, malicious)
            })
            .collect();
        let mut oracle = oracle_over(
            &records,
            FlaggingStrategy::None,
            AnsweringStrategy::Random,
            &mut rng,
        );

        let mut verifier = Verifier::new(audit_all()).unwrap();
        verifier.ingest(records, HashSet::new());
        let report = verifier.run(&mut oracle, &mut rng);

        assert!(report.contradictions.len() <= 10);
        assert!(report.contradictions_found >= report.contradictions.len());
    }

    #[test]
    fn test_sampled_subset_only_is_queried() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let records: Vec<_> = (0..60u64)
            .map(|i| record(i, i as f64 * 0.3, 0.05, 0.01, 0.0))
            .collect();
        let mut oracle = oracle_over(
            &records,
            FlaggingStrategy::None,
            AnsweringStrategy::Honest,
            &mut rng,
        );

        let mut verifier =
            Verifier::new(audit_all().sampling_rate(0.2).query_strategy(QueryStrategy::Exhaustive))
                .unwrap();
        verifier.ingest(records.clone(), HashSet::new());
        let sampled = verifier.sampled_ids().len();
        assert!(sampled < records.len());

        let report = verifier.run(&mut oracle, &mut rng);
        let max_pairs = sampled * sampled.saturating_sub(1) / 2;
        assert!(report.queries_executed <= max_pairs.max(1));
    }
}
