// SPDX-License-Identifier: MIT OR Apache-2.0
//! Multi-trial detection experiments.
//!
//! Wires a full simulation per trial (scheduler, delay model, router,
//! oracle, verifier), runs the verification protocol, and aggregates trial
//! verdicts into detection-rate statistics. Each trial gets an independent
//! seeded RNG stream and its own sampling secret, so whole experiments are
//! reproducible and trials never share randomness.
//!
//! Rendering (CSV, tables, plots) is deliberately not here: results are
//! plain serialisable structs for downstream tooling.

#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use delay_network::{
    DelayConfig, DelayModel, Destination, Packet, Router, TargetingPolicy, TransmissionObserver,
    TransmissionRecord,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sim_engine::Scheduler;
use thiserror::Error;
use tracing::info;
use trust_verification::{
    AnsweringStrategy, FlaggingStrategy, Oracle, Verdict, VerdictReport, Verifier, VerifierConfig,
};

/// Slack run past the nominal duration so in-flight deliveries land.
const DELIVERY_SLACK: f64 = 10.0;

/// Errors surfaced while assembling an experiment.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExperimentError {
    #[error(transparent)]
    Network(#[from] delay_network::ConfigError),
    #[error(transparent)]
    Verification(#[from] trust_verification::ConfigError),
    #[error(transparent)]
    Scheduling(#[from] sim_engine::SimError),
}

/// Result type for experiment runs.
pub type Result<T> = std::result::Result<T, ExperimentError>;

/// Full description of one experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub name: String,
    pub packets: u64,
    pub trials: u64,
    /// Send horizon in virtual seconds; packets are spread uniformly.
    pub duration: f64,
    pub path_label: String,
    pub delay: DelayConfig,
    pub targeting: TargetingPolicy,
    pub flagging: FlaggingStrategy,
    pub answering: AnsweringStrategy,
    pub verify: VerifierConfig,
    /// Base seed; trial `t` runs on `seed + t`.
    pub seed: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            name: String::from("default"),
            packets: 100,
            trials: 10,
            duration: 50.0,
            path_label: String::from("primary"),
            delay: DelayConfig::default(),
            targeting: TargetingPolicy::None,
            flagging: FlaggingStrategy::None,
            answering: AnsweringStrategy::Honest,
            verify: VerifierConfig::default(),
            seed: 1,
        }
    }
}

impl ExperimentConfig {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether the router actually inflates any packets.
    #[must_use]
    pub fn is_adversarial(&self) -> bool {
        !matches!(self.targeting, TargetingPolicy::None)
    }
}

/// Outcome of a single trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub trial: u64,
    pub verdict: Verdict,
    pub confidence: f64,
    pub trustworthy: bool,
    pub queries_executed: usize,
    pub contradictions_found: usize,
    pub definitive_count: usize,
    pub flag_rate: f64,
    /// Ground truth: how many packets the router actually targeted.
    pub targeted_packets: u64,
    /// Whether the verdict matched the ground truth of the configuration.
    pub detected_correctly: bool,
}

/// Aggregated outcome of all trials of one experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResult {
    pub name: String,
    pub was_adversarial: bool,
    pub trials: Vec<TrialResult>,
    pub true_positive_rate: f64,
    pub false_negative_rate: f64,
    pub true_negative_rate: f64,
    pub false_positive_rate: f64,
    pub mean_queries_per_detection: f64,
    pub mean_confidence: f64,
}

/// Pure observer that counts deliveries at the receiving station.
#[derive(Debug, Default)]
pub struct CollectorStation {
    pub received: u64,
}

impl Destination for CollectorStation {
    fn receive(&mut self, _scheduler: &mut Scheduler, _packet: &Packet, _path_label: &str) {
        self.received += 1;
    }
}

/// Client-side transmission log: the verifier's record feed.
#[derive(Debug, Default)]
pub struct TransmissionLog {
    records: Vec<TransmissionRecord>,
}

impl TransmissionLog {
    #[must_use]
    pub fn records(&self) -> &[TransmissionRecord] {
        &self.records
    }
}

impl TransmissionObserver for TransmissionLog {
    fn observe(&mut self, record: &TransmissionRecord) {
        self.records.push(record.clone());
    }
}

/// Runs experiments and keeps their aggregated results.
#[derive(Debug, Default)]
pub struct Runner {
    pub results: Vec<ExperimentResult>,
}

impl Runner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every trial of an experiment and aggregate.
    ///
    /// # Errors
    /// Returns `ExperimentError` when any component rejects its
    /// configuration.
    pub fn run_experiment(&mut self, config: &ExperimentConfig) -> Result<ExperimentResult> {
        info!(name = %config.name, trials = config.trials, "running experiment");
        let mut trials = Vec::with_capacity(config.trials as usize);
        for trial in 0..config.trials {
            trials.push(run_trial(config, trial)?);
        }
        let aggregated = aggregate(config, trials);
        self.results.push(aggregated.clone());
        Ok(aggregated)
    }

    /// Run the same base experiment under each (flagging, answering) pair.
    ///
    /// # Errors
    /// Returns the first configuration error encountered.
    pub fn strategy_sweep(
        &mut self,
        base: &ExperimentConfig,
        strategies: &[(FlaggingStrategy, AnsweringStrategy)],
    ) -> Result<Vec<ExperimentResult>> {
        let mut results = Vec::with_capacity(strategies.len());
        for (flagging, answering) in strategies {
            let mut config = base.clone();
            config.name = format!("{}_{flagging:?}_{answering:?}", base.name);
            config.flagging = flagging.clone();
            config.answering = *answering;
            results.push(self.run_experiment(&config)?);
        }
        Ok(results)
    }

    /// Run the same base experiment across targeting fractions.
    ///
    /// # Errors
    /// Returns the first configuration error encountered.
    pub fn targeting_fraction_sweep(
        &mut self,
        base: &ExperimentConfig,
        fractions: &[f64],
    ) -> Result<Vec<ExperimentResult>> {
        let mut results = Vec::with_capacity(fractions.len());
        for &fraction in fractions {
            let mut config = base.clone();
            config.name = format!("{}_target_{:.0}pct", base.name, fraction * 100.0);
            config.targeting = TargetingPolicy::RandomFraction(fraction);
            results.push(self.run_experiment(&config)?);
        }
        Ok(results)
    }
}

/// Run one trial on its own RNG stream and return its result.
///
/// # Errors
/// Returns `ExperimentError` when any component rejects its configuration.
pub fn run_trial(config: &ExperimentConfig, trial: u64) -> Result<TrialResult> {
    let report = run_trial_report(config, trial)?;
    let was_adversarial = config.is_adversarial();
    let detected_dishonest = !report.report.trustworthy;
    Ok(TrialResult {
        trial,
        verdict: report.report.verdict,
        confidence: report.report.confidence,
        trustworthy: report.report.trustworthy,
        queries_executed: report.report.queries_executed,
        contradictions_found: report.report.contradictions_found,
        definitive_count: report.report.definitive_count,
        flag_rate: report.report.flag_rate,
        targeted_packets: report.targeted_packets,
        detected_correctly: was_adversarial == detected_dishonest,
    })
}

/// A trial's full verdict report plus router-side ground truth.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialReport {
    pub report: VerdictReport,
    pub targeted_packets: u64,
    pub delivered: u64,
}

/// Run one trial and return the verifier's full report.
///
/// # Errors
/// Returns `ExperimentError` when any component rejects its configuration.
pub fn run_trial_report(config: &ExperimentConfig, trial: u64) -> Result<TrialReport> {
    let rng = Rc::new(RefCell::new(ChaCha8Rng::seed_from_u64(
        config.seed.wrapping_add(trial),
    )));
    let mut sim = Scheduler::new();

    let mut model = DelayModel::new(config.delay.clone())?;
    model.initialise(config.duration, &mut *rng.borrow_mut());

    let router = Rc::new(RefCell::new(Router::new(
        model,
        config.targeting.clone(),
        config.path_label.clone(),
    )?));
    let oracle = Rc::new(RefCell::new(Oracle::new(
        config.flagging.clone(),
        config.answering,
    )?));
    let log = Rc::new(RefCell::new(TransmissionLog::default()));
    let station = Rc::new(RefCell::new(CollectorStation::default()));

    router
        .borrow_mut()
        .add_observer(Rc::clone(&oracle) as Rc<RefCell<dyn TransmissionObserver>>);
    router
        .borrow_mut()
        .add_observer(Rc::clone(&log) as Rc<RefCell<dyn TransmissionObserver>>);
    let destination: Rc<RefCell<dyn Destination>> = Rc::clone(&station) as Rc<RefCell<dyn Destination>>;

    let spacing = config.duration / config.packets as f64;
    for i in 0..config.packets {
        let router = Rc::clone(&router);
        let rng = Rc::clone(&rng);
        let destination = Rc::clone(&destination);
        sim.schedule_at(i as f64 * spacing, move |s| {
            let packet = Packet::new(i, "ground_station_a", s.now());
            if let Err(err) =
                router
                    .borrow_mut()
                    .forward(s, &mut *rng.borrow_mut(), packet, &destination)
            {
                tracing::warn!(%err, packet = i, "forward failed");
            }
        })?;
    }

    sim.run(config.duration + DELIVERY_SLACK);

    oracle.borrow_mut().flag_packets(&mut *rng.borrow_mut());
    let flagged: HashSet<u64> = oracle.borrow().flagged_ids();
    let records = log.borrow().records().to_vec();

    let verify = config
        .verify
        .clone()
        .sampling_secret(format!("{}-trial-{}-{}", config.name, config.seed, trial));
    let mut verifier = Verifier::new(verify)?;
    verifier.ingest(records, flagged);

    let report = verifier.run(
        &mut *oracle.borrow_mut(),
        &mut *rng.borrow_mut(),
    );

    let targeted_packets = router.borrow().targeted();
    let delivered = station.borrow().received;
    Ok(TrialReport {
        report,
        targeted_packets,
        delivered,
    })
}

fn aggregate(config: &ExperimentConfig, trials: Vec<TrialResult>) -> ExperimentResult {
    let was_adversarial = config.is_adversarial();
    let n = trials.len() as f64;

    let mut true_positives = 0usize;
    let mut false_positives = 0usize;
    let mut true_negatives = 0usize;
    let mut false_negatives = 0usize;
    let mut detection_queries = 0usize;
    let mut detections = 0usize;
    let mut total_queries = 0usize;
    let mut total_confidence = 0.0;

    for trial in &trials {
        let detected = !trial.trustworthy;
        match (was_adversarial, detected) {
            (true, true) => {
                true_positives += 1;
                detection_queries += trial.queries_executed;
                detections += 1;
            },
            (true, false) => false_negatives += 1,
            (false, true) => false_positives += 1,
            (false, false) => true_negatives += 1,
        }
        total_queries += trial.queries_executed;
        total_confidence += trial.confidence;
    }

    let mean_queries_per_detection = if was_adversarial {
        if detections > 0 {
            detection_queries as f64 / detections as f64
        } else {
            0.0
        }
    } else if n > 0.0 {
        total_queries as f64 / n
    } else {
        0.0
    };

    ExperimentResult {
        name: config.name.clone(),
        was_adversarial,
        true_positive_rate: if n > 0.0 && was_adversarial {
            true_positives as f64 / n
        } else {
            0.0
        },
        false_negative_rate: if n > 0.0 && was_adversarial {
            false_negatives as f64 / n
        } else {
            0.0
        },
        true_negative_rate: if n > 0.0 && !was_adversarial {
            true_negatives as f64 / n
        } else {
            0.0
        },
        false_positive_rate: if n > 0.0 && !was_adversarial {
            false_positives as f64 / n
        } else {
            0.0
        },
        mean_queries_per_detection,
        mean_confidence: if n > 0.0 { total_confidence / n } else { 0.0 },
        trials,
    }
}

/// Normal-approximation 95% confidence interval for a rate over `n` trials.
#[must_use]
pub fn confidence_interval(rate: f64, n: usize) -> (f64, f64) {
    if n == 0 {
        return (0.0, 1.0);
    }
    let z = 1.96;
    let se = (rate * (1.0 - rate) / n as f64).sqrt();
    ((rate - z * se).max(0.0), (rate + z * se).min(1.0))
}

/// Convenience: does this verdict clear the operator?
#[must_use]
pub fn is_clearing_verdict(verdict: Verdict) -> bool {
    matches!(verdict, Verdict::HonestLikely | Verdict::Inconclusive)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_honest() {
        let config = ExperimentConfig::default();
        assert!(!config.is_adversarial());
        assert_eq!(config.packets, 100);
    }

    #[test]
    fn test_single_trial_runs_and_delivers() {
        let mut config = ExperimentConfig::new("smoke");
        config.packets = 20;
        config.duration = 10.0;
        config.verify = VerifierConfig::new().sampling_rate(1.0).min_queries(10);

        let report = run_trial_report(&config, 0).unwrap();
        assert_eq!(report.delivered, 20);
        assert_eq!(report.report.records_ingested, 20);
        assert_eq!(report.targeted_packets, 0);
    }

    #[test]
    fn test_trials_are_reproducible() {
        let mut config = ExperimentConfig::new("repro");
        config.packets = 30;
        config.duration = 15.0;
        config.targeting = TargetingPolicy::RandomFraction(0.2);
        config.flagging = FlaggingStrategy::Random(0.3);
        config.answering = AnsweringStrategy::Consistent;

        let a = run_trial_report(&config, 3).unwrap();
        let b = run_trial_report(&config, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_trials_differ() {
        let mut config = ExperimentConfig::new("streams");
        config.packets = 30;
        config.duration = 15.0;
        config.targeting = TargetingPolicy::RandomFraction(0.5);

        let a = run_trial_report(&config, 0).unwrap();
        let b = run_trial_report(&config, 1).unwrap();
        // Independent RNG streams target different packets.
        assert_ne!(a, b);
    }

    #[test]
    fn test_aggregate_honest_experiment() {
        let mut runner = Runner::new();
        let mut config = ExperimentConfig::new("honest_aggregate");
        config.packets = 30;
        config.trials = 3;
        config.duration = 15.0;
        config.verify = VerifierConfig::new().sampling_rate(1.0).min_queries(20);

        let result = runner.run_experiment(&config).unwrap();
        assert!(!result.was_adversarial);
        assert_eq!(result.trials.len(), 3);
        assert!((result.true_negative_rate + result.false_positive_rate - 1.0).abs() < 1e-9);
        assert_eq!(runner.results.len(), 1);
    }

    #[test]
    fn test_strategy_sweep_names_and_counts() {
        let mut runner = Runner::new();
        let mut base = ExperimentConfig::new("sweep");
        base.packets = 15;
        base.trials = 1;
        base.duration = 8.0;
        base.verify = VerifierConfig::new().sampling_rate(1.0).min_queries(10);

        let results = runner
            .strategy_sweep(
                &base,
                &[
                    (FlaggingStrategy::None, AnsweringStrategy::Honest),
                    (FlaggingStrategy::Random(0.5), AnsweringStrategy::Random),
                ],
            )
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_ne!(results[0].name, results[1].name);
    }

    #[test]
    fn test_confidence_interval_bounds() {
        let (lo, hi) = confidence_interval(0.8, 5);
        assert!(lo >= 0.0 && hi <= 1.0 && lo < 0.8 && hi > 0.8);
        assert_eq!(confidence_interval(0.5, 0), (0.0, 1.0));
    }
}
