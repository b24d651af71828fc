// SPDX-License-Identifier: MIT OR Apache-2.0
//! Contradiction detection over oracle responses.
//!
//! Four cooperating checkers, updated online as responses arrive:
//!
//! - **Transitivity**: a directed graph of "claimed strictly lower minimum"
//!   edges; any cycle is a definitive contradiction.
//! - **Commitment**: an order-normalised memo of past responses; any
//!   mismatch on re-query is definitive.
//! - **Temporal**: soft plausibility checks on near-simultaneous pairs. A
//!   claimed-faster packet observed far slower accumulates suspicion; an
//!   unflagged packet whose observed delay exceeds the public legitimate
//!   envelope, claimed slower in line with the observed gap, is the
//!   hide-by-worse-path signature and yields a non-definitive contradiction.
//! - **Physical**: observed or claimed delays below the speed-of-light floor
//!   (or below a known path base) are definitive.
//!
//! The detector never fails: every check returns `Option<Contradiction>`.

use std::collections::{HashMap, HashSet, VecDeque};

use delay_network::{Commitment, TransmissionRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::query::{Answer, Payload, Query, QueryKey, Response};

/// Severity at or above which a contradiction is definitive.
pub const DEFINITIVE_SEVERITY: f64 = 0.99;

/// Absolute tolerance for float payloads in the commitment check.
const FLOAT_PAYLOAD_EPSILON: f64 = 1e-2;

/// Tolerance when comparing a claimed delay against a known path base.
const PATH_BASE_EPSILON: f64 = 1e-3;

/// Detector tuning knobs. Everything here is public knowledge: the delay
/// envelope parameters describe the published path model, not ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Two packets are comparable when their send times are within this
    /// window (seconds).
    pub comparison_window: f64,
    /// Relative tolerance before an observed-delay gap counts against a
    /// claim.
    pub observed_tolerance: f64,
    /// Speed-of-light floor (seconds).
    pub min_physical_delay: f64,
    /// Largest base delay any path can have (seconds).
    pub max_base_delay: f64,
    /// Jitter beyond the base delay that legitimate congestion can explain
    /// without a flag (seconds).
    pub jitter_allowance: f64,
    /// Depth limit for the cycle search in the transitivity graph.
    pub cycle_depth_limit: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            comparison_window: 5.0,
            observed_tolerance: 0.5,
            min_physical_delay: 0.01,
            max_base_delay: 0.08,
            jitter_allowance: 0.12,
            cycle_depth_limit: 50,
        }
    }
}

impl DetectorConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn comparison_window(mut self, window: f64) -> Self {
        self.comparison_window = window;
        self
    }

    #[must_use]
    pub const fn observed_tolerance(mut self, tolerance: f64) -> Self {
        self.observed_tolerance = tolerance;
        self
    }

    #[must_use]
    pub const fn min_physical_delay(mut self, floor: f64) -> Self {
        self.min_physical_delay = floor;
        self
    }

    #[must_use]
    pub const fn delay_envelope(mut self, max_base: f64, jitter_allowance: f64) -> Self {
        self.max_base_delay = max_base;
        self.jitter_allowance = jitter_allowance;
        self
    }

    /// The largest observed delay legitimate, unflagged traffic can carry.
    #[must_use]
    pub fn legit_envelope(&self) -> f64 {
        self.max_base_delay + self.jitter_allowance
    }

    /// Check every knob against its admissible range.
    ///
    /// # Errors
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("detector.comparison_window", self.comparison_window),
            ("detector.observed_tolerance", self.observed_tolerance),
            ("detector.min_physical_delay", self.min_physical_delay),
            ("detector.max_base_delay", self.max_base_delay),
            ("detector.jitter_allowance", self.jitter_allowance),
        ] {
            if !(value >= 0.0) {
                return Err(ConfigError::Negative { field, value });
            }
        }
        if self.cycle_depth_limit == 0 {
            return Err(ConfigError::NonPositive {
                field: "detector.cycle_depth_limit",
                value: 0.0,
            });
        }
        Ok(())
    }
}

/// What kind of inconsistency was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContradictionKind {
    /// A cycle in the claimed strict ordering of minimum delays.
    Transitivity,
    /// A re-query or fingerprint claim that does not match the committed
    /// answer.
    CommitmentViolation,
    /// A packet claimed faster than one it was observed far slower than.
    TemporalMismatch,
    /// Physically excessive, unflagged delay attributed to path ordering.
    ExcessAttribution,
    /// A delay below the physical floor or a known path base.
    PhysicalViolation,
}

/// A detected inconsistency. Severity 1.0 means logically airtight; the
/// soft temporal signals stay at or below 0.9.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contradiction {
    pub kind: ContradictionKind,
    pub description: String,
    pub severity: f64,
    /// Packet ids forming the cycle, for transitivity contradictions.
    pub cycle: Vec<u64>,
}

impl Contradiction {
    #[must_use]
    pub fn is_definitive(&self) -> bool {
        self.severity >= DEFINITIVE_SEVERITY
    }
}

/// Per-response output fed to the belief engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionSignal {
    /// Suspicion accumulated by this response (0 when nothing fired).
    pub suspicion: f64,
    /// A non-definitive contradiction was recorded for this response.
    pub contradiction: bool,
    /// A definitive contradiction was recorded for this response.
    pub definitive: bool,
    /// Either packet in the comparison carries positive accumulated
    /// suspicion.
    pub involves_suspicious: bool,
    /// The pair's send times fell within the comparison window.
    pub in_window: bool,
}

impl DetectionSignal {
    fn quiet(in_window: bool) -> Self {
        Self {
            suspicion: 0.0,
            contradiction: false,
            definitive: false,
            involves_suspicious: false,
            in_window,
        }
    }
}

#[derive(Debug, Default)]
struct TransitivityChecker {
    // edge faster -> slower: "faster was claimed to have strictly lower
    // minimum delay". Neighbour lists keep insertion order so the cycle
    // search is deterministic.
    edges: HashMap<u64, Vec<u64>>,
}

impl TransitivityChecker {
    fn add_claim(&mut self, faster: u64, slower: u64, depth_limit: usize) -> Option<Contradiction> {
        let neighbours = self.edges.entry(faster).or_default();
        if !neighbours.contains(&slower) {
            neighbours.push(slower);
        }

        let path = self.find_path(slower, faster, depth_limit)?;
        let mut cycle = Vec::with_capacity(path.len());
        cycle.push(faster);
        cycle.extend(path.iter().copied().take_while(|&n| n != faster));
        Some(Contradiction {
            kind: ContradictionKind::Transitivity,
            description: format!("claimed delay ordering contains a cycle: {cycle:?}"),
            severity: 1.0,
            cycle,
        })
    }

    /// Breadth-first search for a path `from -> ... -> to`, bounded by
    /// `depth_limit` hops.
    fn find_path(&self, from: u64, to: u64, depth_limit: usize) -> Option<Vec<u64>> {
        if from == to {
            return Some(vec![from]);
        }
        let mut parent: HashMap<u64, u64> = HashMap::new();
        let mut visited: HashSet<u64> = HashSet::from([from]);
        let mut queue: VecDeque<(u64, usize)> = VecDeque::from([(from, 0)]);

        while let Some((node, depth)) = queue.pop_front() {
            if depth >= depth_limit {
                continue;
            }
            for &next in self.edges.get(&node).into_iter().flatten() {
                if !visited.insert(next) {
                    continue;
                }
                parent.insert(next, node);
                if next == to {
                    let mut path = vec![to];
                    let mut current = to;
                    while current != from {
                        current = parent[&current];
                        path.push(current);
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back((next, depth + 1));
            }
        }
        None
    }

    fn reset(&mut self) {
        self.edges.clear();
    }
}

#[derive(Debug, Default)]
struct CommitmentChecker {
    responses: HashMap<QueryKey, Payload>,
}

impl CommitmentChecker {
    fn canonical_payload(payload: &Payload, swapped: bool) -> Payload {
        match (payload, swapped) {
            (Payload::Comparison(answer), true) => Payload::Comparison(answer.swapped()),
            _ => payload.clone(),
        }
    }

    fn conflicts(previous: &Payload, current: &Payload) -> bool {
        match (previous, current) {
            (Payload::Float(a), Payload::Float(b)) => (a - b).abs() > FLOAT_PAYLOAD_EPSILON,
            _ => previous != current,
        }
    }

    fn check_and_record(&mut self, response: &Response) -> Option<Contradiction> {
        let (key, swapped) = response.query.normalised();
        let canonical = Self::canonical_payload(&response.payload, swapped);

        if let Some(previous) = self.responses.get(&key) {
            if Self::conflicts(previous, &canonical) {
                return Some(Contradiction {
                    kind: ContradictionKind::CommitmentViolation,
                    description: format!(
                        "inconsistent answers to the same query: {previous:?} then {canonical:?}"
                    ),
                    severity: 1.0,
                    cycle: Vec::new(),
                });
            }
            return None;
        }

        self.responses.insert(key, canonical);
        None
    }

    fn reset(&mut self) {
        self.responses.clear();
    }
}

#[derive(Debug)]
struct TemporalChecker {
    tolerance: f64,
    envelope: f64,
    suspicion: HashMap<u64, f64>,
}

impl TemporalChecker {
    fn new(tolerance: f64, envelope: f64) -> Self {
        Self {
            tolerance,
            envelope,
            suspicion: HashMap::new(),
        }
    }

    /// Check a strict comparison answer. `fast` is the packet the oracle
    /// claimed had the lower minimum.
    fn check(
        &mut self,
        fast: &TransmissionRecord,
        slow: &TransmissionRecord,
        in_window: bool,
        slow_is_flagged: bool,
    ) -> (f64, Option<Contradiction>) {
        if !in_window {
            return (0.0, None);
        }
        let obs_fast = fast.observed_by_client;
        let obs_slow = slow.observed_by_client;
        if obs_fast <= 0.0 || obs_slow <= 0.0 {
            return (0.0, None);
        }

        // Claimed faster, observed far slower: the claim disagrees with the
        // observation beyond tolerance.
        if obs_fast > (1.0 + self.tolerance) * obs_slow {
            let sigma = obs_fast / obs_slow - 1.0;
            *self.suspicion.entry(fast.id).or_default() += sigma;
            let contradiction = (sigma > 1.0).then(|| Contradiction {
                kind: ContradictionKind::TemporalMismatch,
                description: format!(
                    "packet {} claimed faster but observed {:.4}s vs {:.4}s",
                    fast.id, obs_fast, obs_slow
                ),
                severity: (sigma / 2.0).min(0.9),
                cycle: Vec::new(),
            });
            return (sigma, contradiction);
        }

        // Claimed slower in line with the observed gap, while unflagged and
        // beyond anything the path model plus jitter can produce: the
        // operator is attributing inexplicable delay to path ordering.
        if !slow_is_flagged
            && obs_slow > self.envelope
            && obs_slow > (1.0 + self.tolerance) * obs_fast
        {
            let sigma = obs_slow / obs_fast - 1.0;
            *self.suspicion.entry(slow.id).or_default() += sigma;
            let contradiction = Contradiction {
                kind: ContradictionKind::ExcessAttribution,
                description: format!(
                    "packet {} observed {:.4}s exceeds the legitimate envelope {:.4}s \
                     unflagged, yet was claimed slower-by-path than packet {}",
                    slow.id, obs_slow, self.envelope, fast.id
                ),
                severity: (sigma / 2.0).min(0.9),
                cycle: Vec::new(),
            };
            return (sigma, Some(contradiction));
        }

        (0.0, None)
    }

    fn score(&self, id: u64) -> f64 {
        self.suspicion.get(&id).copied().unwrap_or(0.0)
    }

    fn reset(&mut self) {
        self.suspicion.clear();
    }
}

#[derive(Debug)]
struct PhysicalChecker {
    min_physical: f64,
    path_bases: HashMap<String, f64>,
}

impl PhysicalChecker {
    fn new(min_physical: f64) -> Self {
        Self {
            min_physical,
            path_bases: HashMap::new(),
        }
    }

    fn check_observed(&self, packet_id: u64, observed: f64) -> Option<Contradiction> {
        (observed < self.min_physical).then(|| Contradiction {
            kind: ContradictionKind::PhysicalViolation,
            description: format!(
                "packet {packet_id} observed {observed:.4}s below the physical minimum {:.4}s",
                self.min_physical
            ),
            severity: 1.0,
            cycle: Vec::new(),
        })
    }

    fn check_claimed(
        &self,
        claimed_min: f64,
        observed: f64,
        path_label: Option<&str>,
    ) -> Option<Contradiction> {
        if claimed_min < self.min_physical {
            return Some(Contradiction {
                kind: ContradictionKind::PhysicalViolation,
                description: format!(
                    "claimed minimum {claimed_min:.4}s below the physical minimum {:.4}s",
                    self.min_physical
                ),
                severity: 1.0,
                cycle: Vec::new(),
            });
        }
        if observed < claimed_min - PATH_BASE_EPSILON {
            return Some(Contradiction {
                kind: ContradictionKind::PhysicalViolation,
                description: format!(
                    "observed {observed:.4}s below the claimed minimum {claimed_min:.4}s"
                ),
                severity: 1.0,
                cycle: Vec::new(),
            });
        }
        if let Some(base) = path_label.and_then(|label| self.path_bases.get(label)) {
            if claimed_min < base - PATH_BASE_EPSILON {
                return Some(Contradiction {
                    kind: ContradictionKind::PhysicalViolation,
                    description: format!(
                        "claimed minimum {claimed_min:.4}s below the path base {base:.4}s"
                    ),
                    severity: 1.0,
                    cycle: Vec::new(),
                });
            }
        }
        None
    }
}

/// Online contradiction detector. Per-verification state: edges, memos and
/// suspicion do not persist across trials.
pub struct ContradictionDetector {
    config: DetectorConfig,
    transitivity: TransitivityChecker,
    commitment: CommitmentChecker,
    temporal: TemporalChecker,
    physical: PhysicalChecker,
    flagged: HashSet<u64>,
    commitments: HashMap<u64, Commitment>,
    contradictions: Vec<Contradiction>,
}

impl ContradictionDetector {
    /// Build a detector from a validated configuration.
    ///
    /// # Errors
    /// Returns `ConfigError` when a knob is out of range.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        let temporal = TemporalChecker::new(config.observed_tolerance, config.legit_envelope());
        let physical = PhysicalChecker::new(config.min_physical_delay);
        Ok(Self {
            config,
            transitivity: TransitivityChecker::default(),
            commitment: CommitmentChecker::default(),
            temporal,
            physical,
            flagged: HashSet::new(),
            commitments: HashMap::new(),
            contradictions: Vec::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Install the oracle's claimed congestion flags for this trial.
    pub fn set_flagged(&mut self, flagged: HashSet<u64>) {
        self.flagged = flagged;
    }

    /// Register the fingerprint commitment carried by a record.
    pub fn register_commitment(&mut self, commitment: &Commitment) {
        self.commitments
            .insert(commitment.packet_id, commitment.clone());
    }

    /// Publish a known path base delay for the physical checker.
    pub fn add_known_path(&mut self, label: impl Into<String>, base_delay: f64) {
        self.physical.path_bases.insert(label.into(), base_delay);
    }

    /// Check a later path claim against the registered fingerprint.
    pub fn check_path_claim(&mut self, packet_id: u64, claimed_label: &str) -> Option<Contradiction> {
        let commitment = self.commitments.get(&packet_id)?;
        if commitment.matches(claimed_label) {
            return None;
        }
        let contradiction = Contradiction {
            kind: ContradictionKind::CommitmentViolation,
            description: format!(
                "packet {packet_id}: claimed path hashes to {}, commitment was {}",
                delay_network::hash_path_label(claimed_label),
                commitment.hash
            ),
            severity: 1.0,
            cycle: Vec::new(),
        };
        self.contradictions.push(contradiction.clone());
        Some(contradiction)
    }

    /// Physical-floor check over an observed delay, run at ingestion.
    pub fn check_observed_delay(&mut self, packet_id: u64, observed: f64) -> Option<Contradiction> {
        let contradiction = self.physical.check_observed(packet_id, observed)?;
        self.contradictions.push(contradiction.clone());
        Some(contradiction)
    }

    /// Physical check over a claimed minimum delay.
    pub fn check_claimed_delay(
        &mut self,
        claimed_min: f64,
        observed: f64,
        path_label: Option<&str>,
    ) -> Option<Contradiction> {
        let contradiction = self.physical.check_claimed(claimed_min, observed, path_label)?;
        self.contradictions.push(contradiction.clone());
        Some(contradiction)
    }

    /// Process one oracle response. `rec_a` / `rec_b` are the verifier's
    /// copies of the compared records, when known.
    pub fn process_response(
        &mut self,
        response: &Response,
        rec_a: Option<&TransmissionRecord>,
        rec_b: Option<&TransmissionRecord>,
        in_window: bool,
    ) -> DetectionSignal {
        let mut signal = DetectionSignal::quiet(in_window);

        if let Some(contradiction) = self.commitment.check_and_record(response) {
            debug!(severity = contradiction.severity, "commitment violation");
            self.push(contradiction, &mut signal);
        }

        let Query::Compare { pkt_a, pkt_b } = response.query else {
            return signal;
        };
        let Some(answer) = response.comparison() else {
            return signal;
        };

        let claim = match answer {
            Answer::Pkt1Lower => Some((pkt_a, pkt_b)),
            Answer::Pkt2Lower => Some((pkt_b, pkt_a)),
            Answer::Equal => None,
        };

        if let Some((faster, slower)) = claim {
            if let Some(contradiction) =
                self.transitivity
                    .add_claim(faster, slower, self.config.cycle_depth_limit)
            {
                debug!(cycle = ?contradiction.cycle, "transitivity cycle");
                self.push(contradiction, &mut signal);
            }

            if let (Some(ra), Some(rb)) = (rec_a, rec_b) {
                let (fast, slow) = if faster == ra.id { (ra, rb) } else { (rb, ra) };
                let slow_is_flagged = self.flagged.contains(&slow.id);
                let (suspicion, contradiction) =
                    self.temporal.check(fast, slow, in_window, slow_is_flagged);
                signal.suspicion = suspicion;
                if let Some(contradiction) = contradiction {
                    self.push(contradiction, &mut signal);
                }
            }
        }

        signal.involves_suspicious =
            self.temporal.score(pkt_a) > 0.0 || self.temporal.score(pkt_b) > 0.0;
        signal
    }

    fn push(&mut self, contradiction: Contradiction, signal: &mut DetectionSignal) {
        if contradiction.is_definitive() {
            signal.definitive = true;
        } else {
            signal.contradiction = true;
        }
        self.contradictions.push(contradiction);
    }

    /// Contradictions with severity `>= 0.99`.
    #[must_use]
    pub fn definitive_contradictions(&self) -> Vec<&Contradiction> {
        self.contradictions
            .iter()
            .filter(|c| c.is_definitive())
            .collect()
    }

    /// Every contradiction recorded so far, in detection order.
    #[must_use]
    pub fn all_contradictions(&self) -> &[Contradiction] {
        &self.contradictions
    }

    /// Accumulated temporal suspicion for a packet.
    #[must_use]
    pub fn suspicion_score(&self, id: u64) -> f64 {
        self.temporal.score(id)
    }

    /// The `n` most suspicious packet ids, highest score first.
    #[must_use]
    pub fn top_suspicious(&self, n: usize) -> Vec<u64> {
        let mut scored: Vec<(u64, f64)> = self
            .temporal
            .suspicion
            .iter()
            .map(|(&id, &score)| (id, score))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.into_iter().take(n).map(|(id, _)| id).collect()
    }

    /// Clear per-trial state; configuration and known paths survive.
    pub fn reset(&mut self) {
        self.transitivity.reset();
        self.commitment.reset();
        self.temporal.reset();
        self.flagged.clear();
        self.commitments.clear();
        self.contradictions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delay_network::DelayComponents;

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

    fn compare_response(a: u64, b: u64, answer: Answer) -> Response {
        Response {
            query: Query::compare(a, b),
            payload: Payload::Comparison(answer),
        }
    }

    fn detector() -> ContradictionDetector {
        ContradictionDetector::new(DetectorConfig::default()).unwrap()
    }

    #[test]
    fn test_transitivity_cycle_is_definitive() {
        let mut det = detector();

        let s1 = det.process_response(&compare_response(1, 2, Answer::Pkt1Lower), None, None, false);
        let s2 = det.process_response(&compare_response(2, 3, Answer::Pkt1Lower), None, None, false);
        assert!(!s1.definitive && !s2.definitive);

        let s3 = det.process_response(&compare_response(3, 1, Answer::Pkt1Lower), None, None, false);
        assert!(s3.definitive);

        let definitive = det.definitive_contradictions();
        assert_eq!(definitive.len(), 1);
        assert_eq!(definitive[0].kind, ContradictionKind::Transitivity);
        for id in [1, 2, 3] {
            assert!(definitive[0].cycle.contains(&id));
        }
    }

    #[test]
    fn test_equal_answers_create_no_edges() {
        let mut det = detector();
        det.process_response(&compare_response(1, 2, Answer::Equal), None, None, false);
        det.process_response(&compare_response(2, 1, Answer::Equal), None, None, false);
        assert!(det.all_contradictions().is_empty());
    }

    #[test]
    fn test_commitment_check_accepts_swapped_consistent_answer() {
        let mut det = detector();
        det.process_response(&compare_response(1, 2, Answer::Pkt1Lower), None, None, false);
        let signal =
            det.process_response(&compare_response(2, 1, Answer::Pkt2Lower), None, None, false);
        assert!(!signal.definitive);
        assert!(det.all_contradictions().is_empty());
    }

    #[test]
    fn test_commitment_check_flags_changed_answer() {
        let mut det = detector();
        det.process_response(&compare_response(1, 2, Answer::Pkt1Lower), None, None, false);
        let signal =
            det.process_response(&compare_response(2, 1, Answer::Pkt1Lower), None, None, false);
        assert!(signal.definitive);
        let definitive = det.definitive_contradictions();
        assert_eq!(definitive[0].kind, ContradictionKind::CommitmentViolation);
    }

    #[test]
    fn test_commitment_check_float_tolerance() {
        let mut det = detector();
        let query = Query::CongestionFlag {
            start: 0.0,
            end: 5.0,
        };
        det.process_response(
            &Response {
                query: query.clone(),
                payload: Payload::Float(0.500),
            },
            None,
            None,
            false,
        );

        // Within +-1e-2: no contradiction.
        let signal = det.process_response(
            &Response {
                query: query.clone(),
                payload: Payload::Float(0.505),
            },
            None,
            None,
            false,
        );
        assert!(!signal.definitive);

        let signal = det.process_response(
            &Response {
                query,
                payload: Payload::Float(0.60),
            },
            None,
            None,
            false,
        );
        assert!(signal.definitive);
    }

    #[test]
    fn test_temporal_mismatch_accumulates_and_contradicts() {
        let mut det = detector();
        // Packet 1 claimed faster, observed 0.24s vs 0.06s: sigma = 3.
        let rec_a = record(1, 0.0, 0.02, 0.07, 0.15);
        let rec_b = record(2, 1.0, 0.05, 0.01, 0.0);

        let signal = det.process_response(
            &compare_response(1, 2, Answer::Pkt1Lower),
            Some(&rec_a),
            Some(&rec_b),
            true,
        );

        assert!(signal.suspicion > 1.0);
        assert!(signal.contradiction);
        assert!(!signal.definitive);
        assert!(signal.involves_suspicious);
        let found = &det.all_contradictions()[0];
        assert_eq!(found.kind, ContradictionKind::TemporalMismatch);
        assert!(found.severity <= 0.9);
        assert!(det.suspicion_score(1) > 0.0);
    }

    #[test]
    fn test_temporal_mismatch_needs_window() {
        let mut det = detector();
        let rec_a = record(1, 0.0, 0.02, 0.07, 0.15);
        let rec_b = record(2, 40.0, 0.05, 0.01, 0.0);

        let signal = det.process_response(
            &compare_response(1, 2, Answer::Pkt1Lower),
            Some(&rec_a),
            Some(&rec_b),
            false,
        );
        assert_eq!(signal.suspicion, 0.0);
        assert!(det.all_contradictions().is_empty());
    }

    #[test]
    fn test_excess_attribution_fires_for_unflagged_over_envelope() {
        let mut det = detector();
        // Packet 1: observed 0.23s, over the 0.20s envelope, unflagged.
        // The oracle claims packet 2 (observed 0.04s) was the faster one.
        let rec_a = record(1, 0.0, 0.02, 0.06, 0.15);
        let rec_b = record(2, 1.0, 0.03, 0.01, 0.0);

        let signal = det.process_response(
            &compare_response(1, 2, Answer::Pkt2Lower),
            Some(&rec_a),
            Some(&rec_b),
            true,
        );

        assert!(signal.contradiction);
        assert!(signal.suspicion > 1.0);
        let found = &det.all_contradictions()[0];
        assert_eq!(found.kind, ContradictionKind::ExcessAttribution);
        assert!(det.suspicion_score(1) > 0.0);
    }

    #[test]
    fn test_excess_attribution_respects_flags() {
        let mut det = detector();
        det.set_flagged(HashSet::from([1]));
        let rec_a = record(1, 0.0, 0.02, 0.06, 0.15);
        let rec_b = record(2, 1.0, 0.03, 0.01, 0.0);

        let signal = det.process_response(
            &compare_response(1, 2, Answer::Pkt2Lower),
            Some(&rec_a),
            Some(&rec_b),
            true,
        );
        assert!(!signal.contradiction);
        assert!(det.all_contradictions().is_empty());
    }

    #[test]
    fn test_excess_attribution_spares_in_envelope_delays() {
        let mut det = detector();
        // 0.10s observed is explainable jitter: inside the 0.20s envelope.
        let rec_a = record(1, 0.0, 0.03, 0.07, 0.0);
        let rec_b = record(2, 1.0, 0.03, 0.005, 0.0);

        let signal = det.process_response(
            &compare_response(1, 2, Answer::Pkt2Lower),
            Some(&rec_a),
            Some(&rec_b),
            true,
        );
        assert!(!signal.contradiction);
        assert_eq!(signal.suspicion, 0.0);
    }

    #[test]
    fn test_physical_floor_is_definitive() {
        let mut det = detector();
        let contradiction = det.check_observed_delay(5, 0.001).unwrap();
        assert_eq!(contradiction.kind, ContradictionKind::PhysicalViolation);
        assert!(contradiction.is_definitive());
        assert_eq!(det.definitive_contradictions().len(), 1);
    }

    #[test]
    fn test_physical_floor_passes_ordinary_delays() {
        let mut det = detector();
        assert!(det.check_observed_delay(5, 0.05).is_none());
    }

    #[test]
    fn test_claimed_delay_below_path_base_is_definitive() {
        let mut det = detector();
        det.add_known_path("uplink", 0.05);
        let contradiction = det
            .check_claimed_delay(0.030, 0.055, Some("uplink"))
            .unwrap();
        assert_eq!(contradiction.kind, ContradictionKind::PhysicalViolation);
        assert!(contradiction.is_definitive());
    }

    #[test]
    fn test_path_claim_must_match_commitment() {
        let mut det = detector();
        det.register_commitment(&Commitment::new(7, "A", 1.0));

        assert!(det.check_path_claim(7, "A").is_none());
        let contradiction = det.check_path_claim(7, "B").unwrap();
        assert_eq!(contradiction.kind, ContradictionKind::CommitmentViolation);
        assert!(contradiction.is_definitive());
        // Unknown packets are skipped, not errors.
        assert!(det.check_path_claim(99, "C").is_none());
    }

    #[test]
    fn test_top_suspicious_orders_by_score() {
        let mut det = detector();
        let rec_a = record(1, 0.0, 0.02, 0.03, 0.19); // observed 0.24
        let rec_b = record(2, 1.0, 0.05, 0.01, 0.0); // observed 0.06
        let rec_c = record(3, 1.5, 0.02, 0.10, 0.19); // observed 0.31

        det.process_response(
            &compare_response(1, 2, Answer::Pkt1Lower),
            Some(&rec_a),
            Some(&rec_b),
            true,
        );
        det.process_response(
            &compare_response(3, 2, Answer::Pkt1Lower),
            Some(&rec_c),
            Some(&rec_b),
            true,
        );

        let top = det.top_suspicious(5);
        assert_eq!(top, vec![3, 1]);
    }

    #[test]
    fn test_reset_clears_trial_state() {
        let mut det = detector();
        det.process_response(&compare_response(1, 2, Answer::Pkt1Lower), None, None, false);
        det.process_response(&compare_response(2, 1, Answer::Pkt1Lower), None, None, false);
        assert!(!det.all_contradictions().is_empty());

        det.reset();
        assert!(det.all_contradictions().is_empty());
        assert_eq!(det.suspicion_score(1), 0.0);
        // The same re-query no longer conflicts after the reset.
        let signal =
            det.process_response(&compare_response(1, 2, Answer::Pkt1Lower), None, None, false);
        assert!(!signal.definitive);
    }
}
