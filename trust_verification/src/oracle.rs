// SPDX-License-Identifier: MIT OR Apache-2.0
//! The adversarial oracle: records ground truth, assigns congestion flags as
//! a batch, and answers verifier queries under a composite strategy.
//!
//! The two strategy dimensions are orthogonal. *Flagging* decides which
//! packets the oracle claims experienced legitimate congestion; it runs once,
//! after the simulation, over the full record batch. *Answering* decides how
//! comparison queries are answered at query time.
//!
//! Every comparison answer is memoised under the canonical (low id, high id)
//! pair: a repeat query in either order returns the same answer (swapped for
//! the reversed order). The memo is the commitment channel the detector
//! exploits.

use std::collections::{HashMap, HashSet};

use delay_network::{TransmissionObserver, TransmissionRecord};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, Result};
use crate::query::{Answer, Payload, Query, QueryAnswerer, Response};

/// Tolerance for delay comparisons: claims within a millisecond are equal.
pub const COMPARE_EPSILON: f64 = 1e-3;

/// Scale applied to a flagged packet's observed delay when the `Consistent`
/// strategy invents its claimed minimum.
const FLAGGED_CLAIM_SCALE: f64 = 0.9;

/// How the oracle chooses which packets to flag as "legitimate congestion".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FlaggingStrategy {
    /// No packet is flagged.
    None,
    /// Each record is flagged independently with the given probability.
    Random(f64),
    /// The given fraction of records with the lowest observed delay.
    LowDelayPercentile(f64),
    /// Exactly the records that were actually targeted. Maximally
    /// self-incriminating; useful as a control.
    ActualTargeted,
}

impl FlaggingStrategy {
    fn validate(&self) -> Result<()> {
        let (field, value) = match self {
            Self::Random(p) => ("flagging probability", *p),
            Self::LowDelayPercentile(q) => ("flagging percentile", *q),
            Self::None | Self::ActualTargeted => return Ok(()),
        };
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::OutOfUnitRange { field, value });
        }
        Ok(())
    }
}

/// How the oracle answers comparison queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnsweringStrategy {
    /// The literal ordering of minimum-possible delays.
    Honest,
    /// Uniform over the three answers.
    Random,
    /// The ordering of observed totals: the naive attacker that exploits the
    /// verifier's lack of direct access to minimums.
    ClaimLowerObserved,
    /// Frozen per-packet claimed minimums: flagged packets claim
    /// `observed * 0.9`, unflagged packets claim the truth, and every later
    /// answer derives from the frozen claims.
    Consistent,
}

/// Running counters over the oracle's answering behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OracleStats {
    pub queries: u64,
    /// Answers that differ from what `Honest` would have said.
    pub lies: u64,
    pub flagged: usize,
    pub lie_rate: f64,
}

/// Ground-truth store plus strategy-driven answering.
pub struct Oracle {
    flagging: FlaggingStrategy,
    answering: AnsweringStrategy,
    records: Vec<TransmissionRecord>,
    by_id: HashMap<u64, usize>,
    flagged: HashSet<u64>,
    claimed_min: HashMap<u64, f64>,
    comparison_memo: HashMap<(u64, u64), Answer>,
    queries: u64,
    lies: u64,
}

impl Oracle {
    /// Build an oracle for a strategy pair.
    ///
    /// # Errors
    /// Returns `ConfigError` when a flagging parameter is out of range.
    pub fn new(flagging: FlaggingStrategy, answering: AnsweringStrategy) -> Result<Self> {
        flagging.validate()?;
        Ok(Self {
            flagging,
            answering,
            records: Vec::new(),
            by_id: HashMap::new(),
            flagged: HashSet::new(),
            claimed_min: HashMap::new(),
            comparison_memo: HashMap::new(),
            queries: 0,
            lies: 0,
        })
    }

    /// Ground truth accumulated so far, in arrival order.
    #[must_use]
    pub fn records(&self) -> &[TransmissionRecord] {
        &self.records
    }

    fn record(&self, id: u64) -> Option<&TransmissionRecord> {
        self.by_id.get(&id).map(|&idx| &self.records[idx])
    }

    /// Assign flags over the whole batch. Called once, after the simulation
    /// completes and before verification begins.
    pub fn flag_packets<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.flagged.clear();
        match &self.flagging {
            FlaggingStrategy::None => {},
            FlaggingStrategy::Random(p) => {
                let p = *p;
                for record in &self.records {
                    if rng.random_bool(p) {
                        self.flagged.insert(record.id);
                    }
                }
            },
            FlaggingStrategy::LowDelayPercentile(q) => {
                let mut order: Vec<(f64, u64)> = self
                    .records
                    .iter()
                    .map(|r| (r.observed_by_client, r.id))
                    .collect();
                order.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
                let take = (q * self.records.len() as f64).floor() as usize;
                for &(_, id) in order.iter().take(take) {
                    self.flagged.insert(id);
                }
            },
            FlaggingStrategy::ActualTargeted => {
                for record in &self.records {
                    if record.malicious > 0.0 {
                        self.flagged.insert(record.id);
                    }
                }
            },
        }
    }

    /// The ids the oracle claims experienced legitimate congestion.
    #[must_use]
    pub fn flagged_ids(&self) -> HashSet<u64> {
        self.flagged.clone()
    }

    /// Fraction of recorded packets that are flagged.
    #[must_use]
    pub fn flag_rate(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        self.flagged.len() as f64 / self.records.len() as f64
    }

    #[must_use]
    pub fn is_flagged(&self, id: u64) -> bool {
        self.flagged.contains(&id)
    }

    #[must_use]
    pub fn stats(&self) -> OracleStats {
        let lie_rate = if self.queries == 0 {
            0.0
        } else {
            self.lies as f64 / self.queries as f64
        };
        OracleStats {
            queries: self.queries,
            lies: self.lies,
            flagged: self.flagged.len(),
            lie_rate,
        }
    }

    /// Forget claims, memos, flags and counters; ground truth stays.
    pub fn reset(&mut self) {
        self.flagged.clear();
        self.claimed_min.clear();
        self.comparison_memo.clear();
        self.queries = 0;
        self.lies = 0;
    }

    fn ordering(lhs: f64, rhs: f64) -> Answer {
        if lhs < rhs - COMPARE_EPSILON {
            Answer::Pkt1Lower
        } else if rhs < lhs - COMPARE_EPSILON {
            Answer::Pkt2Lower
        } else {
            Answer::Equal
        }
    }

    /// The claimed minimum the `Consistent` strategy stands behind for this
    /// packet, frozen the first time it is needed.
    fn frozen_claim(&mut self, record_id: u64) -> f64 {
        if let Some(&claim) = self.claimed_min.get(&record_id) {
            return claim;
        }
        let record = &self.records[self.by_id[&record_id]];
        let claim = if self.flagged.contains(&record_id) {
            record.observed_by_client * FLAGGED_CLAIM_SCALE
        } else {
            record.min_possible
        };
        self.claimed_min.insert(record_id, claim);
        claim
    }

    fn answer_comparison(&mut self, pkt_a: u64, pkt_b: u64, rng: &mut dyn RngCore) -> Answer {
        let (Some(rec_a), Some(rec_b)) = (self.record(pkt_a), self.record(pkt_b)) else {
            warn!(pkt_a, pkt_b, "comparison query for unknown packet");
            return Answer::Equal;
        };
        let rec_a = rec_a.clone();
        let rec_b = rec_b.clone();

        let swapped = pkt_a > pkt_b;
        let key = if swapped { (pkt_b, pkt_a) } else { (pkt_a, pkt_b) };
        if let Some(&memoised) = self.comparison_memo.get(&key) {
            return if swapped { memoised.swapped() } else { memoised };
        }

        let truth = Self::ordering(rec_a.min_possible, rec_b.min_possible);

        let answer = match self.answering {
            AnsweringStrategy::Honest => truth,
            AnsweringStrategy::Random => match rng.random_range(0..3u8) {
                0 => Answer::Pkt1Lower,
                1 => Answer::Pkt2Lower,
                _ => Answer::Equal,
            },
            AnsweringStrategy::ClaimLowerObserved => {
                Self::ordering(rec_a.observed_by_client, rec_b.observed_by_client)
            },
            AnsweringStrategy::Consistent => {
                let claim_a = self.frozen_claim(pkt_a);
                let claim_b = self.frozen_claim(pkt_b);
                Self::ordering(claim_a, claim_b)
            },
        };

        if answer != truth {
            self.lies += 1;
        }
        let canonical = if swapped { answer.swapped() } else { answer };
        self.comparison_memo.insert(key, canonical);
        answer
    }

    fn answer_delay_bound(&mut self, pkt: u64, threshold: f64, rng: &mut dyn RngCore) -> bool {
        let Some(record) = self.record(pkt).cloned() else {
            warn!(pkt, "delay-bound query for unknown packet");
            return false;
        };

        let truth = record.min_possible > threshold;
        let answer = match self.answering {
            AnsweringStrategy::Honest => truth,
            AnsweringStrategy::Random => rng.random_bool(0.5),
            AnsweringStrategy::ClaimLowerObserved => record.observed_by_client > threshold,
            AnsweringStrategy::Consistent => self.frozen_claim(pkt) > threshold,
        };

        if answer != truth {
            self.lies += 1;
        }
        answer
    }

    fn answer_congestion(&self, start: f64, end: f64) -> f64 {
        let mut total = 0usize;
        let mut flagged = 0usize;
        for record in &self.records {
            if record.sent_time >= start && record.sent_time <= end {
                total += 1;
                if self.flagged.contains(&record.id) {
                    flagged += 1;
                }
            }
        }
        if total == 0 {
            return 0.0;
        }
        flagged as f64 / total as f64
    }
}

impl TransmissionObserver for Oracle {
    fn observe(&mut self, record: &TransmissionRecord) {
        self.by_id.insert(record.id, self.records.len());
        self.records.push(record.clone());
    }
}

impl QueryAnswerer for Oracle {
    fn answer(&mut self, query: &Query, rng: &mut dyn RngCore) -> Response {
        self.queries += 1;
        let payload = match *query {
            Query::Compare { pkt_a, pkt_b } => {
                Payload::Comparison(self.answer_comparison(pkt_a, pkt_b, rng))
            },
            Query::DelayBound { pkt, threshold } => {
                Payload::Bool(self.answer_delay_bound(pkt, threshold, rng))
            },
            Query::CongestionFlag { start, end } => {
                Payload::Float(self.answer_congestion(start, end))
            },
        };
        Response {
            query: query.clone(),
            payload,
        }
    }
}
