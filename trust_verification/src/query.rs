// SPDX-License-Identifier: MIT OR Apache-2.0
//! Query/response wire types.
//!
//! The core protocol is a single synchronous call: the verifier poses a
//! `Query`, the oracle returns a `Response`. `Compare` is the shape every
//! proof and test is stated over; `DelayBound` and `CongestionFlag` are
//! carried for extension.

use rand::RngCore;
use serde::{Deserialize, Serialize};

/// A question posed to the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    /// Which of the two packets had the lower minimum-possible delay?
    Compare { pkt_a: u64, pkt_b: u64 },
    /// Was the packet's minimum-possible delay above the threshold?
    DelayBound { pkt: u64, threshold: f64 },
    /// What fraction of packets in the interval experienced congestion?
    CongestionFlag { start: f64, end: f64 },
}

impl Query {
    /// Convenience constructor for the comparison shape.
    #[must_use]
    pub const fn compare(pkt_a: u64, pkt_b: u64) -> Self {
        Self::Compare { pkt_a, pkt_b }
    }

    /// Order-insensitive identity of this query, plus whether the stored
    /// orientation is swapped relative to the canonical one. Float
    /// parameters key by their bit patterns.
    #[must_use]
    pub fn normalised(&self) -> (QueryKey, bool) {
        match *self {
            Self::Compare { pkt_a, pkt_b } => {
                let swapped = pkt_a > pkt_b;
                let (lo, hi) = if swapped {
                    (pkt_b, pkt_a)
                } else {
                    (pkt_a, pkt_b)
                };
                (QueryKey::Compare(lo, hi), swapped)
            },
            Self::DelayBound { pkt, threshold } => {
                (QueryKey::DelayBound(pkt, threshold.to_bits()), false)
            },
            Self::CongestionFlag { start, end } => (
                QueryKey::CongestionFlag(start.to_bits(), end.to_bits()),
                false,
            ),
        }
    }
}

/// Canonical key for commitment/memo maps: kind plus order-normalised
/// parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Compare(u64, u64),
    DelayBound(u64, u64),
    CongestionFlag(u64, u64),
}

/// Answer to a `Compare` query.
///
/// `Equal` is returned only when the oracle cannot distinguish the two
/// packets (or does not know one of them); it is never an evasion channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Answer {
    Pkt1Lower,
    Pkt2Lower,
    Equal,
}

impl Answer {
    /// The same answer with the packet roles exchanged.
    #[must_use]
    pub const fn swapped(self) -> Self {
        match self {
            Self::Pkt1Lower => Self::Pkt2Lower,
            Self::Pkt2Lower => Self::Pkt1Lower,
            Self::Equal => Self::Equal,
        }
    }
}

/// Typed response payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Bool(bool),
    Float(f64),
    Text(String),
    Comparison(Answer),
    /// Packet ids sorted by claimed delay; reserved for extension queries.
    Ordering(Vec<u64>),
}

/// A response paired with the query it answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub query: Query,
    pub payload: Payload,
}

impl Response {
    /// The comparison answer, if this response carries one.
    #[must_use]
    pub fn comparison(&self) -> Option<Answer> {
        match self.payload {
            Payload::Comparison(answer) => Some(answer),
            _ => None,
        }
    }
}

/// The synchronous query/response wire. Answers must be deterministic given
/// the oracle's state, the query, and the RNG stream.
pub trait QueryAnswerer {
    fn answer(&mut self, query: &Query, rng: &mut dyn RngCore) -> Response;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_normalises_to_low_high() {
        let (key_ab, swapped_ab) = Query::compare(3, 9).normalised();
        let (key_ba, swapped_ba) = Query::compare(9, 3).normalised();
        assert_eq!(key_ab, key_ba);
        assert_eq!(key_ab, QueryKey::Compare(3, 9));
        assert!(!swapped_ab);
        assert!(swapped_ba);
    }

    #[test]
    fn test_delay_bound_keys_on_threshold_bits() {
        let (a, _) = Query::DelayBound {
            pkt: 1,
            threshold: 0.05,
        }
        .normalised();
        let (b, _) = Query::DelayBound {
            pkt: 1,
            threshold: 0.06,
        }
        .normalised();
        assert_ne!(a, b);
    }

    #[test]
    fn test_answer_swap_is_involutive() {
        for answer in [Answer::Pkt1Lower, Answer::Pkt2Lower, Answer::Equal] {
            assert_eq!(answer.swapped().swapped(), answer);
        }
        assert_eq!(Answer::Pkt1Lower.swapped(), Answer::Pkt2Lower);
        assert_eq!(Answer::Equal.swapped(), Answer::Equal);
    }

    #[test]
    fn test_comparison_accessor() {
        let response = Response {
            query: Query::compare(1, 2),
            payload: Payload::Comparison(Answer::Equal),
        };
        assert_eq!(response.comparison(), Some(Answer::Equal));

        let response = Response {
            query: Query::CongestionFlag {
                start: 0.0,
                end: 1.0,
            },
            payload: Payload::Float(0.25),
        };
        assert_eq!(response.comparison(), None);
    }
}
