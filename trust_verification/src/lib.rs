// SPDX-License-Identifier: MIT OR Apache-2.0
//! Adversarial-oracle trust verification.
//!
//! Can a client prove that a network operator selectively inflates packet
//! latencies while masking the inflation in its self-reports? This crate
//! holds both sides of that question:
//!
//! - **Oracle**: stores ground truth and answers comparison queries under a
//!   composite (flagging, answering) strategy pair, from fully honest to a
//!   consistency-preserving liar.
//! - **ContradictionDetector**: transitivity graph, commitment memo,
//!   temporal plausibility checks, and the physical floor.
//! - **BeliefEngine**: a three-hypothesis Bayesian tracker, a sequential
//!   probability ratio test, and an advisory detection-odds model.
//! - **Verifier**: hash-based record sampling, query generation, the
//!   execution loop, and verdict rendering.
//!
//! The verifier never sees ground truth: every verdict rests on internal
//! inconsistencies in the oracle's own answers, the published congestion
//! flags, and fingerprint commitments registered at transmission time.

#![forbid(unsafe_code)]

mod belief;
mod contradiction;
mod error;
mod oracle;
mod query;
mod verifier;

pub use belief::{
    BeliefEngine, BeliefState, DetectionOdds, Evidence, HypothesisTracker, Sprt, SprtDecision,
    SUSPICION_THRESHOLD,
};
pub use contradiction::{
    Contradiction, ContradictionDetector, ContradictionKind, DetectionSignal, DetectorConfig,
    DEFINITIVE_SEVERITY,
};
pub use error::{ConfigError, Result};
pub use oracle::{AnsweringStrategy, FlaggingStrategy, Oracle, OracleStats, COMPARE_EPSILON};
pub use query::{Answer, Payload, Query, QueryAnswerer, QueryKey, Response};
pub use verifier::{is_sampled, QueryStrategy, Verdict, VerdictReport, Verifier, VerifierConfig};
