// SPDX-License-Identifier: MIT OR Apache-2.0
//! Path fingerprint commitments.
//!
//! The router registers an 8-byte SHA-256 prefix of its opaque path label at
//! transmission time. The verifier stores the hash; any later claim about
//! the path must reproduce it. The label itself never crosses the interface.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Number of digest bytes kept in a fingerprint.
const FINGERPRINT_BYTES: usize = 8;

/// Hash a path label to its 16-hex-character fingerprint.
///
/// Deterministic across runs: SHA-256 truncated to 8 bytes, lowercase hex.
#[must_use]
pub fn hash_path_label(label: &str) -> String {
    let digest = Sha256::digest(label.as_bytes());
    digest[..FINGERPRINT_BYTES]
        .iter()
        .fold(String::with_capacity(FINGERPRINT_BYTES * 2), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        })
}

/// A fingerprint commitment registered at transmission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commitment {
    pub packet_id: u64,
    /// `hash_path_label` of the path label in effect when the packet was
    /// routed.
    pub hash: String,
    /// Virtual send time of the committed packet.
    pub timestamp: f64,
}

impl Commitment {
    #[must_use]
    pub fn new(packet_id: u64, path_label: &str, timestamp: f64) -> Self {
        Self {
            packet_id,
            hash: hash_path_label(path_label),
            timestamp,
        }
    }

    /// Whether a later path claim matches this commitment.
    #[must_use]
    pub fn matches(&self, claimed_label: &str) -> bool {
        hash_path_label(claimed_label) == self.hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        // SHA-256("abc") begins ba7816bf8f01cfea...
        assert_eq!(hash_path_label("abc"), "ba7816bf8f01cfea");
    }

    #[test]
    fn test_same_input_same_output() {
        assert_eq!(hash_path_label("path_leo_fast"), hash_path_label("path_leo_fast"));
    }

    #[test]
    fn test_output_is_sixteen_lowercase_hex_chars() {
        let hash = hash_path_label("some label");
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_distinct_labels_differ() {
        assert_ne!(hash_path_label("A"), hash_path_label("B"));
    }

    #[test]
    fn test_commitment_matches_only_original_label() {
        let commitment = Commitment::new(7, "A", 1.25);
        assert!(commitment.matches("A"));
        assert!(!commitment.matches("B"));
        assert_eq!(commitment.packet_id, 7);
        assert_eq!(commitment.timestamp, 1.25);
    }
}
