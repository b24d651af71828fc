// SPDX-License-Identifier: MIT OR Apache-2.0
//! Packets and the ground-truth transmission records the router emits.

use serde::{Deserialize, Serialize};

use crate::delay::DelayComponents;
use crate::fingerprint::Commitment;

/// An immutable packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub id: u64,
    pub sent_time: f64,
    pub source_label: String,
}

impl Packet {
    #[must_use]
    pub fn new(id: u64, source_label: impl Into<String>, sent_time: f64) -> Self {
        Self {
            id,
            sent_time,
            source_label: source_label.into(),
        }
    }
}

/// Ground truth for one transmission, immutable once emitted and uniquely
/// keyed by packet id.
///
/// `observed_by_client` equals `total`: the client sees the full latency but
/// not its decomposition. The hidden components (`base`, `legit`,
/// `malicious`, `was_targeted`) exist for the oracle and for analysis;
/// verifier logic must only read the observable fields and the fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmissionRecord {
    pub id: u64,
    pub sent_time: f64,
    pub base: f64,
    pub legit: f64,
    pub malicious: f64,
    pub total: f64,
    pub min_possible: f64,
    pub was_targeted: bool,
    pub observed_by_client: f64,
    pub fingerprint: Commitment,
}

impl TransmissionRecord {
    /// `sent_time` is the virtual clock reading at forward time, which may
    /// differ from the packet's nominal creation time.
    #[must_use]
    pub fn new(
        id: u64,
        sent_time: f64,
        components: &DelayComponents,
        was_targeted: bool,
        fingerprint: Commitment,
    ) -> Self {
        Self {
            id,
            sent_time,
            base: components.base,
            legit: components.legit,
            malicious: components.malicious,
            total: components.total,
            min_possible: components.min_possible,
            was_targeted,
            observed_by_client: components.total,
            fingerprint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_mirrors_components() {
        let packet = Packet::new(3, "station_a", 1.5);
        let components = DelayComponents {
            base: 0.04,
            legit: 0.01,
            malicious: 0.15,
            total: 0.20,
            min_possible: 0.04,
        };
        let record = TransmissionRecord::new(
            packet.id,
            packet.sent_time,
            &components,
            true,
            Commitment::new(3, "uplink", 1.5),
        );

        assert_eq!(record.id, 3);
        assert_eq!(record.sent_time, 1.5);
        assert_eq!(record.observed_by_client, record.total);
        assert_eq!(record.min_possible, record.base);
        assert!(record.was_targeted);
        assert_eq!(record.fingerprint.packet_id, 3);
    }
}
