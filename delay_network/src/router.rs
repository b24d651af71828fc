// SPDX-License-Identifier: MIT OR Apache-2.0
//! Adversarial router: drives packets through the delay model, applies the
//! targeting policy, and emits ground-truth records.
//!
//! The router owns the delay model and holds capability handles to its
//! observers and destination. At delivery time the transmission record is
//! emitted to every observer *before* the destination is notified, so the
//! oracle always holds a record before it can be asked about it.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use sim_engine::Scheduler;
use tracing::debug;

use crate::delay::DelayModel;
use crate::error::{ConfigError, Result};
use crate::fingerprint::Commitment;
use crate::packet::{Packet, TransmissionRecord};

/// Which packets the adversary inflates. Ground truth only; the verifier
/// never sees this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TargetingPolicy {
    /// No packet is targeted.
    None,
    /// Each packet is independently targeted with the given probability.
    RandomFraction(f64),
    /// Targeted iff the packet id is in the set.
    ById(BTreeSet<u64>),
    /// Targeted iff the send time falls in `[start, end]`.
    ByTime { start: f64, end: f64 },
}

impl TargetingPolicy {
    /// Check policy parameters.
    ///
    /// # Errors
    /// Returns `ConfigError` for a fraction outside `[0, 1]` or an inverted
    /// time window.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::RandomFraction(f) => {
                if !(0.0..=1.0).contains(f) {
                    return Err(ConfigError::OutOfUnitRange {
                        field: "targeting fraction",
                        value: *f,
                    });
                }
            },
            Self::ByTime { start, end } => {
                if start > end {
                    return Err(ConfigError::InvalidRange {
                        field: "targeting window",
                        min: *start,
                        max: *end,
                    });
                }
            },
            Self::None | Self::ById(_) => {},
        }
        Ok(())
    }

    fn is_targeted<R: Rng + ?Sized>(&self, packet_id: u64, send_time: f64, rng: &mut R) -> bool {
        match self {
            Self::None => false,
            Self::RandomFraction(f) => rng.random_bool(*f),
            Self::ById(ids) => ids.contains(&packet_id),
            Self::ByTime { start, end } => send_time >= *start && send_time <= *end,
        }
    }
}

/// Sink for delivered packets. Implementations are pure observers.
pub trait Destination {
    fn receive(&mut self, scheduler: &mut Scheduler, packet: &Packet, path_label: &str);
}

/// Listener for emitted transmission records. Records must be treated as
/// immutable.
pub trait TransmissionObserver {
    fn observe(&mut self, record: &TransmissionRecord);
}

/// Routes packets and records ground truth.
pub struct Router {
    model: DelayModel,
    targeting: TargetingPolicy,
    path_label: String,
    observers: Vec<Rc<RefCell<dyn TransmissionObserver>>>,
    routed: u64,
    targeted: u64,
}

impl Router {
    /// Build a router over an initialised delay model.
    ///
    /// # Errors
    /// Returns `ConfigError` when the targeting policy is out of range.
    pub fn new(
        model: DelayModel,
        targeting: TargetingPolicy,
        path_label: impl Into<String>,
    ) -> Result<Self> {
        targeting.validate()?;
        Ok(Self {
            model,
            targeting,
            path_label: path_label.into(),
            observers: Vec::new(),
            routed: 0,
            targeted: 0,
        })
    }

    /// Register a transmission observer. Observers are notified in
    /// registration order, always before the destination.
    pub fn add_observer(&mut self, observer: Rc<RefCell<dyn TransmissionObserver>>) {
        self.observers.push(observer);
    }

    /// Forward a packet: sample its delay, then schedule delivery at
    /// `now + total`. The emitted record carries the fingerprint commitment
    /// for the router's path label.
    ///
    /// # Errors
    /// Propagates `SimError` from the scheduler; the sampled delay is always
    /// non-negative, so this only fires on a non-finite total.
    pub fn forward<R: Rng + ?Sized>(
        &mut self,
        scheduler: &mut Scheduler,
        rng: &mut R,
        packet: Packet,
        destination: &Rc<RefCell<dyn Destination>>,
    ) -> sim_engine::Result<()> {
        self.routed += 1;
        let send_time = scheduler.now();
        let is_targeted = self.targeting.is_targeted(packet.id, send_time, rng);
        if is_targeted {
            self.targeted += 1;
        }

        let components = self.model.compute(send_time, is_targeted, rng);
        let commitment = Commitment::new(packet.id, &self.path_label, send_time);
        let record =
            TransmissionRecord::new(packet.id, send_time, &components, is_targeted, commitment);

        debug!(
            id = packet.id,
            total = components.total,
            targeted = is_targeted,
            "packet forwarded"
        );

        let observers: Vec<_> = self.observers.iter().map(Rc::clone).collect();
        let destination = Rc::clone(destination);
        let path_label = self.path_label.clone();

        scheduler.schedule(components.total, move |s| {
            for observer in &observers {
                observer.borrow_mut().observe(&record);
            }
            destination.borrow_mut().receive(s, &packet, &path_label);
        })
    }

    /// Diagnostic: packets routed so far.
    #[must_use]
    pub fn routed(&self) -> u64 {
        self.routed
    }

    /// Diagnostic: packets targeted so far.
    #[must_use]
    pub fn targeted(&self) -> u64 {
        self.targeted
    }

    /// The delay model driving this router.
    #[must_use]
    pub fn model(&self) -> &DelayModel {
        &self.model
    }
}
