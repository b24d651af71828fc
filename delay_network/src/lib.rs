// SPDX-License-Identifier: MIT OR Apache-2.0
//! Statistical delay modelling and adversarial packet routing.
//!
//! This crate owns the ground-truth side of the simulator:
//!
//! - **DelayModel**: a piecewise-constant base-path delay process with
//!   Poisson-timed transitions, log-normal legitimate jitter, and uniform
//!   malicious delay for targeted packets.
//! - **TargetingPolicy**: which packets the adversary inflates.
//! - **Router**: drives packets through the model and emits immutable
//!   `TransmissionRecord`s (with fingerprint commitments) to registered
//!   observers before notifying the destination.
//!
//! Every random draw takes an explicit `&mut impl Rng` handle; trials with
//! independent seeds are byte-for-byte reproducible.
//!
//! # Example
//!
//! ```
//! use delay_network::{DelayConfig, DelayModel};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let mut model = DelayModel::new(DelayConfig::default()).unwrap();
//! model.initialise(60.0, &mut rng);
//!
//! let components = model.compute(12.5, false, &mut rng);
//! assert_eq!(components.total, components.base + components.legit);
//! ```

#![forbid(unsafe_code)]

mod config;
mod delay;
mod error;
mod fingerprint;
mod packet;
mod router;

pub use config::DelayConfig;
pub use delay::{DelayComponents, DelayModel, PathTransition};
pub use error::{ConfigError, Result};
pub use fingerprint::{hash_path_label, Commitment};
pub use packet::{Packet, TransmissionRecord};
pub use router::{Destination, Router, TargetingPolicy, TransmissionObserver};
