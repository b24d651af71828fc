// SPDX-License-Identifier: MIT OR Apache-2.0
//! Discrete-event scheduling core: a virtual clock and an event queue.
//!
//! One `Scheduler` owns one virtual clock. Actions are closures keyed by
//! absolute execution time; `run` drains events in time order, advancing the
//! clock to each event's time before executing it. Events with equal times
//! execute in insertion order, so delivery ordering between equally-delayed
//! paths is deterministic.
//!
//! There is no wall-clock dependency anywhere: "scheduling" here means
//! virtual-time event ordering only. A simulation harness owns the scheduler
//! and passes `&mut Scheduler` down into each action, which may enqueue
//! further events.
//!
//! # Example
//!
//! ```
//! use sim_engine::Scheduler;
//!
//! let mut sim = Scheduler::new();
//! sim.schedule(1.5, |s| {
//!     assert_eq!(s.now(), 1.5);
//! })
//! .unwrap();
//! sim.run(10.0);
//! assert_eq!(sim.now(), 1.5);
//! ```

#![forbid(unsafe_code)]

mod error;

pub use error::{Result, SimError};

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

/// A scheduled action. Receives the scheduler so it can enqueue follow-ups.
pub type Action = Box<dyn FnOnce(&mut Scheduler)>;

struct ScheduledEvent {
    time: f64,
    seq: u64,
    action: Action,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time.total_cmp(&other.time) == Ordering::Equal && self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the max-heap pops the earliest (time, seq) first.
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Virtual-clock event scheduler.
///
/// The clock is non-decreasing: it only advances when `run` or `run_steps`
/// executes an event. Event ordering is strictly by event time, with a
/// monotone insertion counter breaking ties FIFO.
pub struct Scheduler {
    now: f64,
    next_seq: u64,
    events: BinaryHeap<ScheduledEvent>,
}

impl Scheduler {
    /// Create a scheduler with the clock at zero and an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: 0.0,
            next_seq: 0,
            events: BinaryHeap::new(),
        }
    }

    /// Current virtual time.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Schedule `action` to run `delay` seconds from now.
    ///
    /// # Errors
    /// Returns `SimError::InvalidTime` when `delay` is negative or not
    /// finite.
    pub fn schedule<F>(&mut self, delay: f64, action: F) -> Result<()>
    where
        F: FnOnce(&mut Scheduler) + 'static,
    {
        if !delay.is_finite() || delay < 0.0 {
            return Err(SimError::InvalidTime {
                requested: self.now + delay,
                now: self.now,
            });
        }
        self.push(self.now + delay, Box::new(action));
        Ok(())
    }

    /// Schedule `action` at the absolute virtual time `t`.
    ///
    /// # Errors
    /// Returns `SimError::InvalidTime` when `t` lies in the past or is not
    /// finite. Callers must not schedule behind the clock; the contract is
    /// enforced rather than silently dropped.
    pub fn schedule_at<F>(&mut self, t: f64, action: F) -> Result<()>
    where
        F: FnOnce(&mut Scheduler) + 'static,
    {
        if !t.is_finite() || t < self.now {
            return Err(SimError::InvalidTime {
                requested: t,
                now: self.now,
            });
        }
        self.push(t, Box::new(action));
        Ok(())
    }

    fn push(&mut self, time: f64, action: Action) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(ScheduledEvent { time, seq, action });
    }

    /// Execute queued events whose time is `<= until`, advancing the clock
    /// to each event's time. Actions may enqueue further events; those that
    /// also fall within `until` run in the same call. Returns normally on an
    /// empty queue.
    pub fn run(&mut self, until: f64) {
        loop {
            match self.events.peek() {
                Some(event) if event.time <= until => {},
                _ => break,
            }
            let Some(event) = self.events.pop() else {
                break;
            };
            self.now = event.time;
            (event.action)(self);
        }
    }

    /// Execute at most `steps` events regardless of their times.
    pub fn run_steps(&mut self, steps: usize) {
        for _ in 0..steps {
            let Some(event) = self.events.pop() else {
                break;
            };
            self.now = event.time;
            (event.action)(self);
        }
    }

    /// Number of events still queued.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.events.len()
    }

    /// Time of the earliest queued event, if any.
    #[must_use]
    pub fn next_event_time(&self) -> Option<f64> {
        self.events.peek().map(|event| event.time)
    }

    /// Drop all queued events without touching the clock.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Drop all queued events and rewind the clock to zero.
    pub fn reset(&mut self) {
        self.events.clear();
        self.now = 0.0;
        self.next_seq = 0;
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.now)
            .field("pending", &self.events.len())
            .finish()
    }
}
