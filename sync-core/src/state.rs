//! Counter state machine for clicker-sync.
//!
//! This module provides a pure, side-effect-free state machine over the
//! authoritative counter. It takes events as input and produces the new
//! state plus a list of actions to execute, in order.
//!
//! The actual I/O (persisting, publishing to the peer, calling observers) is
//! performed by sync-client, not by this module.

use crate::reconcile::reconcile;
use clicker_sync_types::Counter;

/// Step applied per unit of multiplier when none is configured.
pub const DEFAULT_INCREMENT_STEP: i64 = 1;

/// Authoritative counter state - NO I/O, just transitions.
///
/// `authoritative` always reflects the last reconciliation or local mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterState {
    authoritative: Counter,
    step: i64,
}

impl CounterState {
    /// Create a state at zero with the default step.
    pub fn new() -> Self {
        Self::with_step(DEFAULT_INCREMENT_STEP)
    }

    /// Create a state at zero that moves by `step` per multiplier unit.
    pub fn with_step(step: i64) -> Self {
        Self {
            authoritative: Counter::zero(),
            step,
        }
    }

    /// The current authoritative counter.
    pub fn authoritative(&self) -> Counter {
        self.authoritative
    }

    /// The configured increment step.
    pub fn step(&self) -> i64 {
        self.step
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// Local mutations produce `[Notify, Persist, Publish]`. Initialization
    /// and remote updates produce only `[Notify]`; a remote value is never
    /// echoed back to the peer.
    pub fn on_event(self, event: Event) -> (Self, Vec<Action>) {
        match event {
            Event::Initialized { local, remote } => {
                let counter = match remote {
                    Some(remote) => reconcile(local, remote),
                    None => local,
                };
                self.replace(counter).notify_only()
            }
            Event::IncrementRequested { multiplier } => {
                let by = self.step.saturating_mul(multiplier);
                self.replace(self.authoritative.increment(by)).propagate()
            }
            Event::DecrementRequested { multiplier } => {
                let by = self.step.saturating_mul(multiplier);
                self.replace(self.authoritative.decrement(by)).propagate()
            }
            Event::ResetRequested => self.replace(self.authoritative.reset()).propagate(),
            Event::RemoteUpdated { remote } => {
                let counter = reconcile(self.authoritative, remote);
                self.replace(counter).notify_only()
            }
        }
    }

    fn replace(self, authoritative: Counter) -> Self {
        Self {
            authoritative,
            ..self
        }
    }

    fn notify_only(self) -> (Self, Vec<Action>) {
        let count = self.authoritative.count();
        (self, vec![Action::Notify { count }])
    }

    fn propagate(self) -> (Self, Vec<Action>) {
        let counter = self.authoritative;
        (
            self,
            vec![
                Action::Notify {
                    count: counter.count(),
                },
                Action::Persist { counter },
                Action::Publish { counter },
            ],
        )
    }
}

impl Default for CounterState {
    fn default() -> Self {
        Self::new()
    }
}

/// Events that change the authoritative counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Startup: the stored counter and the peer's last context, if any.
    Initialized {
        /// Counter read from the local store (zero if absent).
        local: Counter,
        /// Counter from the last received peer context.
        remote: Option<Counter>,
    },
    /// Local increment by `step * multiplier`.
    IncrementRequested {
        /// Number of steps.
        multiplier: i64,
    },
    /// Local decrement by `step * multiplier`.
    DecrementRequested {
        /// Number of steps.
        multiplier: i64,
    },
    /// Local reset to zero.
    ResetRequested,
    /// A counter delivered by the peer.
    RemoteUpdated {
        /// The decoded remote counter.
        remote: Counter,
    },
}

/// Actions to be executed by the sync-client, in the order returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Call every observer with the new count.
    Notify {
        /// The new authoritative count.
        count: i64,
    },
    /// Write the counter to the local store.
    Persist {
        /// Counter to persist.
        counter: Counter,
    },
    /// Send the counter to the peer.
    Publish {
        /// Counter to publish.
        counter: Counter,
    },
}
