//! # sync-core
//!
//! Pure logic for clicker-sync (no I/O, instant tests).
//!
//! This crate decides *what* happens when the counter changes, locally or
//! remotely, without performing any persistence or messaging itself.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects:
//! - [`reconcile`] merges two counters deterministically
//! - [`CounterState`] turns events into an ordered list of [`Action`]s
//! - [`ObserverRegistry`] fans a count out to subscribers in order
//!
//! The actual I/O (store writes, publishing to the peer) is performed by
//! `sync-client`, which interprets the actions produced here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod observer;
pub mod reconcile;
pub mod state;

pub use observer::{CountObserver, ObserverRegistry, SubscriptionId};
pub use reconcile::reconcile;
pub use state::{Action, CounterState, Event, DEFAULT_INCREMENT_STEP};
