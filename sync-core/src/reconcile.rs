//! Counter reconciliation.
//!
//! The merge policy is last-writer-wins-by-magnitude: the larger count wins,
//! ties keep the local value. There is no causal history, so a peer's later
//! decrement is indistinguishable from a stale value and loses to a larger
//! local count.

use clicker_sync_types::Counter;
use std::cmp::Ordering;

/// Merge a local and a remote counter into the authoritative one.
///
/// Returns whichever has the strictly greater count; on equality the local
/// counter is returned.
pub fn reconcile(local: Counter, remote: Counter) -> Counter {
    match remote.compare(&local) {
        Ordering::Greater => remote,
        Ordering::Less | Ordering::Equal => local,
    }
}
