//! Observer fan-out for count changes.
//!
//! Observers are stored with an opaque [`SubscriptionId`] handed out by
//! [`ObserverRegistry::subscribe`]; removal goes through that id, so
//! observers need no equality of their own. Subscribing the same observer
//! twice yields two subscriptions and two calls per notification.
//!
//! The registry is owned by a single writer. [`ObserverRegistry::notify`]
//! holds `&mut self` for the whole pass, so no subscription can change
//! mid-iteration; unsubscribe requests raised by an observer are applied
//! after the pass by whoever owns the registry.

use std::fmt;

/// Opaque handle identifying one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Something that reacts to authoritative count changes.
pub trait CountObserver: Send {
    /// Called with the new authoritative count.
    fn on_count_changed(&mut self, new_count: i64);
}

impl<F> CountObserver for F
where
    F: FnMut(i64) + Send,
{
    fn on_count_changed(&mut self, new_count: i64) {
        self(new_count)
    }
}

/// Ordered set of observers keyed by subscription id.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Vec<(SubscriptionId, Box<dyn CountObserver>)>,
    next_id: u64,
}

impl ObserverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer at the end of the notification order.
    pub fn subscribe(&mut self, observer: Box<dyn CountObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    /// Remove a subscription. Returns `false` if it was not present.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    /// Call every observer with `count`, in subscription order.
    pub fn notify(&mut self, count: i64) {
        for (_, observer) in self.observers.iter_mut() {
            observer.on_count_changed(count);
        }
    }

    /// Number of active subscriptions.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether there are no subscriptions.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field(
                "subscriptions",
                &self.observers.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
            )
            .field("next_id", &self.next_id)
            .finish()
    }
}
