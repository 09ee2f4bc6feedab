//! Tag-keyed subscription registry.

use std::collections::HashMap;
use std::sync::Arc;

use super::ordered::OrderedSubscriptions;
use super::types::Subscription;

/// Maps tags to their ordered subscription sets.
///
/// Not synchronized on its own; the dispatcher keeps it behind its state lock.
/// Sets are never pruned once created, so removing a subscription that is
/// already gone from a known tag is always caught.
#[derive(Default)]
pub struct SubscriptionRegistry {
    by_tag: HashMap<String, OrderedSubscriptions>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscription under its tag.
    ///
    /// Returns false (and leaves the registry unchanged) if a subscription
    /// with the same id is already registered for the tag.
    pub fn register(&mut self, subscription: Arc<Subscription>) -> bool {
        let id = subscription.id();
        let inserted = self
            .by_tag
            .entry(subscription.tag().to_string())
            .or_default()
            .insert(subscription);

        if !inserted {
            tracing::warn!(%id, "subscription already registered, ignoring");
        }
        inserted
    }

    /// Remove a subscription.
    ///
    /// A tag that was never populated is treated as already removed.
    ///
    /// # Panics
    ///
    /// If the tag is known but the subscription is not in it, which means it
    /// was removed before (double dispose or a stale handle).
    pub fn unregister(&mut self, subscription: &Subscription) {
        let Some(set) = self.by_tag.get_mut(subscription.tag()) else {
            return;
        };

        let removed = set.remove(subscription.id());
        assert!(
            removed,
            "Failed to remove subscription {} from '{}', multiple dispose calls?",
            subscription.id(),
            subscription.tag()
        );
    }

    /// Snapshot of the subscriptions for a tag, in delivery order.
    pub fn lookup(&self, tag: &str) -> Vec<Arc<Subscription>> {
        self.by_tag
            .get(tag)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of live subscriptions for one tag.
    pub fn tag_count(&self, tag: &str) -> usize {
        self.by_tag.get(tag).map_or(0, OrderedSubscriptions::len)
    }

    /// Number of live subscriptions across all tags.
    pub fn len(&self) -> usize {
        self.by_tag.values().map(OrderedSubscriptions::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tags that currently have at least one subscription.
    pub fn tags(&self) -> Vec<&str> {
        self.by_tag
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .map(|(tag, _)| tag.as_str())
            .collect()
    }
}
