//! Per-tag subscription set, unique by id and sorted by priority.

use crate::types::{Priority, SubscriptionId};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::types::Subscription;

/// Sort key: highest priority first, then insertion order.
type OrderKey = (Reverse<Priority>, u64);

/// Ordered set of subscriptions for a single tag.
#[derive(Default)]
pub struct OrderedSubscriptions {
    ordered: BTreeMap<OrderKey, Arc<Subscription>>,
    keys: HashMap<SubscriptionId, OrderKey>,
    next_seq: u64,
}

impl OrderedSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a subscription. Returns false if its id is already present.
    pub fn insert(&mut self, subscription: Arc<Subscription>) -> bool {
        let id = subscription.id();
        if self.keys.contains_key(&id) {
            return false;
        }

        let key = (Reverse(subscription.priority()), self.next_seq);
        self.next_seq += 1;

        self.keys.insert(id, key);
        self.ordered.insert(key, subscription);
        true
    }

    /// Remove by id. Returns false if the id was not present.
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        match self.keys.remove(&id) {
            Some(key) => self.ordered.remove(&key).is_some(),
            None => false,
        }
    }

    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.keys.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterate in delivery order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Subscription>> {
        self.ordered.values()
    }
}
