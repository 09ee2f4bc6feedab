//! Subscription types.

use crate::error::Result;
use crate::types::{Action, Priority, SubscriptionId};
use std::fmt;
use std::sync::{Arc, Weak};

/// Callback invoked with every action delivered to a subscription.
pub type Callback = Box<dyn Fn(&dyn Action) -> Result<()> + Send + Sync>;

/// A registered interest in one tag.
///
/// Identity is the `id`; `priority` only decides delivery order.
pub struct Subscription {
    id: SubscriptionId,
    priority: Priority,
    tag: String,
    callback: Callback,
}

impl Subscription {
    /// Create a subscription around a callback.
    pub fn new(
        id: SubscriptionId,
        priority: Priority,
        tag: impl Into<String>,
        callback: Callback,
    ) -> Self {
        Self {
            id,
            priority,
            tag: tag.into(),
            callback,
        }
    }

    /// Unique id of this subscription.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Delivery priority; higher runs first.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Tag this subscription listens to.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Invoke the callback with an action.
    pub fn on(&self, action: &dyn Action) -> Result<()> {
        (self.callback)(action)
    }
}

impl PartialEq for Subscription {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Subscription {}

impl std::hash::Hash for Subscription {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

/// Whatever owns the registry a handle was issued from.
pub(crate) trait Unsubscriber: Send + Sync {
    fn unregister(&self, subscription: &Subscription);
}

/// Handle returned by `subscribe`, used to end the subscription.
///
/// Must be disposed exactly once. Disposing twice panics, as it means two
/// owners think they are responsible for the same subscription.
pub struct SubscriptionHandle {
    subscription: Arc<Subscription>,
    owner: Weak<dyn Unsubscriber>,
}

impl SubscriptionHandle {
    pub(crate) fn new(subscription: Arc<Subscription>, owner: Weak<dyn Unsubscriber>) -> Self {
        Self {
            subscription,
            owner,
        }
    }

    /// Id of the underlying subscription.
    pub fn id(&self) -> SubscriptionId {
        self.subscription.id()
    }

    /// Priority the subscription was registered with.
    pub fn priority(&self) -> Priority {
        self.subscription.priority()
    }

    /// Tag the subscription was registered under.
    pub fn tag(&self) -> &str {
        self.subscription.tag()
    }

    /// Remove the subscription from its dispatcher.
    ///
    /// A no-op if the dispatcher has already been dropped.
    pub fn dispose(&self) {
        match self.owner.upgrade() {
            Some(owner) => owner.unregister(&self.subscription),
            None => tracing::trace!(id = %self.id(), "dispatcher gone, nothing to dispose"),
        }
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id())
            .field("tag", &self.tag())
            .finish()
    }
}

/// A group of handles disposed together.
#[derive(Debug, Default)]
pub struct SubscriptionBag {
    handles: Vec<SubscriptionHandle>,
}

impl SubscriptionBag {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handle to the bag.
    pub fn insert(&mut self, handle: SubscriptionHandle) {
        self.handles.push(handle);
    }

    /// Number of handles held.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Dispose every handle in the bag, leaving it empty.
    pub fn dispose(&mut self) {
        for handle in self.handles.drain(..) {
            handle.dispose();
        }
    }
}

impl Extend<SubscriptionHandle> for SubscriptionBag {
    fn extend<I: IntoIterator<Item = SubscriptionHandle>>(&mut self, iter: I) {
        self.handles.extend(iter);
    }
}
