//! Subscription storage for the dispatcher.
//!
//! Subscriptions are grouped by tag. Within a tag they are unique by id and
//! delivered highest priority first, ties in the order they were added.
//!
//! # Example
//!
//! ```ignore
//! let mut registry = SubscriptionRegistry::new();
//! registry.register(Arc::new(Subscription::new(
//!     SubscriptionId(1),
//!     DEFAULT_PRIORITY,
//!     "Counter",
//!     Box::new(|action: &dyn Action| {
//!         println!("got {:?}", action);
//!         Ok(())
//!     }),
//! )));
//!
//! for sub in registry.lookup("Counter") {
//!     sub.on(&action)?;
//! }
//! ```

mod ordered;
mod registry;
mod types;

pub use ordered::OrderedSubscriptions;
pub use registry::SubscriptionRegistry;
pub(crate) use types::Unsubscriber;
pub use types::{Callback, Subscription, SubscriptionBag, SubscriptionHandle};
