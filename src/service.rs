//! Services: long-lived reactors registered for a set of tags.
//!
//! A service is plain sugar over `subscribe`/`unsubscribe`. Registering one
//! subscribes it once per tag at the dispatcher's default priority; the
//! returned [`ServiceRegistration`] removes all of those subscriptions again.

use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::subscriptions::SubscriptionBag;
use crate::types::Action;
use std::sync::Arc;

pub trait Service: Send + Sync + 'static {
    /// Tags this service reacts to.
    fn tags(&self) -> Vec<String>;

    /// Handle one action carrying one of [`Service::tags`].
    fn perform(&self, action: &dyn Action) -> Result<()>;
}

/// Subscriptions held on behalf of a registered service.
#[derive(Debug)]
pub struct ServiceRegistration {
    subscriptions: SubscriptionBag,
}

impl ServiceRegistration {
    /// Number of tags the service is subscribed to.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl Dispatcher {
    /// Subscribe a service to each of its tags.
    pub fn register_service<S: Service>(&self, service: Arc<S>) -> ServiceRegistration {
        let mut subscriptions = SubscriptionBag::new();
        let mut tags = service.tags();
        tags.sort();
        tags.dedup();

        subscriptions.extend(tags.into_iter().map(|tag| {
            let service = Arc::clone(&service);
            self.subscribe_default(tag, move |action: &dyn Action| service.perform(action))
        }));

        tracing::debug!(tags = subscriptions.len(), "service registered");
        ServiceRegistration { subscriptions }
    }

    /// Remove every subscription made for a service.
    pub fn unregister_service(&self, mut registration: ServiceRegistration) {
        registration.subscriptions.dispose();
        tracing::debug!("service unregistered");
    }
}
