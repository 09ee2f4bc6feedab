//! The dispatcher tying subscriptions, middleware and the main context together.

use crate::error::{DispatchError, Result};
use crate::main_context::MainContext;
use crate::middleware::{Chain, Middleware, Terminal};
use crate::subscriptions::{
    Callback, Subscription, SubscriptionHandle, SubscriptionRegistry, Unsubscriber,
};
use crate::types::{
    Action, DispatchMode, Priority, SubscriptionId, TypedAction, DEFAULT_PRIORITY,
};
use parking_lot::Mutex;
use serde::Deserialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Dispatcher configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Priority used by `subscribe_default`, `subscribe_to` and services.
    pub default_priority: Priority,

    /// Thread name for the main context worker, when the dispatcher starts
    /// its own.
    pub main_thread_name: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            default_priority: DEFAULT_PRIORITY,
            main_thread_name: "actionflow-main".to_string(),
        }
    }
}

impl DispatcherConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.main_thread_name.trim().is_empty() {
            return Err(DispatchError::InvalidConfig(
                "main_thread_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// State guarded by the dispatcher lock.
struct State {
    registry: SubscriptionRegistry,
    middleware: Vec<Arc<dyn Middleware>>,
    chain: Chain,
}

/// Shared core, referenced by the dispatcher, its handles and queued jobs.
struct Shared {
    config: DispatcherConfig,
    main: MainContext,
    state: Mutex<State>,
    next_id: AtomicU64,
    dispatching: AtomicBool,
}

impl Shared {
    /// Run one action through the chain. Main context only.
    fn deliver(&self, action: &dyn Action) -> Result<()> {
        assert!(
            self.main.is_current(),
            "actions must be delivered on the main context '{}'",
            self.main.name()
        );

        let _guard = DispatchGuard::acquire(&self.dispatching);
        let chain = self.state.lock().chain.clone();

        tracing::trace!(tag = action.tag(), links = chain.len(), "delivering action");
        chain.proceed(action, &RootChain { shared: self })
    }
}

impl Unsubscriber for Shared {
    fn unregister(&self, subscription: &Subscription) {
        self.state.lock().registry.unregister(subscription);
        tracing::debug!(
            id = %subscription.id(),
            tag = subscription.tag(),
            "unsubscribed"
        );
    }
}

/// Marks a delivery in flight; cleared on drop, including during unwinding.
struct DispatchGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> DispatchGuard<'a> {
    /// # Panics
    ///
    /// If a delivery is already in flight.
    fn acquire(flag: &'a AtomicBool) -> Self {
        if flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            panic!("Already dispatching");
        }
        Self { flag }
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Innermost link: hands the action to its tag's subscribers.
struct RootChain<'a> {
    shared: &'a Shared,
}

impl Terminal for RootChain<'_> {
    fn proceed(&self, action: &dyn Action) -> Result<()> {
        // Copy out so callbacks can (un)subscribe without deadlocking.
        let subscriptions = self.shared.state.lock().registry.lookup(action.tag());

        for subscription in &subscriptions {
            subscription.on(action)?;
        }
        Ok(())
    }
}

/// An in-process action dispatcher.
///
/// Actions go through the middleware chain and then to every subscription
/// registered under the action's tag, highest priority first. All delivery
/// happens on one [`MainContext`]; every other operation may be called from
/// any thread.
///
/// Cloning gives another handle to the same dispatcher.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl Dispatcher {
    /// Create a dispatcher with its own main context worker thread.
    pub fn new() -> Result<Self> {
        Self::with_config(DispatcherConfig::default())
    }

    /// Create a dispatcher with its own main context worker thread.
    pub fn with_config(config: DispatcherConfig) -> Result<Self> {
        config.validate()?;
        let main = MainContext::spawn(config.main_thread_name.clone())?;
        Ok(Self::with_main_context(main, config))
    }

    /// Create a dispatcher delivering on an existing main context.
    pub fn with_main_context(main: MainContext, config: DispatcherConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                main,
                state: Mutex::new(State {
                    registry: SubscriptionRegistry::new(),
                    middleware: Vec::new(),
                    chain: Chain::default(),
                }),
                next_id: AtomicU64::new(1),
                dispatching: AtomicBool::new(false),
            }),
        }
    }

    /// Configuration this dispatcher was built with.
    pub fn config(&self) -> &DispatcherConfig {
        &self.shared.config
    }

    /// The context all delivery runs on.
    pub fn main_context(&self) -> &MainContext {
        &self.shared.main
    }

    // --- Subscriptions ---

    /// Subscribe a callback to every action carrying `tag`.
    pub fn subscribe<F>(
        &self,
        priority: Priority,
        tag: impl Into<String>,
        callback: F,
    ) -> SubscriptionHandle
    where
        F: Fn(&dyn Action) -> Result<()> + Send + Sync + 'static,
    {
        self.subscribe_boxed(priority, tag.into(), Box::new(callback))
    }

    /// Subscribe at the configured default priority.
    pub fn subscribe_default<F>(&self, tag: impl Into<String>, callback: F) -> SubscriptionHandle
    where
        F: Fn(&dyn Action) -> Result<()> + Send + Sync + 'static,
    {
        self.subscribe(self.shared.config.default_priority, tag, callback)
    }

    /// Subscribe to a concrete action type under an explicit tag.
    ///
    /// # Panics
    ///
    /// The callback panics if an action of another type arrives under `tag`.
    pub fn subscribe_as<T, F>(
        &self,
        priority: Priority,
        tag: impl Into<String>,
        callback: F,
    ) -> SubscriptionHandle
    where
        T: Action,
        F: Fn(&T) -> Result<()> + Send + Sync + 'static,
    {
        let tag = tag.into();
        let expected = tag.clone();
        self.subscribe(priority, tag, move |action: &dyn Action| {
            match action.try_as::<T>() {
                Ok(typed) => callback(typed),
                Err(e) => panic!("Casting to {} failed: {}", expected, e),
            }
        })
    }

    /// Subscribe to a typed action under its own tag, at the default priority.
    pub fn subscribe_to<T, F>(&self, callback: F) -> SubscriptionHandle
    where
        T: TypedAction,
        F: Fn(&T) -> Result<()> + Send + Sync + 'static,
    {
        self.subscribe_as::<T, F>(self.shared.config.default_priority, T::TAG, callback)
    }

    fn subscribe_boxed(
        &self,
        priority: Priority,
        tag: String,
        callback: Callback,
    ) -> SubscriptionHandle {
        let id = SubscriptionId(self.shared.next_id.fetch_add(1, Ordering::SeqCst));
        let subscription = Arc::new(Subscription::new(id, priority, tag, callback));

        self.shared
            .state
            .lock()
            .registry
            .register(Arc::clone(&subscription));
        tracing::debug!(%id, tag = subscription.tag(), priority, "subscribed");

        // Bind the concrete weak first, then unsize it.
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let owner: Weak<dyn Unsubscriber> = weak;
        SubscriptionHandle::new(subscription, owner)
    }

    /// End a subscription. Same as [`SubscriptionHandle::dispose`].
    ///
    /// # Panics
    ///
    /// If the subscription was already removed.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) {
        handle.dispose();
    }

    /// Number of live subscriptions across all tags.
    pub fn subscription_count(&self) -> usize {
        self.shared.state.lock().registry.len()
    }

    /// Number of live subscriptions for one tag.
    pub fn subscription_count_for(&self, tag: &str) -> usize {
        self.shared.state.lock().registry.tag_count(tag)
    }

    // --- Middleware ---

    /// Append a middleware. It wraps everything added after it.
    pub fn add_middleware<M: Middleware>(&self, middleware: Arc<M>) {
        let mut state = self.shared.state.lock();
        state.middleware.push(middleware);
        state.chain = Chain::build(&state.middleware);
        tracing::debug!(count = state.middleware.len(), "middleware added");
    }

    /// Remove a middleware by identity. Returns false if it was not installed.
    pub fn remove_middleware<M: Middleware>(&self, middleware: &Arc<M>) -> bool {
        let target = Arc::as_ptr(middleware) as *const ();
        let mut state = self.shared.state.lock();

        let Some(index) = state
            .middleware
            .iter()
            .position(|m| Arc::as_ptr(m) as *const () == target)
        else {
            return false;
        };

        state.middleware.remove(index);
        state.chain = Chain::build(&state.middleware);
        tracing::debug!(count = state.middleware.len(), "middleware removed");
        true
    }

    /// Number of installed middleware.
    pub fn middleware_count(&self) -> usize {
        self.shared.state.lock().middleware.len()
    }

    // --- Dispatch ---

    /// Dispatch an action.
    ///
    /// In [`DispatchMode::Sync`] the action is fully delivered before this
    /// returns, and the first error raised by a middleware or subscriber is
    /// returned; lower-priority subscribers are skipped once one fails. A
    /// panic during delivery is resumed on the caller.
    ///
    /// In [`DispatchMode::Async`] the action is queued on the main context and
    /// only a closed main context is reported. Delivery errors are logged.
    ///
    /// # Panics
    ///
    /// On a synchronous dispatch made while another delivery on this
    /// dispatcher is in flight, e.g. from inside a subscriber.
    pub fn dispatch<A: Action>(&self, action: A, mode: DispatchMode) -> Result<()> {
        match mode {
            DispatchMode::Sync => {
                if self.shared.main.is_current() {
                    self.shared.deliver(&action)
                } else {
                    let shared = Arc::clone(&self.shared);
                    self.shared.main.run_sync(move || shared.deliver(&action))?
                }
            }
            DispatchMode::Async => {
                let shared = Arc::clone(&self.shared);
                self.shared.main.execute(move || {
                    if let Err(e) = shared.deliver(&action) {
                        tracing::warn!(tag = action.tag(), error = %e, "async dispatch failed");
                    }
                })
            }
        }
    }

    /// Whether a delivery is currently in flight.
    pub fn is_dispatching(&self) -> bool {
        self.shared.dispatching.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Dispatcher")
            .field("main", &self.shared.main)
            .field("subscriptions", &state.registry.len())
            .field("middleware", &state.middleware.len())
            .finish()
    }
}
