//! # Action Dispatcher
//!
//! An in-process, single-writer action bus for unidirectional state flow.
//!
//! ## Core Concepts
//!
//! - **Actions**: Opaque values routed by a string tag
//! - **Subscriptions**: Callbacks per tag, delivered highest priority first
//! - **Middleware**: An ordered chain every action passes through first
//! - **Main context**: The one thread on which all delivery happens
//!
//! At most one delivery is in flight per dispatcher. Dispatching again from
//! inside a subscriber or middleware panics instead of queueing or deadlocking.
//!
//! ## Example
//!
//! ```ignore
//! use actionflow::{Action, DispatchMode, Dispatcher, TypedAction};
//!
//! #[derive(Debug)]
//! struct Increment(i64);
//!
//! impl Action for Increment {
//!     fn tag(&self) -> &str {
//!         Self::TAG
//!     }
//! }
//!
//! impl TypedAction for Increment {
//!     const TAG: &'static str = "Increment";
//! }
//!
//! let dispatcher = Dispatcher::new()?;
//!
//! let handle = dispatcher.subscribe_to(|inc: &Increment| {
//!     println!("+{}", inc.0);
//!     Ok(())
//! });
//!
//! // Blocks until delivered on the main context
//! dispatcher.dispatch(Increment(1), DispatchMode::Sync)?;
//!
//! handle.dispose();
//! ```

pub mod dispatcher;
pub mod error;
pub mod main_context;
pub mod middleware;
pub mod service;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use error::{DispatchError, Result};
pub use main_context::{MainContext, MainLoop};
pub use middleware::{Chain, LoggingMiddleware, Middleware, Next, Terminal};
pub use service::{Service, ServiceRegistration};
pub use subscriptions::{
    Callback, OrderedSubscriptions, Subscription, SubscriptionBag, SubscriptionHandle,
    SubscriptionRegistry,
};
pub use types::*;
