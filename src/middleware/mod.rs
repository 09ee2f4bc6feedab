//! Middleware and chain composition.
//!
//! Every dispatched action passes through the installed middleware, in the
//! order they were added, before reaching subscribers. A middleware receives
//! a [`Next`] continuation and decides whether (and with which action) to
//! continue down the chain.

mod chain;
mod logging;

pub use chain::{Chain, Middleware, Next, Terminal};
pub use logging::LoggingMiddleware;
