//! Middleware that traces every action passing through.

use super::chain::{Middleware, Next};
use crate::error::Result;
use crate::types::Action;

/// Logs each action at `debug` level, and its failure at `warn`, then
/// forwards it unchanged.
#[derive(Clone, Debug, Default)]
pub struct LoggingMiddleware {
    /// Include the action's `Debug` output, not just its tag.
    pub verbose: bool,
}

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verbose() -> Self {
        Self { verbose: true }
    }
}

impl Middleware for LoggingMiddleware {
    fn apply(&self, action: &dyn Action, next: Next<'_>) -> Result<()> {
        if self.verbose {
            tracing::debug!(tag = action.tag(), ?action, "dispatching action");
        } else {
            tracing::debug!(tag = action.tag(), "dispatching action");
        }

        let result = next.proceed(action);
        if let Err(ref e) = result {
            tracing::warn!(tag = action.tag(), error = %e, "action failed");
        }
        result
    }
}
