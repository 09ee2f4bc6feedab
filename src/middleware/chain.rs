//! Chain-of-responsibility over a middleware snapshot.

use crate::error::Result;
use crate::types::Action;
use std::fmt;
use std::sync::Arc;

/// A unit that sees each action before subscribers do.
///
/// Implementations must stay synchronous and must not synchronously dispatch
/// back into the dispatcher they are installed on.
pub trait Middleware: Send + Sync + 'static {
    /// Handle an action. Call `next.proceed(action)` to continue the chain;
    /// returning without calling it stops delivery.
    fn apply(&self, action: &dyn Action, next: Next<'_>) -> Result<()>;
}

/// Innermost link of a chain.
pub trait Terminal {
    fn proceed(&self, action: &dyn Action) -> Result<()>;
}

impl<F> Terminal for F
where
    F: Fn(&dyn Action) -> Result<()>,
{
    fn proceed(&self, action: &dyn Action) -> Result<()> {
        self(action)
    }
}

/// Continuation handed to a middleware: the rest of the chain.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    links: &'a [Arc<dyn Middleware>],
    terminal: &'a dyn Terminal,
}

impl<'a> Next<'a> {
    /// Pass the action to the next middleware, or to the terminal if this
    /// was the last one.
    pub fn proceed(self, action: &dyn Action) -> Result<()> {
        match self.links.split_first() {
            Some((head, rest)) => head.apply(
                action,
                Next {
                    links: rest,
                    terminal: self.terminal,
                },
            ),
            None => self.terminal.proceed(action),
        }
    }
}

/// Immutable snapshot of a middleware list.
///
/// The first middleware in the list is the outermost link and sees the action
/// first. Rebuilding produces a new snapshot; clones of the old one keep
/// running against the list they were built from.
#[derive(Clone)]
pub struct Chain {
    links: Arc<[Arc<dyn Middleware>]>,
}

impl Chain {
    /// Compose a chain from middleware in list order.
    pub fn build(middleware: &[Arc<dyn Middleware>]) -> Self {
        Self {
            links: middleware.iter().cloned().collect(),
        }
    }

    /// Run an action through the chain, ending at `terminal`.
    pub fn proceed(&self, action: &dyn Action, terminal: &dyn Terminal) -> Result<()> {
        Next {
            links: &self.links,
            terminal,
        }
        .proceed(action)
    }

    /// Number of middleware in the chain.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::build(&[])
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("len", &self.len()).finish()
    }
}
