//! Core types for the dispatcher.

use crate::error::{DispatchError, Result};
use serde::{Deserialize, Serialize};
use std::any::{self, Any};
use std::fmt;

/// Subscriber priority. Higher values are delivered first.
pub type Priority = i32;

/// Priority used when the caller does not pick one.
pub const DEFAULT_PRIORITY: Priority = 100;

/// Object-safe access to `Any` for action trait objects.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        any::type_name::<T>()
    }
}

/// A value flowing through the dispatcher.
///
/// The dispatcher only ever looks at [`Action::tag`]; the payload is opaque
/// and only meaningful to subscribers and middleware.
pub trait Action: AsAny + Send + Sync + fmt::Debug + 'static {
    /// Discriminator used to route the action to subscribers.
    fn tag(&self) -> &str;
}

/// An action type with a fixed, compile-time tag.
pub trait TypedAction: Action + Sized {
    const TAG: &'static str;
}

impl dyn Action {
    /// Returns the concrete action if it is of type `T`.
    pub fn downcast_ref<T: Action>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Whether the concrete action is of type `T`.
    pub fn is<T: Action>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Like [`downcast_ref`](Self::downcast_ref), but reports what was found.
    pub fn try_as<T: Action>(&self) -> Result<&T> {
        self.downcast_ref::<T>()
            .ok_or_else(|| DispatchError::TypeMismatch {
                expected: any::type_name::<T>().to_string(),
                got: self.type_name().to_string(),
            })
    }
}

/// How `dispatch` schedules delivery relative to the main context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Deliver before returning. Blocks when called off the main context.
    Sync,
    /// Queue on the main context and return immediately.
    Async,
}

/// Unique identifier for a subscription within one dispatcher.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
