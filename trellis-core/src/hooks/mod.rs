//! Derived Hooks
//!
//! Hooks composed strictly from the reactive primitives: every piece of
//! state they keep lives in a [`StateCell`](crate::reactive::StateCell) of
//! the calling instance, and every side effect runs through its effect
//! scheduler.
//!
//! - [`use_toggle`]: a boolean with `flip`.
//! - [`use_debounce`]: a value that follows its input after a quiet period.
//! - [`use_persisted_state`]: state mirrored into a [`KeyValueStore`](crate::store::KeyValueStore).
//! - [`use_fetch`]: an [`AsyncResource`] driven by a request and a transport.

mod debounce;
mod persisted;
mod resource;
mod toggle;

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

pub use debounce::{use_debounce, use_debounce_default};
pub use persisted::{use_persisted_state, use_persisted_state_with, PersistError, PersistedState};
pub use resource::{use_fetch, AsyncResource, FetchError, ResourceState, Status};
pub use toggle::{use_toggle, Toggle};

/// An error kept in state.
///
/// Shared so snapshots stay cheap to clone; two reports are equal only if
/// they are the same report, so re-reporting an identical failure still
/// counts as a change.
pub struct Reported<E>(Arc<E>);

impl<E> Reported<E> {
    pub fn new(error: E) -> Self {
        Self(Arc::new(error))
    }

    pub fn shared(&self) -> Arc<E> {
        Arc::clone(&self.0)
    }
}

impl<E> Clone for Reported<E> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<E> PartialEq for Reported<E> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<E> Deref for Reported<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.0
    }
}

impl<E: fmt::Debug> fmt::Debug for Reported<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<E: fmt::Display> fmt::Display for Reported<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
