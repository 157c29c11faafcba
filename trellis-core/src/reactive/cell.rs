//! State Cell Implementation
//!
//! A StateCell is the fundamental reactive primitive. It holds a value and
//! notifies its subscribers when a write is accepted.
//!
//! # How Cells Work
//!
//! A cell keeps two values:
//!
//! 1. The *committed* value, which is what a render pass observes.
//!
//! 2. The *pending* value, the logical next value built up by writes issued
//!    since the last commit.
//!
//! Every write (literal or updater) is applied to the pending value if there
//! is one and to the committed value otherwise, so a burst of updaters folds
//! in call order instead of each reading the stale committed value. The
//! owning instance commits the pending value when the render pass reaches
//! the cell again.
//!
//! A write whose result equals its base value is dropped without notifying
//! anyone.
//!
//! # Thread Safety
//!
//! Cells are `Send + Sync` so handles can move into effect cleanups and
//! timer tasks. The interior is guarded by a `parking_lot` mutex. Updaters
//! run with that lock held and must not touch the same cell.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::subscriber::{Subscriber, SubscriberId};

/// Counter for generating unique cell IDs.
static CELL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_cell_id() -> u64 {
    CELL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

struct CellInner<T> {
    committed: T,
    pending: Option<T>,
    disposed: bool,
}

/// A reactive state slot holding a value of type T.
///
/// Cloning a cell clones the handle; all clones share the same slot.
///
/// # Example
///
/// ```rust
/// use trellis_core::reactive::StateCell;
///
/// let count = StateCell::new(0);
/// count.update(|n| n + 1);
/// count.update(|n| n + 1);
///
/// // Nothing is observed until the next commit.
/// assert_eq!(count.get(), 0);
/// count.commit();
/// assert_eq!(count.get(), 2);
/// ```
pub struct StateCell<T> {
    id: u64,
    inner: Arc<Mutex<CellInner<T>>>,
    subscribers: Arc<RwLock<Vec<Subscriber>>>,
}

impl<T> StateCell<T> {
    /// Get the cell's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.lock().disposed
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl<T> StateCell<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    /// Create a new cell with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            id: next_cell_id(),
            inner: Arc::new(Mutex::new(CellInner {
                committed: value,
                pending: None,
                disposed: false,
            })),
            subscribers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// The committed value, as observed by the current render pass.
    pub fn get(&self) -> T {
        self.inner.lock().committed.clone()
    }

    /// The logical next value: pending writes included.
    pub fn latest(&self) -> T {
        let inner = self.inner.lock();
        inner.pending.as_ref().unwrap_or(&inner.committed).clone()
    }

    /// Replace the value.
    ///
    /// Returns `false` when the write was dropped (unchanged value or a
    /// disposed cell).
    pub fn set(&self, value: T) -> bool {
        self.update(move |_| value)
    }

    /// Derive the next value from the logical next value.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        self.update_if(|value| Some(f(value)))
    }

    /// Like [`update`](Self::update), but `f` may decline to write by
    /// returning `None`. The decision and the write happen under one lock.
    pub fn update_if<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> Option<T>,
    {
        {
            let mut inner = self.inner.lock();
            if inner.disposed {
                tracing::trace!(cell = self.id, "write to disposed cell ignored");
                return false;
            }

            let base = inner.pending.as_ref().unwrap_or(&inner.committed);
            let Some(next) = f(base) else {
                return false;
            };
            if &next == base {
                tracing::trace!(cell = self.id, "write skipped, value unchanged");
                return false;
            }
            inner.pending = Some(next);
        }

        self.notify_subscribers();
        true
    }

    /// Apply the pending value.
    ///
    /// Returns whether the committed value changed.
    pub fn commit(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.pending.take() {
            Some(next) if next != inner.committed => {
                inner.committed = next;
                true
            }
            _ => false,
        }
    }

    /// Whether writes are waiting for the next commit.
    pub fn has_pending(&self) -> bool {
        self.inner.lock().pending.is_some()
    }

    /// Register a notification callback.
    ///
    /// The callback runs after every accepted write, outside the cell lock.
    pub fn subscribe<F>(&self, subscriber_id: SubscriberId, notify: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribers
            .write()
            .push(Subscriber::with_id(subscriber_id, notify));
    }

    /// Remove a subscriber.
    pub fn unsubscribe(&self, subscriber_id: SubscriberId) {
        self.subscribers.write().retain(|s| s.id() != subscriber_id);
    }

    /// Terminal transition: drop pending writes and subscribers, refuse
    /// every later write.
    pub fn dispose(&self) {
        {
            let mut inner = self.inner.lock();
            inner.disposed = true;
            inner.pending = None;
        }
        self.subscribers.write().clear();
    }

    fn notify_subscribers(&self) {
        let subscribers = self.subscribers.read().clone();
        for subscriber in &subscribers {
            subscriber.notify();
        }
    }
}

impl<T> Clone for StateCell<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Arc::clone(&self.inner),
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<T> Debug for StateCell<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("StateCell")
            .field("id", &self.id)
            .field("value", &inner.committed)
            .field("pending", &inner.pending)
            .field("disposed", &inner.disposed)
            .finish()
    }
}

/// Type-erased view of a state slot, used by the owning instance.
pub(crate) trait StateSlot: Send + 'static {
    fn as_any(&self) -> &dyn std::any::Any;
    fn dispose(&self);
}

impl<T> StateSlot for StateCell<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn dispose(&self) {
        StateCell::dispose(self);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
