//! Mutable references that survive render passes.
//!
//! Writing through a [`MutableRef`] never schedules a render. Typical uses
//! are counters the view does not display and "previous value" tracking
//! updated from an effect.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::Mutex;

/// A shared mutable slot with no change notification.
pub struct MutableRef<T> {
    current: Arc<Mutex<T>>,
}

impl<T> MutableRef<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: Arc::new(Mutex::new(value)),
        }
    }

    /// Overwrite the current value.
    pub fn set(&self, value: T) {
        *self.current.lock() = value;
    }

    /// Mutate in place.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.current.lock())
    }

    /// Replace the value, returning the old one.
    pub fn replace(&self, value: T) -> T {
        std::mem::replace(&mut *self.current.lock(), value)
    }
}

impl<T> MutableRef<T>
where
    T: Clone,
{
    pub fn get(&self) -> T {
        self.current.lock().clone()
    }
}

impl<T> Clone for MutableRef<T> {
    fn clone(&self) -> Self {
        Self {
            current: Arc::clone(&self.current),
        }
    }
}

impl<T> Debug for MutableRef<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MutableRef").field(&*self.current.lock()).finish()
    }
}
