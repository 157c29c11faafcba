//! Memo Implementation
//!
//! A memo caches a derived value and recomputes it only when its dependency
//! sequence changes, by the same positional rule the effect scheduler uses.
//!
//! # How Memos Work
//!
//! 1. The first call computes the value and stores it with its dependencies.
//!
//! 2. Later calls compare the new dependencies with the stored ones. If no
//!    slot differs the cached value is returned and `compute` is dropped.
//!
//! 3. [`MemoEntry::invalidate`] forces the next call to recompute regardless.
//!
//! `compute` must be pure. The cache cannot tell when a computation read
//! something it did not declare; that shows up as a stale value, and it is
//! a caller bug.

use std::any::Any;
use std::fmt::Debug;

use super::deps::Deps;

/// Dirty state for a memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoState {
    /// The cached value matches the stored dependencies.
    Clean,

    /// The memo must recompute on next access.
    Dirty,
}

/// A cached derived value and the dependencies it was computed from.
pub struct MemoEntry<T> {
    deps: Option<Deps>,
    value: Option<T>,
    state: MemoState,
    compute_count: usize,
}

impl<T> MemoEntry<T>
where
    T: Clone,
{
    /// Create an empty entry. Nothing is computed until first access.
    pub fn new() -> Self {
        Self {
            deps: None,
            value: None,
            state: MemoState::Dirty,
            compute_count: 0,
        }
    }

    /// Return the cached value, recomputing if `deps` changed.
    pub fn get_or_compute<F>(&mut self, deps: Deps, compute: F) -> T
    where
        F: FnOnce() -> T,
    {
        let due = self.state == MemoState::Dirty || deps.changed_since(self.deps.as_ref());

        if !due {
            if let Some(value) = &self.value {
                return value.clone();
            }
        }

        let value = compute();
        self.value = Some(value.clone());
        self.deps = Some(deps);
        self.state = MemoState::Clean;
        self.compute_count += 1;
        value
    }

    /// Force recomputation on next access.
    pub fn invalidate(&mut self) {
        self.state = MemoState::Dirty;
    }

    /// Get the current dirty state.
    pub fn state(&self) -> MemoState {
        self.state
    }

    /// Check if the memo has a cached value.
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// Number of times `compute` has run.
    pub fn compute_count(&self) -> usize {
        self.compute_count
    }
}

impl<T> Default for MemoEntry<T>
where
    T: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for MemoEntry<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoEntry")
            .field("state", &self.state)
            .field("value", &self.value)
            .field("compute_count", &self.compute_count)
            .finish()
    }
}

/// Ordered memo entries for one instance, indexed by registration position.
#[derive(Default)]
pub struct MemoCache {
    entries: Vec<Box<dyn Any + Send>>,
    cursor: usize,
}

impl MemoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the cursor for a new render pass.
    pub fn begin_pass(&mut self) {
        self.cursor = 0;
    }

    /// Number of memos read in the current pass.
    pub fn registered(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read the memo at the next position.
    ///
    /// # Panics
    ///
    /// Panics if the entry at this position holds a different type, which
    /// means hooks were called in a different order than on the last pass.
    pub fn memoize<T, F>(&mut self, deps: Deps, compute: F) -> T
    where
        T: Clone + Send + 'static,
        F: FnOnce() -> T,
    {
        let index = self.cursor;
        self.cursor += 1;
        if index == self.entries.len() {
            self.entries.push(Box::new(MemoEntry::<T>::new()));
        }

        match self.entries[index].downcast_mut::<MemoEntry<T>>() {
            Some(entry) => entry.get_or_compute(deps, compute),
            None => panic!(
                "memo #{index} changed type between passes; hooks must be called in the same order on every render"
            ),
        }
    }
}

impl Debug for MemoCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoCache")
            .field("len", &self.entries.len())
            .field("cursor", &self.cursor)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps;
    use std::cell::Cell;

    #[test]
    fn memo_computes_on_first_access() {
        let mut memo = MemoEntry::new();
        assert!(!memo.has_value());

        assert_eq!(memo.get_or_compute(deps![1], || 42), 42);
        assert!(memo.has_value());
        assert_eq!(memo.compute_count(), 1);
    }

    #[test]
    fn memo_caches_value_while_deps_unchanged() {
        let calls = Cell::new(0);
        let mut memo = MemoEntry::new();

        for _ in 0..3 {
            let value = memo.get_or_compute(deps![7, "k"], || {
                calls.set(calls.get() + 1);
                7 * 6
            });
            assert_eq!(value, 42);
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn memo_recomputes_when_deps_change() {
        let mut memo = MemoEntry::new();
        assert_eq!(memo.get_or_compute(deps![2], || 2 * 2), 4);
        assert_eq!(memo.get_or_compute(deps![3], || 3 * 3), 9);
        assert_eq!(memo.compute_count(), 2);
    }

    #[test]
    fn memo_recomputes_when_invalidated() {
        let mut memo = MemoEntry::new();
        memo.get_or_compute(deps![], || 1);
        assert_eq!(memo.state(), MemoState::Clean);

        memo.invalidate();
        assert_eq!(memo.state(), MemoState::Dirty);
        assert_eq!(memo.get_or_compute(deps![], || 2), 2);
        assert_eq!(memo.state(), MemoState::Clean);
    }

    #[test]
    fn cache_is_positional() {
        let mut cache = MemoCache::new();

        cache.begin_pass();
        assert_eq!(cache.memoize(deps![1], || "one".to_string()), "one");
        assert_eq!(cache.memoize(deps![1], || 10_u32), 10);

        cache.begin_pass();
        assert_eq!(cache.memoize(deps![1], || "changed".to_string()), "one");
        assert_eq!(cache.memoize(deps![2], || 20_u32), 20);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    #[should_panic(expected = "changed type")]
    fn cache_rejects_reordered_hooks() {
        let mut cache = MemoCache::new();
        cache.begin_pass();
        cache.memoize(deps![], || 1_u32);
        cache.begin_pass();
        cache.memoize(deps![], || "oops");
    }
}
