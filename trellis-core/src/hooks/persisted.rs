//! Persisted state.
//!
//! A state cell mirrored into an injected [`KeyValueStore`]:
//!
//! - On the first pass the stored value is read synchronously and decoded.
//!   A missing key, an unreadable store or a malformed value all fall back
//!   to the initial value; none of them is an error.
//! - Mounting never writes, so a value the first read could not see stays
//!   in the store untouched.
//! - After every later pass in which the value (or the key) changed, an
//!   effect encodes the value and writes it. A failed write is reported
//!   through [`PersistedState::error`] and the in-memory value is kept.
//!
//! The store is shared with the world, so nothing read from it is cached
//! beyond the first pass. [`PersistedState::refresh`] re-reads on demand.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use super::Reported;
use crate::reactive::{Dep, Deps, Scope, StateCell};
use crate::store::{Codec, CodecError, JsonCodec, KeyValueStore, StoreError};

/// Failure to mirror a value into its store.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to encode value for {key:?}: {source}")]
    Encode {
        key: String,
        #[source]
        source: CodecError,
    },

    #[error("stored value for {key:?} is malformed: {source}")]
    Decode {
        key: String,
        #[source]
        source: CodecError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Handle to a persisted value.
pub struct PersistedState<T, C = JsonCodec> {
    value: StateCell<T>,
    error: StateCell<Option<Reported<PersistError>>>,
    store: Arc<dyn KeyValueStore>,
    key: String,
    _codec: PhantomData<fn() -> C>,
}

impl<T, C> PersistedState<T, C>
where
    T: Serialize + DeserializeOwned + Clone + PartialEq + Send + 'static,
    C: Codec,
{
    /// The value observed by the current pass.
    pub fn get(&self) -> T {
        self.value.get()
    }

    /// The logical next value.
    pub fn latest(&self) -> T {
        self.value.latest()
    }

    pub fn set(&self, value: T) -> bool {
        self.value.set(value)
    }

    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        self.value.update(f)
    }

    /// The last write failure, cleared by the next successful write.
    pub fn error(&self) -> Option<Reported<PersistError>> {
        self.error.get()
    }

    /// Full storage key, prefix included.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Re-read the store and adopt what it holds.
    ///
    /// Returns whether a different value was found. A missing key leaves
    /// the value alone.
    pub fn refresh(&self) -> Result<bool, PersistError> {
        match read_stored::<T, C>(self.store.as_ref(), &self.key)? {
            Some(stored) => Ok(self.value.set(stored)),
            None => Ok(false),
        }
    }

    fn persist(&self, value: &T) {
        match write_stored::<T, C>(self.store.as_ref(), &self.key, value) {
            Ok(()) => {
                self.error.set(None);
            }
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "failed to persist value");
                self.error.set(Some(Reported::new(err)));
            }
        }
    }
}

impl<T, C> Clone for PersistedState<T, C> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            error: self.error.clone(),
            store: Arc::clone(&self.store),
            key: self.key.clone(),
            _codec: PhantomData,
        }
    }
}

impl<T: std::fmt::Debug, C> std::fmt::Debug for PersistedState<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedState")
            .field("key", &self.key)
            .field("value", &self.value)
            .finish()
    }
}

fn read_stored<T, C>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>, PersistError>
where
    T: DeserializeOwned,
    C: Codec,
{
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    C::decode(&raw)
        .map(Some)
        .map_err(|source| PersistError::Decode {
            key: key.to_owned(),
            source,
        })
}

fn write_stored<T, C>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), PersistError>
where
    T: Serialize,
    C: Codec,
{
    let raw = C::encode(value).map_err(|source| PersistError::Encode {
        key: key.to_owned(),
        source,
    })?;
    store.set(key, raw)?;
    Ok(())
}

fn load_or<T, C, F>(store: &dyn KeyValueStore, key: &str, initial: F) -> T
where
    T: DeserializeOwned,
    C: Codec,
    F: FnOnce() -> T,
{
    match read_stored::<T, C>(store, key) {
        Ok(Some(stored)) => {
            tracing::debug!(key, "seeded from store");
            stored
        }
        Ok(None) => initial(),
        Err(err) => {
            tracing::warn!(key, error = %err, "ignoring stored value");
            initial()
        }
    }
}

/// State persisted as JSON under `key`.
pub fn use_persisted_state<T, F>(
    cx: &mut Scope<'_>,
    store: &Arc<dyn KeyValueStore>,
    key: &str,
    initial: F,
) -> PersistedState<T>
where
    T: Serialize + DeserializeOwned + Clone + PartialEq + Send + Sync + 'static,
    F: FnOnce() -> T,
{
    use_persisted_state_with::<T, JsonCodec, F>(cx, store, key, initial)
}

/// State persisted under `key` with codec `C`.
///
/// The instance's `storage.key_prefix` is prepended to `key`. Changing the
/// key between passes writes the current value under the new key.
pub fn use_persisted_state_with<T, C, F>(
    cx: &mut Scope<'_>,
    store: &Arc<dyn KeyValueStore>,
    key: &str,
    initial: F,
) -> PersistedState<T, C>
where
    T: Serialize + DeserializeOwned + Clone + PartialEq + Send + Sync + 'static,
    C: Codec,
    F: FnOnce() -> T,
{
    let storage_key = cx.config().storage_key(key);
    let value = cx.use_state(|| load_or::<T, C, F>(store.as_ref(), &storage_key, initial));
    let error = cx.use_state(|| None);

    let state = PersistedState {
        value,
        error,
        store: Arc::clone(store),
        key: storage_key,
        _codec: PhantomData,
    };

    let mounting = cx.use_ref(|| true);
    let current = state.get();
    let deps = Deps::tracked([Dep::value(current.clone()), Dep::from(state.key.clone())]);
    let writer = state.clone();
    cx.use_effect(deps, move || {
        if !mounting.replace(false) {
            writer.persist(&current);
        }
        None
    });

    state
}
