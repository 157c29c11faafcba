//! Context Values
//!
//! A context map carries typed values from the host into every render pass
//! of an instance: a theme, a user session, a shared store. Hooks look them
//! up by type with [`Scope::use_context`](super::Scope::use_context).
//!
//! Values are fixed for the lifetime of the instance. Anything that must
//! change over time should be a [`StateCell`](super::StateCell) placed in
//! the context, so readers still go through the cell's commit rules.

use std::any::{Any, TypeId};
use std::sync::Arc;

use indexmap::IndexMap;

/// Type-indexed collection of shared values, in insertion order.
#[derive(Clone, Default)]
pub struct ContextMap {
    values: IndexMap<TypeId, (&'static str, Arc<dyn Any + Send + Sync>)>,
}

impl ContextMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provide a value, replacing any earlier value of the same type.
    pub fn provide<T>(&mut self, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.provide_shared(Arc::new(value));
    }

    /// Provide an already shared value.
    pub fn provide_shared<T>(&mut self, value: Arc<T>)
    where
        T: Send + Sync + 'static,
    {
        self.values
            .insert(TypeId::of::<T>(), (std::any::type_name::<T>(), value));
    }

    /// Look up a value by type.
    pub fn get<T>(&self) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let (_, value) = self.values.get(&TypeId::of::<T>())?;
        Arc::clone(value).downcast::<T>().ok()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl std::fmt::Debug for ContextMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.values.values().map(|(name, _)| name))
            .finish()
    }
}
