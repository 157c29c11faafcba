//! Reactive Primitives
//!
//! This module implements the runtime every component relies on: state
//! cells, the effect scheduler, the memo cache, the reducer engine and the
//! instance that owns them.
//!
//! # Concepts
//!
//! ## State Cells
//!
//! A [`StateCell`] is a container for mutable state. Writes accumulate into
//! a logical next value and are committed when the owning instance renders
//! again. Accepted writes notify subscribers; the owning instance is always
//! one of them.
//!
//! ## Effects
//!
//! An effect is a side-effecting callback gated by a [`Deps`] sequence. The
//! [`EffectScheduler`] runs it after a render pass when the sequence changed,
//! running the previous cleanup first.
//!
//! ## Memos
//!
//! A memo caches a derived value under the same dependency rule.
//!
//! ## Reducers
//!
//! A reducer is a state cell whose writes are actions folded through a pure
//! transition function.
//!
//! # Implementation Notes
//!
//! Nothing here tracks reads automatically. Dependencies are declared, and
//! hook storage is positional: the n-th `use_state` call of a pass always
//! resolves to the n-th state slot of the instance.

mod cell;
mod context;
mod deps;
mod effect;
mod instance;
mod memo;
mod reducer;
mod refs;
mod subscriber;

pub use cell::StateCell;
pub use context::ContextMap;
pub use deps::{Dep, Deps};
pub use effect::{cleanup, Cleanup, EffectEntry, EffectScheduler};
pub use instance::{Component, FnComponent, Instance, InstanceError, InstanceId, Phase, Scope};
pub use memo::{MemoCache, MemoEntry, MemoState};
pub use reducer::{create as create_reducer, Dispatch, ReduceFn, ReducerState};
pub use refs::MutableRef;
pub use subscriber::{Subscriber, SubscriberId};
