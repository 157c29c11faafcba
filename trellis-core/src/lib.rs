//! Trellis Core
//!
//! This crate provides the runtime behind Trellis components: a small set
//! of reactive primitives and the hooks built from them.
//! It implements:
//!
//! - State cells with batched, ordered writes
//! - A dependency-tracked effect scheduler with cleanups
//! - A positional memo cache
//! - Reducers with dispatch channels
//! - Derived hooks: debounce, persisted state, async fetch, toggle
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: the primitives and the component [`Instance`](reactive::Instance) that owns them
//! - `hooks`: hooks composed strictly from the primitives
//! - `store`: key-value persistence and value codecs
//! - `transport`: the request/response seam used by fetch hooks
//! - `config`: runtime settings, loadable from TOML
//! - `telemetry`: optional log subscriber setup
//!
//! # Example
//!
//! ```rust
//! use trellis_core::deps;
//! use trellis_core::reactive::Instance;
//!
//! let mut counter = Instance::from_fn(|cx| {
//!     let (count, dispatch) = cx.use_reducer(|n: &i32, step: i32| n + step, || 0);
//!     let doubled = cx.use_memo(deps![count], || count * 2);
//!     (count, doubled, dispatch)
//! });
//!
//! let (_, _, dispatch) = counter.mount().unwrap().clone();
//! dispatch.dispatch(1);
//! dispatch.dispatch(2);
//! counter.flush().unwrap();
//!
//! let (count, doubled, _) = counter.output().unwrap();
//! assert_eq!((*count, *doubled), (3, 6));
//! ```

pub mod config;
pub mod hooks;
pub mod reactive;
pub mod store;
pub mod telemetry;
pub mod transport;

pub use config::{ConfigError, RuntimeConfig};
pub use reactive::{Dep, Deps, Instance, InstanceError, Scope, StateCell};
