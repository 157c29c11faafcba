//! Reducer Engine
//!
//! A reducer pairs a state value with a pure transition function
//! `(state, action) -> state` and hands out a [`Dispatch`] channel.
//!
//! Dispatching applies the transition to the logical next state right away,
//! under the state cell's lock, so several dispatches in one pass chain: each
//! one's result is the input of the next. The render pass that follows
//! observes the final result. A transition that returns a value equal to its
//! input is dropped and does not schedule a render.
//!
//! The transition function must be pure. If it panics the panic propagates
//! to whoever dispatched.

use std::fmt::Debug;
use std::sync::Arc;

use super::cell::{StateCell, StateSlot};

/// Shared transition function.
pub type ReduceFn<S, A> = Arc<dyn Fn(&S, A) -> S + Send + Sync>;

/// State plus its transition function.
pub struct ReducerState<S, A> {
    cell: StateCell<S>,
    reduce: ReduceFn<S, A>,
}

impl<S, A> ReducerState<S, A>
where
    S: Clone + PartialEq + Send + 'static,
    A: 'static,
{
    pub fn new<R>(reduce: R, initial: S) -> Self
    where
        R: Fn(&S, A) -> S + Send + Sync + 'static,
    {
        Self::from_cell(StateCell::new(initial), Arc::new(reduce))
    }

    pub(crate) fn from_cell(cell: StateCell<S>, reduce: ReduceFn<S, A>) -> Self {
        Self { cell, reduce }
    }

    /// The committed state.
    pub fn state(&self) -> S {
        self.cell.get()
    }

    /// A dispatch handle; clones share the same queue.
    pub fn dispatcher(&self) -> Dispatch<S, A> {
        Dispatch {
            cell: self.cell.clone(),
            reduce: Arc::clone(&self.reduce),
        }
    }

    /// Apply everything dispatched since the last commit.
    pub fn commit(&self) -> bool {
        self.cell.commit()
    }

    pub(crate) fn cell(&self) -> &StateCell<S> {
        &self.cell
    }
}

impl<S, A> Clone for ReducerState<S, A> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            reduce: Arc::clone(&self.reduce),
        }
    }
}

impl<S, A> StateSlot for ReducerState<S, A>
where
    S: Clone + PartialEq + Send + 'static,
    A: 'static,
{
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn dispose(&self) {
        self.cell.dispose();
    }
}

impl<S, A> Debug for ReducerState<S, A>
where
    S: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReducerState").field("cell", &self.cell).finish()
    }
}

/// Create a standalone reducer.
///
/// Returns the state holder and its dispatch channel.
pub fn create<S, A, R>(reduce: R, initial: S) -> (ReducerState<S, A>, Dispatch<S, A>)
where
    S: Clone + PartialEq + Send + 'static,
    A: 'static,
    R: Fn(&S, A) -> S + Send + Sync + 'static,
{
    let state = ReducerState::new(reduce, initial);
    let dispatch = state.dispatcher();
    (state, dispatch)
}

/// Dispatch channel of a reducer.
pub struct Dispatch<S, A> {
    cell: StateCell<S>,
    reduce: ReduceFn<S, A>,
}

impl<S, A> Dispatch<S, A>
where
    S: Clone + PartialEq + Send + 'static,
{
    /// Apply `action` to the logical next state.
    ///
    /// Returns whether the state changed (and a render was scheduled).
    pub fn dispatch(&self, action: A) -> bool {
        let reduce = &self.reduce;
        self.cell.update(|state| reduce(state, action))
    }
}

impl<S, A> Clone for Dispatch<S, A> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            reduce: Arc::clone(&self.reduce),
        }
    }
}

impl<S, A> Debug for Dispatch<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatch").field("cell", &self.cell.id()).finish()
    }
}
