//! Component Instances
//!
//! An instance is the explicit home of everything a component's hooks
//! allocate: ordered lists of state slots, effect entries, memo entries and
//! refs. Each list is indexed by registration position, which is why hooks
//! must be called in the same order on every render pass.
//!
//! # Lifecycle
//!
//! 1. [`Instance::mount`] runs the first render pass. Hooks allocate their
//!    slots, then due effects (all of them, on this pass) run.
//!
//! 2. Writes to the instance's cells mark it dirty and wake
//!    [`Instance::updated`]. The host answers with [`Instance::render`] or
//!    [`Instance::flush`], which commits pending writes as each cell is
//!    reached, re-registers effects and runs the due ones.
//!
//! 3. [`Instance::unmount`] is terminal: outstanding cleanups run once, every
//!    cell is disposed so late async completions are dropped, and further
//!    renders fail.
//!
//! Dropping a mounted instance tears it down the same way.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Notify;

use super::cell::{StateCell, StateSlot};
use super::context::ContextMap;
use super::deps::Deps;
use super::effect::{Cleanup, EffectScheduler};
use super::memo::MemoCache;
use super::reducer::{Dispatch, ReduceFn, ReducerState};
use super::refs::MutableRef;
use super::subscriber::SubscriberId;
use crate::config::RuntimeConfig;

/// Lifecycle misuse reported by an instance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstanceError {
    #[error("instance {0} is already mounted")]
    AlreadyMounted(InstanceId),

    #[error("instance {0} has not been mounted")]
    NotMounted(InstanceId),

    #[error("instance {0} has been unmounted")]
    Unmounted(InstanceId),

    #[error("instance {id} still dirty after {passes} render passes")]
    RenderLoop { id: InstanceId, passes: usize },
}

/// Unique identifier for an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where an instance is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Mounted,
    Unmounted,
}

/// Re-render request flag shared with every cell the instance owns.
#[derive(Debug, Default)]
pub(crate) struct UpdateSignal {
    dirty: AtomicBool,
    closed: AtomicBool,
    notify: Notify,
}

impl UpdateSignal {
    pub(crate) fn schedule(&self) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        self.dirty.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    fn take(&self) -> bool {
        self.dirty.swap(false, Ordering::SeqCst)
    }

    fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.dirty.store(false, Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}

/// Something an instance can render.
pub trait Component {
    type Output;

    fn render(&mut self, cx: &mut Scope<'_>) -> Self::Output;
}

/// A component backed by a closure. Built by [`Instance::from_fn`].
pub struct FnComponent<F, O> {
    render: F,
    _output: PhantomData<fn() -> O>,
}

impl<F, O> Component for FnComponent<F, O>
where
    F: FnMut(&mut Scope<'_>) -> O,
{
    type Output = O;

    fn render(&mut self, cx: &mut Scope<'_>) -> O {
        (self.render)(cx)
    }
}

/// Positional slot storage for one instance.
#[derive(Default)]
struct Hooks {
    states: Vec<Box<dyn StateSlot>>,
    state_cursor: usize,
    refs: Vec<Box<dyn Any + Send>>,
    ref_cursor: usize,
    memos: MemoCache,
    effects: EffectScheduler,
}

impl Hooks {
    fn begin_pass(&mut self) {
        self.state_cursor = 0;
        self.ref_cursor = 0;
        self.memos.begin_pass();
        self.effects.begin_pass();
    }

    fn verify_pass(&self, id: InstanceId) {
        let counts = [
            ("state", self.state_cursor, self.states.len()),
            ("ref", self.ref_cursor, self.refs.len()),
            ("memo", self.memos.registered(), self.memos.len()),
            ("effect", self.effects.registered(), self.effects.len()),
        ];
        for (kind, used, allocated) in counts {
            if used != allocated {
                panic!(
                    "instance {id} rendered {used} {kind} hooks but {allocated} were allocated; \
                     hooks must be called unconditionally and in the same order"
                );
            }
        }
    }
}

/// Hook registration context handed to a component for one render pass.
pub struct Scope<'a> {
    id: InstanceId,
    hooks: &'a mut Hooks,
    update: &'a Arc<UpdateSignal>,
    config: &'a RuntimeConfig,
    contexts: &'a ContextMap,
    first_pass: bool,
}

impl<'a> Scope<'a> {
    /// Whether this is the mount pass.
    pub fn is_first_pass(&self) -> bool {
        self.first_pass
    }

    pub fn instance_id(&self) -> InstanceId {
        self.id
    }

    pub fn config(&self) -> &RuntimeConfig {
        self.config
    }

    fn next_position(&self, kind: &str, cursor: usize, len: usize) {
        if !self.first_pass && cursor >= len {
            panic!(
                "instance {} called more {kind} hooks than on its first render; \
                 hooks must be called unconditionally and in the same order",
                self.id
            );
        }
    }

    fn new_cell<T>(&self, initial: T) -> StateCell<T>
    where
        T: Clone + PartialEq + Send + 'static,
    {
        let cell = StateCell::new(initial);
        let update = Arc::clone(self.update);
        cell.subscribe(SubscriberId::new(), move || update.schedule());
        cell
    }

    /// A state cell owned by this instance.
    ///
    /// `init` runs on the first pass only. Pending writes are committed here,
    /// so the handle's [`StateCell::get`] shows what this pass observes.
    pub fn use_state<T, F>(&mut self, init: F) -> StateCell<T>
    where
        T: Clone + PartialEq + Send + 'static,
        F: FnOnce() -> T,
    {
        let index = self.hooks.state_cursor;
        self.next_position("state", index, self.hooks.states.len());
        self.hooks.state_cursor += 1;

        if index == self.hooks.states.len() {
            let cell = self.new_cell(init());
            self.hooks.states.push(Box::new(cell.clone()));
            return cell;
        }

        match self.hooks.states[index].as_any().downcast_ref::<StateCell<T>>() {
            Some(cell) => {
                cell.commit();
                cell.clone()
            }
            None => panic!("state hook #{index} changed type between passes"),
        }
    }

    /// A reducer owned by this instance.
    ///
    /// Returns the state observed by this pass and the dispatch channel.
    pub fn use_reducer<S, A, R, F>(&mut self, reduce: R, init: F) -> (S, Dispatch<S, A>)
    where
        S: Clone + PartialEq + Send + 'static,
        A: 'static,
        R: Fn(&S, A) -> S + Send + Sync + 'static,
        F: FnOnce() -> S,
    {
        let index = self.hooks.state_cursor;
        self.next_position("state", index, self.hooks.states.len());
        self.hooks.state_cursor += 1;

        if index == self.hooks.states.len() {
            let reduce: ReduceFn<S, A> = Arc::new(reduce);
            let reducer = ReducerState::from_cell(self.new_cell(init()), reduce);
            let observed = reducer.state();
            let dispatch = reducer.dispatcher();
            self.hooks.states.push(Box::new(reducer));
            return (observed, dispatch);
        }

        match self.hooks.states[index]
            .as_any()
            .downcast_ref::<ReducerState<S, A>>()
        {
            Some(reducer) => {
                reducer.cell().commit();
                (reducer.state(), reducer.dispatcher())
            }
            None => panic!("reducer hook #{index} changed type between passes"),
        }
    }

    /// Register an effect. See [`EffectScheduler::register`].
    pub fn use_effect<F>(&mut self, deps: Deps, runner: F)
    where
        F: FnOnce() -> Option<Cleanup> + Send + 'static,
    {
        self.next_position("effect", self.hooks.effects.registered(), self.hooks.effects.len());
        self.hooks.effects.register(deps, runner);
    }

    /// A memoized value. See [`MemoCache::memoize`].
    pub fn use_memo<T, F>(&mut self, deps: Deps, compute: F) -> T
    where
        T: Clone + Send + 'static,
        F: FnOnce() -> T,
    {
        self.next_position("memo", self.hooks.memos.registered(), self.hooks.memos.len());
        self.hooks.memos.memoize(deps, compute)
    }

    /// A shared callback that keeps its identity while `deps` are unchanged.
    ///
    /// Pass the result to [`Dep::identity`](super::Dep::identity) to make a
    /// downstream effect depend on it.
    pub fn use_callback<F>(&mut self, deps: Deps, callback: F) -> Arc<F>
    where
        F: Send + Sync + 'static,
    {
        self.use_memo(deps, move || Arc::new(callback))
    }

    /// A mutable slot that survives passes and never schedules a render.
    pub fn use_ref<T, F>(&mut self, init: F) -> MutableRef<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T,
    {
        let index = self.hooks.ref_cursor;
        self.next_position("ref", index, self.hooks.refs.len());
        self.hooks.ref_cursor += 1;

        if index == self.hooks.refs.len() {
            let slot = MutableRef::new(init());
            self.hooks.refs.push(Box::new(slot.clone()));
            return slot;
        }

        match self.hooks.refs[index].downcast_ref::<MutableRef<T>>() {
            Some(slot) => slot.clone(),
            None => panic!("ref hook #{index} changed type between passes"),
        }
    }

    /// A value provided to the instance by its host.
    pub fn use_context<T>(&self) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.contexts.get::<T>()
    }
}

/// A mounted (or mountable) component with its hook storage.
pub struct Instance<C: Component> {
    id: InstanceId,
    component: C,
    hooks: Hooks,
    update: Arc<UpdateSignal>,
    config: RuntimeConfig,
    contexts: ContextMap,
    phase: Phase,
    passes: usize,
    output: Option<C::Output>,
}

impl<F, O> Instance<FnComponent<F, O>>
where
    F: FnMut(&mut Scope<'_>) -> O,
{
    /// Wrap a render closure.
    pub fn from_fn(render: F) -> Self
    where
        F: FnMut(&mut Scope<'_>) -> O,
    {
        Self::new(FnComponent {
            render,
            _output: PhantomData,
        })
    }
}

impl<C: Component> Instance<C> {
    pub fn new(component: C) -> Self {
        Self {
            id: InstanceId::new(),
            component,
            hooks: Hooks::default(),
            update: Arc::new(UpdateSignal::default()),
            config: RuntimeConfig::default(),
            contexts: ContextMap::new(),
            phase: Phase::Created,
            passes: 0,
            output: None,
        }
    }

    /// Replace the runtime configuration. Only meaningful before mount.
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Provide a context value to every render pass.
    pub fn with_context<T>(mut self, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        self.contexts.provide(value);
        self
    }

    /// Provide an already shared context value.
    pub fn with_shared_context<T>(mut self, value: Arc<T>) -> Self
    where
        T: Send + Sync + 'static,
    {
        self.contexts.provide_shared(value);
        self
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Number of completed render passes.
    pub fn render_count(&self) -> usize {
        self.passes
    }

    /// Whether a write has requested another pass.
    pub fn is_dirty(&self) -> bool {
        self.update.is_dirty()
    }

    /// Output of the most recent pass.
    pub fn output(&self) -> Option<&C::Output> {
        self.output.as_ref()
    }

    /// First render pass.
    pub fn mount(&mut self) -> Result<&C::Output, InstanceError> {
        match self.phase {
            Phase::Created => {}
            Phase::Mounted => return Err(InstanceError::AlreadyMounted(self.id)),
            Phase::Unmounted => return Err(InstanceError::Unmounted(self.id)),
        }
        self.phase = Phase::Mounted;
        tracing::debug!(instance = %self.id, "mounting");
        Ok(self.pass())
    }

    /// One render pass followed by its due effects.
    pub fn render(&mut self) -> Result<&C::Output, InstanceError> {
        self.ensure_mounted()?;
        Ok(self.pass())
    }

    /// Render until no write requests another pass.
    ///
    /// Returns the number of passes run, zero if the instance was clean.
    pub fn flush(&mut self) -> Result<usize, InstanceError> {
        self.ensure_mounted()?;

        let mut passes = 0;
        while self.update.is_dirty() {
            if passes == self.config.max_render_passes {
                tracing::warn!(instance = %self.id, passes, "render loop detected");
                return Err(InstanceError::RenderLoop { id: self.id, passes });
            }
            self.pass();
            passes += 1;
        }
        Ok(passes)
    }

    /// Wait until a write requests another pass.
    ///
    /// Returns immediately if the instance is already dirty, and also
    /// returns once the instance is unmounted.
    pub async fn updated(&self) {
        while !self.update.is_dirty() && self.phase == Phase::Mounted {
            self.update.notify.notified().await;
        }
    }

    /// Terminal transition.
    pub fn unmount(&mut self) -> Result<(), InstanceError> {
        self.ensure_mounted()?;
        self.teardown();
        Ok(())
    }

    fn ensure_mounted(&self) -> Result<(), InstanceError> {
        match self.phase {
            Phase::Mounted => Ok(()),
            Phase::Created => Err(InstanceError::NotMounted(self.id)),
            Phase::Unmounted => Err(InstanceError::Unmounted(self.id)),
        }
    }

    fn pass(&mut self) -> &C::Output {
        self.update.take();
        let first_pass = self.passes == 0;
        self.hooks.begin_pass();

        let output = {
            let mut scope = Scope {
                id: self.id,
                hooks: &mut self.hooks,
                update: &self.update,
                config: &self.config,
                contexts: &self.contexts,
                first_pass,
            };
            self.component.render(&mut scope)
        };

        if !first_pass {
            self.hooks.verify_pass(self.id);
        }
        self.passes += 1;

        let effects = self.hooks.effects.flush();
        tracing::trace!(instance = %self.id, pass = self.passes, effects, "render pass complete");

        self.output.insert(output)
    }

    fn teardown(&mut self) {
        tracing::debug!(instance = %self.id, "unmounting");
        self.phase = Phase::Unmounted;
        self.update.close();
        self.hooks.effects.teardown();
        for state in &self.hooks.states {
            state.dispose();
        }
    }
}

impl<C: Component> Drop for Instance<C> {
    fn drop(&mut self) {
        if self.phase == Phase::Mounted {
            self.teardown();
        }
    }
}

impl<C: Component> std::fmt::Debug for Instance<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("passes", &self.passes)
            .field("states", &self.hooks.states.len())
            .field("effects", &self.hooks.effects)
            .field("memos", &self.hooks.memos)
            .field("contexts", &self.contexts)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
