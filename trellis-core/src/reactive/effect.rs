//! Effect Scheduler
//!
//! An effect is a side-effecting callback that runs after a render pass when
//! its declared dependencies changed since its last run.
//!
//! # How Effects Work
//!
//! 1. During a render pass the component registers each effect, in order,
//!    with its dependency sequence and a runner closure.
//!
//! 2. The scheduler compares the sequence with the one stored for that
//!    position (see [`Deps::changed_since`]). If the effect is not due the
//!    runner is dropped unexecuted.
//!
//! 3. After the pass, [`EffectScheduler::flush`] walks the entries in
//!    registration order. For every due entry it runs the previous cleanup,
//!    then the runner, stores whatever cleanup the runner returned, and
//!    finally stores the new dependencies.
//!
//! 4. On teardown every outstanding cleanup runs exactly once. The scheduler
//!    refuses registrations and flushes afterwards.
//!
//! # Cleanup
//!
//! Runners return `Option<Cleanup>`. A cleanup is how timers get cancelled
//! and subscriptions dropped when the inputs that started them go stale.

use super::deps::Deps;

/// A cleanup thunk returned by an effect runner.
pub type Cleanup = Box<dyn FnOnce() + Send + 'static>;

type Runner = Box<dyn FnOnce() -> Option<Cleanup> + Send + 'static>;

/// Wrap a closure as a [`Cleanup`].
pub fn cleanup<F>(f: F) -> Option<Cleanup>
where
    F: FnOnce() + Send + 'static,
{
    Some(Box::new(f))
}

struct Scheduled {
    runner: Runner,
    deps: Deps,
}

/// One registered effect.
pub struct EffectEntry {
    /// Dependencies stored by the last run. `None` until the first run.
    deps: Option<Deps>,

    /// Cleanup returned by the last run.
    cleanup: Option<Cleanup>,

    /// Runner registered in the current pass, if the entry is due.
    scheduled: Option<Scheduled>,

    run_count: usize,
}

impl EffectEntry {
    fn new() -> Self {
        Self {
            deps: None,
            cleanup: None,
            scheduled: None,
            run_count: 0,
        }
    }

    /// Number of times the runner has executed.
    pub fn run_count(&self) -> usize {
        self.run_count
    }

    pub fn has_cleanup(&self) -> bool {
        self.cleanup.is_some()
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled.is_some()
    }
}

impl std::fmt::Debug for EffectEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectEntry")
            .field("deps", &self.deps)
            .field("has_cleanup", &self.has_cleanup())
            .field("scheduled", &self.is_scheduled())
            .field("run_count", &self.run_count)
            .finish()
    }
}

/// Ordered list of effect entries for one instance, indexed by
/// registration position.
#[derive(Debug, Default)]
pub struct EffectScheduler {
    entries: Vec<EffectEntry>,
    cursor: usize,
    torn_down: bool,
}

impl EffectScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the registration cursor for a new render pass.
    pub fn begin_pass(&mut self) {
        self.cursor = 0;
    }

    /// Number of registrations made in the current pass.
    pub fn registered(&self) -> usize {
        self.cursor
    }

    /// Register the effect at the next position.
    ///
    /// Returns whether the effect is due to run at the next flush.
    pub fn register<F>(&mut self, deps: Deps, runner: F) -> bool
    where
        F: FnOnce() -> Option<Cleanup> + Send + 'static,
    {
        if self.torn_down {
            tracing::warn!("effect registered after teardown, ignoring");
            return false;
        }

        let index = self.cursor;
        self.cursor += 1;
        if index == self.entries.len() {
            self.entries.push(EffectEntry::new());
        }
        let entry = &mut self.entries[index];

        if !deps.changed_since(entry.deps.as_ref()) {
            entry.scheduled = None;
            return false;
        }

        entry.scheduled = Some(Scheduled {
            runner: Box::new(runner),
            deps,
        });
        true
    }

    /// Run every due effect in registration order.
    ///
    /// Returns the number of runners executed.
    pub fn flush(&mut self) -> usize {
        if self.torn_down {
            return 0;
        }

        let mut ran = 0;
        for (index, entry) in self.entries.iter_mut().enumerate() {
            let Some(scheduled) = entry.scheduled.take() else {
                continue;
            };

            if let Some(cleanup) = entry.cleanup.take() {
                tracing::trace!(effect = index, "running cleanup before re-run");
                cleanup();
            }

            entry.cleanup = (scheduled.runner)();
            entry.deps = Some(scheduled.deps);
            entry.run_count += 1;
            ran += 1;

            tracing::debug!(effect = index, run = entry.run_count, "effect ran");
        }
        ran
    }

    /// Terminal transition: run outstanding cleanups once, in registration
    /// order, and drop anything still scheduled.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        for (index, entry) in self.entries.iter_mut().enumerate() {
            entry.scheduled = None;
            if let Some(cleanup) = entry.cleanup.take() {
                tracing::trace!(effect = index, "running cleanup on teardown");
                cleanup();
            }
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inspect an entry by registration position.
    pub fn entry(&self, index: usize) -> Option<&EffectEntry> {
        self.entries.get(index)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps;
    use parking_lot::Mutex;
    use std::sync::Arc;

    type Log = Arc<Mutex<Vec<String>>>;

    fn logging_runner(log: &Log, name: &'static str) -> impl FnOnce() -> Option<Cleanup> + Send {
        let log = log.clone();
        move || {
            log.lock().push(format!("run {name}"));
            let log = log.clone();
            cleanup(move || log.lock().push(format!("cleanup {name}")))
        }
    }

    fn pass(scheduler: &mut EffectScheduler, log: &Log, deps: Deps) -> usize {
        scheduler.begin_pass();
        scheduler.register(deps, logging_runner(log, "a"));
        scheduler.flush()
    }

    #[test]
    fn effect_runs_on_first_registration() {
        let log = Log::default();
        let mut scheduler = EffectScheduler::new();

        assert_eq!(pass(&mut scheduler, &log, deps![]), 1);
        assert_eq!(*log.lock(), vec!["run a"]);
    }

    #[test]
    fn unchanged_deps_neither_run_nor_clean_up() {
        let log = Log::default();
        let mut scheduler = EffectScheduler::new();

        pass(&mut scheduler, &log, deps![1, "x"]);
        assert_eq!(pass(&mut scheduler, &log, deps![1, "x"]), 0);
        assert_eq!(pass(&mut scheduler, &log, deps![1, "x"]), 0);

        assert_eq!(*log.lock(), vec!["run a"]);
        assert_eq!(scheduler.entry(0).map(EffectEntry::run_count), Some(1));
    }

    #[test]
    fn changed_deps_clean_up_then_run() {
        let log = Log::default();
        let mut scheduler = EffectScheduler::new();

        pass(&mut scheduler, &log, deps![1]);
        pass(&mut scheduler, &log, deps![2]);

        assert_eq!(*log.lock(), vec!["run a", "cleanup a", "run a"]);
    }

    #[test]
    fn absent_deps_run_every_pass() {
        let log = Log::default();
        let mut scheduler = EffectScheduler::new();

        for _ in 0..3 {
            pass(&mut scheduler, &log, Deps::always());
        }
        assert_eq!(scheduler.entry(0).map(EffectEntry::run_count), Some(3));
    }

    #[test]
    fn effects_flush_in_registration_order() {
        let log = Log::default();
        let mut scheduler = EffectScheduler::new();

        scheduler.begin_pass();
        scheduler.register(deps![], logging_runner(&log, "first"));
        scheduler.register(deps![], logging_runner(&log, "second"));
        scheduler.register(deps![], logging_runner(&log, "third"));
        scheduler.flush();

        assert_eq!(*log.lock(), vec!["run first", "run second", "run third"]);
    }

    #[test]
    fn teardown_runs_each_cleanup_once() {
        let log = Log::default();
        let mut scheduler = EffectScheduler::new();

        scheduler.begin_pass();
        scheduler.register(deps![], logging_runner(&log, "a"));
        scheduler.register(deps![], || None);
        scheduler.register(deps![], logging_runner(&log, "c"));
        scheduler.flush();
        log.lock().clear();

        scheduler.teardown();
        scheduler.teardown();
        assert_eq!(*log.lock(), vec!["cleanup a", "cleanup c"]);
    }

    #[test]
    fn nothing_fires_after_teardown() {
        let log = Log::default();
        let mut scheduler = EffectScheduler::new();

        pass(&mut scheduler, &log, deps![1]);
        scheduler.teardown();
        log.lock().clear();

        assert_eq!(pass(&mut scheduler, &log, deps![2]), 0);
        assert!(log.lock().is_empty());
        assert!(scheduler.is_torn_down());
    }
}
