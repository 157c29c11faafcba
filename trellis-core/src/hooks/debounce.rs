//! Debounced values.
//!
//! The debounced value trails its input: each new input cancels the pending
//! timer (through effect cleanup) and starts another. Only an input that
//! survives a full quiet period is committed, so a burst of inputs yields
//! one commit, equal to the last input, `delay` after it arrived.
//!
//! Timers are tokio tasks; rendering an instance that uses these hooks
//! requires a tokio runtime. Unmounting aborts a pending timer.

use std::time::Duration;

use tokio::time::{sleep_until, Instant};

use crate::reactive::{cleanup, Dep, Deps, Scope};

/// The last input that stayed unchanged for `delay`.
pub fn use_debounce<T>(cx: &mut Scope<'_>, value: T, delay: Duration) -> T
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    let debounced = cx.use_state(|| value.clone());

    let setter = debounced.clone();
    let deps = Deps::tracked([Dep::value(value.clone()), Dep::from(delay)]);
    cx.use_effect(deps, move || {
        let deadline = Instant::now() + delay;
        let timer = tokio::spawn(async move {
            sleep_until(deadline).await;
            if setter.set(value) {
                tracing::trace!(cell = setter.id(), "debounced value committed");
            }
        });
        cleanup(move || timer.abort())
    });

    debounced.get()
}

/// [`use_debounce`] with the delay from the instance's config.
pub fn use_debounce_default<T>(cx: &mut Scope<'_>, value: T) -> T
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    let delay = cx.config().debounce_delay();
    use_debounce(cx, value, delay)
}
