//! Integration Tests for the Component Runtime
//!
//! These tests drive whole instances through mount, render and unmount and
//! check that cells, effects, memos, reducers and the derived hooks work
//! together.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use trellis_core::deps;
use trellis_core::hooks::{
    use_debounce, use_fetch, use_persisted_state, use_toggle, AsyncResource, FetchError, Status,
};
use trellis_core::reactive::{cleanup, Dep, Deps, Instance};
use trellis_core::store::{FileStore, KeyValueStore, MemoryStore};
use trellis_core::transport::{MockTransport, Request, Transport, TransportError};

async fn settle() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

/// Updaters issued in one pass fold in call order over the pre-pass value.
#[test]
fn updaters_fold_over_the_pre_pass_value() {
    let mut instance = Instance::from_fn(|cx| {
        let total = cx.use_state(|| 2_i64);
        (total.get(), total)
    });

    let (_, total) = instance.mount().unwrap().clone();
    total.update(|n| n + 3);
    total.update(|n| n * 4);
    total.update(|n| n - 1);

    assert_eq!(instance.flush().unwrap(), 1);
    assert_eq!(instance.output().map(|(n, _)| *n), Some(19));
}

/// An effect whose dependencies did not change neither runs nor cleans up.
#[test]
fn unchanged_dependencies_skip_the_effect() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let log_clone = log.clone();

    let mut instance = Instance::from_fn(move |cx| {
        let user = cx.use_state(|| "ada".to_string());
        let unrelated = cx.use_state(|| 0_u32);

        let log = log_clone.clone();
        let name = user.get();
        cx.use_effect(deps![name.clone()], move || {
            log.lock().push(format!("subscribe {name}"));
            cleanup(move || log.lock().push(format!("unsubscribe {name}")))
        });
        (user, unrelated)
    });

    let (user, unrelated) = instance.mount().unwrap().clone();
    unrelated.set(1);
    instance.flush().unwrap();
    unrelated.set(2);
    instance.flush().unwrap();
    assert_eq!(*log.lock(), vec!["subscribe ada"]);

    user.set("grace".to_string());
    instance.flush().unwrap();
    instance.unmount().unwrap();

    assert_eq!(
        *log.lock(),
        vec![
            "subscribe ada",
            "unsubscribe ada",
            "subscribe grace",
            "unsubscribe grace",
        ]
    );
}

/// Memos recompute only when their inputs change.
#[test]
fn memo_recomputes_on_input_change_only() {
    let computed = Arc::new(AtomicUsize::new(0));
    let counter = computed.clone();

    let mut instance = Instance::from_fn(move |cx| {
        let items = cx.use_state(|| vec![3, 1, 2]);
        let filter = cx.use_state(|| 0);
        let counter = counter.clone();
        let list = items.get();
        let deps = Deps::tracked([Dep::value(list.clone()), Dep::from(filter.get())]);
        let sorted = cx.use_memo(deps, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let mut sorted = list;
            sorted.sort_unstable();
            sorted
        });
        (filter, sorted)
    });

    let (filter, sorted) = instance.mount().unwrap().clone();
    assert_eq!(sorted, vec![1, 2, 3]);

    instance.render().unwrap();
    instance.render().unwrap();
    assert_eq!(computed.load(Ordering::SeqCst), 1);

    filter.set(1);
    instance.flush().unwrap();
    assert_eq!(computed.load(Ordering::SeqCst), 2);
}

/// Three increments dispatched in one pass are observed together.
#[test]
fn reducer_increments_within_one_pass() {
    enum Action {
        Increment,
    }

    let mut instance = Instance::from_fn(|cx| {
        cx.use_reducer(
            |state: &u32, action: Action| match action {
                Action::Increment => state + 1,
            },
            || 0,
        )
    });

    let (_, dispatch) = instance.mount().unwrap().clone();
    for _ in 0..3 {
        dispatch.dispatch(Action::Increment);
    }

    assert_eq!(instance.flush().unwrap(), 1);
    assert_eq!(instance.output().map(|(n, _)| *n), Some(3));
}

/// Toggle parity through an instance.
#[test]
fn toggle_parity() {
    let mut instance = Instance::from_fn(|cx| use_toggle(cx, false));
    let (_, toggle) = instance.mount().unwrap().clone();

    toggle.flip();
    toggle.flip();
    instance.flush().unwrap();
    assert_eq!(instance.output().map(|(on, _)| *on), Some(false));

    toggle.flip();
    instance.flush().unwrap();
    assert_eq!(instance.output().map(|(on, _)| *on), Some(true));
}

/// Inputs closer together than the delay produce one commit at `tn + d`.
#[tokio::test(start_paused = true)]
async fn debounce_commits_the_last_input_once() {
    let delay = Duration::from_millis(250);
    let commits = Arc::new(Mutex::new(Vec::new()));
    let sink = commits.clone();

    let mut instance = Instance::from_fn(move |cx| {
        let query = cx.use_state(String::new);
        let debounced = use_debounce(cx, query.get(), delay);

        let sink = sink.clone();
        let seen = debounced.clone();
        cx.use_effect(deps![debounced], move || {
            sink.lock().push((tokio::time::Instant::now(), seen));
            None
        });
        query
    });

    let query = instance.mount().unwrap().clone();
    let start = tokio::time::Instant::now();
    commits.lock().clear();

    for text in ["t", "tr", "tre", "trel"] {
        query.set(text.to_string());
        instance.flush().unwrap();
        tokio::time::advance(Duration::from_millis(50)).await;
    }

    // Let the host react to every wake-up for a while.
    for _ in 0..20 {
        tokio::time::advance(Duration::from_millis(25)).await;
        settle().await;
        instance.flush().unwrap();
    }

    let commits = commits.lock();
    assert_eq!(commits.len(), 1);
    let (at, value) = &commits[0];
    assert_eq!(value, "trel");
    assert_eq!(*at - start, Duration::from_millis(150 + 250));
}

/// A stale response arriving after a newer success changes nothing.
#[test]
fn stale_response_after_newer_success_is_discarded() {
    let resource = AsyncResource::new();
    let a = resource.begin().unwrap();
    let b = resource.begin().unwrap();

    resource.resolve(b, Ok(vec!["b"]));
    resource.cell().commit();
    let settled = resource.snapshot();

    assert!(!resource.resolve(a, Ok(vec!["a"])));
    assert!(!resource.cell().commit());
    assert_eq!(resource.snapshot(), settled);
    assert_eq!(settled.status, Status::Success);
}

/// Persisted values round-trip through a fresh instance on disk.
#[test]
fn persisted_state_round_trips_through_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir.path()).unwrap());

    let render = |store: Arc<dyn KeyValueStore>| {
        Instance::from_fn(move |cx| {
            use_persisted_state(cx, &store, "recent searches", || Vec::<String>::new())
        })
    };

    let mut first = render(store.clone());
    let handle = first.mount().unwrap().clone();
    handle.update(|list| {
        let mut list = list.clone();
        list.push("rust".to_string());
        list
    });
    first.flush().unwrap();
    first.unmount().unwrap();

    let reopened: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir.path()).unwrap());
    let mut second = render(reopened);
    assert_eq!(second.mount().unwrap().get(), vec!["rust".to_string()]);
}

/// Two instances share one store; writes from one are picked up by the
/// other through `refresh`.
#[test]
fn persisted_state_rereads_shared_store() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let render = |store: Arc<dyn KeyValueStore>| {
        Instance::from_fn(move |cx| use_persisted_state(cx, &store, "volume", || 5_u8))
    };

    let mut left = render(store.clone());
    let mut right = render(store.clone());
    let left_handle = left.mount().unwrap().clone();
    let right_handle = right.mount().unwrap().clone();

    left_handle.set(9);
    left.flush().unwrap();

    assert_eq!(right_handle.get(), 5);
    assert!(right_handle.refresh().unwrap());
    right.flush().unwrap();
    assert_eq!(right_handle.get(), 9);
}

/// A host loop that awaits updates and re-renders until the fetch lands.
#[tokio::test(start_paused = true)]
async fn host_loop_drives_fetch_to_completion() {
    let mock = MockTransport::new();
    mock.respond_after(
        "/search?q=trellis",
        Duration::from_millis(40),
        200,
        r#"["trellis-core","trellis-cli"]"#,
    );
    let transport: Arc<dyn Transport> = Arc::new(mock.clone());

    let mut instance = Instance::from_fn(move |cx| {
        let query = cx.use_state(|| "trellis".to_string());
        let request = Some(Request::get(format!("/search?q={}", query.get())));
        use_fetch::<Vec<String>>(cx, &transport, request)
    });

    instance.mount().unwrap();
    while instance.output().map(|s| s.status) != Some(Status::Success) {
        instance.updated().await;
        settle().await;
        instance.flush().unwrap();
    }

    let state = instance.output().unwrap();
    assert_eq!(state.request_id, 1);
    assert_eq!(state.data.as_deref().map(<[String]>::len), Some(2));
    assert_eq!(mock.requests().len(), 1);
}

/// Unmounting while a fetch is in flight leaves nothing to render.
#[tokio::test(start_paused = true)]
async fn unmount_during_fetch_is_quiet() {
    let mock = MockTransport::new();
    mock.respond_after("/slow", Duration::from_secs(1), 200, "1");
    let transport: Arc<dyn Transport> = Arc::new(mock);

    let mut instance =
        Instance::from_fn(move |cx| use_fetch::<u32>(cx, &transport, Some(Request::get("/slow"))));
    instance.mount().unwrap();
    instance.unmount().unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    settle().await;
    assert!(!instance.is_dirty());
    instance.updated().await;
}

/// A transport failure lands in `Error` with its cause, and nothing retries.
#[tokio::test]
async fn transport_failure_is_reported_not_retried() {
    let mock = MockTransport::new();
    mock.fail("/feed", TransportError::Request("reset by peer".into()));
    let transport: Arc<dyn Transport> = Arc::new(mock.clone());

    let mut instance =
        Instance::from_fn(move |cx| use_fetch::<Vec<u32>>(cx, &transport, Some(Request::get("/feed"))));
    instance.mount().unwrap();
    while instance.output().map(|s| s.status) != Some(Status::Error) {
        instance.updated().await;
        settle().await;
        instance.flush().unwrap();
    }

    let state = instance.output().unwrap();
    assert!(matches!(
        state.error.as_deref(),
        Some(FetchError::Transport(TransportError::Request(_)))
    ));

    settle().await;
    assert_eq!(instance.flush().unwrap(), 0);
    assert_eq!(mock.requests().len(), 1);
}
