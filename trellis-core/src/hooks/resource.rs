//! Async Resources
//!
//! An [`AsyncResource`] tracks one logical piece of remote data through
//! `Idle -> Loading -> (Success | Error)`. Any state can go back to
//! `Loading` when a new request is issued.
//!
//! # Stale Responses
//!
//! Issuing a request allocates the next request id. A response is committed
//! only if its id is still the current one; anything older was superseded
//! and is discarded without touching visible state. The id is checked and
//! the state replaced under the cell lock, so a stale response can never
//! slip in between the check and the write.
//!
//! [`use_fetch`] also cancels the task of a superseded request through a
//! [`CancellationToken`], which saves the transport call, but correctness
//! only relies on the id check.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::Reported;
use crate::reactive::{cleanup, Dep, Deps, Scope, StateCell};
use crate::transport::{Request, Transport, TransportError};

/// Why a fetch ended in the `Error` state.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("request failed with status {status}")]
    Status { status: u16, body: String },

    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Snapshot of a resource.
///
/// `Loading` keeps the previous `data` and `error` so a view can show the
/// last result while the next one is on its way.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceState<T> {
    pub status: Status,
    pub data: Option<T>,
    pub error: Option<Reported<FetchError>>,
    pub request_id: u64,
}

impl<T> ResourceState<T> {
    pub fn is_loading(&self) -> bool {
        self.status == Status::Loading
    }
}

impl<T> Default for ResourceState<T> {
    fn default() -> Self {
        Self {
            status: Status::Idle,
            data: None,
            error: None,
            request_id: 0,
        }
    }
}

/// Request-id guarded fetch state.
pub struct AsyncResource<T> {
    cell: StateCell<ResourceState<T>>,
}

impl<T> AsyncResource<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    /// A standalone resource, not owned by any instance.
    pub fn new() -> Self {
        Self::from_cell(StateCell::new(ResourceState::default()))
    }

    pub fn from_cell(cell: StateCell<ResourceState<T>>) -> Self {
        Self { cell }
    }

    /// The committed state.
    pub fn snapshot(&self) -> ResourceState<T> {
        self.cell.get()
    }

    /// The state with uncommitted transitions applied.
    pub fn latest(&self) -> ResourceState<T> {
        self.cell.latest()
    }

    pub fn cell(&self) -> &StateCell<ResourceState<T>> {
        &self.cell
    }

    /// Start a request: allocate the next id and enter `Loading`.
    ///
    /// Returns `None` if the owning instance is gone.
    pub fn begin(&self) -> Option<u64> {
        let mut issued = None;
        self.cell.update(|state| {
            let id = state.request_id + 1;
            issued = Some(id);
            ResourceState {
                status: Status::Loading,
                data: state.data.clone(),
                error: state.error.clone(),
                request_id: id,
            }
        });
        if let Some(id) = issued {
            tracing::debug!(resource = self.cell.id(), request = id, "loading");
        }
        issued
    }

    /// Deliver the outcome of request `id`.
    ///
    /// Returns `false` and leaves the state alone if `id` is no longer the
    /// current request.
    pub fn resolve(&self, id: u64, outcome: Result<T, FetchError>) -> bool {
        let mut current = id;
        let accepted = self.cell.update_if(|state| {
            if state.request_id != id {
                current = state.request_id;
                return None;
            }
            Some(match outcome {
                Ok(data) => ResourceState {
                    status: Status::Success,
                    data: Some(data),
                    error: None,
                    request_id: id,
                },
                Err(err) => ResourceState {
                    status: Status::Error,
                    data: state.data.clone(),
                    error: Some(Reported::new(err)),
                    request_id: id,
                },
            })
        });

        if current != id {
            tracing::debug!(request = id, current, "stale response discarded");
        }
        accepted
    }

    /// Give up on the outstanding request without issuing another.
    ///
    /// A `Loading` resource returns to `Idle`, keeping its data and error,
    /// and the abandoned id is retired so a late response for it is stale.
    /// Returns `false` if nothing was in flight.
    pub fn abandon(&self) -> bool {
        let abandoned = self.cell.update_if(|state| {
            (state.status == Status::Loading).then(|| ResourceState {
                status: Status::Idle,
                data: state.data.clone(),
                error: state.error.clone(),
                request_id: state.request_id + 1,
            })
        });
        if abandoned {
            tracing::debug!(resource = self.cell.id(), "request abandoned");
        }
        abandoned
    }
}

impl<T> Default for AsyncResource<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for AsyncResource<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for AsyncResource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncResource").field("cell", &self.cell).finish()
    }
}

async fn fetch_json<T>(
    transport: &dyn Transport,
    request: Request,
    timeout: Option<Duration>,
) -> Result<T, FetchError>
where
    T: DeserializeOwned,
{
    let sending = transport.send(request);
    let response = match timeout {
        Some(limit) => tokio::time::timeout(limit, sending)
            .await
            .map_err(|_| FetchError::Timeout(limit))??,
        None => sending.await?,
    };

    if !response.is_success() {
        return Err(FetchError::Status {
            status: response.status,
            body: response.body,
        });
    }
    Ok(serde_json::from_str(&response.body)?)
}

/// Fetch `request` and decode the JSON body as `T`.
///
/// A new request is issued whenever `request` changes. Switching to `None`
/// issues nothing; a request still in flight is abandoned and the resource
/// goes back to `Idle`. Non-2xx statuses, transport
/// failures, decode failures and timeouts (`fetch.timeout_ms`) all end in
/// `Error`. Nothing is retried.
///
/// Requests run on tokio tasks, so the instance must be rendered inside a
/// tokio runtime.
pub fn use_fetch<T>(
    cx: &mut Scope<'_>,
    transport: &Arc<dyn Transport>,
    request: Option<Request>,
) -> ResourceState<T>
where
    T: DeserializeOwned + Clone + PartialEq + Send + Sync + 'static,
{
    let cell = cx.use_state(ResourceState::default);
    let resource = AsyncResource::from_cell(cell.clone());
    let transport = Arc::clone(transport);
    let timeout = cx.config().fetch_timeout();

    cx.use_effect(Deps::tracked([Dep::value(request.clone())]), move || {
        let Some(request) = request else {
            resource.abandon();
            return None;
        };
        let id = resource.begin()?;

        let token = CancellationToken::new();
        let cancelled = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {
                    tracing::trace!(request = id, "fetch cancelled");
                }
                outcome = fetch_json::<T>(transport.as_ref(), request, timeout) => {
                    resource.resolve(id, outcome);
                }
            }
        });

        cleanup(move || token.cancel())
    });

    cell.get()
}
