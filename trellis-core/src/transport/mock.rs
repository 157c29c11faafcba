//! Canned-response transport.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use indexmap::IndexMap;
use parking_lot::Mutex;

use super::{Method, Request, Response, Transport, TransportError};

struct Reply {
    delay: Duration,
    outcome: Result<Response, TransportError>,
}

#[derive(Default)]
struct Routes {
    replies: IndexMap<(Method, String), VecDeque<Reply>>,
    sent: Vec<Request>,
}

/// Transport answering from a queue of replies per `(method, url)`.
///
/// Each request consumes the next reply for its route; the last reply of a
/// route is reused once the queue is down to one. Delays use tokio time, so
/// paused-clock tests control exactly when responses arrive.
#[derive(Clone, Default)]
pub struct MockTransport {
    routes: Arc<Mutex<Routes>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `GET url`.
    pub fn respond(&self, url: &str, status: u16, body: &str) -> &Self {
        self.respond_after(url, Duration::ZERO, status, body)
    }

    /// Queue a response for `GET url`, delivered after `delay`.
    pub fn respond_after(&self, url: &str, delay: Duration, status: u16, body: &str) -> &Self {
        self.push(Method::Get, url, delay, Ok(Response::new(status, body)))
    }

    /// Queue a transport failure for `GET url`.
    pub fn fail(&self, url: &str, error: TransportError) -> &Self {
        self.push(Method::Get, url, Duration::ZERO, Err(error))
    }

    /// Queue an arbitrary outcome.
    pub fn push(
        &self,
        method: Method,
        url: &str,
        delay: Duration,
        outcome: Result<Response, TransportError>,
    ) -> &Self {
        self.routes
            .lock()
            .replies
            .entry((method, url.to_owned()))
            .or_default()
            .push_back(Reply { delay, outcome });
        self
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.routes.lock().sent.clone()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: Request) -> BoxFuture<'static, Result<Response, TransportError>> {
        let reply = {
            let mut routes = self.routes.lock();
            routes.sent.push(request.clone());
            let key = (request.method, request.url.clone());
            routes.replies.get_mut(&key).and_then(|queue| {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().map(|reply| Reply {
                        delay: reply.delay,
                        outcome: reply.outcome.clone(),
                    })
                }
            })
        };

        async move {
            let Some(reply) = reply else {
                return Err(TransportError::NoRoute {
                    method: request.method,
                    url: request.url,
                });
            };
            if !reply.delay.is_zero() {
                tokio::time::sleep(reply.delay).await;
            }
            reply.outcome
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_are_consumed_in_order_and_last_one_sticks() {
        let transport = MockTransport::new();
        transport.respond("/a", 200, "first").respond("/a", 500, "second");

        let first = transport.send(Request::get("/a")).await.unwrap();
        let second = transport.send(Request::get("/a")).await.unwrap();
        let third = transport.send(Request::get("/a")).await.unwrap();

        assert_eq!(first.body, "first");
        assert_eq!(second.status, 500);
        assert_eq!(third.status, 500);
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn unknown_route_is_a_transport_error() {
        let transport = MockTransport::new();
        let err = transport.send(Request::get("/missing")).await.unwrap_err();
        assert!(matches!(err, TransportError::NoRoute { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_reply_waits_on_tokio_time() {
        let transport = MockTransport::new();
        transport.respond_after("/slow", Duration::from_secs(5), 200, "done");

        let started = tokio::time::Instant::now();
        let response = transport.send(Request::get("/slow")).await.unwrap();
        assert_eq!(response.body, "done");
        assert!(started.elapsed() >= Duration::from_secs(5));
    }
}
