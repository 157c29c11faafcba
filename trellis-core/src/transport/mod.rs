//! Network Transport
//!
//! The async resource hooks issue requests through [`Transport`] and never
//! see how bytes move. A transport resolves to a [`Response`] for any status
//! code; deciding what counts as success is the caller's job.
//!
//! [`MockTransport`] serves canned responses for tests and demos. With the
//! `http` feature, `HttpTransport` sends real requests through `reqwest`.

#[cfg(feature = "http")]
mod http;
mod mock;

use std::fmt;

use futures_util::future::BoxFuture;
use indexmap::IndexMap;
use thiserror::Error;

#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use mock::MockTransport;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: IndexMap<String, String>,
    pub body: Option<String>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: IndexMap::new(),
            body: None,
        }
    }

    /// A GET request with a JSON content type, as the fetch hooks send by default.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url).header("Content-Type", "application/json")
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// What came back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("no route for {method} {url}")]
    NoRoute { method: Method, url: String },
}

/// Sends requests.
///
/// The returned future must be `'static`: it outlives the effect that
/// started it and is driven on a tokio task.
pub trait Transport: Send + Sync {
    fn send(&self, request: Request) -> BoxFuture<'static, Result<Response, TransportError>>;
}
