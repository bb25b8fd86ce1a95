//! Per-request state handed to middleware and handlers
//!
//! `RequestHead` is what middleware sees, `RequestContext` is what a handler
//! receives once parameters and the body are known, and `ResponseSink` is the
//! write side of the response. A sink delivers exactly one response: `end`
//! consumes it, and dropping it without `end` delivers whatever was written.

use crate::http::Body;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use hyper::http::request::Parts;
use hyper::{HeaderMap, Method, Response, StatusCode};
use std::collections::HashMap;
use tokio::sync::oneshot;

/// Method, path and headers of an incoming request
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    /// Raw request path, without the query string
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
}

impl RequestHead {
    pub fn from_parts(parts: &Parts) -> Self {
        Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(ToString::to_string),
            headers: parts.headers.clone(),
        }
    }
}

/// Everything a route handler gets to see
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub head: RequestHead,
    /// Named captures of the matched route template
    pub params: HashMap<String, String>,
    /// Aggregated request body
    pub body: String,
}

impl RequestContext {
    pub const fn method(&self) -> &Method {
        &self.head.method
    }

    pub fn path(&self) -> &str {
        &self.head.path
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Write side of a response
pub struct ResponseSink {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    done: Option<oneshot::Sender<Response<Body>>>,
}

impl ResponseSink {
    /// Create a sink and the receiver its single response is delivered to
    pub(crate) fn channel() -> (Self, oneshot::Receiver<Response<Body>>) {
        let (tx, rx) = oneshot::channel();
        let sink = Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            done: Some(tx),
        };
        (sink, rx)
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Set a header, replacing any previous value
    ///
    /// Invalid names or values are logged and skipped.
    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => crate::logger::log_warning(&format!("Ignoring invalid header '{name}'")),
        }
        self
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Append to the response body
    pub fn write(&mut self, chunk: impl AsRef<[u8]>) -> &mut Self {
        self.body.extend_from_slice(chunk.as_ref());
        self
    }

    /// Serialize `value` as the response body with a JSON content type
    pub fn json<T: serde::Serialize>(&mut self, value: &T) -> &mut Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                self.set_header("Content-Type", "application/json");
                self.body = bytes;
            }
            Err(e) => {
                crate::logger::log_error(&format!("Failed to serialize JSON body: {e}"));
                self.status = StatusCode::INTERNAL_SERVER_ERROR;
            }
        }
        self
    }

    /// Finalize the response
    ///
    /// Consumes the sink, so a response cannot be ended twice:
    ///
    /// ```compile_fail,E0382
    /// fn finish(res: rustroute::handler::ResponseSink) {
    ///     res.end();
    ///     res.end();
    /// }
    /// ```
    pub fn end(mut self) {
        self.finalize();
    }

    /// Drop the sink without delivering anything
    pub(crate) fn discard(mut self) {
        self.done.take();
    }

    fn finalize(&mut self) {
        let Some(done) = self.done.take() else {
            return;
        };
        let mut response = Response::new(Body::new(Bytes::from(std::mem::take(&mut self.body))));
        *response.status_mut() = self.status;
        *response.headers_mut() = std::mem::take(&mut self.headers);
        // The receiver is gone only if the connection was dropped
        let _ = done.send(response);
    }
}

impl Drop for ResponseSink {
    fn drop(&mut self) {
        self.finalize();
    }
}

impl std::fmt::Debug for ResponseSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseSink")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("finalized", &self.done.is_none())
            .finish()
    }
}
