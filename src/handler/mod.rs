//! Request handler module
//!
//! Entry point between the connection layer and the dispatcher: runs the
//! dispatch and writes the access log line.

pub mod body;
pub mod context;
pub mod dispatcher;
pub mod static_files;
pub mod thumbnail;

pub use context::{RequestContext, RequestHead, ResponseSink};
pub use dispatcher::{DispatchSettings, Dispatcher, MatchResult, Resolution};

use crate::config::AppState;
use crate::error::DispatchError;
use crate::http::Body;
use crate::logger::{self, AccessLogEntry};
use hyper::body::{Body as _, Incoming};
use hyper::{header, Request, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Body>, DispatchError> {
    let started = Instant::now();
    let entry = state.config.logging.access_log.then(|| {
        let mut entry = AccessLogEntry::new(
            peer_addr.ip().to_string(),
            req.method().to_string(),
            req.uri().path().to_string(),
        );
        entry.query = req.uri().query().map(ToString::to_string);
        entry.user_agent = req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        entry
    });

    let mut resp = match state.dispatcher.dispatch(req).await {
        Ok(resp) => resp,
        Err(e) => {
            logger::log_error(&format!("Fatal: {e}"));
            state.fail(e.to_string());
            return Err(e);
        }
    };

    if let Ok(value) = header::HeaderValue::from_str(&state.config.http.server_name) {
        resp.headers_mut().entry(header::SERVER).or_insert(value);
    }

    if let Some(mut entry) = entry {
        entry.status = resp.status().as_u16();
        entry.body_bytes = usize::try_from(resp.body().size_hint().exact().unwrap_or(0))
            .unwrap_or(usize::MAX);
        entry.route = resp
            .extensions()
            .get::<Resolution>()
            .map_or("-", Resolution::label)
            .to_string();
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(resp)
}
