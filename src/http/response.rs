//! HTTP response building module
//!
//! Provides builders for the fixed responses the dispatcher and the static
//! asset fallback produce.

use super::mime::THUMBNAIL_CONTENT_TYPE;
use super::Body;
use hyper::body::Bytes;
use hyper::Response;

/// Body sent for unsupported extensions and missing static assets
pub const STATIC_NOT_FOUND_BODY: &str = "404: File not found";

/// Build 404 for the static fallback (unsupported extension or missing file)
pub fn build_static_404_response() -> Response<Body> {
    Response::builder()
        .status(404)
        .header("Content-Type", "text/html")
        .body(Body::new(Bytes::from_static(STATIC_NOT_FOUND_BODY.as_bytes())))
        .unwrap_or_else(|e| {
            log_build_error("404", &e);
            Response::new(Body::new(Bytes::from_static(STATIC_NOT_FOUND_BODY.as_bytes())))
        })
}

/// Build 404 carrying the not-found document verbatim
pub fn build_not_found_page(document: String) -> Response<Body> {
    let content_length = document.len();
    Response::builder()
        .status(404)
        .header("Content-Type", "text/html; charset=utf-8")
        .header("Content-Length", content_length)
        .body(Body::new(Bytes::from(document)))
        .unwrap_or_else(|e| {
            log_build_error("404", &e);
            Response::new(Body::new(Bytes::new()))
        })
}

/// Build 400 Bad Request response
pub fn build_400_response(reason: &str) -> Response<Body> {
    Response::builder()
        .status(400)
        .header("Content-Type", "text/plain")
        .body(Body::new(Bytes::from(format!("400 Bad Request: {reason}"))))
        .unwrap_or_else(|e| {
            log_build_error("400", &e);
            Response::new(Body::new(Bytes::from("400 Bad Request")))
        })
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<Body> {
    Response::builder()
        .status(413)
        .header("Content-Type", "text/plain")
        .body(Body::new(Bytes::from("413 Payload Too Large")))
        .unwrap_or_else(|e| {
            log_build_error("413", &e);
            Response::new(Body::new(Bytes::from("413 Payload Too Large")))
        })
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response<Body> {
    Response::builder()
        .status(500)
        .header("Content-Type", "text/plain")
        .body(Body::new(Bytes::from("500 Internal Server Error")))
        .unwrap_or_else(|e| {
            log_build_error("500", &e);
            Response::new(Body::new(Bytes::from("500 Internal Server Error")))
        })
}

/// Build 200 thumbnail response; always labelled as the thumbnail image type
pub fn build_thumbnail_response(data: Vec<u8>) -> Response<Body> {
    let content_length = data.len();
    Response::builder()
        .status(200)
        .header("Content-Type", THUMBNAIL_CONTENT_TYPE)
        .header("Content-Length", content_length)
        .body(Body::new(Bytes::from(data)))
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            Response::new(Body::new(Bytes::new()))
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
