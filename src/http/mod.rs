//! HTTP protocol layer module
//!
//! Response builders, the static content-type table and the CORS injector,
//! decoupled from routing.

pub mod cors;
pub mod mime;
pub mod response;

/// Response body type used throughout the crate
pub type Body = http_body_util::Full<hyper::body::Bytes>;

// Re-export commonly used builders
pub use response::{
    build_400_response, build_413_response, build_500_response, build_not_found_page,
    build_static_404_response, build_thumbnail_response,
};
