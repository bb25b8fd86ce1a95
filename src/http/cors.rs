//! CORS header injection for matched routes

use crate::config::CorsConfig;
use crate::handler::context::ResponseSink;

/// Add the configured CORS headers to `sink`
pub fn apply(sink: &mut ResponseSink, cors: &CorsConfig) {
    sink.set_header("Access-Control-Allow-Origin", &cors.allow_origin)
        .set_header("Access-Control-Allow-Methods", &cors.allow_methods)
        .set_header("Access-Control-Allow-Headers", &cors.allow_headers);
}
