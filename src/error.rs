//! Error types
//!
//! One enum per failure domain. Registration errors are returned to the caller
//! that builds the router; every per-request error is contained in the
//! dispatcher and turned into a response, except `DispatchError`, which is fatal.

use std::path::PathBuf;
use thiserror::Error;

/// Route registration failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    /// Registration without a callable handler
    #[error("handler for {method} {template} must be a function")]
    InvalidHandler { method: String, template: String },

    /// Method outside get/post/put/patch/delete
    #[error("unsupported method '{0}'")]
    UnsupportedMethod(String),
}

/// Malformed route template, detected when it is compiled during dispatch
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("empty parameter name in template '{0}'")]
    EmptyParam(String),

    #[error("invalid parameter name '{name}' in template '{template}'")]
    InvalidParam { template: String, name: String },

    #[error("template '{template}' does not compile: {source}")]
    Regex {
        template: String,
        #[source]
        source: regex::Error,
    },
}

/// Request body could not be aggregated
#[derive(Debug, Error)]
pub enum BodyReadError {
    #[error("failed to read request body: {0}")]
    Read(String),

    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: u64 },
}

/// Static asset and thumbnail failures
#[derive(Debug, Error)]
pub enum StaticError {
    #[error("unsupported extension '{0}'")]
    UnsupportedExtension(String),

    #[error("asset not found: {0}")]
    NotFound(PathBuf),

    #[error("thumbnail of '{path}' failed: {source}")]
    Thumbnail {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("thumbnail worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Fatal dispatcher failures
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The not-found document itself is unreadable; there is no further fallback
    #[error("cannot read not-found document '{path}': {source}")]
    NotFoundAsset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
