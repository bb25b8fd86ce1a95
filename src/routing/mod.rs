//! Routing module
//!
//! Provides route registration and matching:
//! - Template compilation into matchers (`:name` placeholders)
//! - An ordered, overwrite-on-register route table
//! - Middleware chains fired before handlers

pub mod middleware;
pub mod pattern;
mod router;
pub mod table;

pub use middleware::{middleware, Middleware, Next};
pub use pattern::Matcher;
pub use router::Router;
pub use table::{handler, Handler, RouteEntry, RouteTable};
