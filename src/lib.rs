//! rustroute
//!
//! A small HTTP router: handlers are registered per template and method,
//! matched first-come-first-served, preceded by middleware, and backed by a
//! static thumbnail fallback and an on-disk 404 page.
//!
//! ```no_run
//! use rustroute::routing::{middleware, Router};
//! use rustroute::handler::DispatchSettings;
//! # fn settings() -> DispatchSettings { unimplemented!() }
//!
//! let mut router = Router::new();
//! let log = middleware(|head, _res, next| {
//!     println!("{} {}", head.method, head.path);
//!     next.run();
//! });
//! router.get("/users/:id", |req, mut res| {
//!     res.write(format!("user {}", req.param("id").unwrap_or("?")));
//!     res.end();
//! }, [vec![log]]);
//! let dispatcher = router.into_dispatcher(settings());
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod routing;
pub mod server;
