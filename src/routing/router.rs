//! Registration API
//!
//! `Router` is the only place routes are added. Once serving starts it is
//! frozen into a [`Dispatcher`], which never changes, so request handling
//! needs no locking.

use super::middleware::Middleware;
use super::table::{flatten_groups, Handler, RouteTable};
use crate::error::RouteError;
use crate::handler::context::{RequestContext, ResponseSink};
use crate::handler::dispatcher::{DispatchSettings, Dispatcher};
use crate::logger;
use std::sync::Arc;

#[derive(Default)]
pub struct Router {
    table: RouteTable,
    global_middleware: Vec<Middleware>,
}

macro_rules! method_fn {
    ($($name:ident),*) => {
        $(
            #[doc = concat!("Register a `", stringify!($name), "` handler; middleware groups are flattened in order.")]
            pub fn $name<F, G>(&mut self, template: &str, handler: F, groups: G) -> &mut Self
            where
                F: Fn(RequestContext, ResponseSink) + Send + Sync + 'static,
                G: IntoIterator<Item = Vec<Middleware>>,
            {
                self.insert(stringify!($name), template, Arc::new(handler), flatten_groups(groups));
                self
            }
        )*
    };
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    method_fn!(get, post, put, patch, delete);

    /// Register by method name, for routes assembled at runtime
    ///
    /// Fails with `InvalidHandler` when `handler` is `None` and with
    /// `UnsupportedMethod` for anything but get/post/put/patch/delete.
    pub fn route<G>(
        &mut self,
        method: &str,
        template: &str,
        handler: Option<Handler>,
        groups: G,
    ) -> Result<&mut Self, RouteError>
    where
        G: IntoIterator<Item = Vec<Middleware>>,
    {
        self.table
            .register(method, template, handler, flatten_groups(groups))?;
        Ok(self)
    }

    /// Add middleware that runs before the route's own middleware on every matched route
    pub fn use_middleware(&mut self, mw: Middleware) -> &mut Self {
        self.global_middleware.push(mw);
        self
    }

    pub const fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Freeze the registered routes
    pub fn into_dispatcher(self, settings: DispatchSettings) -> Dispatcher {
        logger::log_info(&format!(
            "{} routes registered, {} global middleware",
            self.table.len(),
            self.global_middleware.len()
        ));
        Dispatcher::new(self.table, self.global_middleware, settings)
    }

    fn insert(&mut self, method: &str, template: &str, handler: Handler, mw: Vec<Middleware>) {
        let result = self.table.register(method, template, Some(handler), mw);
        debug_assert!(result.is_ok(), "typed registration of {method} failed: {result:?}");
    }
}
