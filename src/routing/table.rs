//! Route registry
//!
//! Maps a route template to a `RouteEntry`. Iteration follows registration
//! order. Registering any method for a template replaces the whole entry:
//! handlers for other methods and the previous middleware list are gone.

use super::middleware::Middleware;
use super::pattern::Matcher;
use crate::error::RouteError;
use crate::handler::context::{RequestContext, ResponseSink};
use crate::logger;
use std::sync::{Arc, OnceLock};

/// A route handler
pub type Handler = Arc<dyn Fn(RequestContext, ResponseSink) + Send + Sync>;

/// Methods a route can be registered for
pub const METHODS: [&str; 5] = ["get", "post", "put", "patch", "delete"];

/// Wrap a closure as a [`Handler`]
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(RequestContext, ResponseSink) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Concatenate middleware groups into one ordered list
pub fn flatten_groups<G>(groups: G) -> Vec<Middleware>
where
    G: IntoIterator<Item = Vec<Middleware>>,
{
    groups.into_iter().flatten().collect()
}

/// Everything registered for one template by the latest registration call
pub struct RouteEntry {
    /// Lowercase method key
    method: String,
    handler: Handler,
    middleware: Option<Vec<Middleware>>,
    /// Compiled on first dispatch; `None` if the template is malformed
    matcher: OnceLock<Option<Matcher>>,
}

impl RouteEntry {
    fn new(method: String, handler: Handler, middleware: Vec<Middleware>) -> Self {
        Self {
            method,
            handler,
            middleware: (!middleware.is_empty()).then_some(middleware),
            matcher: OnceLock::new(),
        }
    }

    /// Handler for `method`, compared case-insensitively
    pub fn handler_for(&self, method: &str) -> Option<&Handler> {
        self.method
            .eq_ignore_ascii_case(method)
            .then_some(&self.handler)
    }

    pub fn middleware(&self) -> &[Middleware] {
        self.middleware.as_deref().unwrap_or_default()
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Compiled matcher for `template`, compiling it on first use
    pub fn matcher(&self, template: &str) -> Option<&Matcher> {
        self.matcher
            .get_or_init(|| match Matcher::compile(template) {
                Ok(m) => Some(m),
                Err(e) => {
                    logger::log_warning(&format!("Route never matches: {e}"));
                    None
                }
            })
            .as_ref()
    }
}

/// Ordered template -> entry registry
#[derive(Default)]
pub struct RouteTable {
    entries: Vec<(String, RouteEntry)>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `method` at `template`, replacing any existing entry
    pub fn register(
        &mut self,
        method: &str,
        template: &str,
        handler: Option<Handler>,
        middleware: Vec<Middleware>,
    ) -> Result<(), RouteError> {
        let method = method.to_ascii_lowercase();
        if !METHODS.contains(&method.as_str()) {
            return Err(RouteError::UnsupportedMethod(method));
        }
        let Some(handler) = handler else {
            return Err(RouteError::InvalidHandler {
                method,
                template: template.to_string(),
            });
        };

        logger::log_route_registered(&method, template, middleware.len());
        let entry = RouteEntry::new(method, handler, middleware);
        // A re-registered template keeps its original position
        match self.entries.iter_mut().find(|(t, _)| t == template) {
            Some((_, existing)) => *existing = entry,
            None => self.entries.push((template.to_string(), entry)),
        }
        Ok(())
    }

    pub fn get(&self, template: &str) -> Option<&RouteEntry> {
        self.entries
            .iter()
            .find(|(t, _)| t == template)
            .map(|(_, e)| e)
    }

    /// Entries in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RouteEntry)> {
        self.entries.iter().map(|(t, e)| (t.as_str(), e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
