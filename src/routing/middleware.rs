//! Middleware invocation
//!
//! Middleware runs in list order before the route handler. Each middleware
//! receives a `Next` continuation, but nothing waits for it: the handler is
//! invoked as soon as every middleware function has returned, whether or not
//! any of them signalled completion.

use crate::handler::context::{RequestHead, ResponseSink};
use crate::logger;
use std::sync::Arc;

/// A middleware function
pub type Middleware = Arc<dyn Fn(&RequestHead, &mut ResponseSink, Next) + Send + Sync>;

/// Wrap a closure as a [`Middleware`]
pub fn middleware<F>(f: F) -> Middleware
where
    F: Fn(&RequestHead, &mut ResponseSink, Next) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Continuation passed to a middleware
///
/// May be called, moved into a spawned task, or dropped. The dispatcher does
/// not observe it.
#[derive(Debug)]
pub struct Next {
    position: usize,
    template: String,
}

impl Next {
    /// Signal that the middleware is done
    pub fn run(self) {
        logger::log_debug(&format!(
            "[Middleware] #{} on {} signalled completion",
            self.position, self.template
        ));
    }

    pub const fn position(&self) -> usize {
        self.position
    }
}

/// Fire every middleware in order for a matched route
pub fn run_all<'a>(
    chain: impl IntoIterator<Item = &'a Middleware>,
    head: &RequestHead,
    sink: &mut ResponseSink,
    template: &str,
) {
    for (position, mw) in chain.into_iter().enumerate() {
        let next = Next {
            position,
            template: template.to_string(),
        };
        mw(head, sink, next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::{HeaderMap, Method};
    use std::sync::Mutex;

    fn head() -> RequestHead {
        RequestHead {
            method: Method::GET,
            path: "/x".to_string(),
            query: None,
            headers: HeaderMap::new(),
        }
    }

    #[test]
    fn test_runs_in_order_without_waiting_for_next() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let parked = Arc::new(Mutex::new(Vec::new()));

        let chain: Vec<Middleware> = (0..3)
            .map(|i| {
                let seen = Arc::clone(&seen);
                let parked = Arc::clone(&parked);
                middleware(move |_, sink, next| {
                    seen.lock().unwrap().push(i);
                    sink.set_header(&format!("X-Mw-{i}"), "1");
                    // Never signal completion; hold on to the continuation
                    parked.lock().unwrap().push(next);
                })
            })
            .collect();

        let (mut sink, _rx) = ResponseSink::channel();
        run_all(&chain, &head(), &mut sink, "/x");

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(sink.headers().len(), 3);
        let positions: Vec<usize> = parked.lock().unwrap().iter().map(Next::position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }
}
