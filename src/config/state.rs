// Application state module
// Shared by every connection; nothing in it changes after startup except the
// fatal-error slot and the shutdown signal

use std::sync::{Arc, OnceLock};
use tokio::sync::Notify;

use super::types::Config;
use crate::handler::Dispatcher;

/// Application state
pub struct AppState {
    pub config: Config,
    pub dispatcher: Dispatcher,
    /// Stops the accept loop (signals and fatal errors)
    pub shutdown: Arc<Notify>,
    fatal: OnceLock<String>,
}

impl AppState {
    pub fn new(config: Config, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            dispatcher,
            shutdown: Arc::new(Notify::new()),
            fatal: OnceLock::new(),
        }
    }

    /// Record a fatal error and stop accepting connections
    pub fn fail(&self, reason: String) {
        if self.fatal.set(reason).is_ok() {
            self.shutdown.notify_one();
        }
    }

    /// The fatal error that stopped the server, if any
    pub fn fatal_error(&self) -> Option<&str> {
        self.fatal.get().map(String::as_str)
    }
}
