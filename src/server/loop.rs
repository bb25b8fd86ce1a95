// Server loop module
// Accepts connections until shutdown is requested

use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::handle_connection;
use crate::config::AppState;
use crate::logger;

/// Accept connections and hand each to its own local task
///
/// Returns once `state.shutdown` is notified. Must run inside a
/// `tokio::task::LocalSet`.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    let shutdown = Arc::clone(&state.shutdown);
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        logger::log_debug(&format!("[Connection] Accepted from: {peer_addr}"));
                        handle_connection(stream, peer_addr, &state);
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            () = shutdown.notified() => {
                let reason = state.fatal_error().unwrap_or("Shutdown requested");
                logger::log_shutdown(reason);
                return Ok(());
            }
        }
    }
}
