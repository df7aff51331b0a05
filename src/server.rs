//! TCP accept loop
//!
//! Accepts connections and spawns one task per client. All tasks share the
//! same `Arc<Store>`.

use crate::commands::CommandHandler;
use crate::connection::{handle_connection, ConnectionStats};
use crate::protocol::FrameLimits;
use crate::storage::Store;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::error;

/// Accepts connections forever.
///
/// Accept errors are logged and do not stop the loop. Run it inside
/// `tokio::select!` against a shutdown signal to stop it.
pub async fn serve(
    listener: TcpListener,
    store: Arc<Store>,
    stats: Arc<ConnectionStats>,
    limits: FrameLimits,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = CommandHandler::new(Arc::clone(&store));
                let stats = Arc::clone(&stats);

                tokio::spawn(async move {
                    handle_connection(stream, addr, handler, stats, limits).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
