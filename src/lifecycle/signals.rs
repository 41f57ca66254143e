//! OS signal handling.

use crate::lifecycle::shutdown::Shutdown;
use std::sync::Arc;

/// Trigger `shutdown` when the process receives Ctrl+C.
pub fn cancel_on_interrupt(shutdown: Arc<Shutdown>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Interrupt received, cancelling run");
                shutdown.trigger();
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            }
        }
    })
}
