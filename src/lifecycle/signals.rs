//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for Ctrl-C (SIGINT)
//! - Merge it with the gateway's own shutdown route
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A failed handler install disables Ctrl-C instead of aborting the server

use crate::lifecycle::shutdown::Shutdown;

/// Resolve on Ctrl-C. Never resolves if the handler cannot be installed.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

/// Resolve on Ctrl-C or when `shutdown` is triggered.
pub async fn shutdown_signal(shutdown: Shutdown) {
    tokio::select! {
        _ = ctrl_c() => {
            tracing::info!("Shutdown signal received");
            shutdown.trigger();
        }
        _ = shutdown.wait() => {
            tracing::info!("Quit request received, quitting");
        }
    }
}
