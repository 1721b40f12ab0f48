//! Typed errors for server startup and watch subscription.
//!
//! Per-request and per-client failures are not represented here: they turn
//! into HTTP responses or client drops and never terminate the run. Only
//! `ServerError::Bind` is fatal.

use std::net::SocketAddr;

use thiserror::Error;

/// Errors surfaced by the server lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be bound (port in use, permission).
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A served root does not exist or is not a directory.
    #[error("served root is not a directory: {0}")]
    InvalidRoot(std::path::PathBuf),
}

/// Errors surfaced by the file watcher.
#[derive(Debug, Error)]
pub enum WatchError {
    /// Native-event subscription failed (inotify/kqueue limits, permissions).
    /// Callers fall back to the polling strategy.
    #[error("native watch subscription failed: {0}")]
    Subscription(#[from] notify::Error),
}
