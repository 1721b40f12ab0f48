//! Live reload pipeline.
//!
//! ```text
//! watcher --> Coordinator --> Hub --> browsers
//! (events)    (debounce +     (broadcast)
//!              classify)
//! ```
//!
//! # Module Structure
//!
//! - `debounce` - Pure timing and deduplication of change bursts
//! - `message` - Wire messages and burst classification
//! - `hub` - Client registry with failure-isolated broadcast
//! - `upgrade` - WebSocket handshake on the shared HTTP port
//! - `coordinator` - Event loop wiring the above together

mod coordinator;
mod debounce;
mod hub;
mod message;
mod upgrade;

pub use coordinator::Coordinator;
pub use upgrade::{Hub, handle_upgrade};

/// Reserved URL path for the WebSocket endpoint.
pub const WS_PATH: &str = "/livereload";

/// Reserved URL path for the injected client script.
pub const CLIENT_SCRIPT_PATH: &str = "/livereload.js";
