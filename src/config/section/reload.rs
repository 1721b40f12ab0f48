//! `[reload]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [reload]
//! enabled = true          # Inject the live-reload client into HTML pages
//! css_injection = true    # Swap stylesheets in place instead of a full reload
//! debounce_ms = 100       # Quiet window before a change burst is flushed
//! ```

use std::time::Duration;

use serde::Deserialize;

/// Live-reload behaviour settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Inject the reload client script into served HTML and open the
    /// WebSocket endpoint. Disabling turns the server into a plain static
    /// file server.
    pub enabled: bool,

    /// When every change in a burst is a stylesheet, refresh CSS links in
    /// place instead of reloading the whole page.
    pub css_injection: bool,

    /// Milliseconds of quiet after the last change before clients are
    /// notified. Coalesces editor save bursts into one reload.
    pub debounce_ms: u64,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self { enabled: true, css_injection: true, debounce_ms: 100 }
    }
}

impl ReloadConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
