//! `[connections]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [connections]
//! max_concurrent = 100    # Simultaneous requests before returning 503
//! max_threads = 64        # Worker threads serving requests
//! timeout_secs = 30       # Idle connection timeout
//! ```

use std::time::Duration;

use serde::Deserialize;

/// Connection and worker-pool settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectionsConfig {
    /// Requests served at once before new ones get a 503 busy page.
    pub max_concurrent: usize,

    /// Size of the worker pool handling requests.
    pub max_threads: usize,

    /// Seconds before an idle connection is dropped.
    pub timeout_secs: u64,
}

impl Default for ConnectionsConfig {
    fn default() -> Self {
        Self { max_concurrent: 100, max_threads: 64, timeout_secs: 30 }
    }
}

impl ConnectionsConfig {
    /// Worker pool size, clamped to `4..=512`.
    pub fn max_threads_clamped(&self) -> usize {
        self.max_threads.clamp(4, 512)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;

    #[test]
    fn test_connections_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.connections.max_concurrent, 100);
        assert_eq!(config.connections.max_threads_clamped(), 64);
        assert_eq!(config.connections.timeout().as_secs(), 30);
    }

    #[test]
    fn test_max_threads_clamped() {
        let config = test_parse_config("[connections]\nmax_threads = 1");
        assert_eq!(config.connections.max_threads_clamped(), 4);

        let config = test_parse_config("[connections]\nmax_threads = 10000");
        assert_eq!(config.connections.max_threads_clamped(), 512);
    }
}
