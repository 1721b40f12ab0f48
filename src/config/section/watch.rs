//! `[watch]` section configuration.
//!
//! Controls how filesystem changes are detected.
//!
//! # Example
//!
//! ```toml
//! [watch]
//! force_polling = false        # Use the polling strategy even if native events work
//! poll_interval = 1.0          # Seconds between polling scans
//! max_targets = 50             # Directory ceiling before falling back to polling
//! ignored_dirs = ["node_modules", ".git"]
//! ignored_extensions = ["log"]
//! ```

use std::time::Duration;

use serde::Deserialize;

/// Directory names skipped during watching and target collection.
const DEFAULT_IGNORED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "__pycache__",
    ".svn",
    ".hg",
    ".sass-cache",
    ".pytest_cache",
];

/// Filesystem watching settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Always use the polling strategy, skipping native OS notifications.
    /// Useful on network mounts and container volumes where inotify events
    /// never arrive.
    pub force_polling: bool,

    /// Seconds between scans when polling.
    pub poll_interval: f64,

    /// Maximum number of directories registered with the native watcher.
    /// When a root tree exceeds this, the session falls back to polling.
    pub max_targets: usize,

    /// Directory names excluded from watching and listings.
    pub ignored_dirs: Vec<String>,

    /// Extensions (without dot) whose changes never trigger a reload.
    pub ignored_extensions: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            force_polling: false,
            poll_interval: 1.0,
            max_targets: 50,
            ignored_dirs: DEFAULT_IGNORED_DIRS.iter().map(|s| (*s).to_string()).collect(),
            ignored_extensions: Vec::new(),
        }
    }
}

impl WatchConfig {
    /// Polling scan interval, clamped to a sane floor.
    pub fn poll_interval_duration(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval.max(0.1))
    }

    /// Directory ceiling, clamped to `10..=5000`.
    pub fn max_targets_clamped(&self) -> usize {
        self.max_targets.clamp(10, 5000)
    }

    /// Check whether a directory name is excluded.
    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignored_dirs.iter().any(|d| d == name)
    }

    /// Check whether an extension (without dot, any case) is excluded.
    pub fn is_ignored_extension(&self, ext: &str) -> bool {
        self.ignored_extensions
            .iter()
            .any(|ignored| ignored.eq_ignore_ascii_case(ext))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::config::test_parse_config;

    #[test]
    fn test_watch_config_defaults() {
        let config = test_parse_config("");
        assert!(!config.watch.force_polling);
        assert_eq!(config.watch.poll_interval_duration(), Duration::from_secs(1));
        assert_eq!(config.watch.max_targets_clamped(), 50);
        assert!(config.watch.is_ignored_dir("node_modules"));
        assert!(config.watch.is_ignored_dir(".git"));
        assert!(!config.watch.is_ignored_dir("src"));
    }

    #[test]
    fn test_max_targets_clamped() {
        let config = test_parse_config("[watch]\nmax_targets = 2");
        assert_eq!(config.watch.max_targets_clamped(), 10);

        let config = test_parse_config("[watch]\nmax_targets = 999999");
        assert_eq!(config.watch.max_targets_clamped(), 5000);
    }

    #[test]
    fn test_poll_interval_floor() {
        let config = test_parse_config("[watch]\npoll_interval = 0.0");
        assert_eq!(config.watch.poll_interval_duration(), Duration::from_millis(100));
    }

    #[test]
    fn test_ignored_extensions() {
        let config = test_parse_config("[watch]\nignored_extensions = [\"log\", \"tmp\"]");
        assert!(config.watch.is_ignored_extension("log"));
        assert!(config.watch.is_ignored_extension("LOG"));
        assert!(!config.watch.is_ignored_extension("css"));
    }
}
