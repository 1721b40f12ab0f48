//! Server configuration management for `liveserve.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/          # Configuration section definitions
//! │   ├── http          # [http] file serving policy
//! │   ├── watch         # [watch] change detection
//! │   ├── reload        # [reload] live-reload behaviour
//! │   └── connections   # [connections] limits and worker pool
//! └── mod.rs            # Config (this file)
//! ```
//!
//! # Sections
//!
//! | Section         | Purpose                                          |
//! |-----------------|--------------------------------------------------|
//! | `roots`         | Ordered directories served and watched           |
//! | `[http]`        | host, port, compression, cors, size/type policy  |
//! | `[watch]`       | polling, target ceiling, ignore lists            |
//! | `[reload]`      | client injection, css refresh, debounce          |
//! | `[connections]` | concurrency cap, worker threads, idle timeout    |

pub mod section;

pub use section::{
    connections::ConnectionsConfig, http::HttpConfig, reload::ReloadConfig, watch::WatchConfig,
};

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::{cli::Cli, log, utils::fs::normalize_path};

/// Root configuration structure representing liveserve.toml
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Absolute path to the config file, when one was found (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Directories served and watched, in resolution order. Requests are
    /// answered from the first root containing the path.
    pub roots: Vec<PathBuf>,

    /// File serving settings
    pub http: HttpConfig,

    /// Change detection settings
    pub watch: WatchConfig,

    /// Live-reload settings
    pub reload: ReloadConfig,

    /// Connection limit settings
    pub connections: ConnectionsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: None,
            roots: Vec::new(),
            http: HttpConfig::default(),
            watch: WatchConfig::default(),
            reload: ReloadConfig::default(),
            connections: ConnectionsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd for the config file; a missing file is not
    /// an error, defaults apply. CLI options override file values.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = match find_config_file(&cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.config_path = Some(path);
                config
            }
            None => Self::default(),
        };

        config.finalize(cli)?;
        Ok(config)
    }

    /// Apply CLI overrides, expand and normalize roots, validate.
    fn finalize(&mut self, cli: &Cli) -> Result<()> {
        if !cli.roots.is_empty() {
            self.roots = cli.roots.clone();
        }
        if self.roots.is_empty() {
            self.roots.push(PathBuf::from("."));
        }

        if let Some(host) = cli.host {
            self.http.host = host;
        }
        if let Some(port) = cli.port {
            self.http.port = port;
        }
        if cli.no_reload {
            self.reload.enabled = false;
        }
        if cli.poll {
            self.watch.force_polling = true;
        }

        // Tilde-expand, absolutize, canonicalize each root
        self.roots = self
            .roots
            .iter()
            .map(|root| {
                let expanded =
                    shellexpand::tilde(root.to_str().unwrap_or_default()).into_owned();
                normalize_path(Path::new(&expanded))
            })
            .collect();

        for root in &self.roots {
            if !root.is_dir() {
                bail!(crate::error::ServerError::InvalidRoot(root.clone()));
            }
        }

        Ok(())
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {field}");
        }
    }
}

/// Search upward from cwd for the config file.
fn find_config_file(name: &Path) -> Option<PathBuf> {
    if name.is_absolute() {
        return name.exists().then(|| name.to_path_buf());
    }

    let mut dir = std::env::current_dir().ok()?;
    loop {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse a config snippet on top of defaults.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> Config {
    let (parsed, ignored) = Config::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("[http\nport = 8080");
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults_without_file() {
        let config = Config::default();
        assert!(config.roots.is_empty());
        assert_eq!(config.http.port, 5500);
        assert!(config.reload.enabled);
    }

    #[test]
    fn test_roots_parsed_in_order() {
        let config = test_parse_config("roots = [\"public\", \"assets\"]");
        assert_eq!(config.roots, vec![PathBuf::from("public"), PathBuf::from("assets")]);
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[http]\nport = 8080\n[unknown_section]\nfield = \"value\"";
        let (config, ignored) = Config::parse_with_ignored(content).unwrap();

        assert_eq!(config.http.port, 8080);
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_no_unknown_fields() {
        let (_, ignored) = Config::parse_with_ignored("[reload]\ndebounce_ms = 50").unwrap();
        assert!(ignored.is_empty());
    }

    #[test]
    fn test_finalize_rejects_missing_root() {
        let cli = Cli::for_tests(vec![PathBuf::from("/nonexistent/liveserve-test-root")]);
        let mut config = Config::default();
        assert!(config.finalize(&cli).is_err());
    }

    #[test]
    fn test_finalize_defaults_to_cwd() {
        let cli = Cli::for_tests(Vec::new());
        let mut config = Config::default();
        config.finalize(&cli).unwrap();
        assert_eq!(config.roots.len(), 1);
        assert!(config.roots[0].is_absolute());
    }
}
