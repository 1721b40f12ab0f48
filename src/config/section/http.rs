//! `[http]` section configuration.
//!
//! File-serving policy for the development server.
//!
//! # Example
//!
//! ```toml
//! [http]
//! host = "127.0.0.1"      # Network interface (127.0.0.1 = localhost only)
//! port = 5500             # Port number (0 = pick any free port)
//! compression = true      # gzip text responses when the client supports it
//! cors = false            # Permissive cross-origin headers
//! max_file_size = 100     # Largest served file, in MiB
//! ```
//!
//! Use `host = "0.0.0.0"` to make the server accessible from LAN.

use std::net::{IpAddr, Ipv4Addr};

use serde::Deserialize;

/// Extensions served inline by default. Anything else is offered as a
/// download instead of rendered.
const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    "html", "htm", "css", "js", "mjs", "jsx", "tsx", "ts", "vue", "svelte", "scss", "sass", "less",
    "jpg", "jpeg", "png", "gif", "svg", "ico", "webp", "avif", "woff", "woff2", "ttf", "eot",
    "mp4", "webm", "ogg", "mp3", "wav", "pdf", "json", "xml", "map", "md", "txt",
];

/// File-serving settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub host: IpAddr,

    /// Port number. `0` asks the OS for any free port; the bound port is
    /// reported after start.
    pub port: u16,

    /// gzip text responses when the client advertises support.
    pub compression: bool,

    /// Send permissive CORS headers on every response.
    pub cors: bool,

    /// Maximum served file size in MiB; larger files get a 413.
    pub max_file_size: u64,

    /// Extensions (without dot) rendered inline; others download as
    /// attachments.
    pub allowed_extensions: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 5500,
            compression: true,
            cors: false,
            max_file_size: 100,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

impl HttpConfig {
    /// Maximum served file size in bytes.
    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_size * 1024 * 1024
    }

    /// Check whether an extension (without dot, any case) is allowed inline.
    pub fn is_allowed_extension(&self, ext: Option<&str>) -> bool {
        let Some(ext) = ext else { return false };
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }
}
