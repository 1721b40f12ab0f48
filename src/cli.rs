//! Command-line interface definitions.

use clap::{ColorChoice, Parser};
use std::{net::IpAddr, path::PathBuf};

/// Live-reload development server CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directories to serve, in resolution order (default: current directory)
    #[arg(value_name = "ROOT", value_hint = clap::ValueHint::DirPath)]
    pub roots: Vec<PathBuf>,

    /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
    #[arg(short = 'H', long)]
    pub host: Option<IpAddr>,

    /// Port number to listen on (0 picks any free port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Config file path (default: liveserve.toml, searched upward from cwd)
    #[arg(short = 'C', long, default_value = "liveserve.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Enable verbose debug output
    #[arg(short, long)]
    pub verbose: bool,

    /// Serve files without injecting the live-reload client
    #[arg(long)]
    pub no_reload: bool,

    /// Use the polling watch strategy instead of native OS notifications
    #[arg(long)]
    pub poll: bool,
}

#[cfg(test)]
impl Cli {
    /// Construct a Cli with the given roots and defaults everywhere else.
    pub fn for_tests(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            host: None,
            port: None,
            config: PathBuf::from("liveserve.toml"),
            color: ColorChoice::Auto,
            verbose: false,
            no_reload: false,
            poll: false,
        }
    }
}
