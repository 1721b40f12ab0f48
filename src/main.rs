//! liveserve - a static file server with live reload.

#![allow(dead_code)]

mod cli;
mod config;
mod embed;
mod error;
mod logger;
mod reload;
mod server;
mod utils;
mod watcher;

use std::sync::OnceLock;

use anyhow::Result;
use clap::{ColorChoice, Parser};

use cli::Cli;
use config::Config;
use server::{LiveServer, ServerHandle};

/// Server handle for the Ctrl+C handler.
static HANDLE: OnceLock<ServerHandle> = OnceLock::new();

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = Config::load(&cli)?;
    let server = LiveServer::bind(config)?;
    let _ = HANDLE.set(server.handle());

    server.run()
}

fn setup_shutdown_handler() -> Result<()> {
    ctrlc::set_handler(|| {
        if let Some(handle) = HANDLE.get() {
            crate::log!("serve"; "shutting down...");
            handle.stop();
        } else {
            // Nothing running yet, no graceful path needed
            std::process::exit(0);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}
