// SPDX-License-Identifier: GPL-3.0-only

use std::io;

use anyhow::{Context, Result};
use butterd::{Cli, Config, Handlers, serve};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_cli(&cli).context("failed to load configuration")?;

    // stdout carries the protocol, so logs go to stderr
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(io::stderr)
        .init();

    tracing::info!(
        "Starting butterd v{} on {}",
        env!("CARGO_PKG_VERSION"),
        config.root.display()
    );

    let handlers = Handlers::system(&config);
    let stdin = io::stdin();
    let stdout = io::stdout();

    serve(&handlers, stdin.lock(), stdout.lock()).map_err(|e| {
        tracing::error!("{}", e);
        anyhow::Error::new(e)
    })
}
