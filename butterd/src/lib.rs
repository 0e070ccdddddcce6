// SPDX-License-Identifier: GPL-3.0-only

//! butterd - btrfs snapshot daemon
//!
//! Reads one JSON request per line on stdin and answers with one JSON value
//! per line on stdout. Diagnostics go to stderr.

pub mod config;
pub mod error;
pub mod handlers;
pub mod server;

pub use config::{Cli, Config, FileConfig};
pub use error::{DaemonError, Result};
pub use handlers::Handlers;
pub use server::serve;
