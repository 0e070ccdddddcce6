// SPDX-License-Identifier: GPL-3.0-only

use butter_types::RequestError;
use thiserror::Error;

/// Errors that end the daemon
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("Bad Request: {line}: {source}")]
    BadRequest {
        line: String,
        #[source]
        source: RequestError,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Btrfs(#[from] butter_btrfs::BtrfsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DaemonError>;
