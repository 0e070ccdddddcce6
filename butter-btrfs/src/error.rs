// SPDX-License-Identifier: GPL-3.0-only

use thiserror::Error;

/// Error types for subvolume enumeration and operations
#[derive(Error, Debug)]
pub enum BtrfsError {
    #[error("Mount source has no bracketed subvolume path: {0}")]
    MalformedMountSource(String),

    #[error("Containment cycle detected at subvolume {0}")]
    ContainmentCycle(u64),

    #[error("Subvolume not found: {0}")]
    SubvolumeNotFound(String),

    #[error("BTRFS operation failed: {0}")]
    OperationFailed(String),

    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for BTRFS operations
pub type Result<T> = std::result::Result<T, BtrfsError>;
