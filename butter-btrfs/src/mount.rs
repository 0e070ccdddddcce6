// SPDX-License-Identifier: GPL-3.0-only

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{BtrfsError, Result};

/// Subvolume-relative path to the absolute path it is mounted at
pub type MountMap = HashMap<String, String>;

/// Top-level document printed by `findmnt --json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindmntOutput {
    #[serde(default)]
    pub filesystems: Vec<MountEntry>,
}

/// One node of the mount tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountEntry {
    pub target: String,
    /// Device path with the mounted subvolume in brackets, e.g.
    /// `/dev/vda2[/@/home]`
    pub source: String,
    #[serde(default)]
    pub fstype: Option<String>,
    #[serde(default)]
    pub options: Option<String>,
    /// Subvolume path when `source` was printed without it
    #[serde(default)]
    pub fsroot: Option<String>,
    #[serde(default)]
    pub children: Vec<MountEntry>,
}

impl MountEntry {
    pub fn new(target: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn with_children(mut self, children: Vec<MountEntry>) -> Self {
        self.children = children;
        self
    }
}

/// Extract the bracketed subvolume path from a mount source
pub fn subvolume_path_of_source(source: &str) -> Result<&str> {
    source
        .strip_suffix(']')
        .and_then(|rest| rest.find('[').map(|open| &rest[open + 1..]))
        .filter(|path| !path.is_empty())
        .ok_or_else(|| BtrfsError::MalformedMountSource(source.to_string()))
}

/// Flatten a mount tree into a [`MountMap`].
///
/// Every node contributes one entry keyed by its own bracketed path, so the
/// result does not depend on traversal order. A later node with the same
/// subvolume path replaces an earlier one. Any source without a bracketed
/// path fails the whole operation.
pub fn flatten_mount_tree(roots: &[MountEntry]) -> Result<MountMap> {
    let mut mounts = MountMap::new();
    let mut pending: Vec<&MountEntry> = roots.iter().rev().collect();

    while let Some(entry) = pending.pop() {
        let subvolume_path = subvolume_path_of_source(&entry.source)?;
        if let Some(previous) = mounts.insert(subvolume_path.to_string(), entry.target.clone()) {
            tracing::debug!(
                "{} mounted again at {}, dropping {}",
                subvolume_path,
                entry.target,
                previous
            );
        }
        pending.extend(entry.children.iter().rev());
    }

    Ok(mounts)
}
