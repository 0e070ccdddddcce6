// SPDX-License-Identifier: GPL-3.0-only

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Object id of the filesystem top-level subvolume
pub const FS_TREE_OBJECTID: u64 = 5;

/// Which part of the filesystem a metadata pass enumerates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumerationScope {
    /// Everything below the filesystem top level, with canonical paths
    FilesystemTree,
    /// Subvolumes visible below the currently mounted root
    MountRoot,
}

/// Raw metadata of one subvolume as reported by a metadata provider
///
/// A nil `uuid` or `parent_uuid` stands for "no value"; a nil `parent_uuid`
/// means the subvolume is not a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubvolumeRecord {
    pub id: u64,
    pub uuid: Uuid,
    pub parent_id: Option<u64>,
    pub parent_uuid: Uuid,
    /// Path relative to the filesystem top level, starting with `/`
    pub path: String,
    pub creation_time: Option<DateTime<Utc>>,
}

impl SubvolumeRecord {
    pub fn is_snapshot(&self) -> bool {
        !self.parent_uuid.is_nil()
    }
}
