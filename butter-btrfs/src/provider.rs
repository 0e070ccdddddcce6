// SPDX-License-Identifier: GPL-3.0-only

//! Seams to the live system.
//!
//! The graph and resolver only ever see what these traits return, so tests
//! can drive them with fixed data and no mounted filesystem.

use std::path::Path;

use crate::error::Result;
use crate::mount::MountEntry;
use crate::record::{EnumerationScope, SubvolumeRecord};

/// Source of raw subvolume metadata
pub trait MetadataProvider {
    fn records(&self, scope: EnumerationScope) -> Result<Vec<SubvolumeRecord>>;
}

/// Source of the nested mount tree
pub trait MountTopologyProvider {
    fn mount_tree(&self) -> Result<Vec<MountEntry>>;
}

/// Filesystem mutations used by the snapshot commands.
///
/// Each call is expected to be atomic at the filesystem level and is tried
/// exactly once.
pub trait SubvolumeOperations {
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    fn create_snapshot(&self, source: &Path, destination: &Path, read_only: bool) -> Result<()>;

    /// Delete a subvolume together with any subvolumes nested below it
    fn delete_subvolume(&self, path: &Path) -> Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
}
