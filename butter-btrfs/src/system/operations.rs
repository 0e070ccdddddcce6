// SPDX-License-Identifier: GPL-3.0-only

use std::fs;
use std::path::Path;

use btrfsutil::subvolume::{DeleteFlags, SnapshotFlags, Subvolume};

use crate::error::{BtrfsError, Result};
use crate::provider::SubvolumeOperations;

/// Subvolume mutations through libbtrfsutil and plain filesystem calls
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOperations;

impl SubvolumeOperations for SystemOperations {
    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn create_snapshot(&self, source: &Path, destination: &Path, read_only: bool) -> Result<()> {
        let source_subvol = Subvolume::try_from(source).map_err(|e| {
            BtrfsError::SubvolumeNotFound(format!("Source {}: {}", source.display(), e))
        })?;

        let flags = if read_only {
            SnapshotFlags::READ_ONLY
        } else {
            SnapshotFlags::empty()
        };

        source_subvol.snapshot(destination, flags, None).map_err(|e| {
            BtrfsError::OperationFailed(format!(
                "Failed to create snapshot from {} to {}: {}",
                source.display(),
                destination.display(),
                e
            ))
        })?;

        Ok(())
    }

    fn delete_subvolume(&self, path: &Path) -> Result<()> {
        let subvol = Subvolume::try_from(path)
            .map_err(|e| BtrfsError::SubvolumeNotFound(format!("{}: {}", path.display(), e)))?;

        subvol.delete(DeleteFlags::RECURSIVE).map_err(|e| {
            BtrfsError::OperationFailed(format!(
                "Failed to delete subvolume at {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to)?;
        Ok(())
    }
}
