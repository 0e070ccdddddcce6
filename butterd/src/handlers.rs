// SPDX-License-Identifier: GPL-3.0-only

use std::path::Path;

use butter_btrfs::{
    BtrfsCli, Findmnt, MetadataProvider, MountTopologyProvider, MountedPathResolver,
    SubvolumeOperations, SystemOperations, load_graph,
};
use butter_types::{Request, SubvolumeListing, format_creation_time};
use chrono::Local;
use serde_json::Value;

use crate::config::Config;
use crate::error::Result;

/// Command handlers for one daemon instance.
///
/// Every call works from fresh data: the subvolume graph is rebuilt per
/// `list_subvolumes` and nothing is cached between requests.
pub struct Handlers {
    metadata: Box<dyn MetadataProvider>,
    topology: Box<dyn MountTopologyProvider>,
    operations: Box<dyn SubvolumeOperations>,
}

impl Handlers {
    pub fn new(
        metadata: impl MetadataProvider + 'static,
        topology: impl MountTopologyProvider + 'static,
        operations: impl SubvolumeOperations + 'static,
    ) -> Self {
        Self {
            metadata: Box::new(metadata),
            topology: Box::new(topology),
            operations: Box::new(operations),
        }
    }

    /// Handlers backed by the running system
    pub fn system(config: &Config) -> Self {
        Self::new(
            BtrfsCli::new(&config.btrfs, &config.root),
            Findmnt::new(&config.findmnt),
            SystemOperations,
        )
    }

    /// Dispatch one request and build its reply
    pub fn handle(&self, request: &Request) -> Result<Value> {
        let reply = match request {
            Request::ListSubvolumes => serde_json::to_value(self.list_subvolumes()?)?,
            Request::CreateSnapshot {
                source,
                destination,
                read_only,
            } => serde_json::to_value(self.create_snapshot(source, destination, *read_only))?,
            Request::RenameSnapshot { before, after } => {
                Value::Bool(self.rename_snapshot(before, after))
            }
            Request::DeleteSnapshot { path } => Value::Bool(self.delete_snapshot(path)),
        };
        Ok(reply)
    }

    /// Every subvolume with its mounted path and snapshot origin.
    ///
    /// Fails only when the input as a whole is unusable: a malformed mount
    /// tree, a provider error or a containment cycle.
    pub fn list_subvolumes(&self) -> Result<Vec<SubvolumeListing>> {
        let graph = load_graph(self.metadata.as_ref(), self.topology.as_ref())?;
        let mut resolver = MountedPathResolver::new(&graph);

        let listings = resolver
            .resolve_all()?
            .into_iter()
            .map(|(subvolume, absolute_path)| SubvolumeListing {
                path: subvolume.path().to_string(),
                absolute_path,
                creation_time: subvolume
                    .record()
                    .creation_time
                    .map(|time| format_creation_time(&time.with_timezone(&Local))),
                snapshot_source_path: graph
                    .snapshot_origin(subvolume)
                    .map(|origin| origin.path().to_string()),
            })
            .collect();

        Ok(listings)
    }

    /// Snapshot `source` to `destination`, creating missing parent
    /// directories first. Returns the failure description, if any.
    pub fn create_snapshot(&self, source: &str, destination: &str, read_only: bool) -> Option<String> {
        tracing::info!(
            "Creating snapshot from {} to {}, readonly={}",
            source,
            destination,
            read_only
        );

        let destination = Path::new(destination);
        let result = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                self.operations.create_dir_all(parent)
            }
            _ => Ok(()),
        }
        .and_then(|()| {
            self.operations
                .create_snapshot(Path::new(source), destination, read_only)
        });

        match result {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("Snapshot of {} failed: {}", source, e);
                Some(e.to_string())
            }
        }
    }

    pub fn rename_snapshot(&self, before: &str, after: &str) -> bool {
        tracing::info!("Renaming {} to {}", before, after);

        self.operations
            .rename(Path::new(before), Path::new(after))
            .inspect_err(|e| tracing::warn!("Rename of {} failed: {}", before, e))
            .is_ok()
    }

    /// Delete a snapshot and anything nested in it. The reason for a failure
    /// is logged but not returned.
    pub fn delete_snapshot(&self, path: &str) -> bool {
        tracing::info!("Deleting snapshot at {}", path);

        self.operations
            .delete_subvolume(Path::new(path))
            .inspect_err(|e| tracing::warn!("Delete of {} failed: {}", path, e))
            .is_ok()
    }
}
