// SPDX-License-Identifier: GPL-3.0-only

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use uuid::Uuid;

use crate::error::Result;
use crate::mount::{MountMap, flatten_mount_tree};
use crate::provider::{MetadataProvider, MountTopologyProvider};
use crate::record::{EnumerationScope, SubvolumeRecord};

/// A subvolume linked into its filesystem's graph.
///
/// Links are indices into the owning [`SubvolumeGraph`]; use the graph's
/// accessors to follow them.
#[derive(Debug, Clone)]
pub struct Subvolume {
    record: SubvolumeRecord,
    containing: Option<usize>,
    origin: Option<usize>,
    explicit_mount_point: Option<String>,
}

impl Subvolume {
    pub fn record(&self) -> &SubvolumeRecord {
        &self.record
    }

    pub fn id(&self) -> u64 {
        self.record.id
    }

    pub fn path(&self) -> &str {
        &self.record.path
    }

    pub fn is_snapshot(&self) -> bool {
        self.record.is_snapshot()
    }

    /// Mount target recorded for this exact subvolume, if any
    pub fn explicit_mount_point(&self) -> Option<&str> {
        self.explicit_mount_point.as_deref()
    }
}

/// Containment forest and snapshot lineage of one enumeration.
///
/// Built once per request and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct SubvolumeGraph {
    subvolumes: Vec<Subvolume>,
    by_id: HashMap<u64, usize>,
    by_uuid: HashMap<Uuid, usize>,
}

impl SubvolumeGraph {
    /// Link `records` into a graph and attach mount points from `mounts`.
    ///
    /// Never fails: a record whose parent or snapshot origin is unknown keeps
    /// that link absent, and a record repeating an id already seen is
    /// dropped.
    pub fn build(records: Vec<SubvolumeRecord>, mounts: &MountMap) -> Self {
        let mut graph = Self::default();

        for record in records {
            if graph.by_id.contains_key(&record.id) {
                tracing::warn!("Duplicate subvolume id {} at {}, ignoring", record.id, record.path);
                continue;
            }

            let index = graph.subvolumes.len();
            graph.by_id.insert(record.id, index);

            if !record.uuid.is_nil() {
                match graph.by_uuid.entry(record.uuid) {
                    Entry::Occupied(existing) => tracing::warn!(
                        "Subvolume {} shares uuid {} with subvolume {}",
                        record.id,
                        record.uuid,
                        graph.subvolumes[*existing.get()].id()
                    ),
                    Entry::Vacant(slot) => {
                        slot.insert(index);
                    }
                }
            }

            let explicit_mount_point = mounts.get(&record.path).cloned();
            graph.subvolumes.push(Subvolume {
                record,
                containing: None,
                origin: None,
                explicit_mount_point,
            });
        }

        for index in 0..graph.subvolumes.len() {
            let record = &graph.subvolumes[index].record;

            let containing = record
                .parent_id
                .and_then(|parent_id| graph.by_id.get(&parent_id).copied());
            if containing.is_none() && record.parent_id.is_some() {
                tracing::debug!(
                    "Containing subvolume {:?} of {} is outside the enumeration",
                    record.parent_id,
                    record.path
                );
            }

            let origin = if record.is_snapshot() {
                let origin = graph.by_uuid.get(&record.parent_uuid).copied();
                if origin.is_none() {
                    tracing::warn!(
                        "Snapshot origin {} of {} not found",
                        record.parent_uuid,
                        record.path
                    );
                }
                origin
            } else {
                None
            };

            let subvolume = &mut graph.subvolumes[index];
            subvolume.containing = containing;
            subvolume.origin = origin;
        }

        graph
    }

    pub fn len(&self) -> usize {
        self.subvolumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subvolumes.is_empty()
    }

    /// Subvolumes in enumeration order
    pub fn iter(&self) -> impl Iterator<Item = &Subvolume> {
        self.subvolumes.iter()
    }

    pub fn get(&self, id: u64) -> Option<&Subvolume> {
        self.by_id.get(&id).map(|&index| &self.subvolumes[index])
    }

    pub fn get_by_uuid(&self, uuid: &Uuid) -> Option<&Subvolume> {
        self.by_uuid.get(uuid).map(|&index| &self.subvolumes[index])
    }

    pub fn containing_subvolume(&self, subvolume: &Subvolume) -> Option<&Subvolume> {
        subvolume.containing.map(|index| &self.subvolumes[index])
    }

    /// The subvolume `subvolume` was snapshotted from, when it is a snapshot
    /// and its origin was enumerated in the same pass
    pub fn snapshot_origin(&self, subvolume: &Subvolume) -> Option<&Subvolume> {
        subvolume.origin.map(|index| &self.subvolumes[index])
    }
}

/// Combine the two enumeration passes into one record list.
///
/// The filesystem-tree pass decides which subvolumes exist and what their
/// canonical paths are. Uuids and creation times come from the mount-root
/// pass where it saw the same id, falling back to what the filesystem-tree
/// pass knew. Subvolumes only the mount-root pass saw are left out.
pub fn merge_scopes(
    filesystem_tree: Vec<SubvolumeRecord>,
    mount_root: Vec<SubvolumeRecord>,
) -> Vec<SubvolumeRecord> {
    let mut mount_root: HashMap<u64, SubvolumeRecord> = mount_root
        .into_iter()
        .map(|record| (record.id, record))
        .collect();

    let merged: Vec<SubvolumeRecord> = filesystem_tree
        .into_iter()
        .map(|mut record| {
            if let Some(seen) = mount_root.remove(&record.id) {
                if !seen.uuid.is_nil() {
                    record.uuid = seen.uuid;
                }
                if seen.is_snapshot() {
                    record.parent_uuid = seen.parent_uuid;
                }
                record.creation_time = seen.creation_time.or(record.creation_time);
            }
            record
        })
        .collect();

    for record in mount_root.values() {
        tracing::debug!(
            "Subvolume {} ({}) only seen below the mount root, skipping",
            record.id,
            record.path
        );
    }

    merged
}

/// Run both metadata passes and the mount topology query, then build the
/// graph
pub fn load_graph<M, T>(metadata: &M, topology: &T) -> Result<SubvolumeGraph>
where
    M: MetadataProvider + ?Sized,
    T: MountTopologyProvider + ?Sized,
{
    let mounts = flatten_mount_tree(&topology.mount_tree()?)?;
    let filesystem_tree = metadata.records(EnumerationScope::FilesystemTree)?;
    let mount_root = metadata.records(EnumerationScope::MountRoot)?;

    let graph = SubvolumeGraph::build(merge_scopes(filesystem_tree, mount_root), &mounts);
    tracing::debug!(
        "Built subvolume graph with {} subvolumes and {} mount points",
        graph.len(),
        mounts.len()
    );

    Ok(graph)
}
