// SPDX-License-Identifier: GPL-3.0-only

//! Btrfs subvolume relationship and mount path resolution
//!
//! Given raw per-subvolume metadata and the live mount topology, this crate
//! rebuilds the containment forest and snapshot lineage of a filesystem and
//! works out where each subvolume is reachable. The live system sits behind
//! the traits in [`provider`]; everything else is a pure function of what
//! those traits return.

pub mod error;
pub mod graph;
pub mod mount;
pub mod path;
pub mod provider;
pub mod record;
pub mod resolve;
pub mod system;

// Re-export commonly used types
pub use error::{BtrfsError, Result};
pub use graph::{Subvolume, SubvolumeGraph, load_graph, merge_scopes};
pub use mount::{MountEntry, MountMap, flatten_mount_tree, subvolume_path_of_source};
pub use provider::{MetadataProvider, MountTopologyProvider, SubvolumeOperations};
pub use record::{EnumerationScope, FS_TREE_OBJECTID, SubvolumeRecord};
pub use resolve::MountedPathResolver;
pub use system::{BtrfsCli, Findmnt, SystemOperations};
