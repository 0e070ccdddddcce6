// SPDX-License-Identifier: GPL-3.0-only

use std::collections::{HashMap, HashSet};

use crate::error::{BtrfsError, Result};
use crate::graph::{Subvolume, SubvolumeGraph};
use crate::path::{join_under, strip_path_prefix};

/// Works out where each subvolume of a graph is reachable.
///
/// A subvolume with its own mount point is reachable there. Otherwise it is
/// reachable below its containing subvolume's mounted path, or nowhere when
/// no ancestor is mounted. Results are memoized per subvolume id, so asking
/// twice is cheap and always gives the same answer.
pub struct MountedPathResolver<'g> {
    graph: &'g SubvolumeGraph,
    resolved: HashMap<u64, Option<String>>,
    // Ids whose whole chain of containing subvolumes ends at a root
    acyclic: HashSet<u64>,
}

impl<'g> MountedPathResolver<'g> {
    pub fn new(graph: &'g SubvolumeGraph) -> Self {
        Self {
            graph,
            resolved: HashMap::with_capacity(graph.len()),
            acyclic: HashSet::with_capacity(graph.len()),
        }
    }

    /// Absolute path of subvolume `id`, `None` when it is unreachable.
    ///
    /// Fails with [`BtrfsError::ContainmentCycle`] when following containing
    /// subvolumes leads back to one already visited, even when a mount point
    /// on the way would have answered the question.
    pub fn mounted_path(&mut self, id: u64) -> Result<Option<String>> {
        let graph = self.graph;
        let mut current = graph
            .get(id)
            .ok_or_else(|| BtrfsError::SubvolumeNotFound(format!("id {id}")))?;
        self.check_containment(current)?;

        // Climb until something already answers the question, remembering
        // the way back down.
        let mut chain: Vec<&'g Subvolume> = Vec::new();
        let mut mounted = loop {
            if let Some(known) = self.resolved.get(&current.id()) {
                break known.clone();
            }
            if let Some(mount_point) = current.explicit_mount_point() {
                let mounted = Some(mount_point.to_string());
                self.resolved.insert(current.id(), mounted.clone());
                break mounted;
            }
            match graph.containing_subvolume(current) {
                Some(parent) => {
                    chain.push(current);
                    current = parent;
                }
                None => {
                    self.resolved.insert(current.id(), None);
                    break None;
                }
            }
        };

        let mut parent = current;
        while let Some(child) = chain.pop() {
            mounted = mounted.and_then(|mount_point| below_parent(parent, child, &mount_point));
            self.resolved.insert(child.id(), mounted.clone());
            parent = child;
        }

        Ok(mounted)
    }

    /// Walk every containing subvolume above `start` up to a root
    fn check_containment(&mut self, start: &'g Subvolume) -> Result<()> {
        let graph = self.graph;
        let mut visiting = Vec::new();
        let mut current = Some(start);

        while let Some(subvolume) = current {
            if self.acyclic.contains(&subvolume.id()) {
                break;
            }
            if visiting.contains(&subvolume.id()) {
                return Err(BtrfsError::ContainmentCycle(subvolume.id()));
            }
            visiting.push(subvolume.id());
            current = graph.containing_subvolume(subvolume);
        }

        self.acyclic.extend(visiting);
        Ok(())
    }

    /// Resolve every subvolume, in enumeration order
    pub fn resolve_all(&mut self) -> Result<Vec<(&'g Subvolume, Option<String>)>> {
        let graph = self.graph;
        graph
            .iter()
            .map(|subvolume| Ok((subvolume, self.mounted_path(subvolume.id())?)))
            .collect()
    }
}

fn below_parent(parent: &Subvolume, child: &Subvolume, parent_mount: &str) -> Option<String> {
    match strip_path_prefix(child.path(), parent.path()) {
        Some(relative) => Some(join_under(parent_mount, relative)),
        None => {
            tracing::warn!(
                "Subvolume {} is not below its containing subvolume {}",
                child.path(),
                parent.path()
            );
            None
        }
    }
}
