// SPDX-License-Identifier: GPL-3.0-only

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use btrfsutil::subvolume::{Subvolume, SubvolumeIterator};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{BtrfsError, Result};
use crate::provider::MetadataProvider;
use crate::record::{EnumerationScope, FS_TREE_OBJECTID, SubvolumeRecord};

use super::run_capture;

/// Subvolume metadata from the `btrfs` tool and libbtrfsutil
///
/// The filesystem-tree pass runs `btrfs subvolume list`, which names every
/// subvolume relative to the top level no matter what is mounted where, and
/// reads each creation time with `btrfs subvolume show`. The mount-root pass
/// walks the subvolumes below `root` with libbtrfsutil.
#[derive(Debug, Clone)]
pub struct BtrfsCli {
    program: PathBuf,
    root: PathBuf,
}

impl BtrfsCli {
    pub fn new<P: Into<PathBuf>, R: Into<PathBuf>>(program: P, root: R) -> Self {
        Self {
            program: program.into(),
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn filesystem_tree(&self) -> Result<Vec<SubvolumeRecord>> {
        let stdout = run_capture(
            &self.program,
            [
                OsStr::new("subvolume"),
                OsStr::new("list"),
                OsStr::new("-a"),
                OsStr::new("-p"),
                OsStr::new("-u"),
                OsStr::new("-q"),
                OsStr::new("-R"),
                self.root.as_os_str(),
            ],
        )?;

        // The top level is never listed by the tool
        let mut records = vec![SubvolumeRecord {
            id: FS_TREE_OBJECTID,
            uuid: Uuid::nil(),
            parent_id: None,
            parent_uuid: Uuid::nil(),
            path: "/".to_string(),
            creation_time: None,
        }];
        records.extend(parse_subvolume_list(&stdout));

        for record in &mut records {
            record.creation_time = self.creation_time(record.id);
        }

        Ok(records)
    }

    /// Creation time of subvolume `id`, looked up by id so it works for
    /// subvolumes that are not mounted anywhere
    fn creation_time(&self, id: u64) -> Option<DateTime<Utc>> {
        let id = id.to_string();
        let stdout = run_capture(
            &self.program,
            [
                OsStr::new("subvolume"),
                OsStr::new("show"),
                OsStr::new("-r"),
                OsStr::new(&id),
                self.root.as_os_str(),
            ],
        );

        match stdout {
            Ok(stdout) => parse_creation_time(&stdout),
            Err(e) => {
                tracing::warn!("No creation time for subvolume {}: {}", id, e);
                None
            }
        }
    }

    fn mount_root(&self) -> Result<Vec<SubvolumeRecord>> {
        let root = Subvolume::try_from(self.root.as_path()).map_err(|e| {
            BtrfsError::SubvolumeNotFound(format!("{}: {}", self.root.display(), e))
        })?;

        let mut records = vec![record_from_subvolume(&root)?];

        let iter = SubvolumeIterator::try_from(&root).map_err(|e| {
            BtrfsError::OperationFailed(format!(
                "Failed to enumerate subvolumes below {}: {}",
                self.root.display(),
                e
            ))
        })?;

        for item in iter {
            let subvolume = match item {
                Ok(subvolume) => subvolume,
                Err(e) => {
                    tracing::warn!("Skipping subvolume below {}: {}", self.root.display(), e);
                    continue;
                }
            };
            match record_from_subvolume(&subvolume) {
                Ok(record) => records.push(record),
                // Deleted since the iterator saw it
                Err(e) => tracing::warn!("Skipping {}: {}", subvolume.path().display(), e),
            }
        }

        Ok(records)
    }
}

impl MetadataProvider for BtrfsCli {
    fn records(&self, scope: EnumerationScope) -> Result<Vec<SubvolumeRecord>> {
        match scope {
            EnumerationScope::FilesystemTree => self.filesystem_tree(),
            EnumerationScope::MountRoot => self.mount_root(),
        }
    }
}

fn record_from_subvolume(subvolume: &Subvolume) -> Result<SubvolumeRecord> {
    let info = subvolume.info().map_err(|e| {
        BtrfsError::OperationFailed(format!(
            "Failed to get subvolume info for {}: {}",
            subvolume.path().display(),
            e
        ))
    })?;

    Ok(SubvolumeRecord {
        id: info.id,
        uuid: Uuid::from_bytes(*info.uuid.as_bytes()),
        parent_id: info.parent_id,
        parent_uuid: info
            .parent_uuid
            .map(|parent_uuid| Uuid::from_bytes(*parent_uuid.as_bytes()))
            .unwrap_or_else(Uuid::nil),
        path: subvolume.path().to_string_lossy().to_string(),
        creation_time: DateTime::from_timestamp(info.otime.timestamp(), 0),
    })
}

/// Parse `btrfs subvolume list -a -p -u -q -R` output.
///
/// Lines look like
/// `ID 257 gen 9 parent 5 top level 5 parent_uuid - received_uuid - uuid <uuid> path <FS_TREE>/@home`.
/// Unparsable lines are skipped, `-` stands for a nil uuid and paths are
/// made absolute with respect to the top level.
pub fn parse_subvolume_list(output: &str) -> Vec<SubvolumeRecord> {
    let mut records = Vec::new();

    for line in output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.first() != Some(&"ID") {
            continue;
        }

        let id = value_after(&parts, "ID").and_then(|value| value.parse::<u64>().ok());
        let path_idx = parts.iter().position(|&part| part == "path");
        let (Some(id), Some(path_idx)) = (id, path_idx) else {
            tracing::warn!("Unparsable subvolume list line: {}", line);
            continue;
        };

        // Everything after "path", spaces included
        let path = line
            .split_once(" path ")
            .map(|(_, path)| path.to_string())
            .unwrap_or_else(|| parts[path_idx + 1..].join(" "));

        records.push(SubvolumeRecord {
            id,
            uuid: uuid_after(&parts, "uuid"),
            parent_id: value_after(&parts, "parent").and_then(|value| value.parse().ok()),
            parent_uuid: uuid_after(&parts, "parent_uuid"),
            path: canonical_path(&path),
            creation_time: None,
        });
    }

    if records.is_empty() {
        tracing::debug!("No subvolumes listed besides the top level");
    }

    records
}

/// Pull the `Creation time:` field out of `btrfs subvolume show` output.
///
/// The top level shows `-` there, which comes back as `None`.
pub fn parse_creation_time(output: &str) -> Option<DateTime<Utc>> {
    let value = output
        .lines()
        .find_map(|line| line.trim().strip_prefix("Creation time:"))?
        .trim();
    if value == "-" {
        return None;
    }

    match DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S %z") {
        Ok(time) => Some(time.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!("Invalid creation time '{}': {}", value, e);
            None
        }
    }
}

fn value_after<'a>(parts: &[&'a str], keyword: &str) -> Option<&'a str> {
    parts
        .iter()
        .position(|&part| part == keyword)
        .and_then(|idx| parts.get(idx + 1).copied())
}

fn uuid_after(parts: &[&str], keyword: &str) -> Uuid {
    match value_after(parts, keyword) {
        None | Some("-") => Uuid::nil(),
        Some(value) => Uuid::parse_str(value).unwrap_or_else(|e| {
            tracing::warn!("Invalid {} '{}': {}", keyword, value, e);
            Uuid::nil()
        }),
    }
}

fn canonical_path(path: &str) -> String {
    let relative = path.strip_prefix("<FS_TREE>").unwrap_or(path);
    format!("/{}", relative.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST_OUTPUT: &str = "\
ID 256 gen 3120 parent 5 top level 5 parent_uuid - received_uuid - uuid 6a4d5c8e-0b4c-4c4e-9d0a-1f2e3d4c5b6a path <FS_TREE>/@
ID 257 gen 3121 parent 256 top level 256 parent_uuid - received_uuid - uuid 1c2b3a49-5d6e-4f70-8192-a3b4c5d6e7f8 path @/home
ID 300 gen 3122 parent 5 top level 5 parent_uuid 1c2b3a49-5d6e-4f70-8192-a3b4c5d6e7f8 received_uuid - uuid 9f8e7d6c-5b4a-4392-8170-6f5e4d3c2b1a path <FS_TREE>/snapshots/home 2022-03-14
";

    #[test]
    fn parses_ids_parents_and_uuids() {
        let records = parse_subvolume_list(LIST_OUTPUT);

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id, 256);
        assert_eq!(records[0].parent_id, Some(5));
        assert_eq!(records[0].path, "/@");
        assert!(records[0].parent_uuid.is_nil());
        assert_eq!(
            records[0].uuid,
            Uuid::parse_str("6a4d5c8e-0b4c-4c4e-9d0a-1f2e3d4c5b6a").unwrap()
        );

        assert_eq!(records[1].parent_id, Some(256));
        assert_eq!(records[1].path, "/@/home");

        assert!(records[2].is_snapshot());
        assert_eq!(records[2].parent_uuid, records[1].uuid);
        assert_eq!(records[2].path, "/snapshots/home 2022-03-14");
    }

    #[test]
    fn skips_noise_and_broken_lines() {
        let records = parse_subvolume_list(
            "WARNING: something\nID x gen 1 path foo\nID 260 gen 1 parent 5 uuid not-a-uuid path data\n",
        );

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 260);
        assert!(records[0].uuid.is_nil());
        assert_eq!(records[0].path, "/data");
    }

    const SHOW_OUTPUT: &str = "\
@home
\tName: \t\t\t@home
\tUUID: \t\t\t1c2b3a49-5d6e-4f70-8192-a3b4c5d6e7f8
\tParent UUID: \t\t-
\tReceived UUID: \t\t-
\tCreation time: \t\t2022-03-14 10:26:40 +0100
\tSubvolume ID: \t\t257
\tGeneration: \t\t3121
";

    #[test]
    fn reads_creation_time_from_show_output() {
        let created = parse_creation_time(SHOW_OUTPUT).unwrap();
        assert_eq!(created, DateTime::<Utc>::from_timestamp(1_647_250_000, 0).unwrap());
    }

    #[test]
    fn top_level_and_garbage_have_no_creation_time() {
        assert_eq!(parse_creation_time("/\n\tCreation time: \t\t-\n"), None);
        assert_eq!(parse_creation_time("\tCreation time: \t\tyesterday\n"), None);
        assert_eq!(parse_creation_time(""), None);
    }
}
