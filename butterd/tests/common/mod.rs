// SPDX-License-Identifier: GPL-3.0-only

//! In-memory stand-in for the metadata, mount and mutation providers

use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use butter_btrfs::{
    BtrfsError, EnumerationScope, FS_TREE_OBJECTID, MetadataProvider, MountEntry,
    MountTopologyProvider, Result, SubvolumeOperations, SubvolumeRecord,
};
use butterd::{Handlers, serve};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const CREATED_AT: i64 = 1_647_250_000;

#[derive(Default)]
pub struct FakeState {
    pub records: Vec<SubvolumeRecord>,
    pub mounts: Vec<MountEntry>,
    pub created_dirs: Vec<PathBuf>,
    /// Subvolume the mount-root pass starts from
    pub mount_root: String,
    next_id: u64,
}

/// Shared handle so tests can inspect state after handing clones to
/// [`Handlers`]
#[derive(Clone, Default)]
pub struct FakeSystem(pub Rc<RefCell<FakeState>>);

pub fn record(id: u64, parent_id: Option<u64>, path: &str) -> SubvolumeRecord {
    SubvolumeRecord {
        id,
        uuid: Uuid::from_u128(id as u128),
        parent_id,
        parent_uuid: Uuid::nil(),
        path: path.to_string(),
        creation_time: DateTime::<Utc>::from_timestamp(CREATED_AT, 0),
    }
}

impl FakeSystem {
    /// Top level mounted at `/` holding `/home` and `/srv`
    pub fn flat_layout() -> Self {
        Self::with(
            vec![
                record(FS_TREE_OBJECTID, None, "/"),
                record(256, Some(FS_TREE_OBJECTID), "/home"),
                record(257, Some(FS_TREE_OBJECTID), "/srv"),
            ],
            vec![MountEntry::new("/", "/dev/vda2[/]")],
        )
    }

    pub fn with(records: Vec<SubvolumeRecord>, mounts: Vec<MountEntry>) -> Self {
        let next_id = records.iter().map(|record| record.id).max().unwrap_or(256) + 1;
        Self(Rc::new(RefCell::new(FakeState {
            records,
            mounts,
            created_dirs: Vec::new(),
            mount_root: "/".to_string(),
            next_id,
        })))
    }

    pub fn handlers(&self) -> Handlers {
        Handlers::new(self.clone(), self.clone(), self.clone())
    }

    pub fn state(&self) -> std::cell::Ref<'_, FakeState> {
        self.0.borrow()
    }
}

impl MetadataProvider for FakeSystem {
    fn records(&self, scope: EnumerationScope) -> Result<Vec<SubvolumeRecord>> {
        let state = self.0.borrow();
        Ok(match scope {
            EnumerationScope::FilesystemTree => state.records.clone(),
            // libbtrfsutil only walks below the mounted subvolume
            EnumerationScope::MountRoot => state
                .records
                .iter()
                .filter(|record| below(&record.path, &state.mount_root))
                .cloned()
                .collect(),
        })
    }
}

fn below(path: &str, root: &str) -> bool {
    root == "/"
        || path == root
        || path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
}

impl MountTopologyProvider for FakeSystem {
    fn mount_tree(&self) -> Result<Vec<MountEntry>> {
        Ok(self.0.borrow().mounts.clone())
    }
}

impl SubvolumeOperations for FakeSystem {
    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.0.borrow_mut().created_dirs.push(path.to_path_buf());
        Ok(())
    }

    fn create_snapshot(&self, source: &Path, destination: &Path, _read_only: bool) -> Result<()> {
        let mut state = self.0.borrow_mut();
        let source_uuid = state
            .records
            .iter()
            .find(|record| Path::new(&record.path) == source)
            .map(|record| record.uuid)
            .ok_or_else(|| BtrfsError::SubvolumeNotFound(format!("Source {}", source.display())))?;

        let id = state.next_id;
        state.next_id += 1;
        let mut snapshot = record(id, Some(FS_TREE_OBJECTID), &destination.to_string_lossy());
        snapshot.parent_uuid = source_uuid;
        state.records.push(snapshot);
        Ok(())
    }

    fn delete_subvolume(&self, path: &Path) -> Result<()> {
        let mut state = self.0.borrow_mut();
        let before = state.records.len();
        state.records.retain(|record| Path::new(&record.path) != path);
        if state.records.len() == before {
            return Err(BtrfsError::SubvolumeNotFound(path.display().to_string()));
        }
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut state = self.0.borrow_mut();
        let record = state
            .records
            .iter_mut()
            .find(|record| Path::new(&record.path) == from)
            .ok_or_else(|| BtrfsError::Io(io::Error::from(io::ErrorKind::NotFound)))?;
        record.path = to.to_string_lossy().to_string();
        Ok(())
    }
}

/// Feed `input` to the request loop and return the loop result with every
/// reply line parsed
pub fn run(
    handlers: &Handlers,
    input: &str,
) -> (butterd::Result<()>, Vec<serde_json::Value>) {
    let mut output = Vec::new();
    let result = serve(handlers, input.as_bytes(), &mut output);
    let replies = String::from_utf8(output)
        .expect("replies are UTF-8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("reply is JSON"))
        .collect();
    (result, replies)
}
