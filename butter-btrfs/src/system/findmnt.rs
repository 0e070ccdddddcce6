// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use crate::error::Result;
use crate::mount::{FindmntOutput, MountEntry};
use crate::provider::MountTopologyProvider;

use super::run_capture;

/// Mount topology from `findmnt --json`
#[derive(Debug, Clone)]
pub struct Findmnt {
    program: PathBuf,
}

impl Findmnt {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for Findmnt {
    fn default() -> Self {
        Self::new("findmnt")
    }
}

impl MountTopologyProvider for Findmnt {
    fn mount_tree(&self) -> Result<Vec<MountEntry>> {
        let stdout = run_capture(
            &self.program,
            [
                "--json",
                "--types",
                "btrfs",
                "--output",
                "TARGET,SOURCE,FSTYPE,OPTIONS,FSROOT",
            ],
        )?;

        // findmnt prints nothing at all when no btrfs filesystem is mounted
        if stdout.trim().is_empty() {
            return Ok(Vec::new());
        }

        parse_findmnt(&stdout)
    }
}

/// Parse `findmnt --json` output.
///
/// With `FSROOT` among the columns findmnt leaves the subvolume out of
/// `SOURCE`; it is folded back in as `device[fsroot]`.
pub(crate) fn parse_findmnt(json: &str) -> Result<Vec<MountEntry>> {
    let mut output: FindmntOutput = serde_json::from_str(json)?;
    output.filesystems.iter_mut().for_each(bracket_sources);
    Ok(output.filesystems)
}

fn bracket_sources(entry: &mut MountEntry) {
    if !entry.source.ends_with(']')
        && let Some(fsroot) = &entry.fsroot
    {
        entry.source = format!("{}[{}]", entry.source, fsroot);
    }
    entry.children.iter_mut().for_each(bracket_sources);
}
