// SPDX-License-Identifier: GPL-3.0-only

//! Providers backed by the running system

mod findmnt;
mod list;
mod operations;

pub use findmnt::Findmnt;
pub use list::{BtrfsCli, parse_subvolume_list};
pub use operations::SystemOperations;

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{BtrfsError, Result};

/// Resolve `program` against `PATH` unless it already names a file
pub(crate) fn locate_program(program: &Path) -> Result<PathBuf> {
    if program.is_absolute() {
        return Ok(program.to_path_buf());
    }

    which::which(program).map_err(|e| {
        BtrfsError::CommandFailed(format!("{} not found: {}", program.display(), e))
    })
}

pub(crate) fn run_capture<I, S>(program: &Path, args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program = locate_program(program)?;
    let output = Command::new(&program)
        .args(args)
        .output()
        .map_err(|e| {
            BtrfsError::CommandFailed(format!("Failed to run {}: {}", program.display(), e))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BtrfsError::CommandFailed(format!(
            "{} failed: {}",
            program.display(),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
