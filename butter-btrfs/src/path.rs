// SPDX-License-Identifier: GPL-3.0-only

//! Lexical path helpers. Nothing here touches the filesystem.

/// Collapse repeated separators, drop `.` and resolve `..` segments.
///
/// `..` never climbs above the root of an absolute path. An absolute path
/// that normalizes to nothing is `/`.
pub fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Strip `prefix` from `path` on a component boundary.
///
/// Returns the remainder without a leading separator, or `None` when `path`
/// does not live under `prefix`.
pub fn strip_path_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let prefix = prefix.trim_end_matches('/');
    let rest = path.strip_prefix(prefix)?;

    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix('/').map(|rest| rest.trim_start_matches('/'))
    }
}

/// Re-root `relative` under `mount_point`
pub fn join_under(mount_point: &str, relative: &str) -> String {
    normalize(&format!("{mount_point}/{relative}"))
}
