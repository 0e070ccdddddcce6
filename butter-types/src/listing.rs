// SPDX-License-Identifier: GPL-3.0-only

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Layout of `creation_time` in a listing, local time to the minute
pub const CREATION_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One entry of the `list_subvolumes` reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubvolumeListing {
    /// Path relative to the filesystem top level, always starting with `/`
    pub path: String,

    /// Where the subvolume is reachable right now, `None` when no mount
    /// point leads to it
    pub absolute_path: Option<String>,

    pub creation_time: Option<String>,

    /// Relative path of the subvolume this one was snapshotted from.
    /// `None` both for plain subvolumes and for snapshots whose origin is
    /// gone.
    pub snapshot_source_path: Option<String>,
}

pub fn format_creation_time<Tz>(time: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    time.format(CREATION_TIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn creation_time_is_truncated_to_minutes() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let time = offset.with_ymd_and_hms(2022, 3, 14, 9, 26, 53).unwrap();

        assert_eq!(format_creation_time(&time), "2022-03-14 09:26");
    }

    #[test]
    fn missing_values_serialize_as_null() {
        let listing = SubvolumeListing {
            path: "/@home".to_string(),
            absolute_path: None,
            creation_time: None,
            snapshot_source_path: None,
        };

        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "path": "/@home",
                "absolute_path": null,
                "creation_time": null,
                "snapshot_source_path": null,
            })
        );
    }
}
