use crate::error::{Error, Result};
use chrono::{Local, NaiveDateTime, TimeZone};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Textual format accepted for cutoff timestamps, in local time.
pub const CUTOFF_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Parse a `YYYY-MM-DD HH:MM:SS` local timestamp.
///
/// On a DST fold the earlier instant is used; a time inside a DST gap is
/// rejected like any other malformed input.
pub fn parse_cutoff(input: &str) -> Result<SystemTime> {
    let invalid = || Error::InvalidCutoffFormat {
        input: input.to_string(),
    };

    let naive = NaiveDateTime::parse_from_str(input.trim(), CUTOFF_FORMAT).map_err(|_| invalid())?;
    let local = Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(invalid)?;

    Ok(SystemTime::from(local))
}

/// Cutoff for "not touched in `days` days", measured from `now`.
pub fn cutoff_days_before(now: SystemTime, days: u64) -> SystemTime {
    now.checked_sub(Duration::from_secs(days * SECONDS_PER_DAY))
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

pub fn modified_time(path: &Path) -> Result<SystemTime> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| Error::io(path, e))
}

/// A file is stale iff it was last modified strictly before `cutoff`.
pub fn is_stale(path: &Path, cutoff: SystemTime) -> Result<bool> {
    Ok(is_before(modified_time(path)?, cutoff))
}

pub fn is_before(modified: SystemTime, cutoff: SystemTime) -> bool {
    modified < cutoff
}
