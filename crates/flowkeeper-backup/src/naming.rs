//! Backup name validation and generation

use crate::error::{BackupError, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,50}$").expect("backup name regex is valid"));

/// Names that cannot be used for a backup (compared case-insensitively)
pub const RESERVED_NAMES: &[&str] = &["latest", "current", "temp", "backup"];

/// Prefix of names generated for unnamed backups
pub const AUTO_NAME_PREFIX: &str = "backup";

/// Prefix of safety backups taken before a restore
pub const PRE_RESTORE_PREFIX: &str = "pre_restore";

/// Check the character set and length of a name.
///
/// Used on lookups, where a reserved word is simply not found.
pub fn check_format(name: &str) -> Result<()> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(BackupError::invalid_name(
            name,
            "must be 1-50 characters of letters, digits, '_' or '-'",
        ))
    }
}

/// Full validation for a name about to be created.
pub fn validate_name(name: &str) -> Result<()> {
    check_format(name)?;

    let lowered = name.to_ascii_lowercase();
    if let Some(reserved) = RESERVED_NAMES.iter().find(|r| **r == lowered) {
        return Err(BackupError::invalid_name(
            name,
            format!("'{}' is a reserved name", reserved),
        ));
    }

    Ok(())
}

/// `<prefix>_<YYYYmmdd_HHMMSS_mmm>` in UTC.
pub fn generate_name(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{}_{}", prefix, at.format("%Y%m%d_%H%M%S_%3f"))
}
