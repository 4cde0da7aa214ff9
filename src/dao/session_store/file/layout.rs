//! On-disk layout of the data directory.

use std::path::{Path, PathBuf};

use time::{
    OffsetDateTime, PrimitiveDateTime, format_description::BorrowedFormatItem,
    macros::format_description,
};

pub(super) const SESSIONS_DIR: &str = "sessions";
pub(super) const QUESTION_SETS_DIR: &str = "question_sets";
pub(super) const LEADERBOARDS_DIR: &str = "leaderboards";
pub(super) const JSON_EXT: &str = ".json";

const COMPACT_TIMESTAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day]_[hour][minute][second]_[subsecond digits:3]");
const COMPACT_TIMESTAMP_SECONDS: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day]_[hour][minute][second]");
const HUMAN_TIMESTAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second] UTC");

/// Upper-cased session code, the key of session and snapshot files.
///
/// `None` when the code holds anything but ASCII letters, digits, `-` and `_`.
pub(super) fn session_key(code: &str) -> Option<String> {
    let key = code.trim().to_uppercase();
    let safe = !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    safe.then_some(key)
}

pub(super) fn session_path(root: &Path, code: &str) -> Option<PathBuf> {
    session_key(code).map(|key| root.join(SESSIONS_DIR).join(format!("{key}{JSON_EXT}")))
}

/// Keep ASCII letters, digits, `-` and `_`, trim separators at both ends, lower-case.
pub(super) fn sanitize_set_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '-' || *ch == '_')
        .collect();
    let trimmed = kept.trim_matches(|ch| ch == '-' || ch == '_').to_lowercase();
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed
    }
}

pub(super) fn question_set_path(root: &Path, name: &str) -> PathBuf {
    root.join(QUESTION_SETS_DIR)
        .join(format!("{}{JSON_EXT}", sanitize_set_name(name)))
}

/// Resolve a snapshot id or file name inside the leaderboard directory.
///
/// Anything that could escape the directory resolves to `None`.
pub(super) fn snapshot_path(root: &Path, snapshot_id: &str) -> Option<PathBuf> {
    let id = snapshot_id.trim();
    if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
        return None;
    }
    let file = if id.ends_with(JSON_EXT) {
        id.to_string()
    } else {
        format!("{id}{JSON_EXT}")
    };
    Some(root.join(LEADERBOARDS_DIR).join(file))
}

/// Whether a snapshot file stem belongs to the session keyed `key`.
///
/// The whole remainder after `<key>_` must be a snapshot stamp, so `GLOBAL` never claims
/// the archives of `GLOBAL_2`.
pub(super) fn is_snapshot_of(stem: &str, key: &str) -> bool {
    stem.strip_prefix(key)
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(is_snapshot_stamp)
}

/// `YYYYMMDD_HHMMSS_mmm`, optionally followed by a `_n` collision counter.
fn is_snapshot_stamp(stamp: &str) -> bool {
    fn digits(part: Option<&str>, len: Option<usize>) -> bool {
        part.is_some_and(|part| {
            !part.is_empty()
                && len.is_none_or(|len| part.len() == len)
                && part.bytes().all(|byte| byte.is_ascii_digit())
        })
    }

    let mut parts = stamp.split('_');
    digits(parts.next(), Some(8))
        && digits(parts.next(), Some(6))
        && digits(parts.next(), Some(3))
        && match parts.next() {
            None => true,
            counter => digits(counter, None) && parts.next().is_none(),
        }
}

/// Compact UTC timestamp used in snapshot ids.
pub(super) fn compact_timestamp(at: OffsetDateTime) -> String {
    at.format(COMPACT_TIMESTAMP)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

/// Render a compact timestamp for humans, echoing the input when it cannot be parsed.
pub(super) fn human_timestamp(compact: &str) -> String {
    PrimitiveDateTime::parse(compact, COMPACT_TIMESTAMP)
        .or_else(|_| PrimitiveDateTime::parse(compact, COMPACT_TIMESTAMP_SECONDS))
        .ok()
        .and_then(|parsed| parsed.format(HUMAN_TIMESTAMP).ok())
        .unwrap_or_else(|| compact.to_string())
}

/// Temporary sibling used for atomic replacement of `path`.
pub(super) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn set_names_are_sanitized() {
        assert_eq!(sanitize_set_name("My Quiz #1"), "myquiz1");
        assert_eq!(sanitize_set_name("--Round_2--"), "round_2");
        assert_eq!(sanitize_set_name("../../etc"), "etc");
        assert_eq!(sanitize_set_name("!!!"), "untitled");
    }

    #[test]
    fn snapshot_paths_stay_inside_directory() {
        let root = Path::new("/data");
        assert_eq!(
            snapshot_path(root, "GLOBAL_20240101_120000_000"),
            Some(PathBuf::from("/data/leaderboards/GLOBAL_20240101_120000_000.json"))
        );
        assert_eq!(
            snapshot_path(root, "GLOBAL_1.json"),
            Some(PathBuf::from("/data/leaderboards/GLOBAL_1.json"))
        );
        assert_eq!(snapshot_path(root, "../sessions/GLOBAL"), None);
        assert_eq!(snapshot_path(root, ""), None);
    }

    #[test]
    fn snapshot_ownership_uses_full_session_key() {
        assert!(is_snapshot_of("GLOBAL_20240101_120000_000", "GLOBAL"));
        assert!(!is_snapshot_of("GLOBAL_2_20240101_120000_000", "GLOBAL"));
        assert!(is_snapshot_of("GLOBAL_2_20240101_120000_000", "GLOBAL_2"));
        assert!(!is_snapshot_of("GLOBALX_20240101", "GLOBAL"));
        assert!(is_snapshot_of("GLOBAL_20240101_120000_000_2", "GLOBAL"));
        assert!(!is_snapshot_of("GLOBAL_2_20240101_120000_000_1", "GLOBAL"));
        assert!(!is_snapshot_of("GLOBAL_20240101_120000", "GLOBAL"));
        assert!(!is_snapshot_of("GLOBAL_20240101_120000_000_", "GLOBAL"));
    }

    #[test]
    fn timestamps_render_compact_and_human() {
        let at = datetime!(2024-03-05 07:08:09.123 UTC);
        let compact = compact_timestamp(at);
        assert_eq!(compact, "20240305_070809_123");
        assert_eq!(human_timestamp(&compact), "2024-03-05 07:08:09 UTC");
        assert_eq!(human_timestamp("20240305_070809"), "2024-03-05 07:08:09 UTC");
        assert_eq!(human_timestamp("garbage"), "garbage");
    }

    #[test]
    fn session_files_are_upper_cased() {
        assert_eq!(
            session_path(Path::new("/d"), "global"),
            Some(PathBuf::from("/d/sessions/GLOBAL.json"))
        );
    }

    #[test]
    fn session_files_never_leave_their_directory() {
        let root = Path::new("/d");
        assert_eq!(session_path(root, "../escaped"), None);
        assert_eq!(session_path(root, "a/b"), None);
        assert_eq!(session_path(root, "  "), None);
        assert_eq!(session_key("night_1-b"), Some("NIGHT_1-B".to_string()));
    }
}
