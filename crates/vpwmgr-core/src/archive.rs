//! Historical snapshots of superseded entries.
//!
//! Before an entry is overwritten, moved, renamed or deleted its stored
//! record is copied into the collection's archive group under a title that
//! records where it came from and when.

use crate::error::{Error, Result};
use crate::models::Record;
use crate::path::EntryPath;
use crate::store::SecretStore;
use chrono::{DateTime, Duration, Utc};

/// Reserved group holding archived snapshots.
pub const ARCHIVE_GROUP: &str = "Archived Entries";

const TITLE_SEPARATOR: char = '|';

/// `YYYYMMDDHHMMSS`, zero-padded so archive titles sort chronologically.
pub fn compact_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d%H%M%S").to_string()
}

/// `<group>|<title>|<timestamp>`
pub fn archive_title(group: &str, title: &str, at: DateTime<Utc>) -> String {
    format!(
        "{group}{TITLE_SEPARATOR}{title}{TITLE_SEPARATOR}{}",
        compact_timestamp(at)
    )
}

/// Where a snapshot of `path` taken at `at` is stored.
pub fn archive_path(path: &EntryPath, at: DateTime<Utc>) -> EntryPath {
    EntryPath::new(
        path.collection.clone(),
        ARCHIVE_GROUP,
        archive_title(&path.group, &path.title, at),
    )
}

/// Archive rows are never archived again.
pub fn is_archived(path: &EntryPath) -> bool {
    path.group == ARCHIVE_GROUP
}

/// Split an archive title back into its original group, title and time.
pub fn parse_archive_title(title: &str) -> Option<(&str, &str, DateTime<Utc>)> {
    let (rest, stamp) = title.rsplit_once(TITLE_SEPARATOR)?;
    let (group, original) = rest.split_once(TITLE_SEPARATOR)?;
    let at = chrono::NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S")
        .ok()?
        .and_utc();
    Some((group, original, at))
}

/// How many later seconds are tried when a snapshot title is already taken.
const MAX_ARCHIVE_SLOTS: u32 = 60;

/// Write `record` as the archived copy of `path`.
///
/// Existing snapshots are never replaced: when the title for `at` is taken
/// the timestamp is advanced one second at a time until a free one is found.
/// A failure is reported as [`Error::ArchiveFailed`]; callers must not go on
/// to change the live entry in that case.
pub fn archive<S: SecretStore>(
    store: &S,
    token: &str,
    path: &EntryPath,
    record: &Record,
    at: DateTime<Utc>,
) -> Result<EntryPath> {
    let failed = |source| Error::ArchiveFailed {
        path: path.to_string(),
        source,
    };

    let mut at = at;
    for _ in 0..MAX_ARCHIVE_SLOTS {
        let target = archive_path(path, at);
        let key = target.key();
        if store.read(token, &key).map_err(failed)?.is_some() {
            tracing::debug!("Archive slot {} taken", target.title);
            at += Duration::seconds(1);
            continue;
        }

        tracing::info!("Archiving {} as {}", path, target.title);
        store.write(token, &key, record).map_err(failed)?;
        return Ok(target);
    }

    Err(Error::ArchiveSlotsExhausted(path.to_string()))
}
