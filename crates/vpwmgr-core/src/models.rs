//! Shared data types for the application.

use crate::path::{CollectionId, EntryPath};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// The editable part of a password entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryFields {
    pub url: String,
    pub userid: String,
    pub password: String,
    pub notes: String,
}

/// Payload stored under an entry's key. Field names are shared with other
/// clients of the same store and must not change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(flatten)]
    pub fields: EntryFields,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub changed: Option<DateTime<Utc>>,
    #[serde(
        rename = "pwChanged",
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub pw_changed: Option<DateTime<Utc>>,
}

/// Accepts RFC 3339 or `YYYY-MM-DD HH:MM:SS` (taken as UTC). Anything else
/// loads as unset so the record stays readable.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(value) = Option::<serde_json::Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let parsed = value.as_str().and_then(parse_timestamp);
    if parsed.is_none() {
        tracing::warn!("Ignoring unreadable timestamp {}", value);
    }
    Ok(parsed)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// A password entry as loaded from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: EntryPath,
    pub fields: EntryFields,
    pub changed: Option<DateTime<Utc>>,
    pub pw_changed: Option<DateTime<Utc>>,
}

impl Entry {
    pub fn from_record(path: EntryPath, record: Record) -> Self {
        Self {
            path,
            fields: record.fields,
            changed: record.changed,
            pw_changed: record.pw_changed,
        }
    }

    pub fn to_record(&self) -> Record {
        Record {
            fields: self.fields.clone(),
            changed: self.changed,
            pw_changed: self.pw_changed,
        }
    }
}

/// A named bucket of entries within a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub entry_titles: Vec<String>,
}

impl Group {
    pub fn contains(&self, title: &str) -> bool {
        self.entry_titles.iter().any(|t| t == title)
    }
}

/// Snapshot of one collection's groups, rebuilt on every refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub id: CollectionId,
    pub groups: Vec<Group>,
}

impl Collection {
    pub fn new(id: CollectionId) -> Self {
        Self {
            id,
            groups: Vec::new(),
        }
    }

    pub fn find_group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn entry_count(&self) -> usize {
        self.groups.iter().map(|g| g.entry_titles.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn record_uses_stored_field_names() {
        let record = Record {
            fields: EntryFields {
                url: "https://facepalm.com".into(),
                userid: "bob".into(),
                password: "bobknows".into(),
                notes: "Forget privacy!".into(),
            },
            changed: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
            pw_changed: Some(Utc.with_ymd_and_hms(2024, 2, 1, 8, 30, 0).unwrap()),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["userid"], "bob");
        assert_eq!(json["password"], "bobknows");
        assert_eq!(json["changed"], "2024-03-01T12:00:00Z");
        assert_eq!(json["pwChanged"], "2024-02-01T08:30:00Z");
        assert!(json.get("groupid").is_none());
        assert!(json.get("title").is_none());
    }

    #[test]
    fn sparse_records_load_with_defaults() {
        let record: Record = serde_json::from_str(r#"{"password":"hunter2"}"#).unwrap();
        assert_eq!(record.fields.password, "hunter2");
        assert_eq!(record.fields.url, "");
        assert_eq!(record.changed, None);
        assert_eq!(record.pw_changed, None);
    }

    #[test]
    fn foreign_timestamps_do_not_block_loading() {
        let record: Record = serde_json::from_str(
            r#"{"password":"x","changed":"2017-03-04 09:00:00","pwChanged":"last tuesday"}"#,
        )
        .unwrap();
        assert_eq!(record.fields.password, "x");
        assert_eq!(
            record.changed,
            Some(Utc.with_ymd_and_hms(2017, 3, 4, 9, 0, 0).unwrap())
        );
        assert_eq!(record.pw_changed, None);

        let record: Record =
            serde_json::from_str(r#"{"changed":1488618000,"pwChanged":null}"#).unwrap();
        assert_eq!(record.changed, None);
        assert_eq!(record.pw_changed, None);
    }
}
