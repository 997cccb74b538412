//! Entry lifecycle: deciding what submitting an edited entry means, and the
//! ordered side effects that carry it out.
//!
//! [`classify`] is a pure function of the loaded original, the edited draft
//! and whether something already lives at the draft's path. [`plan`] turns
//! the result into [`Step`]s, and [`Plan::execute`] runs them one at a time:
//! archives first, then the delete of the old path, then the write of the
//! new one.

use crate::archive::{self, is_archived};
use crate::error::{Error, Result, ValidationError};
use crate::models::{Entry, EntryFields, Record};
use crate::path::EntryPath;
use crate::store::SecretStore;
use crate::validate::validate_identifier;
use chrono::{DateTime, Utc};
use std::fmt;

/// The entry as currently edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub path: EntryPath,
    pub fields: EntryFields,
}

impl Draft {
    pub fn new(path: EntryPath, fields: EntryFields) -> Self {
        Self { path, fields }
    }
}

impl From<&Entry> for Draft {
    fn from(entry: &Entry) -> Self {
        Self {
            path: entry.path.clone(),
            fields: entry.fields.clone(),
        }
    }
}

/// What submitting a draft would do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Create an entry at the draft's path.
    New,
    /// Nothing differs from the loaded entry.
    Unchanged,
    /// Same path, different fields.
    Update,
    /// Same collection and group, new title.
    Rename,
    /// Same title, different group or collection.
    Move,
    /// Replace an entry that already exists at the draft's path.
    Overwrite,
    Invalid(ValidationError),
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::New => "New",
            Action::Unchanged => "Unchanged",
            Action::Update => "Update",
            Action::Rename => "Rename",
            Action::Move => "Move",
            Action::Overwrite => "Overwrite",
            Action::Invalid(_) => "Invalid",
        }
    }

    /// Overwrites destroy the target's contents and must be confirmed.
    pub fn needs_confirmation(&self) -> bool {
        matches!(self, Action::Overwrite)
    }

    /// Whether submitting would issue any backend call.
    pub fn changes_store(&self) -> bool {
        !matches!(self, Action::Unchanged | Action::Invalid(_))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Invalid(err) => write!(f, "Invalid: {err}"),
            other => f.write_str(other.label()),
        }
    }
}

/// Decide what submitting `draft` means.
///
/// `target_exists` tells whether an entry already lives at `draft.path`.
pub fn classify(original: Option<&Entry>, draft: &Draft, target_exists: bool) -> Action {
    if let Err(err) = validate_identifier(&draft.path.group, &draft.path.title) {
        return Action::Invalid(err);
    }

    let Some(original) = original else {
        return if target_exists {
            Action::Overwrite
        } else {
            Action::New
        };
    };

    if original.path == draft.path {
        return if original.fields == draft.fields {
            Action::Unchanged
        } else {
            Action::Update
        };
    }

    if target_exists {
        Action::Overwrite
    } else if original.path.title == draft.path.title {
        Action::Move
    } else if original.path.same_group(&draft.path) {
        Action::Rename
    } else {
        Action::New
    }
}

/// One backend call of a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Snapshot `record`, currently stored at `source`, into the archive group.
    Archive { source: EntryPath, record: Record },
    Delete(EntryPath),
    Write { path: EntryPath, record: Record },
}

/// Ordered side effects of a commit and the entry it leaves behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// `None` for deletions.
    pub action: Option<Action>,
    pub steps: Vec<Step>,
    /// The entry at the draft's path after the plan runs, if any.
    pub result: Option<Entry>,
}

impl Plan {
    /// Run every step in order, stopping at the first failure.
    ///
    /// A failed archive aborts the plan before anything live is touched.
    pub fn execute<S: SecretStore>(&self, store: &S, token: &str, now: DateTime<Utc>) -> Result<()> {
        for step in &self.steps {
            match step {
                Step::Archive { source, record } => {
                    archive::archive(store, token, source, record, now)?;
                }
                Step::Delete(path) => {
                    tracing::debug!("Deleting {}", path);
                    store.delete(token, &path.key())?;
                }
                Step::Write { path, record } => {
                    tracing::debug!("Writing {}", path);
                    store.write(token, &path.key(), record)?;
                }
            }
        }
        Ok(())
    }
}

/// Build the commit plan for `draft`.
///
/// `target` is the entry currently stored at the draft's path, if any; it is
/// archived before being overwritten.
pub fn plan(
    original: Option<&Entry>,
    draft: &Draft,
    target: Option<&Entry>,
    now: DateTime<Utc>,
) -> std::result::Result<Plan, ValidationError> {
    let action = classify(original, draft, target.is_some());
    let mut steps = Vec::new();

    let archive_step = |entry: &Entry| Step::Archive {
        source: entry.path.clone(),
        record: entry.to_record(),
    };

    let relocated = original.filter(|o| o.path != draft.path);

    if let Action::Invalid(err) = action {
        return Err(err);
    }
    if action == Action::Unchanged {
        return Ok(Plan {
            action: Some(action),
            steps,
            result: original.cloned(),
        });
    }

    match &action {
        Action::New | Action::Unchanged | Action::Invalid(_) => {}
        Action::Update => {
            if let Some(original) = original.filter(|o| !is_archived(&o.path)) {
                steps.push(archive_step(original));
            }
        }
        Action::Move | Action::Rename => {
            if let Some(original) = relocated {
                if !is_archived(&original.path) {
                    steps.push(archive_step(original));
                }
                steps.push(Step::Delete(original.path.clone()));
            }
        }
        Action::Overwrite => {
            if let Some(target) = target.filter(|t| !is_archived(&t.path)) {
                steps.push(archive_step(target));
            }
            if let Some(original) = relocated {
                if !is_archived(&original.path) {
                    steps.push(archive_step(original));
                }
                steps.push(Step::Delete(original.path.clone()));
            }
        }
    }

    let entry = stamp(original, draft, &action, now);
    steps.push(Step::Write {
        path: entry.path.clone(),
        record: entry.to_record(),
    });

    Ok(Plan {
        action: Some(action),
        steps,
        result: Some(entry),
    })
}

/// Plan the removal of `entry`: archive it (unless it is itself an archive
/// row), then delete it.
pub fn plan_delete(entry: &Entry) -> Plan {
    let mut steps = Vec::new();
    if !is_archived(&entry.path) {
        steps.push(Step::Archive {
            source: entry.path.clone(),
            record: entry.to_record(),
        });
    }
    steps.push(Step::Delete(entry.path.clone()));
    Plan {
        action: None,
        steps,
        result: None,
    }
}

/// The entry a commit writes. `changed` is always now; `pwChanged` only
/// moves when the password differs from the loaded original.
fn stamp(original: Option<&Entry>, draft: &Draft, action: &Action, now: DateTime<Utc>) -> Entry {
    let carried = match (original, action) {
        (_, Action::New) | (None, _) => None,
        (Some(original), _) if original.fields.password != draft.fields.password => None,
        (Some(original), _) => original.pw_changed,
    };

    Entry {
        path: draft.path.clone(),
        fields: draft.fields.clone(),
        changed: Some(now),
        pw_changed: Some(carried.unwrap_or(now)),
    }
}

/// Refuse an overwrite the operator has not confirmed.
pub fn check_confirmed(action: &Action, path: &EntryPath, confirmed: bool) -> Result<()> {
    if action.needs_confirmation() && !confirmed {
        return Err(Error::OverwriteNotConfirmed(path.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ARCHIVE_GROUP;
    use crate::path::CollectionId;
    use chrono::TimeZone;

    fn me() -> CollectionId {
        CollectionId::Personal("alice".into())
    }

    fn path(group: &str, title: &str) -> EntryPath {
        EntryPath::new(me(), group, title)
    }

    fn fields(password: &str, notes: &str) -> EntryFields {
        EntryFields {
            url: "https://google.com".into(),
            userid: "alice".into(),
            password: password.into(),
            notes: notes.into(),
        }
    }

    fn earlier() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn entry(group: &str, title: &str) -> Entry {
        Entry {
            path: path(group, title),
            fields: fields("pw", ""),
            changed: Some(earlier()),
            pw_changed: Some(earlier()),
        }
    }

    fn draft(group: &str, title: &str) -> Draft {
        Draft::new(path(group, title), fields("pw", ""))
    }

    #[test]
    fn rename_when_target_free() {
        let original = entry("web", "google.com");
        let action = classify(Some(&original), &draft("web", "netflix"), false);
        assert_eq!(action, Action::Rename);
    }

    #[test]
    fn overwrite_when_target_taken() {
        let original = entry("web", "google.com");
        let action = classify(Some(&original), &draft("web", "netflix"), true);
        assert_eq!(action, Action::Overwrite);
        assert!(action.needs_confirmation());
    }

    #[test]
    fn new_without_original() {
        assert_eq!(classify(None, &draft("web", "netflix"), false), Action::New);
        assert_eq!(classify(None, &draft("web", "netflix"), true), Action::Overwrite);
    }

    #[test]
    fn move_keeps_title() {
        let original = entry("web", "google.com");
        assert_eq!(
            classify(Some(&original), &draft("search", "google.com"), false),
            Action::Move
        );

        let mut to_team = draft("web", "google.com");
        to_team.path.collection = CollectionId::Team("ops".into());
        assert_eq!(classify(Some(&original), &to_team, false), Action::Move);
    }

    #[test]
    fn both_changed_is_new() {
        let original = entry("web", "google.com");
        assert_eq!(
            classify(Some(&original), &draft("search", "bing.com"), false),
            Action::New
        );
    }

    #[test]
    fn same_path_update_or_unchanged() {
        let original = entry("web", "google.com");
        assert_eq!(
            classify(Some(&original), &draft("web", "google.com"), true),
            Action::Unchanged
        );

        let mut edited = draft("web", "google.com");
        edited.fields.notes = "new notes".into();
        assert_eq!(classify(Some(&original), &edited, true), Action::Update);
    }

    #[test]
    fn validation_comes_first() {
        let original = entry("web", "google.com");
        assert!(matches!(
            classify(Some(&original), &draft("web", "#"), false),
            Action::Invalid(ValidationError::InvalidTitle(_))
        ));
        assert!(matches!(
            classify(None, &draft(ARCHIVE_GROUP, "x"), false),
            Action::Invalid(ValidationError::ReservedGroup(_))
        ));
        assert!(matches!(
            classify(None, &draft("", ""), false),
            Action::Invalid(_)
        ));
    }

    #[test]
    fn overwrite_plan_archives_deletes_then_writes() {
        let original = entry("web", "google.com");
        let target = entry("web", "netflix");
        let plan = plan(Some(&original), &draft("web", "netflix"), Some(&target), now()).unwrap();

        assert_eq!(plan.action, Some(Action::Overwrite));
        let kinds: Vec<_> = plan
            .steps
            .iter()
            .map(|s| match s {
                Step::Archive { source, .. } => format!("archive {source}"),
                Step::Delete(p) => format!("delete {p}"),
                Step::Write { path, .. } => format!("write {path}"),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "archive web/netflix",
                "archive web/google.com",
                "delete web/google.com",
                "write web/netflix",
            ]
        );
    }

    #[test]
    fn rename_plan() {
        let original = entry("web", "google.com");
        let plan = plan(Some(&original), &draft("web", "netflix"), None, now()).unwrap();
        assert_eq!(plan.steps.len(), 3);
        assert!(matches!(&plan.steps[0], Step::Archive { source, .. } if *source == original.path));
        assert_eq!(plan.steps[1], Step::Delete(original.path.clone()));
        assert!(matches!(&plan.steps[2], Step::Write { path: p, .. } if *p == path("web", "netflix")));
    }

    #[test]
    fn archived_original_is_not_archived_again() {
        let original = entry(ARCHIVE_GROUP, "web|google.com|20200101000000");
        let target = entry("web", "google.com");
        let plan = plan(Some(&original), &draft("web", "google.com"), Some(&target), now()).unwrap();

        assert_eq!(plan.action, Some(Action::Overwrite));
        assert_eq!(plan.steps.len(), 3);
        assert!(matches!(&plan.steps[0], Step::Archive { source, .. } if *source == target.path));
        assert_eq!(plan.steps[1], Step::Delete(original.path.clone()));
        assert!(matches!(&plan.steps[2], Step::Write { .. }));
    }

    #[test]
    fn unchanged_plan_is_empty() {
        let original = entry("web", "google.com");
        let plan = plan(Some(&original), &draft("web", "google.com"), Some(&original), now()).unwrap();
        assert_eq!(plan.action, Some(Action::Unchanged));
        assert!(plan.steps.is_empty());
        assert_eq!(plan.result, Some(original));
    }

    #[test]
    fn invalid_plan_is_an_error() {
        let err = plan(None, &draft("a/b", "x"), None, now()).unwrap_err();
        assert_eq!(err, ValidationError::InvalidGroup("a/b".into()));
    }

    #[test]
    fn password_timestamp_moves_only_with_password() {
        let original = entry("web", "google.com");

        let mut notes_only = draft("web", "google.com");
        notes_only.fields.notes = "rotated soon".into();
        let result = plan(Some(&original), &notes_only, Some(&original), now())
            .unwrap()
            .result
            .unwrap();
        assert_eq!(result.changed, Some(now()));
        assert_eq!(result.pw_changed, Some(earlier()));

        let mut new_password = draft("web", "google.com");
        new_password.fields.password = "hunter2".into();
        let result = plan(Some(&original), &new_password, Some(&original), now())
            .unwrap()
            .result
            .unwrap();
        assert_eq!(result.changed, Some(now()));
        assert_eq!(result.pw_changed, Some(now()));
    }

    #[test]
    fn delete_plan_skips_archive_rows() {
        let live = entry("web", "google.com");
        let plan_live = plan_delete(&live);
        assert_eq!(plan_live.steps.len(), 2);
        assert!(matches!(plan_live.steps[0], Step::Archive { .. }));

        let archived = entry(ARCHIVE_GROUP, "web|google.com|20200101000000");
        let plan_archived = plan_delete(&archived);
        assert_eq!(plan_archived.steps, vec![Step::Delete(archived.path.clone())]);
    }

    #[test]
    fn unconfirmed_overwrite_is_refused() {
        let target = path("web", "netflix");
        assert!(matches!(
            check_confirmed(&Action::Overwrite, &target, false),
            Err(Error::OverwriteNotConfirmed(p)) if p == "web/netflix"
        ));
        assert!(check_confirmed(&Action::Overwrite, &target, true).is_ok());
        assert!(check_confirmed(&Action::Rename, &target, false).is_ok());
    }
}
