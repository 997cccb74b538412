//! Top-level application controller.
//!
//! Owns the session, the store, the collection snapshot and the entry
//! currently open for editing. Every command is a strictly ordered chain of
//! store calls followed by a refresh of the snapshot.

use crate::error::{Error, Result};
use crate::index::CollectionIndex;
use crate::lifecycle::{self, check_confirmed, Action, Draft};
use crate::models::{Collection, Entry};
use crate::path::{CollectionId, EntryPath};
use crate::session::SessionContext;
use crate::store::SecretStore;
use chrono::{DateTime, Utc};

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Result of a committed command, for operator feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// What the commit turned out to be; `None` for deletions.
    pub action: Option<Action>,
    pub message: String,
    /// The entry now open for editing, if any.
    pub entry: Option<Entry>,
}

pub struct PasswordManager<S> {
    store: S,
    session: SessionContext,
    index: CollectionIndex,
    loaded: Option<Entry>,
    clock: Clock,
}

impl<S: SecretStore> PasswordManager<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            session: SessionContext::new(),
            index: CollectionIndex::new(),
            loaded: None,
            clock: Box::new(Utc::now),
        }
    }

    /// Replace the time source used for `changed`, `pwChanged` and archive titles.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn index(&self) -> &CollectionIndex {
        &self.index
    }

    pub fn collections(&self) -> &[Collection] {
        self.index.collections()
    }

    /// The entry open for editing, as last read from the store.
    pub fn loaded(&self) -> Option<&Entry> {
        self.loaded.as_ref()
    }

    /// The logged-in user's own collection.
    pub fn personal_collection(&self) -> Option<CollectionId> {
        self.session
            .vault_id()
            .map(|id| CollectionId::Personal(id.to_string()))
    }

    pub fn login(&mut self, id: &str, password: &str) -> Result<()> {
        self.loaded = None;
        self.index.clear();
        self.session.login(&self.store, id, password)?;
        if let Err(err) = self.refresh() {
            tracing::warn!("Initial refresh for {} failed: {}", id, err);
            self.session.logout();
            self.index.clear();
            return Err(err);
        }
        Ok(())
    }

    pub fn logout(&mut self) {
        self.session.logout();
        self.index.clear();
        self.loaded = None;
    }

    pub fn refresh(&mut self) -> Result<()> {
        let session = self.session.session()?;
        self.index.refresh(&self.store, session)?;
        Ok(())
    }

    /// Load the entry at `path` as the original for subsequent edits.
    pub fn select(&mut self, path: &EntryPath) -> Result<&Entry> {
        let token = self.session.session()?.token.as_str();
        let record = self
            .store
            .read(token, &path.key())?
            .ok_or_else(|| Error::EntryNotFound(path.to_string()))?;
        tracing::debug!("Loaded {}", path);
        Ok(&*self.loaded.insert(Entry::from_record(path.clone(), record)))
    }

    /// Discard the entry open for editing.
    pub fn clear(&mut self) {
        self.loaded = None;
    }

    /// What `update` would do with `draft`, for display before committing.
    pub fn evaluate(&self, draft: &Draft) -> Action {
        lifecycle::classify(self.loaded.as_ref(), draft, self.index.contains(&draft.path))
    }

    /// What `add` would do with `draft`.
    pub fn evaluate_new(&self, draft: &Draft) -> Action {
        lifecycle::classify(None, draft, self.index.contains(&draft.path))
    }

    /// Create `draft` as a new entry, ignoring any loaded original.
    pub fn add(&mut self, draft: &Draft, confirm_overwrite: bool) -> Result<Outcome> {
        self.commit(None, draft, confirm_overwrite)
    }

    /// Commit `draft` against the loaded original.
    pub fn update(&mut self, draft: &Draft, confirm_overwrite: bool) -> Result<Outcome> {
        let original = self.loaded.clone().ok_or(Error::NothingLoaded)?;
        self.commit(Some(original), draft, confirm_overwrite)
    }

    fn commit(&mut self, original: Option<Entry>, draft: &Draft, confirm_overwrite: bool) -> Result<Outcome> {
        let token = self.session.session()?.token.clone();

        let action = lifecycle::classify(original.as_ref(), draft, self.index.contains(&draft.path));
        if let Action::Invalid(err) = action {
            return Err(err.into());
        }
        check_confirmed(&action, &draft.path, confirm_overwrite)?;

        if action == Action::Unchanged {
            return Ok(Outcome {
                action: Some(action),
                message: format!("No changes to entry {}", draft.path),
                entry: original,
            });
        }

        let target = if action == Action::Overwrite {
            self.store
                .read(&token, &draft.path.key())?
                .map(|record| Entry::from_record(draft.path.clone(), record))
        } else {
            None
        };

        let now = (self.clock)();
        let plan = lifecycle::plan(original.as_ref(), draft, target.as_ref(), now)?;
        let action = plan.action.clone().unwrap_or(Action::New);
        tracing::info!("{} {} ({} step(s))", action, draft.path, plan.steps.len());

        if let Err(err) = plan.execute(&self.store, &token, now) {
            tracing::warn!("Commit of {} failed: {}", draft.path, err);
            self.refresh_after_failure();
            return Err(err);
        }

        self.refresh()?;
        self.loaded = plan.result.clone();

        let message = match (&action, &original) {
            (Action::Move, Some(o)) if o.path.collection != draft.path.collection => format!(
                "Moved entry {} to {}/{}",
                o.path, draft.path.collection, draft.path
            ),
            (Action::Move, Some(o)) => format!("Moved entry {} to {}", o.path, draft.path),
            (Action::Rename, Some(o)) => format!("Renamed entry {} to {}", o.path, draft.path),
            (Action::Overwrite, _) => format!("Overwrote entry {}", draft.path),
            (Action::Update, _) => format!("Updated entry {}", draft.path),
            _ => format!("Added new entry {}", draft.path),
        };

        Ok(Outcome {
            action: Some(action),
            message,
            entry: plan.result,
        })
    }

    /// Archive and remove the entry at `path`.
    pub fn delete(&mut self, path: &EntryPath) -> Result<Outcome> {
        let token = self.session.session()?.token.clone();
        if !self.index.contains(path) {
            return Err(Error::EntryNotFound(path.to_string()));
        }

        let record = self
            .store
            .read(&token, &path.key())?
            .ok_or_else(|| Error::EntryNotFound(path.to_string()))?;
        let entry = Entry::from_record(path.clone(), record);

        let now = (self.clock)();
        let plan = lifecycle::plan_delete(&entry);
        if let Err(err) = plan.execute(&self.store, &token, now) {
            tracing::warn!("Delete of {} failed: {}", path, err);
            self.refresh_after_failure();
            return Err(err);
        }
        tracing::info!("Deleted {}", path);

        self.refresh()?;
        if self.loaded.as_ref().is_some_and(|e| &e.path == path) {
            self.loaded = None;
        }

        Ok(Outcome {
            action: None,
            message: format!("Deleted entry {path}"),
            entry: None,
        })
    }

    fn refresh_after_failure(&mut self) {
        if let Err(err) = self.refresh() {
            tracing::warn!("Refresh after failed command also failed: {}", err);
        }
    }
}
