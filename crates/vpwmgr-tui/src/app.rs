//! Application state management.

use crate::config::Config;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use std::collections::HashSet;
use vpwmgr_core::path::encode;
use vpwmgr_core::{
    Action, CollectionId, Draft, Entry, EntryFields, EntryPath, Error, PasswordManager,
    SecretStore, ARCHIVE_GROUP,
};

/// Application state.
#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    /// Waiting for credentials.
    Locked,
    /// Logged in to the secret store.
    Unlocked,
    /// Application should quit.
    Quit,
}

/// Input mode for the application.
#[derive(Debug, Clone, PartialEq)]
pub enum InputMode {
    /// Credential entry.
    Login,
    /// Normal navigation mode.
    Normal,
    /// Typing into the entry form.
    Edit,
    /// Search mode.
    Search,
    /// Waiting for a yes/no answer.
    Confirm,
}

/// Focus area within the unlocked view.
#[derive(Debug, Clone, PartialEq)]
pub enum Focus {
    /// Sidebar tree is focused.
    Sidebar,
    /// Entry form is focused.
    Form,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    Id,
    Password,
}

#[derive(Debug, Default)]
pub struct LoginForm {
    pub id: String,
    pub password: String,
    pub active: LoginField,
}

impl LoginForm {
    pub fn toggle(&mut self) {
        self.active = match self.active {
            LoginField::Id => LoginField::Password,
            LoginField::Password => LoginField::Id,
        };
    }

    pub fn input_mut(&mut self) -> &mut String {
        match self.active {
            LoginField::Id => &mut self.id,
            LoginField::Password => &mut self.password,
        }
    }
}

/// Fields of the entry form, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
    #[default]
    Collection,
    Group,
    Title,
    Url,
    UserId,
    Password,
    Notes,
}

impl FormField {
    pub const ALL: [FormField; 7] = [
        FormField::Collection,
        FormField::Group,
        FormField::Title,
        FormField::Url,
        FormField::UserId,
        FormField::Password,
        FormField::Notes,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormField::Collection => "Collection",
            FormField::Group => "Group",
            FormField::Title => "Title",
            FormField::Url => "URL",
            FormField::UserId => "User ID",
            FormField::Password => "Password",
            FormField::Notes => "Notes",
        }
    }

    fn position(self) -> usize {
        Self::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.position() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.position() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// The edit buffer shown in the main panel.
#[derive(Debug, Clone, Default)]
pub struct EntryForm {
    /// Index into the loaded collections.
    pub collection: usize,
    pub group: String,
    pub title: String,
    pub url: String,
    pub userid: String,
    pub password: String,
    pub notes: String,
    pub active: FormField,
    pub show_password: bool,
}

impl EntryForm {
    /// The text buffer behind the active field; the collection is picked, not typed.
    pub fn input_mut(&mut self) -> Option<&mut String> {
        match self.active {
            FormField::Collection => None,
            FormField::Group => Some(&mut self.group),
            FormField::Title => Some(&mut self.title),
            FormField::Url => Some(&mut self.url),
            FormField::UserId => Some(&mut self.userid),
            FormField::Password => Some(&mut self.password),
            FormField::Notes => Some(&mut self.notes),
        }
    }

    pub fn value(&self, field: FormField) -> &str {
        match field {
            FormField::Collection => "",
            FormField::Group => &self.group,
            FormField::Title => &self.title,
            FormField::Url => &self.url,
            FormField::UserId => &self.userid,
            FormField::Password => &self.password,
            FormField::Notes => &self.notes,
        }
    }

    pub fn fields(&self) -> EntryFields {
        EntryFields {
            url: self.url.clone(),
            userid: self.userid.clone(),
            password: self.password.clone(),
            notes: self.notes.clone(),
        }
    }
}

/// A destructive command waiting for the operator's answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Pending {
    Overwrite { adding: bool },
    Delete(EntryPath),
}

/// A flattened tree item for rendering.
#[derive(Debug, Clone)]
pub struct TreeItem {
    /// Depth level for indentation.
    pub depth: usize,
    pub kind: TreeItemKind,
    /// Key prefix identifying the node, used to track expansion.
    pub key: String,
    /// Display name.
    pub name: String,
    pub is_expanded: bool,
    pub has_children: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TreeItemKind {
    Collection,
    Group,
    Entry(EntryPath),
}

/// A search result.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub path: EntryPath,
    /// Collection-qualified path for display.
    pub label: String,
    /// Match score for sorting.
    pub score: i64,
}

/// Main application model.
pub struct App<S> {
    pub state: AppState,
    pub input_mode: InputMode,
    pub focus: Focus,
    pub manager: PasswordManager<S>,

    pub login: LoginForm,
    pub form: EntryForm,
    pub pending: Option<Pending>,
    /// Feedback from the last command.
    pub status: Option<String>,
    /// Login failure shown on the lock screen.
    pub error_message: Option<String>,

    // Sidebar state
    pub expanded: HashSet<String>,
    pub sidebar_selected_index: usize,
    pub tree_items: Vec<TreeItem>,
    show_archive: bool,
    hidden_groups: Vec<String>,

    // Search state
    pub search_query: String,
    pub search_results: Vec<SearchResult>,
    pub search_selected_index: usize,
}

fn group_key(collection: &CollectionId, group: &str) -> String {
    format!("{}{}/", collection.prefix(), encode(group))
}

fn collection_label(id: &CollectionId) -> String {
    match id {
        CollectionId::Personal(name) => format!("{name} (personal)"),
        CollectionId::Team(name) => format!("{name} (team)"),
    }
}

impl<S: SecretStore> App<S> {
    pub fn new(manager: PasswordManager<S>, config: &Config) -> Self {
        let mut login = LoginForm::default();
        if let Some(user) = &config.default_user {
            login.id = user.clone();
            login.active = LoginField::Password;
        }

        Self {
            state: AppState::Locked,
            input_mode: InputMode::Login,
            focus: Focus::Sidebar,
            manager,
            login,
            form: EntryForm::default(),
            pending: None,
            status: None,
            error_message: None,
            expanded: HashSet::new(),
            sidebar_selected_index: 0,
            tree_items: Vec::new(),
            show_archive: config.show_archive,
            hidden_groups: config.hidden_groups.clone(),
            search_query: String::new(),
            search_results: Vec::new(),
            search_selected_index: 0,
        }
    }

    /// Attempt to log in with the current credentials.
    pub fn try_login(&mut self) -> bool {
        let id = self.login.id.trim().to_string();
        let result = self.manager.login(&id, &self.login.password);
        self.login.password.clear();

        match result {
            Ok(()) => {
                self.state = AppState::Unlocked;
                self.input_mode = InputMode::Normal;
                self.focus = Focus::Sidebar;
                self.error_message = None;
                self.expanded.clear();
                // Expand the personal collection by default
                if let Some(personal) = self.manager.personal_collection() {
                    self.expanded.insert(personal.prefix());
                }
                self.clear_form();
                self.sidebar_selected_index = 0;
                self.rebuild_tree();
                self.status = Some(format!(
                    "Logged in as {id}, {} entries",
                    self.manager.index().entry_count()
                ));
                true
            }
            Err(e) => {
                tracing::warn!("Login failed for {}: {}", id, e);
                self.error_message = Some(e.to_string());
                false
            }
        }
    }

    pub fn logout(&mut self) {
        self.manager.logout();
        self.state = AppState::Locked;
        self.input_mode = InputMode::Login;
        self.login.active = if self.login.id.is_empty() {
            LoginField::Id
        } else {
            LoginField::Password
        };
        self.form = EntryForm::default();
        self.pending = None;
        self.status = None;
        self.expanded.clear();
        self.tree_items.clear();
        self.sidebar_selected_index = 0;
    }

    fn group_visible(&self, name: &str) -> bool {
        if name == ARCHIVE_GROUP {
            return self.show_archive;
        }
        !self.hidden_groups.iter().any(|hidden| hidden == name)
    }

    /// Rebuild the flattened tree items from the collection snapshot.
    pub fn rebuild_tree(&mut self) {
        let mut items = Vec::new();

        for collection in self.manager.collections() {
            let key = collection.id.prefix();
            let is_expanded = self.expanded.contains(&key);
            let groups: Vec<_> = collection
                .groups
                .iter()
                .filter(|group| self.group_visible(&group.name))
                .collect();

            items.push(TreeItem {
                depth: 0,
                kind: TreeItemKind::Collection,
                key,
                name: collection_label(&collection.id),
                is_expanded,
                has_children: !groups.is_empty(),
            });
            if !is_expanded {
                continue;
            }

            for group in groups {
                let key = group_key(&collection.id, &group.name);
                let is_expanded = self.expanded.contains(&key);
                items.push(TreeItem {
                    depth: 1,
                    kind: TreeItemKind::Group,
                    key,
                    name: group.name.clone(),
                    is_expanded,
                    has_children: !group.entry_titles.is_empty(),
                });
                if !is_expanded {
                    continue;
                }

                for title in &group.entry_titles {
                    let path = EntryPath::new(collection.id.clone(), &group.name, title);
                    items.push(TreeItem {
                        depth: 2,
                        key: path.key(),
                        kind: TreeItemKind::Entry(path),
                        name: title.clone(),
                        is_expanded: false,
                        has_children: false,
                    });
                }
            }
        }

        self.tree_items = items;
        if self.sidebar_selected_index >= self.tree_items.len() {
            self.sidebar_selected_index = self.tree_items.len().saturating_sub(1);
        }
    }

    /// Toggle expansion of a collection or group.
    pub fn toggle_expand(&mut self, key: &str) {
        if !self.expanded.remove(key) {
            self.expanded.insert(key.to_string());
        }
        self.rebuild_tree();
    }

    /// Select the current tree item.
    pub fn select_current_item(&mut self) {
        let Some(item) = self.tree_items.get(self.sidebar_selected_index).cloned() else {
            return;
        };
        match item.kind {
            TreeItemKind::Collection | TreeItemKind::Group => self.toggle_expand(&item.key),
            TreeItemKind::Entry(path) => self.load_entry(&path),
        }
    }

    /// Move selection up in the sidebar.
    pub fn move_up(&mut self) {
        if self.sidebar_selected_index > 0 {
            self.sidebar_selected_index -= 1;
        }
    }

    /// Move selection down in the sidebar.
    pub fn move_down(&mut self) {
        if self.sidebar_selected_index + 1 < self.tree_items.len() {
            self.sidebar_selected_index += 1;
        }
    }

    /// Expand the current node or open the entry.
    pub fn expand_current(&mut self) {
        let Some(item) = self.tree_items.get(self.sidebar_selected_index).cloned() else {
            return;
        };
        match item.kind {
            TreeItemKind::Collection | TreeItemKind::Group => {
                if self.expanded.insert(item.key) {
                    self.rebuild_tree();
                }
            }
            TreeItemKind::Entry(path) => self.load_entry(&path),
        }
    }

    /// Collapse the current node, or the group holding the current entry.
    pub fn collapse_current(&mut self) {
        let Some(item) = self.tree_items.get(self.sidebar_selected_index).cloned() else {
            return;
        };
        let key = match &item.kind {
            TreeItemKind::Entry(path) => group_key(&path.collection, &path.group),
            _ => item.key,
        };
        if self.expanded.remove(&key) {
            self.rebuild_tree();
            if let Some(i) = self.tree_items.iter().position(|t| t.key == key) {
                self.sidebar_selected_index = i;
            }
        }
    }

    /// Expand the tree down to `path` and select it.
    pub fn reveal(&mut self, path: &EntryPath) {
        self.expanded.insert(path.collection.prefix());
        self.expanded.insert(group_key(&path.collection, &path.group));
        self.rebuild_tree();
        if let Some(i) = self
            .tree_items
            .iter()
            .position(|item| item.kind == TreeItemKind::Entry(path.clone()))
        {
            self.sidebar_selected_index = i;
        }
    }

    /// Read the entry at `path` into the form.
    pub fn load_entry(&mut self, path: &EntryPath) {
        match self.manager.select(path).cloned() {
            Ok(entry) => {
                self.fill_form(&entry);
                self.focus = Focus::Form;
                self.status = None;
            }
            Err(e) => self.report(e),
        }
    }

    fn fill_form(&mut self, entry: &Entry) {
        let collection = self
            .manager
            .collections()
            .iter()
            .position(|c| c.id == entry.path.collection)
            .unwrap_or(0);
        self.form = EntryForm {
            collection,
            group: entry.path.group.clone(),
            title: entry.path.title.clone(),
            url: entry.fields.url.clone(),
            userid: entry.fields.userid.clone(),
            password: entry.fields.password.clone(),
            notes: entry.fields.notes.clone(),
            active: self.form.active,
            show_password: false,
        };
    }

    /// Empty the form and forget the loaded entry.
    pub fn clear_form(&mut self) {
        self.manager.clear();
        self.form = EntryForm::default();
    }

    /// Cycle the form's target collection.
    pub fn cycle_collection(&mut self, forward: bool) {
        let count = self.manager.collections().len();
        if count == 0 {
            return;
        }
        self.form.collection = if forward {
            (self.form.collection + 1) % count
        } else {
            (self.form.collection + count - 1) % count
        };
    }

    pub fn form_collection(&self) -> Option<CollectionId> {
        self.manager
            .collections()
            .get(self.form.collection)
            .map(|c| c.id.clone())
            .or_else(|| self.manager.personal_collection())
    }

    /// The form contents as a draft.
    pub fn draft(&self) -> Option<Draft> {
        let collection = self.form_collection()?;
        Some(Draft::new(
            EntryPath::new(collection, self.form.group.trim(), self.form.title.trim()),
            self.form.fields(),
        ))
    }

    /// Nothing loaded and no identifier typed yet.
    pub fn form_is_blank(&self) -> bool {
        self.manager.loaded().is_none()
            && self.form.group.trim().is_empty()
            && self.form.title.trim().is_empty()
    }

    /// What submitting the form would do right now.
    pub fn current_action(&self) -> Option<Action> {
        if self.form_is_blank() {
            return Some(Action::New);
        }
        let draft = self.draft()?;
        Some(if self.manager.loaded().is_some() {
            self.manager.evaluate(&draft)
        } else {
            self.manager.evaluate_new(&draft)
        })
    }

    /// Commit the form, as a new entry when `adding`, otherwise against the loaded one.
    pub fn submit(&mut self, adding: bool, confirm: bool) {
        if self.form_is_blank() {
            self.status = Some("Nothing to submit".to_string());
            return;
        }
        let Some(draft) = self.draft() else {
            return;
        };
        let result = if adding {
            self.manager.add(&draft, confirm)
        } else {
            self.manager.update(&draft, confirm)
        };

        match result {
            Ok(outcome) => {
                tracing::info!("{}", outcome.message);
                if let Some(entry) = &outcome.entry {
                    self.fill_form(entry);
                }
                self.input_mode = InputMode::Normal;
                self.reveal(&draft.path);
                self.status = Some(outcome.message);
            }
            Err(Error::OverwriteNotConfirmed(path)) => {
                self.pending = Some(Pending::Overwrite { adding });
                self.input_mode = InputMode::Confirm;
                self.status = Some(format!("Entry {path} already exists. Overwrite it? (y/n)"));
            }
            Err(e) => self.report(e),
        }
    }

    /// Ask before deleting the loaded entry, or the one under the cursor.
    pub fn request_delete(&mut self) {
        let path = match self.manager.loaded() {
            Some(entry) => entry.path.clone(),
            None => match self.tree_items.get(self.sidebar_selected_index) {
                Some(TreeItem {
                    kind: TreeItemKind::Entry(path),
                    ..
                }) => path.clone(),
                _ => {
                    self.status = Some("No entry selected".to_string());
                    return;
                }
            },
        };
        self.status = Some(format!("Delete entry {path}? (y/n)"));
        self.pending = Some(Pending::Delete(path));
        self.input_mode = InputMode::Confirm;
    }

    /// Answer the pending question.
    pub fn confirm(&mut self, yes: bool) {
        self.input_mode = InputMode::Normal;
        let Some(pending) = self.pending.take() else {
            return;
        };
        if !yes {
            self.status = Some("Cancelled".to_string());
            return;
        }

        match pending {
            Pending::Overwrite { adding } => self.submit(adding, true),
            Pending::Delete(path) => match self.manager.delete(&path) {
                Ok(outcome) => {
                    if self.manager.loaded().is_none() {
                        self.form = EntryForm::default();
                    }
                    self.rebuild_tree();
                    self.status = Some(outcome.message);
                }
                Err(e) => self.report(e),
            },
        }
    }

    pub fn refresh(&mut self) {
        match self.manager.refresh() {
            Ok(()) => {
                self.rebuild_tree();
                self.status = Some(format!(
                    "Refreshed, {} entries",
                    self.manager.index().entry_count()
                ));
            }
            Err(e) => self.report(e),
        }
    }

    fn report(&mut self, err: Error) {
        tracing::warn!("{}", err);
        self.input_mode = InputMode::Normal;
        self.status = Some(err.to_string());
        // The refresh after a failed commit may have moved things around
        self.rebuild_tree();
    }

    /// Start search mode.
    pub fn start_search(&mut self) {
        self.input_mode = InputMode::Search;
        self.search_query.clear();
        self.search_results.clear();
        self.search_selected_index = 0;
    }

    /// Exit search mode.
    pub fn exit_search(&mut self) {
        self.input_mode = InputMode::Normal;
        self.search_query.clear();
        self.search_results.clear();
    }

    /// Fuzzy search over every entry in the snapshot.
    pub fn perform_search(&mut self) {
        self.search_results.clear();
        self.search_selected_index = 0;
        if self.search_query.trim().is_empty() {
            return;
        }

        let matcher = SkimMatcherV2::default();
        let mut scored: Vec<_> = self
            .manager
            .index()
            .entries()
            .filter(|path| self.group_visible(&path.group))
            .filter_map(|path| {
                let label = format!("{}/{}", path.collection, path);
                let text = format!("{} {}", path.title, label);
                matcher
                    .fuzzy_match(&text, &self.search_query)
                    .map(|score| SearchResult { path, label, score })
            })
            .collect();

        scored.sort_by(|a, b| b.score.cmp(&a.score));
        self.search_results = scored.into_iter().take(10).collect();
    }

    /// Open the selected search result.
    pub fn select_search_result(&mut self) {
        let Some(result) = self.search_results.get(self.search_selected_index).cloned() else {
            return;
        };
        self.exit_search();
        self.reveal(&result.path);
        self.load_entry(&result.path);
    }
}
