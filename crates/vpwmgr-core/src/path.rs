//! Mapping between entry identifiers and the store's flat key namespace.

use std::fmt;

const PERSONAL_ROOT: &str = "user/";
const TEAM_ROOT: &str = "team/";

/// Percent-encode a group or title so it can be used as one key segment.
pub fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Inverse of [`encode`]. Listing responses mark folders with a trailing
/// `/`, which is stripped first.
pub fn decode(segment: &str) -> String {
    let raw = segment.strip_suffix('/').unwrap_or(segment);
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => {
            tracing::warn!("Segment {:?} is not valid percent-encoded UTF-8", raw);
            raw.to_string()
        }
    }
}

/// A namespace of groups: the caller's own, or a shared team one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectionId {
    Personal(String),
    Team(String),
}

impl CollectionId {
    /// Key prefix for everything stored in this collection, e.g. `user/alice/`.
    pub fn prefix(&self) -> String {
        match self {
            CollectionId::Personal(id) => format!("{PERSONAL_ROOT}{}/", encode(id)),
            CollectionId::Team(id) => format!("{TEAM_ROOT}{}/", encode(id)),
        }
    }

    /// Parse a prefix produced by [`CollectionId::prefix`].
    pub fn parse(prefix: &str) -> Option<Self> {
        let (root, rest) = if let Some(rest) = prefix.strip_prefix(PERSONAL_ROOT) {
            (PERSONAL_ROOT, rest)
        } else {
            (TEAM_ROOT, prefix.strip_prefix(TEAM_ROOT)?)
        };
        let id = rest.strip_suffix('/').unwrap_or(rest);
        if id.is_empty() || id.contains('/') {
            return None;
        }
        let id = decode(id);
        Some(if root == PERSONAL_ROOT {
            CollectionId::Personal(id)
        } else {
            CollectionId::Team(id)
        })
    }

    /// The vault id or team id.
    pub fn name(&self) -> &str {
        match self {
            CollectionId::Personal(id) | CollectionId::Team(id) => id,
        }
    }

    pub fn is_personal(&self) -> bool {
        matches!(self, CollectionId::Personal(_))
    }

    /// Prefix under which every team collection lives.
    pub fn team_root() -> &'static str {
        TEAM_ROOT
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Full identifier of an entry. There is no separate entry id: the path is
/// the identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryPath {
    pub collection: CollectionId,
    pub group: String,
    pub title: String,
}

impl EntryPath {
    pub fn new(collection: CollectionId, group: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            collection,
            group: group.into(),
            title: title.into(),
        }
    }

    /// Key of the record in the store.
    pub fn key(&self) -> String {
        format!("{}{}", self.group_prefix(), encode(&self.title))
    }

    /// Key prefix of the group containing this entry.
    pub fn group_prefix(&self) -> String {
        format!("{}{}/", self.collection.prefix(), encode(&self.group))
    }

    /// True when both paths name the same group in the same collection.
    pub fn same_group(&self, other: &EntryPath) -> bool {
        self.collection == other.collection && self.group == other.group
    }
}

impl fmt::Display for EntryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.title)
    }
}
