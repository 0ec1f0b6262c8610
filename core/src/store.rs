use std::error::Error;
use std::fmt;

use uuid::Uuid;

use crate::entry::{Entry, EntryId};

/// Restricts a similarity search. Empty fields do not constrain the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub owner: Option<Uuid>,
    pub content_type: Option<String>,
    /// Matches entries carrying at least one of these tags.
    pub tags: Vec<String>,
}

impl SearchFilter {
    pub fn matches(&self, entry: &Entry) -> bool {
        if self.owner.is_some_and(|owner| owner != entry.owner) {
            return false;
        }
        if self
            .content_type
            .as_deref()
            .is_some_and(|content_type| content_type != entry.content_type)
        {
            return false;
        }
        self.tags.is_empty() || self.tags.iter().any(|tag| entry.tags.contains(tag))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Conflict(EntryId),
    NotFound(EntryId),
    /// The backend could not be reached or failed to answer.
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict(id) => write!(f, "entry '{id}' already exists"),
            Self::NotFound(id) => write!(f, "entry '{id}' not found"),
            Self::Unavailable(message) => write!(f, "entry store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {}

/// Storage and similarity-search backend used by `EntryService`.
///
/// Implementations are shared across request handlers, so every method
/// takes `&self`.
pub trait EntryStore: Send + Sync {
    /// Writes a new record keyed by `entry.id`.
    fn store(&self, entry: Entry) -> Result<(), StoreError>;

    fn fetch_by_id(&self, id: EntryId) -> Result<Entry, StoreError>;

    /// Substitutes the record stored under `id`, keeping the stored
    /// `created_at` whatever `entry` carries.
    fn replace(&self, id: EntryId, entry: Entry) -> Result<(), StoreError>;

    fn delete_by_id(&self, id: EntryId) -> Result<(), StoreError>;

    /// Returns up to `limit` `(entry, cosine similarity)` pairs matching
    /// `filter`, best first.
    fn search_similar(
        &self,
        vector: &[f32],
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<(Entry, f32)>, StoreError>;

    /// Number of stored entries.
    fn len(&self) -> Result<usize, StoreError>;

    fn is_empty(&self) -> Result<bool, StoreError> {
        self.len().map(|len| len == 0)
    }
}
