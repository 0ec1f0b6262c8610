use std::error::Error;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::entry::{Entry, EntryId};
use crate::ranking::{rank, Candidate, RankedResults};
use crate::store::{EntryStore, StoreError};
use crate::validation::{
    validate_entry, validate_search_query, ValidationFailure, MAX_SEARCH_LIMIT,
};

#[derive(Debug)]
pub enum ServiceError {
    Validation(ValidationFailure),
    NotFound(EntryId),
    Conflict(EntryId),
    /// The collaborator failed; callers surface this as a hard failure.
    Unavailable(String),
    /// A capability that is deliberately disabled.
    Unsupported(&'static str),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(failure) => write!(f, "{failure}"),
            Self::NotFound(id) => write!(f, "entry '{id}' not found"),
            Self::Conflict(id) => write!(f, "entry '{id}' already exists"),
            Self::Unavailable(message) => write!(f, "entry store unavailable: {message}"),
            Self::Unsupported(operation) => write!(f, "{operation} is not implemented"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<ValidationFailure> for ServiceError {
    fn from(failure: ValidationFailure) -> Self {
        Self::Validation(failure)
    }
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict(id) => Self::Conflict(id),
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::Unavailable(message) => Self::Unavailable(message),
        }
    }
}

/// Validates requests, delegates storage to the injected collaborator and
/// ranks search hits.
#[derive(Clone)]
pub struct EntryService {
    store: Arc<dyn EntryStore>,
    max_search_limit: usize,
}

impl fmt::Debug for EntryService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryService")
            .field("max_search_limit", &self.max_search_limit)
            .finish_non_exhaustive()
    }
}

impl EntryService {
    pub fn new(store: Arc<dyn EntryStore>) -> Self {
        Self {
            store,
            max_search_limit: MAX_SEARCH_LIMIT,
        }
    }

    /// Caps the number of candidates requested from the collaborator.
    pub fn with_max_search_limit(mut self, max_search_limit: usize) -> Self {
        self.max_search_limit = max_search_limit.clamp(1, MAX_SEARCH_LIMIT);
        self
    }

    pub fn store(&self) -> &Arc<dyn EntryStore> {
        &self.store
    }

    pub fn create(&self, payload: &Value) -> Result<Entry, ServiceError> {
        let draft = validate_entry(payload)?;
        let entry = Entry::from_draft(Uuid::new_v4(), draft, Utc::now());
        self.store.store(entry.clone())?;
        Ok(entry)
    }

    pub fn get(&self, id: EntryId) -> Result<Entry, ServiceError> {
        Ok(self.store.fetch_by_id(id)?)
    }

    /// Full replacement. Identity and creation time always come from the
    /// stored record, whatever the payload says.
    pub fn replace(&self, id: EntryId, payload: &Value) -> Result<Entry, ServiceError> {
        let draft = validate_entry(payload)?;
        let current = self.store.fetch_by_id(id)?;
        let entry = current.replaced_by(draft, Utc::now());
        self.store.replace(id, entry.clone())?;
        Ok(entry)
    }

    /// Sparse updates are not supported; use `replace`.
    pub fn patch(&self, _id: EntryId, _payload: &Value) -> Result<Entry, ServiceError> {
        Err(ServiceError::Unsupported("partial entry update"))
    }

    pub fn delete(&self, id: EntryId) -> Result<(), ServiceError> {
        Ok(self.store.delete_by_id(id)?)
    }

    pub fn search(&self, payload: &Value) -> Result<RankedResults<Entry>, ServiceError> {
        let query = validate_search_query(payload)?;
        let limit = query.limit.min(self.max_search_limit);
        let hits = self
            .store
            .search_similar(&query.query_embedding, &query.filter, limit)?;
        let candidates = hits.into_iter().map(Candidate::from).collect();
        Ok(rank(candidates, query.threshold, query.boost, Utc::now()))
    }

    pub fn entry_count(&self) -> Result<usize, ServiceError> {
        Ok(self.store.len()?)
    }
}
