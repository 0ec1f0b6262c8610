#![forbid(unsafe_code)]
//! Core of the semstore entry store.
//!
//! Everything here is synchronous and holds no process-wide state: entry
//! validation, post-retrieval ranking, the storage collaborator contract and
//! an in-memory collaborator used by the server and tests.

pub mod entry;
pub mod memory_store;
pub mod ranking;
pub mod service;
pub mod store;
pub mod validation;
pub mod vector;

pub use entry::{
    EmotionalContext, Entry, EntryDraft, EntryId, LinkedEntities, SearchMetadata,
    TemporalContext, LIGHTWEIGHT_EMBEDDING_DIM, PRIMARY_EMBEDDING_DIM,
};
pub use memory_store::MemoryStore;
pub use ranking::{
    rank, rank_now, BoostOptions, Candidate, RankedHit, RankedResults, Rankable,
    DEFAULT_THRESHOLD,
};
pub use service::{EntryService, ServiceError};
pub use store::{EntryStore, SearchFilter, StoreError};
pub use validation::{
    validate, validate_entry, validate_search_query, Schema, SearchQuery, Validated,
    ValidationFailure, Violation,
};
pub use vector::PreparedCosineQuery;
