use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use rayon::prelude::*;

use crate::entry::{Entry, EntryId};
use crate::store::{EntryStore, SearchFilter, StoreError};
use crate::vector::PreparedCosineQuery;

/// In-process `EntryStore` doing exact cosine scans over every entry.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<EntryId, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|entry| (entry.id, entry))
                    .collect(),
            ),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<EntryId, Entry>>, StoreError> {
        self.entries
            .read()
            .map_err(|_| StoreError::Unavailable("entry store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<EntryId, Entry>>, StoreError> {
        self.entries
            .write()
            .map_err(|_| StoreError::Unavailable("entry store lock poisoned".to_string()))
    }
}

impl EntryStore for MemoryStore {
    fn store(&self, entry: Entry) -> Result<(), StoreError> {
        let mut entries = self.write()?;
        if entries.contains_key(&entry.id) {
            return Err(StoreError::Conflict(entry.id));
        }
        entries.insert(entry.id, entry);
        Ok(())
    }

    fn fetch_by_id(&self, id: EntryId) -> Result<Entry, StoreError> {
        self.read()?
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn replace(&self, id: EntryId, mut entry: Entry) -> Result<(), StoreError> {
        let mut entries = self.write()?;
        let stored = entries.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        entry.id = id;
        entry.created_at = stored.created_at;
        entry.updated_at = entry.updated_at.max(stored.created_at);
        *stored = entry;
        Ok(())
    }

    fn delete_by_id(&self, id: EntryId) -> Result<(), StoreError> {
        self.write()?
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    fn search_similar(
        &self,
        vector: &[f32],
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<(Entry, f32)>, StoreError> {
        if limit == 0 || vector.is_empty() {
            return Ok(Vec::new());
        }

        let query = PreparedCosineQuery::new(vector);
        let entries = self.read()?;
        let scored: Vec<(EntryId, f32)> = entries
            .values()
            .filter(|entry| filter.matches(entry))
            .collect::<Vec<_>>()
            .into_par_iter()
            .filter_map(|entry| {
                query
                    .cosine(&entry.primary_embedding, f32::EPSILON)
                    .filter(|similarity| similarity.is_finite())
                    .map(|similarity| (entry.id, similarity))
            })
            .collect();

        select_top_k(scored, limit)
            .into_iter()
            .map(|(id, similarity)| {
                entries
                    .get(&id)
                    .cloned()
                    .map(|entry| (entry, similarity))
                    .ok_or_else(|| {
                        StoreError::Unavailable("entry index is inconsistent".to_string())
                    })
            })
            .collect()
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.len())
    }
}

/// Keeps the `keep` highest similarities, best first, ties broken by id.
fn select_top_k(scored: Vec<(EntryId, f32)>, keep: usize) -> Vec<(EntryId, f32)> {
    let mut heap = BinaryHeap::with_capacity(keep.min(scored.len()));
    for (id, similarity) in scored {
        let candidate = HeapCandidate { id, similarity };
        if heap.len() < keep {
            heap.push(candidate);
            continue;
        }
        let should_replace = heap
            .peek()
            .is_some_and(|worst| candidate.cmp(worst).is_lt());
        if should_replace {
            let _ = heap.pop();
            heap.push(candidate);
        }
    }

    heap.into_sorted_vec()
        .into_iter()
        .map(|candidate| (candidate.id, candidate.similarity))
        .collect()
}

/// Orders so that the max-heap top is the worst kept candidate.
#[derive(Debug, Clone)]
struct HeapCandidate {
    id: EntryId,
    similarity: f32,
}

impl PartialEq for HeapCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for HeapCandidate {}

impl PartialOrd for HeapCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .similarity
            .total_cmp(&self.similarity)
            .then_with(|| self.id.cmp(&other.id))
    }
}
