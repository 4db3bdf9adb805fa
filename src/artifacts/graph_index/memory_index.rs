//! Build-time index
//!
//! Filled one commit at a time while history is walked. Not synchronized:
//! concurrent writers need an outer lock.

use crate::artifacts::bloom::BloomSettings;
use crate::artifacts::bloom::filter::Filter;
use crate::artifacts::core::Result;
use crate::artifacts::graph_index::BloomIndex;
use crate::artifacts::objects::commit_id::CommitId;
use std::borrow::Cow;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    /// `None` marks a commit that is known but has no filter
    filters: HashMap<CommitId, Option<Filter>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the filter of `id`, replacing any previous entry
    pub fn insert(&mut self, id: CommitId, filter: Filter) -> Option<Filter> {
        self.filters.insert(id, Some(filter)).flatten()
    }

    /// Record `id` as indexed but without a filter
    ///
    /// Lookups for it return `None`, so callers fall back to a real diff.
    pub fn insert_unfiltered(&mut self, id: CommitId) -> Option<Filter> {
        self.filters.insert(id, None).flatten()
    }

    /// Build and store the filter for one commit from its changed paths
    ///
    /// Returns whether a filter was stored; commits over the changed-path
    /// limit are recorded without one.
    pub fn record<I, S>(&mut self, id: CommitId, paths: I, settings: &BloomSettings) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match Filter::from_changed_paths(paths, settings)? {
            Some(filter) => {
                self.insert(id, filter);
                Ok(true)
            }
            None => {
                tracing::debug!(commit = %id, "too many changed paths, recording without filter");
                self.insert_unfiltered(id);
                Ok(false)
            }
        }
    }

    pub fn remove(&mut self, id: &CommitId) -> Option<Filter> {
        self.filters.remove(id).flatten()
    }

    pub fn contains(&self, id: &CommitId) -> bool {
        self.filters.contains_key(id)
    }

    pub fn get(&self, id: &CommitId) -> Option<&Filter> {
        self.filters.get(id).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Number of commits that carry a filter
    pub fn filter_count(&self) -> usize {
        self.filters.values().filter(|filter| filter.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CommitId, Option<&Filter>)> {
        self.filters.iter().map(|(id, filter)| (id, filter.as_ref()))
    }
}

impl BloomIndex for MemoryIndex {
    fn lookup(&self, id: &CommitId) -> Result<Option<Cow<'_, Filter>>> {
        Ok(self.get(id).map(Cow::Borrowed))
    }

    fn all_ids(&self) -> Result<Vec<CommitId>> {
        Ok(self.filters.keys().copied().collect())
    }
}
