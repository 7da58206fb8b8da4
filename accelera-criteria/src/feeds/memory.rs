//! In-memory criteria list (feed C)
//!
//! Other parts of the process push raw criteria here before the
//! reconciliation runs. The list is an explicit, shareable instance handed
//! to whoever needs it rather than a process-wide global.

use super::CriteriaFeed;
use accelera_common::{FeedSource, ProgramId, RawCriterion};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};

/// Shared in-memory list of raw criteria
///
/// Cloning yields another handle to the same list.
#[derive(Clone, Default)]
pub struct MemoryFeed {
    records: Arc<RwLock<Vec<RawCriterion>>>,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record
    pub fn push(&self, record: RawCriterion) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    /// Append several records
    pub fn extend(&self, records: impl IntoIterator<Item = RawCriterion>) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(records);
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CriteriaFeed for MemoryFeed {
    fn source(&self) -> FeedSource {
        FeedSource::Memory
    }

    /// Returns the whole list; scoping happens downstream
    async fn fetch(&self, _program: Option<&ProgramId>) -> Result<Vec<RawCriterion>> {
        Ok(self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}
