//! Criteria feeds - the origins that supply raw criteria
//!
//! - `CacheFeed`: persisted local key-value cache (SQLite)
//! - `MemoryFeed`: explicitly injected in-memory list
//! - `RemoteFeed`: application backend REST API
//!
//! Creation events do not go through a feed; they enter via
//! `CriteriaStore::announce`.

use accelera_common::{FeedSource, ProgramId, RawCriterion};
use anyhow::Result;
use async_trait::async_trait;

pub mod cache;
pub mod memory;
pub mod remote;

pub use cache::CacheFeed;
pub use memory::MemoryFeed;
pub use remote::RemoteFeed;

/// Feed trait - every criteria origin implements this
#[async_trait]
pub trait CriteriaFeed: Send + Sync {
    /// Tag attached to everything this feed ingests
    fn source(&self) -> FeedSource;

    /// Fetch raw criteria
    ///
    /// # Arguments
    /// * `program` - Program being viewed, or `None` for the unscoped view
    ///
    /// # Returns
    /// * `Ok(records)` - Possibly empty; may include records of other programs
    /// * `Err(_)` - Source unavailable (logged by the caller, other feeds continue)
    async fn fetch(&self, program: Option<&ProgramId>) -> Result<Vec<RawCriterion>>;
}
