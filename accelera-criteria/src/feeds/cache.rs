//! Persisted local cache (feed A)
//!
//! Reads the global criteria list plus per-program lists from the SQLite
//! key-value table. A row holding malformed JSON contributes nothing; the
//! other rows are still used.
//!
//! Writes from this process are serialized, and each list update reads and
//! rewrites its row inside one transaction, so concurrent creates for the
//! same program all land.

use super::CriteriaFeed;
use crate::db::cache::{program_key, read_all_criteria, read_value, write_value, GLOBAL_KEY};
use accelera_common::criteria::parse_raw_list;
use accelera_common::{Criterion, FeedSource, ProgramId, RawCriterion};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// SQLite-backed criteria cache
#[derive(Clone)]
pub struct CacheFeed {
    db: SqlitePool,
    /// Held for the whole read-modify-write of a list
    writes: Arc<Mutex<()>>,
}

impl CacheFeed {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            writes: Arc::new(Mutex::new(())),
        }
    }

    /// Raw criteria stored under one key (empty when absent or unreadable)
    async fn read_list(&self, key: &str) -> Result<Vec<RawCriterion>> {
        let value = read_value(&self.db, key)
            .await
            .with_context(|| format!("Failed to read cache key {}", key))?;
        Ok(value.map(|json| decode(key, &json)).unwrap_or_default())
    }

    /// Replace a program's cached list
    pub async fn write_program(&self, program: &ProgramId, records: &[RawCriterion]) -> Result<()> {
        let _guard = self.writes.lock().await;
        let key = program_key(program);
        let json = serde_json::to_string(records).context("Failed to encode criteria")?;
        write_value(&self.db, &key, &json)
            .await
            .with_context(|| format!("Failed to write cache key {}", key))?;
        debug!(key = %key, count = records.len(), "Wrote criteria cache");
        Ok(())
    }

    /// Upsert one criterion into its program's cached list
    ///
    /// An entry with the same id is replaced in place; otherwise the
    /// criterion is appended.
    pub async fn remember(&self, program: &ProgramId, criterion: &Criterion) -> Result<()> {
        let _guard = self.writes.lock().await;
        let key = program_key(program);

        let mut tx = self
            .db
            .begin()
            .await
            .context("Failed to start cache transaction")?;

        let mut records = read_value(&mut *tx, &key)
            .await
            .with_context(|| format!("Failed to read cache key {}", key))?
            .map(|json| decode(&key, &json))
            .unwrap_or_default();

        let entry = RawCriterion::from(criterion);
        match records
            .iter_mut()
            .find(|r| r.criterion_id().as_ref() == Some(&criterion.id))
        {
            Some(existing) => *existing = entry,
            None => records.push(entry),
        }

        let json = serde_json::to_string(&records).context("Failed to encode criteria")?;
        write_value(&mut *tx, &key, &json)
            .await
            .with_context(|| format!("Failed to write cache key {}", key))?;
        tx.commit()
            .await
            .with_context(|| format!("Failed to commit cache key {}", key))?;

        debug!(key = %key, count = records.len(), criterion = %criterion.id, "Cached criterion");
        Ok(())
    }
}

fn decode(key: &str, json: &str) -> Vec<RawCriterion> {
    match parse_raw_list(json) {
        Ok(records) => records,
        Err(e) => {
            warn!(key = %key, "Ignoring malformed criteria cache entry: {}", e);
            Vec::new()
        }
    }
}

#[async_trait]
impl CriteriaFeed for CacheFeed {
    fn source(&self) -> FeedSource {
        FeedSource::Cache
    }

    /// With a program: the global list followed by that program's list.
    /// Without: every cached list.
    async fn fetch(&self, program: Option<&ProgramId>) -> Result<Vec<RawCriterion>> {
        match program {
            Some(program) => {
                let mut records = self.read_list(GLOBAL_KEY).await?;
                records.extend(self.read_list(&program_key(program)).await?);
                Ok(records)
            }
            None => {
                let rows = read_all_criteria(&self.db)
                    .await
                    .context("Failed to read criteria cache")?;
                Ok(rows
                    .iter()
                    .flat_map(|(key, json)| decode(key, json))
                    .collect())
            }
        }
    }
}
