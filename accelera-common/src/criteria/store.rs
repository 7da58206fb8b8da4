//! Reconciling criteria store
//!
//! One authoritative collection of every criterion known to the process.
//! Feeds upsert into it by canonical id; views read from it and scope the
//! result per program. The store performs no I/O.

use super::model::Criterion;
use super::normalize::normalize;
use super::program::{CriterionId, ProgramId};
use super::raw::{FeedSource, RawCriterion};
use crate::events::{ChangeNotifier, CriterionCreated};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Outcome of one ingestion call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Records normalized and upserted
    pub accepted: usize,
    /// Records dropped for lacking an id
    pub dropped: usize,
}

#[derive(Default)]
struct Entries {
    records: Vec<Criterion>,
    index: HashMap<CriterionId, usize>,
}

impl Entries {
    /// Overwrite in place when the id is known, append otherwise
    fn upsert(&mut self, criterion: Criterion) {
        match self.index.get(&criterion.id) {
            Some(&slot) => self.records[slot] = criterion,
            None => {
                self.index.insert(criterion.id.clone(), self.records.len());
                self.records.push(criterion);
            }
        }
    }
}

/// In-process criteria cache, shared via `Arc`
///
/// - Exactly one record per canonical id; later ingests overwrite earlier
///   ones and keep the original position.
/// - Records without an id are dropped (debug-logged), never an error.
/// - Everything returned has been through `normalize`.
///
/// The store owns the `ChangeNotifier` for `CriterionCreated`, so producers
/// and views depend on the store instance rather than on each other.
#[derive(Default)]
pub struct CriteriaStore {
    entries: RwLock<Entries>,
    notifier: ChangeNotifier<CriterionCreated>,
}

impl CriteriaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize and upsert every record that has an id
    pub fn ingest_many(&self, records: &[RawCriterion]) -> IngestReport {
        self.upsert_all(None, records)
    }

    /// Normalize and upsert a single record
    ///
    /// Returns the stored criterion, or `None` if the record had no id.
    pub fn ingest_one(&self, record: &RawCriterion) -> Option<Criterion> {
        if !record.has_id() {
            debug!("Dropping criterion without id");
            return None;
        }
        let criterion = normalize(record);
        self.write().upsert(criterion.clone());
        Some(criterion)
    }

    /// Ingest a batch tagged with the feed it came from
    pub fn ingest_from(&self, source: FeedSource, records: &[RawCriterion]) -> IngestReport {
        let report = self.upsert_all(Some(source), records);
        debug!(
            source = %source,
            accepted = report.accepted,
            dropped = report.dropped,
            "Ingested criteria batch"
        );
        report
    }

    fn upsert_all(&self, source: Option<FeedSource>, records: &[RawCriterion]) -> IngestReport {
        let mut report = IngestReport::default();
        let normalized: Vec<Criterion> = records
            .iter()
            .filter(|record| {
                let keep = record.has_id();
                if !keep {
                    report.dropped += 1;
                    debug!(source = ?source, "Dropping criterion without id");
                }
                keep
            })
            .map(normalize)
            .collect();

        report.accepted = normalized.len();
        let mut entries = self.write();
        for criterion in normalized {
            entries.upsert(criterion);
        }
        report
    }

    /// Record a newly authored criterion and notify subscribers
    ///
    /// A criterion that names no program of its own is assigned `program_id`.
    /// The store is updated before subscribers run, so a handler reading the
    /// store sees the new record. Returns `None` (and publishes nothing)
    /// when the record has no id.
    pub fn announce(&self, program_id: ProgramId, record: &RawCriterion) -> Option<Criterion> {
        let mut record = record.clone();
        if !record.has_program() {
            record.program_id = serde_json::to_value(&program_id).ok().filter(|v| !v.is_null());
        }

        let criterion = self.ingest_one(&record)?;
        let event = CriterionCreated::new(program_id, criterion.clone());
        let delivered = self.notifier.publish(&event);
        debug!(
            criterion = %criterion.id,
            program = %event.program_id,
            delivered,
            "Announced new criterion"
        );
        Some(criterion)
    }

    /// Every known criterion, in first-insertion order
    pub fn all(&self) -> Vec<Criterion> {
        self.read().records.clone()
    }

    pub fn get(&self, id: &CriterionId) -> Option<Criterion> {
        let entries = self.read();
        entries.index.get(id).map(|&slot| entries.records[slot].clone())
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Notifier carrying `CriterionCreated` events
    pub fn notifier(&self) -> &ChangeNotifier<CriterionCreated> {
        &self.notifier
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}
