//! Criteria reconciliation across feeds
//!
//! `CriteriaSync` pulls from every registered feed in order and folds the
//! results into the shared store. Feeds registered later win when two
//! feeds carry the same id. A feed that fails contributes nothing and the
//! remaining feeds still run.

use crate::feeds::CriteriaFeed;
use accelera_common::{CriteriaStore, FeedSource, ProgramId};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Per-feed outcome of a refresh
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source: FeedSource,
    pub fetched: usize,
    pub accepted: usize,
    pub dropped: usize,
}

/// Outcome of one `CriteriaSync::refresh`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_id: Option<ProgramId>,
    /// Feeds that answered, in query order
    pub sources: Vec<SourceReport>,
    /// Feeds that were unavailable
    pub failed: Vec<FeedSource>,
    /// Store size after the refresh
    pub total: usize,
}

impl RefreshReport {
    /// Records accepted across all feeds
    pub fn accepted(&self) -> usize {
        self.sources.iter().map(|s| s.accepted).sum()
    }
}

/// Feeds plus the store they reconcile into
pub struct CriteriaSync {
    store: Arc<CriteriaStore>,
    feeds: Vec<Arc<dyn CriteriaFeed>>,
}

impl CriteriaSync {
    pub fn new(store: Arc<CriteriaStore>) -> Self {
        Self {
            store,
            feeds: Vec::new(),
        }
    }

    /// Register a feed; feeds are queried in registration order
    pub fn with_feed(mut self, feed: Arc<dyn CriteriaFeed>) -> Self {
        self.feeds.push(feed);
        self
    }

    pub fn store(&self) -> &Arc<CriteriaStore> {
        &self.store
    }

    /// Sources in query order
    pub fn sources(&self) -> Vec<FeedSource> {
        self.feeds.iter().map(|feed| feed.source()).collect()
    }

    /// Query every feed and ingest what they return
    pub async fn refresh(&self, program: Option<&ProgramId>) -> RefreshReport {
        let mut report = RefreshReport {
            program_id: program.cloned(),
            ..RefreshReport::default()
        };

        for feed in &self.feeds {
            let source = feed.source();
            match feed.fetch(program).await {
                Ok(records) => {
                    let ingested = self.store.ingest_from(source, &records);
                    report.sources.push(SourceReport {
                        source,
                        fetched: records.len(),
                        accepted: ingested.accepted,
                        dropped: ingested.dropped,
                    });
                }
                Err(e) => {
                    warn!(source = %source, "Criteria feed unavailable: {:#}", e);
                    report.failed.push(source);
                }
            }
        }

        report.total = self.store.len();
        info!(
            program = %program.map(ProgramId::canonical).unwrap_or_else(|| "*".to_string()),
            accepted = report.accepted(),
            failed = report.failed.len(),
            total = report.total,
            "Criteria refresh complete"
        );
        report
    }
}

/// Refresh on a fixed interval until `cancel` fires
///
/// Each tick refreshes the unscoped view, then every program in
/// `programs`. The first tick fires immediately. Cancel the token on
/// shutdown so the task does not outlive the state it references.
pub fn spawn_refresh_loop(
    sync: Arc<CriteriaSync>,
    programs: Vec<ProgramId>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Criteria refresh loop started (every {:?})", period);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    sync.refresh(None).await;
                    for program in &programs {
                        if cancel.is_cancelled() {
                            break;
                        }
                        sync.refresh(Some(program)).await;
                    }
                }
            }
        }

        info!("Criteria refresh loop stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use accelera_common::RawCriterion;
    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticFeed {
        source: FeedSource,
        records: Vec<Value>,
        calls: AtomicUsize,
    }

    impl StaticFeed {
        fn new(source: FeedSource, records: Vec<Value>) -> Arc<Self> {
            Arc::new(Self {
                source,
                records,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CriteriaFeed for StaticFeed {
        fn source(&self) -> FeedSource {
            self.source
        }

        async fn fetch(&self, _program: Option<&ProgramId>) -> Result<Vec<RawCriterion>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .records
                .iter()
                .map(|v| serde_json::from_value(v.clone()))
                .collect::<std::result::Result<_, _>>()?)
        }
    }

    struct BrokenFeed;

    #[async_trait]
    impl CriteriaFeed for BrokenFeed {
        fn source(&self) -> FeedSource {
            FeedSource::Remote
        }

        async fn fetch(&self, _program: Option<&ProgramId>) -> Result<Vec<RawCriterion>> {
            anyhow::bail!("connection refused")
        }
    }

    #[tokio::test]
    async fn test_later_feed_wins() {
        let store = Arc::new(CriteriaStore::new());
        let sync = CriteriaSync::new(Arc::clone(&store))
            .with_feed(StaticFeed::new(
                FeedSource::Cache,
                vec![json!({"id": "c1", "programId": "7", "weight": 40})],
            ))
            .with_feed(StaticFeed::new(
                FeedSource::Remote,
                vec![json!({"id": "c1", "programId": 7, "weight": 55})],
            ));

        assert_eq!(sync.sources(), vec![FeedSource::Cache, FeedSource::Remote]);
        let report = sync.refresh(Some(&ProgramId::from("7"))).await;

        assert_eq!(report.total, 1);
        assert_eq!(report.accepted(), 2);
        assert!(report.failed.is_empty());
        assert_eq!(store.all()[0].weight, 55.0);
    }

    #[tokio::test]
    async fn test_failed_feed_does_not_abort_others() {
        let store = Arc::new(CriteriaStore::new());
        let sync = CriteriaSync::new(Arc::clone(&store))
            .with_feed(Arc::new(BrokenFeed))
            .with_feed(StaticFeed::new(
                FeedSource::Memory,
                vec![json!({"id": "m1"}), json!({"name": "no id"})],
            ));

        let report = sync.refresh(None).await;

        assert_eq!(report.failed, vec![FeedSource::Remote]);
        assert_eq!(report.sources.len(), 1);
        assert_eq!(report.sources[0].fetched, 2);
        assert_eq!(report.sources[0].accepted, 1);
        assert_eq!(report.sources[0].dropped, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_loop_runs_until_cancelled() {
        let store = Arc::new(CriteriaStore::new());
        let feed = StaticFeed::new(FeedSource::Memory, vec![json!({"id": "a"})]);
        let sync = Arc::new(
            CriteriaSync::new(Arc::clone(&store)).with_feed(Arc::clone(&feed) as Arc<dyn CriteriaFeed>),
        );

        let cancel = CancellationToken::new();
        let handle = spawn_refresh_loop(
            Arc::clone(&sync),
            vec![ProgramId::from(1)],
            Duration::from_millis(10),
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_millis(60)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("refresh loop should stop after cancel")
            .expect("refresh loop should not panic");

        // Unscoped + one program per tick, at least one tick
        let calls = feed.calls.load(Ordering::SeqCst);
        assert!(calls >= 2, "expected at least one full tick, got {} calls", calls);
        assert_eq!(store.len(), 1);

        // No further refreshes after cancellation
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(feed.calls.load(Ordering::SeqCst), calls);
    }
}
