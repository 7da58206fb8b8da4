//! Server-Sent Events (SSE) for criterion creation
//!
//! Bridges the store's synchronous `ChangeNotifier` onto a tokio broadcast
//! channel, so each connected client gets its own async stream of
//! `CriterionCreated` events.

use crate::AppState;
use accelera_common::{CriteriaStore, CriterionCreated, Subscription};
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

/// SSE event name for created criteria
pub const CRITERION_CREATED: &str = "CriterionCreated";

/// SSE Broadcaster forwards store notifications to connected clients
#[derive(Clone)]
pub struct SseBroadcaster {
    tx: broadcast::Sender<CriterionCreated>,
    subscription: Arc<Subscription<CriterionCreated>>,
}

impl SseBroadcaster {
    /// Subscribe to `store` and start forwarding its creation events
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer per client before the
    ///   slowest client starts missing events
    pub fn attach(store: &CriteriaStore, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        let forward = tx.clone();
        let subscription = store.notifier().subscribe(move |event: &CriterionCreated| {
            // No connected clients is not a failure
            let _ = forward.send(event.clone());
            Ok(())
        });
        info!("SSE broadcaster attached with capacity {}", capacity);

        Self {
            tx,
            subscription: Arc::new(subscription),
        }
    }

    /// Get current number of connected clients
    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Stop forwarding store events (idempotent)
    pub fn detach(&self) {
        self.subscription.unsubscribe();
    }

    /// Raw receiver for in-process listeners
    pub fn subscribe_receiver(&self) -> broadcast::Receiver<CriterionCreated> {
        self.tx.subscribe()
    }

    /// Create an SSE stream for a new client connection
    pub fn subscribe_stream(&self) -> impl Stream<Item = Result<Event, Infallible>> {
        BroadcastStream::new(self.subscribe_receiver()).filter_map(|result| async move {
            match result {
                Ok(created) => match Event::default().event(CRITERION_CREATED).json_data(&created) {
                    Ok(event) => {
                        debug!("Broadcasting SSE event for criterion {}", created.criterion.id);
                        Some(Ok(event))
                    }
                    Err(e) => {
                        warn!("Failed to serialize SSE event: {}", e);
                        None
                    }
                },
                Err(e) => {
                    // Lagged client: skip the missed events and continue
                    warn!("SSE client error: {:?}", e);
                    None
                }
            }
        })
    }
}

/// GET /api/events - SSE stream of created criteria
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(
        "New SSE client connected, total clients: {}",
        state.events.client_count() + 1
    );

    Sse::new(state.events.subscribe_stream()).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
