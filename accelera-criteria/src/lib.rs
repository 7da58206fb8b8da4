//! accelera-criteria library - Criteria reconciliation service
//!
//! Serves evaluation criteria reconciled from the local cache, the
//! in-memory list and the remote backend, scoped per program, and accepts
//! creation events from the criterion builder.

use accelera_common::CriteriaStore;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod feeds;
pub mod sync;

use api::SseBroadcaster;
use feeds::CacheFeed;
use sync::CriteriaSync;

/// SSE buffer per client
pub const SSE_CAPACITY: usize = 100;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Reconciled criteria
    pub store: Arc<CriteriaStore>,
    /// Feeds feeding `store`
    pub sync: Arc<CriteriaSync>,
    /// Local cache, written when criteria are created
    pub cache: CacheFeed,
    /// Creation events for SSE clients
    pub events: SseBroadcaster,
}

impl AppState {
    /// Create new application state
    ///
    /// Attaches the SSE broadcaster to the store behind `sync`.
    pub fn new(sync: Arc<CriteriaSync>, cache: CacheFeed) -> Self {
        let store = Arc::clone(sync.store());
        let events = SseBroadcaster::attach(&store, SSE_CAPACITY);
        Self {
            store,
            sync,
            cache,
            events,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let criteria = Router::new()
        .route(
            "/api/criteria",
            get(api::list_criteria).post(api::create_criterion),
        )
        .route("/api/criteria/refresh", post(api::refresh_criteria))
        .route("/api/criteria/:id", get(api::get_criterion))
        .route("/api/events", get(api::event_stream));

    Router::new()
        .merge(criteria)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
