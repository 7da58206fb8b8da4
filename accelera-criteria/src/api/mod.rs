//! HTTP API handlers for accelera-criteria

pub mod criteria;
pub mod health;
pub mod sse;

pub use criteria::{create_criterion, get_criterion, list_criteria, refresh_criteria};
pub use health::health_routes;
pub use sse::{event_stream, SseBroadcaster};
