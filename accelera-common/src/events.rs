//! Change notification for Accelera criteria
//!
//! Provides the `CriterionCreated` event and a synchronous, typed
//! publish/subscribe fan-out (`ChangeNotifier`). Producers publish without
//! knowing who listens; views subscribe without knowing who produces.

use crate::criteria::{Criterion, ProgramId};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::{debug, warn};

/// A criterion was authored somewhere in the application
///
/// Carries the canonical (already normalized) criterion, so subscribers
/// never see raw record shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionCreated {
    /// Program the criterion was created for
    pub program_id: ProgramId,
    /// Normalized criterion
    pub criterion: Criterion,
    /// When the criterion was accepted
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl CriterionCreated {
    /// Create an event stamped with the current time
    pub fn new(program_id: ProgramId, criterion: Criterion) -> Self {
        Self {
            program_id,
            criterion,
            timestamp: chrono::Utc::now(),
        }
    }
}

type Handler<E> = Arc<dyn Fn(&E) -> anyhow::Result<()> + Send + Sync>;

/// One registered handler; `active` is shared with its `Subscription`
struct Entry<E> {
    id: u64,
    active: Arc<AtomicBool>,
    handler: Handler<E>,
}

impl<E> Clone for Entry<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            active: Arc::clone(&self.active),
            handler: Arc::clone(&self.handler),
        }
    }
}

struct Registry<E> {
    next_id: AtomicU64,
    handlers: Mutex<Vec<Entry<E>>>,
}

impl<E> Registry<E> {
    fn remove(&self, id: u64) {
        let mut handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        handlers.retain(|entry| entry.id != id);
    }
}

/// Synchronous publish/subscribe fan-out
///
/// - `publish` invokes every current handler in subscription order before
///   returning.
/// - A handler that returns `Err` or panics is logged and skipped; the
///   remaining handlers still receive the event.
/// - Handlers may subscribe or unsubscribe from inside a publish. A handler
///   subscribed during a publish first sees the next event; a handler
///   unsubscribed during a publish is skipped for the rest of it.
///
/// Cloning yields another handle to the same subscriber list.
///
/// # Examples
///
/// ```
/// use accelera_common::events::ChangeNotifier;
///
/// let notifier = ChangeNotifier::<String>::new();
/// let subscription = notifier.subscribe(|event: &String| {
///     println!("received {event}");
///     Ok(())
/// });
///
/// assert_eq!(notifier.publish(&"hello".to_string()), 1);
/// subscription.unsubscribe();
/// assert_eq!(notifier.publish(&"ignored".to_string()), 0);
/// ```
pub struct ChangeNotifier<E> {
    registry: Arc<Registry<E>>,
}

impl<E> Clone for ChangeNotifier<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<E> Default for ChangeNotifier<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> ChangeNotifier<E> {
    /// Creates a notifier with no subscribers
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                next_id: AtomicU64::new(1),
                handlers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Register a handler for all future events
    ///
    /// The handler stays registered until `Subscription::unsubscribe` is
    /// called. Dropping the `Subscription` does not unsubscribe.
    pub fn subscribe<F>(&self, handler: F) -> Subscription<E>
    where
        F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let active = Arc::new(AtomicBool::new(true));
        self.registry
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Entry {
                id,
                active: Arc::clone(&active),
                handler: Arc::new(handler),
            });
        debug!(subscriber = id, "Change handler subscribed");

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
            active,
        }
    }

    /// Deliver an event to every current subscriber
    ///
    /// Returns the number of handlers that completed successfully.
    pub fn publish(&self, event: &E) -> usize {
        let handlers: Vec<Entry<E>> = self
            .registry
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut delivered = 0;
        for Entry { id, active, handler } in handlers {
            // May have been unsubscribed by an earlier handler in this loop
            if !active.load(Ordering::Acquire) {
                continue;
            }
            match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => warn!(subscriber = id, "Change handler failed: {:#}", e),
                Err(_) => warn!(subscriber = id, "Change handler panicked"),
            }
        }
        delivered
    }

    /// Get the current number of subscribers
    pub fn subscriber_count(&self) -> usize {
        self.registry
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Handle returned by `ChangeNotifier::subscribe`
pub struct Subscription<E> {
    id: u64,
    registry: Weak<Registry<E>>,
    active: Arc<AtomicBool>,
}

impl<E> Subscription<E> {
    /// Remove the handler. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
            debug!(subscriber = self.id, "Change handler unsubscribed");
        }
    }

    /// Whether `unsubscribe` has not been called yet
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl<E> std::fmt::Debug for Subscription<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
