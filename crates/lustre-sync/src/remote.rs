//! The remote-subscription capability consumed by the stores.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use lustre_core::Result;

/// One delivery from a remote subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    /// The full current contents of the collection.
    Snapshot(Vec<JsonValue>),
    /// The subscription was rejected or dropped.
    Error(String),
}

/// Callback receiving every delivery of one subscription.
///
/// Listeners may be invoked from any thread, including synchronously from
/// inside [`RemoteSource::subscribe`].
pub type Listener = Arc<dyn Fn(RemoteEvent) + Send + Sync>;

/// Ends delivery for one subscription.
pub trait SubscriptionHandle: Send {
    /// Stop delivering to the listener. Calling it more than once is a no-op.
    fn unsubscribe(&mut self);
}

/// A source of live collection snapshots (a document database, a test double).
pub trait RemoteSource: Send + Sync {
    /// Register `listener` on `collection`.
    ///
    /// An `Err` means the subscription could not be established; stores
    /// handle it exactly like a listener error.
    fn subscribe(&self, collection: &str, listener: Listener) -> Result<Box<dyn SubscriptionHandle>>;
}

/// What a store must release when an attempt ends.
///
/// Collected while the store state is locked and run after the lock is
/// released, so the remote is never called with the lock held.
#[derive(Default)]
pub(crate) struct Teardown {
    pub(crate) subscription: Option<Box<dyn SubscriptionHandle>>,
    pub(crate) timer: Option<tokio::task::AbortHandle>,
}

impl Teardown {
    pub(crate) fn is_empty(&self) -> bool {
        self.subscription.is_none() && self.timer.is_none()
    }

    pub(crate) fn run(self) {
        if let Some(timer) = self.timer {
            timer.abort();
        }
        if let Some(mut subscription) = self.subscription {
            subscription.unsubscribe();
        }
    }
}
