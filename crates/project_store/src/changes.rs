use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::StoreError;

/// Kind of change observed on a project's file collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One out-of-band change notification.
///
/// The payload makes no guarantee beyond "something in this project's
/// files changed"; consumers re-read authoritative state rather than
/// interpreting the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub project_id: String,
    pub kind: ChangeKind,
}

/// Live subscription to one project's file-change notifications.
///
/// Events arrive on an unbounded channel; dropping the subscription (or
/// calling [`ChangeSubscription::unsubscribe`]) detaches it from the feed.
#[derive(Debug)]
pub struct ChangeSubscription {
    events: mpsc::UnboundedReceiver<ChangeEvent>,
}

impl ChangeSubscription {
    #[must_use]
    pub fn new(events: mpsc::UnboundedReceiver<ChangeEvent>) -> Self {
        Self { events }
    }

    /// Waits for the next change event. `None` means the feed closed.
    pub async fn next_event(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    /// Detaches from the feed. Dropping the subscription has the same
    /// effect; this form just names the intent.
    pub fn unsubscribe(mut self) {
        self.events.close();
    }
}

/// Source of out-of-band file-change notifications.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Subscribes to change events scoped to one project.
    async fn subscribe(&self, project_id: &str) -> Result<ChangeSubscription, StoreError>;
}
