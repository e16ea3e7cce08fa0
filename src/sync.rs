use std::sync::{Arc, Mutex, MutexGuard};

use project_store::{ChangeSubscription, FileRecord, FileStore};
use tokio::task::JoinHandle;

use crate::error::WorkspaceError;

/// Shared, observable view of one project's file collection.
///
/// Two independent writers feed it — the reconciler's post-apply reload
/// and the remote-change listener — so it is only ever replaced wholesale
/// from authoritative store state, never patched in place. Last full
/// reload wins.
#[derive(Debug, Clone, Default)]
pub struct FileView {
    records: Arc<Mutex<Vec<FileRecord>>>,
}

impl FileView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents, cloned out. Cheap at workspace file counts.
    #[must_use]
    pub fn snapshot(&self) -> Vec<FileRecord> {
        lock_unpoisoned(&self.records).clone()
    }

    /// Replaces the whole view with a fresh authoritative listing.
    pub fn replace(&self, records: Vec<FileRecord>) {
        *lock_unpoisoned(&self.records) = records;
    }
}

/// Reloads the project's file collection from the store into `view`.
///
/// Idempotent and stateless with respect to what triggered it; running it
/// twice for one change is harmless and expected.
pub async fn refresh_files(
    store: &dyn FileStore,
    project_id: &str,
    view: &FileView,
) -> Result<(), WorkspaceError> {
    let records = store.list_files(project_id).await?;
    view.replace(records);
    Ok(())
}

/// Consumes a change subscription on a background task, reloading the
/// file view on every notification.
///
/// Reload failures on this path are logged and swallowed: the listener
/// stays passive rather than crashing the session. The task ends when the
/// feed closes or the subscription is dropped.
pub fn spawn_change_listener(
    store: Arc<dyn FileStore>,
    project_id: String,
    view: FileView,
    mut subscription: ChangeSubscription,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = subscription.next_event().await {
            tracing::debug!(kind = ?event.kind, project_id = %event.project_id, "remote file change");

            if let Err(error) = refresh_files(store.as_ref(), &project_id, &view).await {
                tracing::warn!(%error, %project_id, "file reload after remote change failed");
            }
        }

        tracing::debug!(%project_id, "change feed closed");
    })
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
