use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::changes::{ChangeEvent, ChangeFeed, ChangeKind, ChangeSubscription};
use crate::error::StoreError;
use crate::schema::{now_rfc3339, FilePatch, FileRecord, NewFileRecord};
use crate::store::FileStore;

#[derive(Debug, Default)]
struct Inner {
    files: HashMap<String, FileRecord>,
    subscribers: Vec<(String, mpsc::UnboundedSender<ChangeEvent>)>,
}

/// In-process implementation of [`FileStore`] and [`ChangeFeed`].
///
/// Used by tests and local development. Enforces per-project path
/// uniqueness and fans change events out to live subscribers on every
/// write, which makes it a convenient stand-in for a relational store
/// with a realtime channel.
#[derive(Debug, Default)]
pub struct MemoryFileStore {
    inner: Mutex<Inner>,
}

impl MemoryFileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records across all projects. Test convenience.
    pub fn len(&self) -> usize {
        lock_unpoisoned(&self.inner).files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes a record by id, notifying subscribers. The core never
    /// deletes files; this exists so tests can exercise the
    /// remote-change path for deletions.
    pub fn remove_file(&self, id: &str) -> Option<FileRecord> {
        let mut inner = lock_unpoisoned(&self.inner);
        let removed = inner.files.remove(id);
        if let Some(record) = &removed {
            let project_id = record.project_id.clone();
            publish(&mut inner, &project_id, ChangeKind::Delete);
        }
        removed
    }
}

impl Inner {
    fn find_by_path(&self, project_id: &str, path: &str) -> Option<&FileRecord> {
        self.files
            .values()
            .find(|record| record.project_id == project_id && record.path == path)
    }
}

fn publish(inner: &mut Inner, project_id: &str, kind: ChangeKind) {
    inner.subscribers.retain(|(subscribed_project, sender)| {
        if subscribed_project != project_id {
            return !sender.is_closed();
        }

        sender
            .send(ChangeEvent {
                project_id: project_id.to_string(),
                kind,
            })
            .is_ok()
    });
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn list_files(&self, project_id: &str) -> Result<Vec<FileRecord>, StoreError> {
        let inner = lock_unpoisoned(&self.inner);
        let mut records: Vec<FileRecord> = inner
            .files
            .values()
            .filter(|record| record.project_id == project_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(records)
    }

    async fn find_file_by_path(
        &self,
        project_id: &str,
        path: &str,
    ) -> Result<Option<FileRecord>, StoreError> {
        let inner = lock_unpoisoned(&self.inner);
        Ok(inner.find_by_path(project_id, path).cloned())
    }

    async fn insert_file(&self, file: NewFileRecord) -> Result<FileRecord, StoreError> {
        let now = now_rfc3339()?;
        let mut inner = lock_unpoisoned(&self.inner);

        if inner.find_by_path(&file.project_id, &file.path).is_some() {
            return Err(StoreError::DuplicatePath {
                project_id: file.project_id,
                path: file.path,
            });
        }

        let record = FileRecord {
            id: Uuid::new_v4().to_string(),
            project_id: file.project_id,
            path: file.path,
            content: file.content,
            language: file.language,
            created_at: now.clone(),
            updated_at: now,
        };

        inner.files.insert(record.id.clone(), record.clone());
        let project_id = record.project_id.clone();
        publish(&mut inner, &project_id, ChangeKind::Insert);
        Ok(record)
    }

    async fn update_file(&self, id: &str, patch: FilePatch) -> Result<FileRecord, StoreError> {
        let now = now_rfc3339()?;
        let mut inner = lock_unpoisoned(&self.inner);

        let record = match inner.files.get_mut(id) {
            Some(record) => record,
            None => {
                return Err(StoreError::NotFound { id: id.to_string() });
            }
        };

        if let Some(content) = patch.content {
            record.content = content;
        }
        if let Some(language) = patch.language {
            record.language = language;
        }
        record.updated_at = now;

        let updated = record.clone();
        let project_id = updated.project_id.clone();
        publish(&mut inner, &project_id, ChangeKind::Update);
        Ok(updated)
    }
}

#[async_trait]
impl ChangeFeed for MemoryFileStore {
    async fn subscribe(&self, project_id: &str) -> Result<ChangeSubscription, StoreError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut inner = lock_unpoisoned(&self.inner);
        inner.subscribers.push((project_id.to_string(), sender));
        Ok(ChangeSubscription::new(receiver))
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryFileStore;
    use crate::changes::{ChangeFeed, ChangeKind};
    use crate::error::StoreError;
    use crate::schema::{FilePatch, NewFileRecord};
    use crate::store::FileStore;

    fn new_file(project_id: &str, path: &str, content: &str) -> NewFileRecord {
        NewFileRecord {
            project_id: project_id.to_string(),
            path: path.to_string(),
            content: content.to_string(),
            language: "javascript".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_then_find_by_path() {
        let store = MemoryFileStore::new();
        let inserted = store
            .insert_file(new_file("p1", "a.js", "v1"))
            .await
            .expect("insert should succeed");

        let found = store
            .find_file_by_path("p1", "a.js")
            .await
            .expect("find should succeed")
            .expect("record should exist");
        assert_eq!(found, inserted);

        assert!(store
            .find_file_by_path("p2", "a.js")
            .await
            .expect("find should succeed")
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_path_within_project_is_rejected() {
        let store = MemoryFileStore::new();
        store
            .insert_file(new_file("p1", "a.js", "v1"))
            .await
            .expect("insert should succeed");

        let error = store
            .insert_file(new_file("p1", "a.js", "v2"))
            .await
            .expect_err("duplicate path must be rejected");
        assert!(matches!(error, StoreError::DuplicatePath { .. }));

        // Same path in a different project is fine.
        store
            .insert_file(new_file("p2", "a.js", "v1"))
            .await
            .expect("insert in another project should succeed");
    }

    #[tokio::test]
    async fn update_patches_only_set_fields() {
        let store = MemoryFileStore::new();
        let record = store
            .insert_file(new_file("p1", "a.js", "v1"))
            .await
            .expect("insert should succeed");

        let updated = store
            .update_file(&record.id, FilePatch::content("v2"))
            .await
            .expect("update should succeed");
        assert_eq!(updated.content, "v2");
        assert_eq!(updated.language, "javascript");

        let error = store
            .update_file("missing-id", FilePatch::content("x"))
            .await
            .expect_err("unknown id must fail");
        assert!(matches!(error, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn writes_notify_project_scoped_subscribers() {
        let store = MemoryFileStore::new();
        let mut ours = store.subscribe("p1").await.expect("subscribe");
        let mut theirs = store.subscribe("p2").await.expect("subscribe");

        let record = store
            .insert_file(new_file("p1", "a.js", "v1"))
            .await
            .expect("insert should succeed");
        store
            .update_file(&record.id, FilePatch::content("v2"))
            .await
            .expect("update should succeed");
        store.remove_file(&record.id).expect("remove should succeed");

        let kinds: Vec<ChangeKind> = [
            ours.next_event().await.expect("insert event").kind,
            ours.next_event().await.expect("update event").kind,
            ours.next_event().await.expect("delete event").kind,
        ]
        .into();
        assert_eq!(
            kinds,
            vec![ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete]
        );

        // The other project's subscriber saw nothing.
        store
            .insert_file(new_file("p2", "b.js", "v1"))
            .await
            .expect("insert should succeed");
        let event = theirs.next_event().await.expect("p2 insert event");
        assert_eq!(event.project_id, "p2");
    }
}
