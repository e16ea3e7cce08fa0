use async_trait::async_trait;

use crate::error::StoreError;
use crate::schema::{FilePatch, FileRecord, NewFileRecord};

/// Persistence operations the core depends on.
///
/// Implementations are key/path lookup plus upsert-style writes; the core
/// holds no transaction across calls, so a batch of writes interrupted by
/// a failure stays partially applied.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// All file records for one project.
    async fn list_files(&self, project_id: &str) -> Result<Vec<FileRecord>, StoreError>;

    /// The record at `path` within the project, when present.
    async fn find_file_by_path(
        &self,
        project_id: &str,
        path: &str,
    ) -> Result<Option<FileRecord>, StoreError>;

    /// Inserts a new record. Fails with [`StoreError::DuplicatePath`] when
    /// the path is already taken within the project.
    async fn insert_file(&self, file: NewFileRecord) -> Result<FileRecord, StoreError>;

    /// Applies a partial update to the record with `id` and returns the
    /// updated record.
    async fn update_file(&self, id: &str, patch: FilePatch) -> Result<FileRecord, StoreError>;
}
