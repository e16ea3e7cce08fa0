use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::StoreError;

/// One persisted project file. `path` is unique within a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub project_id: String,
    pub path: String,
    /// Opaque to the core; never interpreted or diffed.
    pub content: String,
    pub language: String,
    /// RFC 3339 timestamps.
    pub created_at: String,
    pub updated_at: String,
}

/// Insert payload for a new file record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFileRecord {
    pub project_id: String,
    pub path: String,
    pub content: String,
    pub language: String,
}

/// Partial update applied through `update_file`. Unset fields keep their
/// stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePatch {
    pub content: Option<String>,
    pub language: Option<String>,
}

impl FilePatch {
    #[must_use]
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            language: None,
        }
    }

    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

pub(crate) fn now_rfc3339() -> Result<String, StoreError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(StoreError::ClockFormat)
}
