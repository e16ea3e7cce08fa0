use thiserror::Error;

/// Failure of a persistence or subscription operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend failed while {operation}: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },

    #[error("no file record with id '{id}'")]
    NotFound { id: String },

    #[error("project '{project_id}' already has a file at '{path}'")]
    DuplicatePath { project_id: String, path: String },

    #[error("change subscription for project '{project_id}' failed: {message}")]
    Subscription {
        project_id: String,
        message: String,
    },

    #[error("failed to format current UTC timestamp as RFC3339: {0}")]
    ClockFormat(#[source] time::error::Format),
}

impl StoreError {
    #[must_use]
    pub fn backend(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            operation,
            message: message.into(),
        }
    }
}
