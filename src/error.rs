use thiserror::Error;

/// User-visible failure of a workspace operation.
///
/// Frame-level and extraction-level problems never reach this type; they
/// are recovered where they occur. What surfaces here is a transport
/// failure (the triggering user turn has already been rolled back) or a
/// persistence failure (intents applied before the failure stay applied).
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("completion request failed: {0}")]
    Transport(#[from] chat_stream::ChatApiError),

    #[error("file persistence failed: {0}")]
    Persistence(#[from] project_store::StoreError),
}
