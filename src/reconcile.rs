use file_actions::{ActionKind, FileAction};
use project_store::{FilePatch, FileStore, NewFileRecord};

use crate::error::WorkspaceError;

/// Applies one batch of mutation intents against the store, in order.
///
/// `selected_file` is the caller's "currently active file" and is updated
/// as a side effect: every applied `Create` selects the resulting record.
/// Order therefore matters for selection, not for storage correctness.
///
/// There is no transaction across the batch: a failure part-way through
/// leaves earlier intents applied and surfaces the error.
pub async fn apply_actions(
    store: &dyn FileStore,
    project_id: &str,
    selected_file: &mut Option<String>,
    actions: Vec<FileAction>,
) -> Result<(), WorkspaceError> {
    for action in actions {
        match action.kind {
            ActionKind::Create => {
                // Repeated create intents for one path behave as idempotent
                // upserts, not duplicate-key errors.
                let existing = store.find_file_by_path(project_id, &action.path).await?;
                let record = match existing {
                    Some(existing) => {
                        store
                            .update_file(
                                &existing.id,
                                FilePatch::content(action.content).with_language(action.language),
                            )
                            .await?
                    }
                    None => {
                        store
                            .insert_file(NewFileRecord {
                                project_id: project_id.to_string(),
                                path: action.path,
                                content: action.content,
                                language: action.language,
                            })
                            .await?
                    }
                };

                *selected_file = Some(record.id);
            }
            ActionKind::Edit => {
                // Edit targets the current selection; the intent's path is
                // informational only (preserved upstream quirk).
                match selected_file.as_deref() {
                    Some(id) => {
                        store
                            .update_file(id, FilePatch::content(action.content))
                            .await?;
                    }
                    None => {
                        tracing::warn!(
                            path = %action.path,
                            "dropping edit intent: no file is selected"
                        );
                    }
                }
            }
        }
    }

    Ok(())
}
