use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chat_stream::{CancellationSignal, ChatRequest, ChatTurn, Role};
use file_actions::extract_actions;
use project_store::{FileRecord, FileStore};
use tokio::task::JoinHandle;

use crate::error::WorkspaceError;
use crate::reconcile::apply_actions;
use crate::sync::{refresh_files, spawn_change_listener, FileView};
use crate::transport::CompletionTransport;

/// Monotonic token identifying one in-flight stream.
type Generation = u64;

#[derive(Debug, Default)]
struct SessionState {
    turns: Vec<ChatTurn>,
    selected_file: Option<String>,
}

/// One user's conversation with the model, scoped to one project.
///
/// Owns the ordered turn list and the "currently selected file" that edit
/// intents target. State sits behind a mutex that is never held across an
/// await, so concurrent sends interleave safely; each send carries a
/// generation token and a stream that has been superseded by a newer send
/// has its output discarded instead of raced into shared state.
pub struct ChatSession {
    transport: Arc<dyn CompletionTransport>,
    store: Arc<dyn FileStore>,
    project_id: String,
    files: FileView,
    state: Mutex<SessionState>,
    generation: AtomicU64,
}

impl ChatSession {
    pub fn new(
        transport: Arc<dyn CompletionTransport>,
        store: Arc<dyn FileStore>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            store,
            project_id: project_id.into(),
            files: FileView::new(),
            state: Mutex::new(SessionState::default()),
            generation: AtomicU64::new(0),
        }
    }

    /// Snapshot of the conversation so far.
    #[must_use]
    pub fn turns(&self) -> Vec<ChatTurn> {
        self.lock_state().turns.clone()
    }

    /// Shared file view fed by reloads; clone it into rendering code.
    #[must_use]
    pub fn files(&self) -> &FileView {
        &self.files
    }

    /// Snapshot of the current file listing.
    #[must_use]
    pub fn file_records(&self) -> Vec<FileRecord> {
        self.files.snapshot()
    }

    /// Id of the currently selected file, when any.
    #[must_use]
    pub fn selected_file(&self) -> Option<String> {
        self.lock_state().selected_file.clone()
    }

    /// Sends one user message and streams the assistant reply.
    ///
    /// `on_update` observes the full turn list after the optimistic user
    /// turn is recorded, after every appended delta, and after the final
    /// turn commit — call frequency is one per token, suitable for
    /// progressive rendering. While the stream is live the trailing
    /// assistant turn is replaced in place (coalesced), never duplicated.
    ///
    /// On transport failure the optimistic user turn (and any partial
    /// assistant turn) is rolled back before the error is returned. On
    /// success the final text is scanned for file mutation intents, which
    /// are reconciled against the store followed by a full reload of the
    /// file view.
    pub async fn send_message<F>(
        &self,
        prompt: impl Into<String>,
        cancellation: Option<&CancellationSignal>,
        mut on_update: F,
    ) -> Result<String, WorkspaceError>
    where
        F: FnMut(&[ChatTurn]) + Send,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let request = {
            let mut state = self.lock_state();
            state.turns.push(ChatTurn::user(prompt.into()));
            on_update(&state.turns);
            ChatRequest::new(state.turns.clone())
        };

        let mut appended_partial = false;
        let mut handle_delta = |text: &str| {
            if !self.is_current(generation) {
                return;
            }
            appended_partial = true;
            let mut state = self.lock_state();
            coalesce_assistant_turn(&mut state.turns, text);
            let turns = state.turns.clone();
            drop(state);
            on_update(&turns);
        };
        let streamed = self
            .transport
            .stream_message(&request, cancellation, &mut handle_delta)
            .await;

        let final_text = match streamed {
            Ok(text) => text,
            Err(error) => {
                if self.is_current(generation) {
                    let mut state = self.lock_state();
                    if appended_partial
                        && state.turns.last().map(|turn| turn.role) == Some(Role::Assistant)
                    {
                        state.turns.pop();
                    }
                    if state.turns.last().map(|turn| turn.role) == Some(Role::User) {
                        state.turns.pop();
                    }
                    let turns = state.turns.clone();
                    drop(state);
                    on_update(&turns);
                }
                return Err(error.into());
            }
        };

        if !self.is_current(generation) {
            tracing::debug!(generation, "discarding superseded stream result");
            return Ok(final_text);
        }

        {
            let mut state = self.lock_state();
            if !final_text.is_empty() {
                coalesce_assistant_turn(&mut state.turns, &final_text);
            }
            let turns = state.turns.clone();
            drop(state);
            on_update(&turns);
        }

        self.apply_assistant_reply(&final_text).await?;
        Ok(final_text)
    }

    /// Extracts file mutation intents from final assistant text and
    /// reconciles them against the store, then reloads the file view.
    ///
    /// Plain conversational text (no action block) has no side effects.
    /// Returns the number of intents applied to storage — partial counts
    /// are lost on error, but applied intents stay applied.
    pub async fn apply_assistant_reply(&self, text: &str) -> Result<usize, WorkspaceError> {
        let actions = extract_actions(text);
        if actions.is_empty() {
            return Ok(0);
        }
        let count = actions.len();

        let mut selected = self.lock_state().selected_file.clone();
        let applied = apply_actions(
            self.store.as_ref(),
            &self.project_id,
            &mut selected,
            actions,
        )
        .await;

        // Selection reflects whatever was applied, even on partial failure.
        self.lock_state().selected_file = selected;

        let reloaded = refresh_files(self.store.as_ref(), &self.project_id, &self.files).await;
        applied?;
        reloaded?;
        Ok(count)
    }

    /// Reloads the file view from authoritative storage.
    pub async fn refresh_files(&self) -> Result<(), WorkspaceError> {
        refresh_files(self.store.as_ref(), &self.project_id, &self.files).await
    }

    /// Wires a change subscription into this session's reload path on a
    /// background task.
    pub fn attach_change_listener(
        &self,
        subscription: project_store::ChangeSubscription,
    ) -> JoinHandle<()> {
        spawn_change_listener(
            Arc::clone(&self.store),
            self.project_id.clone(),
            self.files.clone(),
            subscription,
        )
    }

    fn is_current(&self, generation: Generation) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Replaces the trailing assistant turn with the updated accumulated text,
/// or appends a new assistant turn when the last entry is the user's.
fn coalesce_assistant_turn(turns: &mut Vec<ChatTurn>, text: &str) {
    match turns.last_mut() {
        Some(turn) if turn.role == Role::Assistant => {
            turn.content.clear();
            turn.content.push_str(text);
        }
        _ => turns.push(ChatTurn::assistant(text)),
    }
}
