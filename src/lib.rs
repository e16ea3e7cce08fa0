//! Streaming response core for an AI project workspace.
//!
//! A user turn goes out to a chat completion endpoint; the chunked reply is
//! decoded incrementally (`chat_stream`), rendered token-by-token through a
//! turn-list observer, and — once assembled — scanned for an embedded block
//! of file mutation intents (`file_actions`). Extracted intents are
//! reconciled against the project's file store (`project_store`), after
//! which the local file view is reloaded wholesale from authoritative
//! storage. A remote-change listener feeds the same reload path, so the
//! view converges to store state no matter which writer ran last.
//!
//! Concurrency contract: one logical task, cooperative interleaving at
//! await points. The turn list and file view live behind mutexes that are
//! never held across an await. In-flight streams carry a generation token;
//! output of a superseded stream is discarded rather than raced into the
//! turn list.

pub mod error;
pub mod reconcile;
pub mod session;
pub mod sync;
pub mod transport;

pub use error::WorkspaceError;
pub use reconcile::apply_actions;
pub use session::ChatSession;
pub use sync::{refresh_files, spawn_change_listener, FileView};
pub use transport::CompletionTransport;
