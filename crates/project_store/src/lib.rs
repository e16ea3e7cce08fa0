//! Persistence boundary for project file records.
//!
//! The core never talks to a concrete database; it depends on the
//! [`FileStore`] and [`ChangeFeed`] traits defined here. A relational
//! backing store implements them out of tree. [`MemoryFileStore`]
//! implements both in-process and is what tests and local development use.

mod changes;
mod error;
mod memory;
mod schema;
mod store;

pub use changes::{ChangeEvent, ChangeFeed, ChangeKind, ChangeSubscription};
pub use error::StoreError;
pub use memory::MemoryFileStore;
pub use schema::{FilePatch, FileRecord, NewFileRecord};
pub use store::FileStore;
