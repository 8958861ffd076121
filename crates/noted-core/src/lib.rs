//! Core of the Duley Noted backend.
//!
//! * [`entities`]: SQLite persistence behind per-table store traits.
//! * [`reconcile`]: keeps a streaming chat session and its stored rows in
//!   agreement.
//! * [`services`]: chats, notes, projects, profiles and recent activity.
//! * [`completion`]: the hosted model seam used for assistant replies.

pub mod completion;
pub mod entities;
pub mod error;
pub mod reconcile;
pub mod services;
pub mod util;

pub use completion::{CompletionProvider, CompletionStream, GenaiProvider, PromptMessage};
pub use entities::SqliteStore;
pub use error::{NotedError, Result};
pub use reconcile::{
    PersistPolicy, ReconcileOutcome, ReconcileSessions, ReconcileState, Reconciler,
    SessionMessage,
};
