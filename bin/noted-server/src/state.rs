//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use noted_core::{CompletionProvider, ReconcileSessions, Reconciler, SqliteStore};

use crate::config::Config;

/// State shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Every table lives in the same SQLite database.
    pub store: Arc<SqliteStore>,
    /// Hosted model used for assistant replies.
    pub completions: Arc<dyn CompletionProvider>,
    /// Per-chat reconciliation state, keyed by `(user, chat)`.
    pub sessions: Arc<ReconcileSessions>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        config: Config,
        store: SqliteStore,
        completions: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            completions,
            sessions: Arc::new(ReconcileSessions::new()),
        }
    }

    /// Reconciler over the shared store using the configured failure policy.
    pub fn reconciler(&self) -> Reconciler<SqliteStore> {
        Reconciler::new(Arc::clone(&self.store), self.config.persist_policy)
    }
}
