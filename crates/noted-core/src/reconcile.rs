//! Chat message reconciliation.
//!
//! A streaming chat session assigns its own ephemeral ids to messages; the
//! store assigns durable row ids.  The [`Reconciler`] makes sure every
//! finished session message ends up as exactly one `chat_messages` row whose
//! `chat_context_id` equals the ephemeral id, no matter how many times the
//! same message is reconciled.
//!
//! Correlation state lives in an explicit [`ReconcileState`] that callers own
//! and pass in by `&mut`.  The server keeps one per `(user, chat)` inside
//! [`ReconcileSessions`]; the per-chat async mutex serializes attempts.
//!
//! Per ephemeral id the lifecycle is `unseen → linked` (an existing unlinked
//! row was claimed) or `unseen → inserted`.  Membership in the processed set
//! is monotonic for the lifetime of a state value.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::entities::{ChatMessage, ChatMessageStore, MessageRole};
use crate::error::{NotedError, Result};

// ── Session messages ──────────────────────────────────────────────────────────

/// One content part of a session message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessagePart {
    Text { text: String },
    /// Step markers, reasoning, files and any other part without prompt text.
    #[serde(other)]
    Other,
}

/// Streaming state of a session message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum StreamState {
    InProgress,
    #[default]
    Complete,
}

/// In-memory view of a message, keyed by its ephemeral id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SessionMessage {
    pub id: String,
    pub role: MessageRole,
    pub parts: Vec<MessagePart>,
    #[serde(default)]
    pub state: StreamState,
}

impl SessionMessage {
    pub fn complete(id: impl Into<String>, role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            parts: vec![MessagePart::Text { text: text.into() }],
            state: StreamState::Complete,
        }
    }

    /// Concatenated text of all parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .map(|part| match part {
                MessagePart::Text { text } => text.as_str(),
                MessagePart::Other => "",
            })
            .collect()
    }

    fn from_row(row: &ChatMessage) -> Self {
        let id = row.chat_context_id.clone().unwrap_or_else(|| row.id.clone());
        Self::complete(id, row.role, row.content.clone())
    }
}

// ── Policy & outcomes ─────────────────────────────────────────────────────────

/// What to do when a store write fails during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
pub enum PersistPolicy {
    /// Log the failure, mark the id processed and carry on.  The message stays
    /// visible in the session but may never reach the store.
    #[default]
    #[strum(serialize = "best-effort")]
    BestEffort,
    /// Return the error and leave the id unprocessed so a later call retries.
    #[strum(serialize = "strict")]
    Strict,
}

/// Result of one reconciliation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The id was already confirmed; nothing was attempted.
    AlreadyProcessed,
    /// Nothing to persist (empty text, still streaming, or the tagged row was
    /// deleted).
    Skipped,
    /// An existing unlinked row was claimed for the id.
    Linked { message_id: String },
    /// The row tagged with the id had its content refreshed.
    Updated { message_id: String },
    /// A new row was created.
    Inserted { message_id: String },
    /// The write failed under [`PersistPolicy::BestEffort`].
    Dropped,
}

impl ReconcileOutcome {
    pub fn message_id(&self) -> Option<&str> {
        match self {
            Self::Linked { message_id }
            | Self::Updated { message_id }
            | Self::Inserted { message_id } => Some(message_id),
            _ => None,
        }
    }
}

// ── State ─────────────────────────────────────────────────────────────────────

/// Durable row metadata known for an ephemeral id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedRow {
    pub message_id: String,
    pub context_id: Option<String>,
    pub role: MessageRole,
    pub content: String,
}

/// Correlation bookkeeping for one chat session.
#[derive(Debug, Default)]
pub struct ReconcileState {
    processed: HashSet<String>,
    links: HashMap<String, LinkedRow>,
}

impl ReconcileState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_processed(&self, ephemeral_id: &str) -> bool {
        self.processed.contains(ephemeral_id)
    }

    pub fn link(&self, ephemeral_id: &str) -> Option<&LinkedRow> {
        self.links.get(ephemeral_id)
    }

    fn mark_processed(&mut self, ephemeral_id: &str) {
        self.processed.insert(ephemeral_id.to_owned());
    }

    /// `true` if some ephemeral id already maps onto `message_id`.
    fn claims(&self, message_id: &str) -> bool {
        self.links.values().any(|row| row.message_id == message_id)
    }

    fn record(&mut self, ephemeral_id: &str, row: LinkedRow) {
        // A row is represented by at most one ephemeral id.
        self.links.retain(|key, existing| {
            key.as_str() == ephemeral_id || existing.message_id != row.message_id
        });
        self.links.insert(ephemeral_id.to_owned(), row);
    }
}

/// How long an unused session state is kept before it is evicted.
pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

type SharedState = Arc<tokio::sync::Mutex<ReconcileState>>;

struct SessionEntry {
    state: SharedState,
    last_used: Instant,
}

impl SessionEntry {
    fn new(state: SharedState, now: Instant) -> Self {
        Self {
            state,
            last_used: now,
        }
    }
}

/// Registry of reconciliation states keyed by `(user id, chat id)`.
///
/// Entries nobody holds are dropped once idle for longer than the TTL.  An
/// evicted chat starts again from an empty state; the keyed upsert keeps its
/// next reconciliation idempotent.
pub struct ReconcileSessions {
    states: Mutex<HashMap<(String, String), SessionEntry>>,
    idle_ttl: Duration,
}

impl Default for ReconcileSessions {
    fn default() -> Self {
        Self::with_idle_ttl(SESSION_IDLE_TTL)
    }
}

impl std::fmt::Debug for ReconcileSessions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.states.lock().map(|s| s.len()).unwrap_or(0);
        write!(f, "ReconcileSessions({count} sessions)")
    }
}

impl ReconcileSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            idle_ttl,
        }
    }

    /// State for the chat, created empty on first use.
    pub fn session(&self, user_id: &str, chat_id: &str) -> SharedState {
        let now = Instant::now();
        let mut states = self.states.lock().unwrap_or_else(|p| p.into_inner());
        self.evict_idle(&mut states, now);
        let entry = states
            .entry((user_id.to_owned(), chat_id.to_owned()))
            .or_insert_with(|| SessionEntry::new(SharedState::default(), now));
        entry.last_used = now;
        Arc::clone(&entry.state)
    }

    /// Replace the chat's state with a fresh one.
    pub fn reset(&self, user_id: &str, chat_id: &str) -> SharedState {
        let now = Instant::now();
        let fresh = SharedState::default();
        let mut states = self.states.lock().unwrap_or_else(|p| p.into_inner());
        self.evict_idle(&mut states, now);
        states.insert(
            (user_id.to_owned(), chat_id.to_owned()),
            SessionEntry::new(Arc::clone(&fresh), now),
        );
        fresh
    }

    pub fn remove(&self, user_id: &str, chat_id: &str) {
        if let Ok(mut states) = self.states.lock() {
            states.remove(&(user_id.to_owned(), chat_id.to_owned()));
        }
    }

    pub fn len(&self) -> usize {
        self.states.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_idle(&self, states: &mut HashMap<(String, String), SessionEntry>, now: Instant) {
        let before = states.len();
        states.retain(|_, entry| {
            Arc::strong_count(&entry.state) > 1
                || now.duration_since(entry.last_used) < self.idle_ttl
        });
        let evicted = before - states.len();
        if evicted > 0 {
            debug!(evicted, remaining = states.len(), "evicted idle chat sessions");
        }
    }
}

/// Ephemeral ids key both the processed set and the stored rows, so a blank
/// one would collapse every later message onto the first.
fn require_ephemeral_id(ephemeral_id: &str) -> Result<()> {
    if ephemeral_id.trim().is_empty() {
        return Err(NotedError::Validation("message id is required".into()));
    }
    Ok(())
}

// ── Reconciler ────────────────────────────────────────────────────────────────

/// Keeps durable rows consistent with a streaming session.
#[derive(Debug)]
pub struct Reconciler<S> {
    store: Arc<S>,
    policy: PersistPolicy,
}

impl<S> Clone for Reconciler<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            policy: self.policy,
        }
    }
}

impl<S: ChatMessageStore> Reconciler<S> {
    pub fn new(store: Arc<S>, policy: PersistPolicy) -> Self {
        Self { store, policy }
    }

    /// Build the session view of a chat from its persisted rows.
    ///
    /// Every returned id is recorded in `state` and marked processed, so
    /// reconciling a loaded message again is a no-op.
    pub async fn load(
        &self,
        chat_id: &str,
        state: &mut ReconcileState,
    ) -> Result<Vec<SessionMessage>> {
        let rows = self.store.list_messages(chat_id).await?;
        let mut messages = Vec::with_capacity(rows.len());
        for row in rows.iter().filter(|row| !row.content.is_empty()) {
            let message = SessionMessage::from_row(row);
            state.record(
                &message.id,
                LinkedRow {
                    message_id: row.id.clone(),
                    context_id: row.chat_context_id.clone(),
                    role: row.role,
                    content: row.content.clone(),
                },
            );
            state.mark_processed(&message.id);
            messages.push(message);
        }
        debug!(chat_id, count = messages.len(), "chat session loaded");
        Ok(messages)
    }

    /// Reconcile any finished session message, dispatching on its role.
    pub async fn reconcile(
        &self,
        chat_id: &str,
        state: &mut ReconcileState,
        message: &SessionMessage,
    ) -> Result<ReconcileOutcome> {
        if message.state == StreamState::InProgress {
            return Ok(ReconcileOutcome::Skipped);
        }
        let text = message.text();
        match message.role {
            MessageRole::User => {
                self.reconcile_user_message(chat_id, state, &message.id, &text)
                    .await
            }
            MessageRole::Assistant => {
                self.reconcile_assistant_message(chat_id, state, &message.id, &text)
                    .await
            }
        }
    }

    /// Persist a user-authored message once.
    ///
    /// An unlinked row with the same content (left behind by a save that never
    /// recorded the context id) is claimed before anything new is written.
    pub async fn reconcile_user_message(
        &self,
        chat_id: &str,
        state: &mut ReconcileState,
        ephemeral_id: &str,
        content: &str,
    ) -> Result<ReconcileOutcome> {
        require_ephemeral_id(ephemeral_id)?;
        if state.is_processed(ephemeral_id) {
            return Ok(ReconcileOutcome::AlreadyProcessed);
        }
        if content.trim().is_empty() {
            state.mark_processed(ephemeral_id);
            return Ok(ReconcileOutcome::Skipped);
        }

        let attempt = self
            .persist_user_message(chat_id, state, ephemeral_id, content)
            .await;
        self.settle(chat_id, state, ephemeral_id, MessageRole::User, attempt)
    }

    /// Persist a finished assistant turn.
    ///
    /// Safe to call repeatedly for the same id: the keyed upsert refreshes the
    /// existing row instead of creating another.
    pub async fn reconcile_assistant_message(
        &self,
        chat_id: &str,
        state: &mut ReconcileState,
        ephemeral_id: &str,
        content: &str,
    ) -> Result<ReconcileOutcome> {
        require_ephemeral_id(ephemeral_id)?;
        if content.trim().is_empty() {
            return Ok(ReconcileOutcome::Skipped);
        }

        let attempt = self
            .upsert(chat_id, state, ephemeral_id, MessageRole::Assistant, content)
            .await;
        self.settle(chat_id, state, ephemeral_id, MessageRole::Assistant, attempt)
    }

    async fn persist_user_message(
        &self,
        chat_id: &str,
        state: &mut ReconcileState,
        ephemeral_id: &str,
        content: &str,
    ) -> Result<ReconcileOutcome> {
        let candidates = self
            .store
            .find_unlinked_messages(chat_id, MessageRole::User, content)
            .await?;

        // Rows already shown in this session under their durable id belong to
        // another message.
        for candidate in candidates.iter().filter(|row| !state.claims(&row.id)) {
            if self
                .store
                .link_message(&candidate.id, chat_id, ephemeral_id)
                .await?
            {
                state.record(
                    ephemeral_id,
                    LinkedRow {
                        message_id: candidate.id.clone(),
                        context_id: Some(ephemeral_id.to_owned()),
                        role: MessageRole::User,
                        content: content.to_owned(),
                    },
                );
                return Ok(ReconcileOutcome::Linked {
                    message_id: candidate.id.clone(),
                });
            }
        }

        self.upsert(chat_id, state, ephemeral_id, MessageRole::User, content)
            .await
    }

    async fn upsert(
        &self,
        chat_id: &str,
        state: &mut ReconcileState,
        ephemeral_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ReconcileOutcome> {
        let Some(result) = self
            .store
            .upsert_message_by_context_id(chat_id, ephemeral_id, role, content)
            .await?
        else {
            debug!(chat_id, ephemeral_id, "tagged row was deleted; not restoring it");
            return Ok(ReconcileOutcome::Skipped);
        };
        let message_id = result.message.id.clone();
        state.record(
            ephemeral_id,
            LinkedRow {
                message_id: message_id.clone(),
                context_id: Some(ephemeral_id.to_owned()),
                role,
                content: content.to_owned(),
            },
        );
        Ok(if result.inserted {
            ReconcileOutcome::Inserted { message_id }
        } else {
            ReconcileOutcome::Updated { message_id }
        })
    }

    fn settle(
        &self,
        chat_id: &str,
        state: &mut ReconcileState,
        ephemeral_id: &str,
        role: MessageRole,
        attempt: Result<ReconcileOutcome>,
    ) -> Result<ReconcileOutcome> {
        match attempt {
            Ok(outcome) => {
                state.mark_processed(ephemeral_id);
                info!(chat_id, ephemeral_id, %role, outcome = ?outcome, "message reconciled");
                Ok(outcome)
            }
            Err(e) => match self.policy {
                PersistPolicy::BestEffort => {
                    warn!(chat_id, ephemeral_id, %role, error = %e, "failed to persist chat message; dropping");
                    state.mark_processed(ephemeral_id);
                    Ok(ReconcileOutcome::Dropped)
                }
                PersistPolicy::Strict => {
                    warn!(chat_id, ephemeral_id, %role, error = %e, "failed to persist chat message");
                    Err(e)
                }
            },
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
