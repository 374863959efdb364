//! Append-only conversation store.
//!
//! A conversation is not a stored object: it is the ordered set of [`Turn`]s
//! sharing a caller-supplied conversation id. The [`ConversationStore`] trait
//! is the seam between the pipeline and persistence; production uses
//! [`sqlite::SqliteConversationStore`], tests and ephemeral runs use
//! [`memory::MemoryConversationStore`].

pub mod memory;
pub mod sqlite;

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::triage::{Persona, RiskLevel, ScamCategory, UnknownLabel};

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

/// One scammer-message / agent-reply exchange. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    /// Globally unique turn id (UUID v4).
    pub id: String,
    /// Caller-supplied conversation id.
    pub conversation_id: String,
    /// When the turn was recorded (UTC, microsecond precision).
    pub timestamp: DateTime<Utc>,
    /// Inbound message from the scammer.
    pub scammer_message: String,
    /// Reply the decoy sent back.
    pub agent_reply: String,
    /// Category assigned to the inbound message.
    pub scam_category: ScamCategory,
    /// Risk tier assigned to the inbound message.
    pub risk_level: RiskLevel,
    /// Persona used for the reply.
    pub persona: Persona,
}

impl Turn {
    /// Create a turn with a freshly generated id.
    pub fn new(
        conversation_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        scammer_message: impl Into<String>,
        agent_reply: impl Into<String>,
        scam_category: ScamCategory,
        risk_level: RiskLevel,
        persona: Persona,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.into(),
            timestamp,
            scammer_message: scammer_message.into(),
            agent_reply: agent_reply.into(),
            scam_category,
            risk_level,
            persona,
        }
    }

    /// The (message, reply) pair used as prompt history.
    pub fn exchange(&self) -> Exchange {
        Exchange {
            scammer_message: self.scammer_message.clone(),
            agent_reply: self.agent_reply.clone(),
        }
    }
}

/// A single prior exchange, as fed back into the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exchange {
    /// What the scammer said.
    pub scammer_message: String,
    /// What the decoy answered.
    pub agent_reply: String,
}

/// Render a timestamp the way it is persisted: RFC 3339, microseconds, `Z`.
///
/// Fixed width, so lexical order in SQLite equals chronological order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a persisted timestamp.
///
/// # Errors
///
/// Returns [`StoreError::InvalidTimestamp`] if the value is not RFC 3339.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| StoreError::InvalidTimestamp(raw.to_owned()))
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// UTC clock that never goes backwards.
///
/// Each call returns a value strictly greater than the previous one at the
/// persisted (microsecond) precision, even if the wall clock steps back.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl MonotonicClock {
    /// Create a clock with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Next timestamp.
    pub fn now(&self) -> DateTime<Utc> {
        self.next_after(Utc::now())
    }

    fn next_after(&self, wall: DateTime<Utc>) -> DateTime<Utc> {
        let wall = wall.trunc_subsecs(6);
        let mut last = self
            .last
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let next = match *last {
            Some(prev) if prev >= wall => prev
                .checked_add_signed(Duration::microseconds(1))
                .unwrap_or(prev),
            _ => wall,
        };
        *last = Some(next);
        next
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from conversation store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row carried an unrecognised label.
    #[error("corrupt turn record: {0}")]
    InvalidLabel(#[from] UnknownLabel),

    /// A stored timestamp could not be parsed.
    #[error("invalid timestamp in turn record: {0:?}")]
    InvalidTimestamp(String),

    /// The store cannot accept writes.
    #[error("conversation store unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Append-only, per-conversation ordered history of turns.
///
/// Implementations must be `Send + Sync`; the pipeline shares one store across
/// request tasks.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Prior exchanges for a conversation, oldest first.
    ///
    /// `limit = Some(n)` keeps only the `n` most recent turns (still oldest
    /// first). Unknown ids yield an empty vector.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing store cannot be read.
    async fn fetch_history(
        &self,
        conversation_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Exchange>, StoreError>;

    /// Durably record a turn. Must complete before the reply leaves the process.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the turn could not be persisted.
    async fn append(&self, turn: &Turn) -> Result<(), StoreError>;

    /// Every turn of one conversation, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing store cannot be read.
    async fn turns(&self, conversation_id: &str) -> Result<Vec<Turn>, StoreError>;

    /// Turns across all conversations, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing store cannot be read.
    async fn recent(&self, limit: Option<usize>) -> Result<Vec<Turn>, StoreError>;
}
