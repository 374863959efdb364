//! Per-message engagement pipeline.
//!
//! [`Honeypot::handle`] runs one inbound message through the whole decision
//! flow under the conversation's lock:
//!
//! 1. fetch bounded history
//! 2. classify, score, pick a persona
//! 3. generate (or fall back)
//! 4. append the turn, then the evidence record
//!
//! Storage failures never cost the caller its reply; they are logged and
//! reported on the returned [`Engagement`].

pub mod locks;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::evidence::{EvidenceRecord, EvidenceRecorder};
use crate::responder::ResponseGenerator;
use crate::store::{ConversationStore, MonotonicClock, Turn};
use crate::triage::{self, Persona, RiskLevel, ScamCategory};

use self::locks::ConversationLocks;

/// Reply for an empty or whitespace-only message.
pub const PROMPT_FOR_INPUT: &str = "Please send a message.";

/// History window used when none is configured.
pub const DEFAULT_HISTORY_TURNS: usize = 20;

/// Decision computed for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verdict {
    /// Scam category.
    #[serde(rename = "scam_type")]
    pub category: ScamCategory,
    /// Urgency tier.
    #[serde(rename = "risk_score")]
    pub risk: RiskLevel,
    /// Persona the reply was written in.
    pub persona: Persona,
}

/// Which store rejected a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageFailure {
    /// The conversation store append failed.
    Conversation(String),
    /// The evidence append failed.
    Evidence(String),
}

/// Result of handling one inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Engagement {
    /// Reply to send back.
    pub reply: String,
    /// Classification, absent when the message was empty.
    #[serde(flatten)]
    pub verdict: Option<Verdict>,
    /// The fallback reply was used.
    #[serde(skip)]
    pub degraded: bool,
    /// Writes that did not land.
    #[serde(skip)]
    pub storage_failures: Vec<StorageFailure>,
}

impl Engagement {
    fn prompt_for_input() -> Self {
        Self {
            reply: PROMPT_FOR_INPUT.to_owned(),
            verdict: None,
            degraded: false,
            storage_failures: Vec::new(),
        }
    }
}

/// Triage a message without generating a reply.
pub fn assess(message: &str) -> Verdict {
    let category = triage::classify(message);
    let risk = triage::score(message);
    Verdict {
        category,
        risk,
        persona: triage::select_persona(category, risk),
    }
}

/// Engagement pipeline shared by every request task.
pub struct Honeypot {
    store: Arc<dyn ConversationStore>,
    evidence: Arc<dyn EvidenceRecorder>,
    generator: ResponseGenerator,
    clock: MonotonicClock,
    locks: ConversationLocks,
    history_limit: Option<usize>,
}

impl std::fmt::Debug for Honeypot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Honeypot")
            .field("generator", &self.generator)
            .field("history_limit", &self.history_limit)
            .finish_non_exhaustive()
    }
}

impl Honeypot {
    /// Wire a pipeline over the given stores and generator.
    pub fn new(
        store: Arc<dyn ConversationStore>,
        evidence: Arc<dyn EvidenceRecorder>,
        generator: ResponseGenerator,
    ) -> Self {
        Self {
            store,
            evidence,
            generator,
            clock: MonotonicClock::new(),
            locks: ConversationLocks::new(),
            history_limit: Some(DEFAULT_HISTORY_TURNS),
        }
    }

    /// Override the history window; `None` sends the full history.
    #[must_use]
    pub fn with_history_limit(mut self, limit: Option<usize>) -> Self {
        self.history_limit = limit;
        self
    }

    /// Conversation store.
    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Evidence sink.
    pub fn evidence(&self) -> &Arc<dyn EvidenceRecorder> {
        &self.evidence
    }

    /// Lock registry (exposed for tests).
    pub fn locks(&self) -> &ConversationLocks {
        &self.locks
    }

    /// Handle one inbound message for `conversation_id`.
    pub async fn handle(&self, conversation_id: &str, message: &str) -> Engagement {
        if message.trim().is_empty() {
            debug!(conversation_id, "empty message, prompting for input");
            return Engagement::prompt_for_input();
        }

        let _guard = self.locks.acquire(conversation_id).await;

        let history = match self
            .store
            .fetch_history(conversation_id, self.history_limit)
            .await
        {
            Ok(history) => history,
            Err(e) => {
                warn!(conversation_id, error = %e, "history unavailable, replying without context");
                Vec::new()
            }
        };

        let verdict = assess(message);
        let generated = self
            .generator
            .generate(message, &history, verdict.persona, verdict.risk)
            .await;
        let degraded = generated.is_fallback();
        let reply = generated.into_text();

        let turn = Turn::new(
            conversation_id,
            self.clock.now(),
            message,
            reply.as_str(),
            verdict.category,
            verdict.risk,
            verdict.persona,
        );

        let mut storage_failures = Vec::new();
        if let Err(e) = self.store.append(&turn).await {
            error!(conversation_id, turn_id = %turn.id, error = %e, "failed to persist turn");
            storage_failures.push(StorageFailure::Conversation(e.to_string()));
        }
        if let Err(e) = self.evidence.append(&EvidenceRecord::from(&turn)).await {
            error!(conversation_id, turn_id = %turn.id, error = %e, "failed to record evidence");
            storage_failures.push(StorageFailure::Evidence(e.to_string()));
        }

        info!(
            conversation_id,
            category = %verdict.category,
            risk = %verdict.risk,
            persona = %verdict.persona,
            history_turns = history.len(),
            degraded,
            "engagement turn complete"
        );

        Engagement {
            reply,
            verdict: Some(verdict),
            degraded,
            storage_failures,
        }
    }
}
