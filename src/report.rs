//! Per-conversation transcript reports.
//!
//! [`ReportExporter`] reads the ordered turns of one conversation into a
//! [`ReportDocument`]; a [`ReportRenderer`] turns the document into bytes.
//! Only a plain-text renderer ships; typeset formats would be further
//! renderers over the same document.

use std::fmt::Write as _;
use std::sync::Arc;

use crate::store::{format_timestamp, ConversationStore, StoreError, Turn};
use crate::triage::{Persona, RiskLevel, ScamCategory};

/// Width of the rule between turn blocks.
const RULE_WIDTH: usize = 80;

/// One turn as it appears in a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportBlock {
    /// RFC 3339 timestamp.
    pub time: String,
    /// Scam category.
    pub category: ScamCategory,
    /// Persona used.
    pub persona: Persona,
    /// Risk tier.
    pub risk: RiskLevel,
    /// Inbound scammer message.
    pub scammer_message: String,
    /// Decoy reply.
    pub agent_reply: String,
}

impl From<&Turn> for ReportBlock {
    fn from(turn: &Turn) -> Self {
        Self {
            time: format_timestamp(&turn.timestamp),
            category: turn.scam_category,
            persona: turn.persona,
            risk: turn.risk_level,
            scammer_message: turn.scammer_message.clone(),
            agent_reply: turn.agent_reply.clone(),
        }
    }
}

/// Full transcript of one conversation, oldest turn first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocument {
    /// Conversation the report covers.
    pub conversation_id: String,
    /// One block per turn.
    pub blocks: Vec<ReportBlock>,
}

/// Errors from report export.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// No turns exist for the conversation.
    #[error("no records found for conversation {0:?}")]
    NotFound(String),

    /// The conversation store could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Builds report documents from the conversation store.
#[derive(Clone)]
pub struct ReportExporter {
    store: Arc<dyn ConversationStore>,
}

impl std::fmt::Debug for ReportExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportExporter").finish_non_exhaustive()
    }
}

impl ReportExporter {
    /// Create an exporter over a store.
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    /// Collect every turn of `conversation_id` into a document.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::NotFound`] when the conversation has no turns,
    /// or [`ReportError::Store`] if the store cannot be read.
    pub async fn render(&self, conversation_id: &str) -> Result<ReportDocument, ReportError> {
        let turns = self.store.turns(conversation_id).await?;
        if turns.is_empty() {
            return Err(ReportError::NotFound(conversation_id.to_owned()));
        }
        Ok(ReportDocument {
            conversation_id: conversation_id.to_owned(),
            blocks: turns.iter().map(ReportBlock::from).collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// Renderers
// ---------------------------------------------------------------------------

/// Output format for a [`ReportDocument`].
pub trait ReportRenderer: Send + Sync {
    /// MIME type of the rendered bytes.
    fn content_type(&self) -> &'static str;

    /// File extension for downloads, without the dot.
    fn file_extension(&self) -> &'static str;

    /// Render the document.
    fn render(&self, document: &ReportDocument) -> Vec<u8>;
}

/// Labelled plain-text transcript.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextRenderer;

impl PlainTextRenderer {
    /// Render to a `String`.
    pub fn render_text(document: &ReportDocument) -> String {
        let rule = "-".repeat(RULE_WIDTH);
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = writeln!(out, "Scammer ID: {}", document.conversation_id);
        out.push('\n');
        for block in &document.blocks {
            let _ = writeln!(out, "Time: {}", block.time);
            let _ = writeln!(out, "Scam Type: {}", block.category);
            let _ = writeln!(out, "Persona: {}", block.persona);
            let _ = writeln!(out, "Risk Level: {}", block.risk);
            let _ = writeln!(out, "Scammer Message: {}", block.scammer_message);
            let _ = writeln!(out, "Victim Reply: {}", block.agent_reply);
            let _ = writeln!(out, "{rule}");
        }
        out
    }
}

impl ReportRenderer for PlainTextRenderer {
    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    fn file_extension(&self) -> &'static str {
        "txt"
    }

    fn render(&self, document: &ReportDocument) -> Vec<u8> {
        Self::render_text(document).into_bytes()
    }
}
