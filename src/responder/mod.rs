//! Reply generation: prompt construction, backend call, sanitization.
//!
//! [`ResponseGenerator::generate`] never fails. Any backend problem (network,
//! status, parse, timeout, or a reply that sanitizes to nothing) yields
//! [`GeneratedReply::Fallback`] with [`FALLBACK_REPLY`], and the caller
//! branches on the variant instead of catching an error.

pub mod sanitize;

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::ModelsConfig;
use crate::providers::{CompletionRequest, LlmProvider, Message, ProviderError};
use crate::store::Exchange;
use crate::triage::{Persona, RiskLevel};

use self::sanitize::ReplySanitizer;

/// Neutral reply used whenever the backend cannot produce one.
pub const FALLBACK_REPLY: &str =
    "I'm not sure about this. Can you explain clearly what you want me to do?";

/// Behavioral constraints sent with every request.
const RULES: &str = "\
STRICT RULES:
- Write short, clear, direct replies (2-4 sentences max)
- NO emotions, NO stage directions
- DO NOT use brackets (), * *, or roleplay actions
- Sound like a normal, cautious person
- Ask only relevant follow-up questions
- Focus on extracting details (process, payment, identity)
- NEVER reveal you are AI";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Why a fallback reply was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The backend returned an error.
    Backend(String),
    /// The backend did not answer before the deadline.
    Timeout(Duration),
    /// The reply was empty after sanitization.
    Empty,
}

/// Outcome of one generation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedReply {
    /// Sanitized backend output.
    Generated(String),
    /// Backend unavailable; carries [`FALLBACK_REPLY`].
    Fallback {
        /// Reply text to send.
        reply: String,
        /// What went wrong.
        reason: FallbackReason,
    },
}

impl GeneratedReply {
    fn fallback(reason: FallbackReason) -> Self {
        Self::Fallback {
            reply: FALLBACK_REPLY.to_owned(),
            reason,
        }
    }

    /// Text to send back, whichever variant this is.
    pub fn text(&self) -> &str {
        match self {
            Self::Generated(text) => text,
            Self::Fallback { reply, .. } => reply,
        }
    }

    /// Whether the fallback reply was used.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    /// Consume into the reply text.
    pub fn into_text(self) -> String {
        match self {
            Self::Generated(text) => text,
            Self::Fallback { reply, .. } => reply,
        }
    }
}

/// Fixed decoding parameters for one deployment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodingParams {
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum reply tokens.
    pub max_tokens: u32,
    /// Deadline for the backend call.
    pub timeout: Duration,
}

impl Default for DecodingParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 200,
            timeout: Duration::from_secs(20),
        }
    }
}

impl From<&ModelsConfig> for DecodingParams {
    fn from(models: &ModelsConfig) -> Self {
        Self {
            temperature: models.clamped_temperature(),
            max_tokens: models.max_tokens,
            timeout: models.timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

/// System prompt for a persona and risk tier.
pub fn system_prompt(persona: Persona, risk: RiskLevel) -> String {
    format!(
        "You are an undercover scam-baiting victim.\n\n\
         PERSONA: {persona}\n\
         RISK LEVEL: {risk}\n\
         TONE: {tone}\n\n\
         {RULES}",
        tone = risk.tone(),
    )
}

/// Render prior exchanges as alternating `Scammer:` / `Agent:` lines.
pub fn render_transcript(history: &[Exchange]) -> String {
    let mut out = String::new();
    for exchange in history {
        // Writing to a String cannot fail.
        let _ = writeln!(out, "Scammer: {}", exchange.scammer_message);
        let _ = writeln!(out, "Agent: {}", exchange.agent_reply);
    }
    out
}

/// User prompt: transcript so far plus the new message.
pub fn user_prompt(message: &str, history: &[Exchange]) -> String {
    format!(
        "Conversation so far:\n{transcript}\nScammer: \"{message}\"\nReply:",
        transcript = render_transcript(history),
    )
}

/// Assemble the full completion request.
pub fn build_request(
    message: &str,
    history: &[Exchange],
    persona: Persona,
    risk: RiskLevel,
    params: &DecodingParams,
) -> CompletionRequest {
    CompletionRequest {
        messages: vec![Message::user(user_prompt(message, history))],
        system: Some(system_prompt(persona, risk)),
        max_tokens: Some(params.max_tokens),
        temperature: Some(params.temperature),
    }
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Produces in-character replies through an [`LlmProvider`].
#[derive(Clone)]
pub struct ResponseGenerator {
    provider: Arc<dyn LlmProvider>,
    params: DecodingParams,
    sanitizer: ReplySanitizer,
}

impl std::fmt::Debug for ResponseGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseGenerator")
            .field("model", &self.provider.model_id())
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl ResponseGenerator {
    /// Create a generator over a provider with fixed decoding parameters.
    pub fn new(provider: Arc<dyn LlmProvider>, params: DecodingParams) -> Self {
        Self {
            provider,
            params,
            sanitizer: ReplySanitizer::new(),
        }
    }

    /// Generate a reply. Never fails; see [`GeneratedReply`].
    pub async fn generate(
        &self,
        message: &str,
        history: &[Exchange],
        persona: Persona,
        risk: RiskLevel,
    ) -> GeneratedReply {
        let request = build_request(message, history, persona, risk, &self.params);

        let outcome = tokio::time::timeout(self.params.timeout, self.provider.complete(request))
            .await
            .unwrap_or(Err(ProviderError::Timeout(self.params.timeout)));

        match outcome {
            Ok(response) => {
                let reply = self.sanitizer.sanitize(&response.text);
                if reply.is_empty() {
                    warn!(model = %response.model, "backend reply empty after sanitization");
                    return GeneratedReply::fallback(FallbackReason::Empty);
                }
                debug!(
                    model = %response.model,
                    output_tokens = response.usage.output_tokens,
                    "reply generated"
                );
                GeneratedReply::Generated(reply)
            }
            Err(ProviderError::Timeout(after)) => {
                warn!(model = %self.provider.model_id(), ?after, "backend call timed out");
                GeneratedReply::fallback(FallbackReason::Timeout(after))
            }
            Err(err) => {
                warn!(model = %self.provider.model_id(), error = %err, "backend call failed");
                GeneratedReply::fallback(FallbackReason::Backend(err.to_string()))
            }
        }
    }
}
