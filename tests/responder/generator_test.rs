//! Response generator tests against scripted providers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tarpit::providers::{
    CompletionRequest, CompletionResponse, LlmProvider, ProviderError, UsageStats,
};
use tarpit::responder::{
    DecodingParams, FallbackReason, GeneratedReply, ResponseGenerator, FALLBACK_REPLY,
};
use tarpit::store::Exchange;
use tarpit::triage::{Persona, RiskLevel};

// ---------------------------------------------------------------------------
// Mock providers
// ---------------------------------------------------------------------------

/// Returns a fixed reply and records every request.
struct ScriptedProvider {
    reply: String,
    seen: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_owned(),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.seen.lock().expect("lock").push(request);
        Ok(CompletionResponse {
            text: self.reply.clone(),
            usage: UsageStats {
                input_tokens: 40,
                output_tokens: 12,
            },
            model: "mock".to_owned(),
        })
    }

    fn model_id(&self) -> &str {
        "mock/scripted"
    }
}

/// Always fails with an upstream status error.
struct FailingProvider;

#[async_trait]
impl LlmProvider for FailingProvider {
    async fn complete(
        &self,
        _request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        Err(ProviderError::HttpStatus {
            status: 503,
            body: "upstream overloaded".to_owned(),
        })
    }

    fn model_id(&self) -> &str {
        "mock/failing"
    }
}

/// Never answers within any reasonable deadline.
struct StalledProvider;

#[async_trait]
impl LlmProvider for StalledProvider {
    async fn complete(
        &self,
        _request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(ProviderError::Unavailable("unreachable".to_owned()))
    }

    fn model_id(&self) -> &str {
        "mock/stalled"
    }
}

fn params() -> DecodingParams {
    DecodingParams {
        timeout: Duration::from_millis(200),
        ..DecodingParams::default()
    }
}

fn history() -> Vec<Exchange> {
    vec![
        Exchange {
            scammer_message: "This is your bank".to_owned(),
            agent_reply: "Which bank?".to_owned(),
        },
        Exchange {
            scammer_message: "State Bank, share OTP".to_owned(),
            agent_reply: "Why do you need it?".to_owned(),
        },
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generated_reply_is_sanitized() {
    let provider = Arc::new(ScriptedProvider::new(
        "*worried* What is the OTP for?\n\n\n(pauses) Who are you?",
    ));
    let generator = ResponseGenerator::new(provider, params());

    let reply = generator
        .generate("share otp now", &[], Persona::PanickedBankCustomer, RiskLevel::High)
        .await;

    assert_eq!(
        reply,
        GeneratedReply::Generated("What is the OTP for?\nWho are you?".to_owned())
    );
}

#[tokio::test]
async fn prompt_carries_history_persona_and_params() {
    let provider = Arc::new(ScriptedProvider::new("Okay."));
    let generator = ResponseGenerator::new(Arc::clone(&provider) as Arc<dyn LlmProvider>, params());

    generator
        .generate("send it fast", &history(), Persona::ConfusedUser, RiskLevel::Medium)
        .await;

    let seen = provider.seen.lock().expect("lock");
    assert_eq!(seen.len(), 1);
    let request = &seen[0];
    assert_eq!(request.max_tokens, Some(200));
    assert_eq!(request.temperature, Some(0.7));

    let system = request.system.as_deref().expect("system prompt");
    assert!(system.contains("Confused User"));
    assert!(system.contains("confused and cautious"));

    let user = &request.messages[0].content;
    let first = user.find("Scammer: This is your bank").expect("first turn");
    let second = user.find("Agent: Why do you need it?").expect("second turn");
    assert!(first < second);
    assert!(user.ends_with("Scammer: \"send it fast\"\nReply:"));
}

#[tokio::test]
async fn backend_error_falls_back() {
    let generator = ResponseGenerator::new(Arc::new(FailingProvider), params());
    let reply = generator
        .generate("hello", &[], Persona::EverydayUser, RiskLevel::Low)
        .await;

    assert!(reply.is_fallback());
    assert_eq!(reply.text(), FALLBACK_REPLY);
    assert!(matches!(
        reply,
        GeneratedReply::Fallback {
            reason: FallbackReason::Backend(_),
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn timeout_falls_back() {
    let generator = ResponseGenerator::new(Arc::new(StalledProvider), params());
    let reply = generator
        .generate("hello", &[], Persona::EverydayUser, RiskLevel::Low)
        .await;

    assert_eq!(
        reply,
        GeneratedReply::Fallback {
            reply: FALLBACK_REPLY.to_owned(),
            reason: FallbackReason::Timeout(Duration::from_millis(200)),
        }
    );
}

#[tokio::test]
async fn reply_that_sanitizes_to_nothing_falls_back() {
    let provider = Arc::new(ScriptedProvider::new("*stares at phone* (silence)"));
    let generator = ResponseGenerator::new(provider, params());
    let reply = generator
        .generate("hello", &[], Persona::EverydayUser, RiskLevel::Low)
        .await;

    assert_eq!(
        reply,
        GeneratedReply::Fallback {
            reply: FALLBACK_REPLY.to_owned(),
            reason: FallbackReason::Empty,
        }
    );
}
