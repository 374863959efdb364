//! Generative backend abstraction.
//!
//! Defines the [`LlmProvider`] trait and the request/response types shared by
//! the implementations:
//! - [`openai::OpenAiProvider`] — `/chat/completions` wire format, used for
//!   OpenAI and Groq (which speaks the same protocol)
//! - [`ollama::OllamaProvider`] — Ollama `/api/chat` API
//!
//! [`build_provider`] turns a `"<provider>/<model>"` spec plus credentials
//! into a boxed provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::credentials::Credentials;

pub mod ollama;
pub mod openai;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// Conversation participant role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message.
    System,
    /// Human user message.
    User,
}

impl Role {
    /// Wire name shared by both chat protocols.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
        }
    }
}

/// A message in a conversation with an LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message author.
    pub role: Role,
    /// Plain text content.
    pub content: String,
}

impl Message {
    /// Shorthand for a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request / Response
// ---------------------------------------------------------------------------

/// A request to an LLM provider for a completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Messages following the system prompt.
    pub messages: Vec<Message>,
    /// System prompt (injected before messages).
    pub system: Option<String>,
    /// Maximum tokens in the response.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
}

/// Usage statistics for a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageStats {
    /// Tokens used in the prompt/input.
    pub input_tokens: u32,
    /// Tokens generated in the response.
    pub output_tokens: u32,
}

/// The response from an LLM provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    /// Generated text (may be empty).
    pub text: String,
    /// Token usage.
    pub usage: UsageStats,
    /// The model identifier that served this response.
    pub model: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by model providers.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP transport failure.
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Response did not match expected schema.
    #[error("provider response parse error: {0}")]
    Parse(String),
    /// Upstream provider responded with an error status.
    #[error("provider returned non-success status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },
    /// The call did not finish within the configured deadline.
    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),
    /// Provider cannot satisfy the request with current configuration.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// Check HTTP response status and return body text or a structured error.
///
/// # Errors
///
/// Returns `ProviderError::Request` on transport failure, `ProviderError::HttpStatus` on non-2xx.
pub async fn check_http_response(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ProviderError::HttpStatus {
            status: status.as_u16(),
            body: sanitize_http_error_body(&body),
        });
    }
    Ok(body)
}

/// Collapse whitespace, redact key-shaped tokens, and cap the length of an
/// upstream error body before it reaches logs.
pub fn sanitize_http_error_body(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut sanitized = collapsed;
    for pattern in [
        r"gsk_[A-Za-z0-9]{20,}",
        r"sk-proj-[A-Za-z0-9_\-]{20,}",
        r"sk-[A-Za-z0-9]{32,}",
    ] {
        if let Ok(regex) = Regex::new(pattern) {
            sanitized = regex.replace_all(&sanitized, "[REDACTED]").into_owned();
        }
    }

    const MAX_ERROR_BODY_CHARS: usize = 256;
    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Core LLM provider interface.
///
/// Implementations must be `Send + Sync`; one provider is shared by every
/// request task.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Request a completion from the LLM.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on API, network, or parse failure.
    async fn complete(&self, request: CompletionRequest)
        -> Result<CompletionResponse, ProviderError>;

    /// The model spec string this provider is instantiated for.
    fn model_id(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// Provider construction errors.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Model spec is not in `<provider>/<model>` format.
    #[error("invalid model spec '{spec}', expected '<provider>/<model>'")]
    InvalidModelSpec {
        /// Invalid raw spec.
        spec: String,
    },
    /// Unsupported provider type in spec prefix.
    #[error("unsupported provider '{provider}'")]
    UnsupportedProvider {
        /// Unsupported provider prefix.
        provider: String,
    },
    /// Required API credential missing for selected provider.
    #[error("missing credential for provider '{provider}': {key}")]
    MissingCredential {
        /// Provider name.
        provider: String,
        /// Missing credential key.
        key: String,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Parse a provider string like `"groq/llama-3.1-8b-instant"` into components.
///
/// Returns `(provider_name, model_name)`.
///
/// # Errors
///
/// Returns [`BuildError::InvalidModelSpec`] if either side of the first `/`
/// is empty or there is no `/`.
pub fn parse_provider_string(s: &str) -> Result<(&str, &str), BuildError> {
    match s.split_once('/') {
        Some((provider, model)) if !provider.is_empty() && !model.is_empty() => {
            Ok((provider, model))
        }
        _ => Err(BuildError::InvalidModelSpec { spec: s.to_owned() }),
    }
}

/// Credential key a provider needs, if any.
pub fn required_credential(provider: &str) -> Option<&'static str> {
    match provider {
        "groq" => Some("GROQ_API_KEY"),
        "openai" => Some("OPENAI_API_KEY"),
        _ => None,
    }
}

/// Instantiate the provider named by `spec`.
///
/// `request_timeout` bounds each HTTP exchange at the client level; the
/// response generator applies its own deadline on top.
///
/// # Errors
///
/// Returns [`BuildError`] if the model string is malformed, the provider is unknown,
/// or its API key is missing.
pub fn build_provider(
    spec: &str,
    credentials: &Credentials,
    request_timeout: Duration,
) -> Result<Arc<dyn LlmProvider>, BuildError> {
    let (provider, model) = parse_provider_string(spec)?;
    let client = reqwest::Client::builder().timeout(request_timeout).build()?;

    let api_key = |key: &str| {
        credentials
            .get(key)
            .map(str::to_owned)
            .ok_or_else(|| BuildError::MissingCredential {
                provider: provider.to_owned(),
                key: key.to_owned(),
            })
    };

    match provider {
        "groq" => Ok(Arc::new(openai::OpenAiProvider::with_client(
            spec.to_owned(),
            model.to_owned(),
            openai::GROQ_API_BASE.to_owned(),
            api_key("GROQ_API_KEY")?,
            client,
        ))),
        "openai" => Ok(Arc::new(openai::OpenAiProvider::with_client(
            spec.to_owned(),
            model.to_owned(),
            openai::OPENAI_API_BASE.to_owned(),
            api_key("OPENAI_API_KEY")?,
            client,
        ))),
        "ollama" => {
            let base_url = credentials
                .get("OLLAMA_URL")
                .unwrap_or(ollama::DEFAULT_OLLAMA_URL)
                .to_owned();
            Ok(Arc::new(ollama::OllamaProvider::with_client(
                spec.to_owned(),
                model.to_owned(),
                base_url,
                client,
            )))
        }
        other => Err(BuildError::UnsupportedProvider {
            provider: other.to_owned(),
        }),
    }
}
