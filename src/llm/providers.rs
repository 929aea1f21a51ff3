//! Wire formats for the supported chat-completion providers
//!
//! Request building and response parsing are kept free of I/O so both can be
//! checked without a network.

use crate::llm::config::{AiConfig, Provider};
use crate::llm::context::{ConversationMessage, MessageRole};
use crate::{MurmurError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an API key goes on the outgoing request
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    /// `Authorization: Bearer <key>`
    Bearer(String),
    /// `?key=<key>` query parameter
    QueryKey(String),
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Auth::QueryKey(_) => f.write_str("QueryKey(<redacted>)"),
        }
    }
}

/// A fully prepared provider call
#[derive(Clone, Debug)]
pub struct ProviderRequest {
    pub provider: Provider,
    pub url: String,
    pub auth: Auth,
    pub body: serde_json::Value,
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiReply,
}

#[derive(Deserialize)]
struct OpenAiReply {
    content: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiReplyContent>,
}

#[derive(Deserialize)]
struct GeminiReplyContent {
    #[serde(default)]
    parts: Vec<GeminiReplyPart>,
}

#[derive(Deserialize)]
struct GeminiReplyPart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Gemini calls the assistant role "model"
fn gemini_role(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "model",
    }
}

/// Serialize a conversation into the configured provider's request
pub fn build_request(config: &AiConfig, history: &[ConversationMessage]) -> Result<ProviderRequest> {
    let provider = config.provider;
    let key = config
        .credential()
        .ok_or_else(|| MurmurError::MissingCredential(provider.name().to_string()))?
        .to_string();
    let model = config.resolved_model();

    let request = match provider {
        Provider::OpenAi => {
            let body = OpenAiRequest {
                model,
                messages: history
                    .iter()
                    .map(|m| OpenAiMessage {
                        role: m.role.as_str(),
                        content: &m.content,
                    })
                    .collect(),
                temperature: config.temperature,
                max_tokens: config.max_tokens,
                stream: false,
            };
            ProviderRequest {
                provider,
                url: format!("{}/v1/chat/completions", config.base_url()),
                auth: Auth::Bearer(key),
                body: serde_json::to_value(body)?,
            }
        }
        Provider::Gemini => {
            let body = GeminiRequest {
                contents: history
                    .iter()
                    .map(|m| GeminiContent {
                        role: gemini_role(m.role),
                        parts: vec![GeminiPart { text: &m.content }],
                    })
                    .collect(),
                generation_config: GeminiGenerationConfig {
                    temperature: config.temperature,
                    max_output_tokens: config.max_tokens,
                },
            };
            ProviderRequest {
                provider,
                url: format!(
                    "{}/v1beta/models/{}:generateContent",
                    config.base_url(),
                    model
                ),
                auth: Auth::QueryKey(key),
                body: serde_json::to_value(body)?,
            }
        }
    };

    Ok(request)
}

/// Extract the reply text from a provider response.
///
/// `reason` is the HTTP reason phrase, used when an error body carries no message.
pub fn parse_response(provider: Provider, status: u16, reason: &str, body: &str) -> Result<String> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ErrorEnvelope>(body)
            .ok()
            .and_then(|envelope| envelope.error)
            .and_then(|error| error.message)
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| reason.to_string());
        return Err(MurmurError::ProviderError {
            provider: provider.name().to_string(),
            status: Some(status),
            message,
        });
    }

    let malformed = |e: serde_json::Error| {
        MurmurError::MalformedResponse(format!("{} response: {}", provider.name(), e))
    };
    let empty = || MurmurError::EmptyResult(provider.name().to_string());

    match provider {
        Provider::OpenAi => {
            let response: OpenAiResponse = serde_json::from_str(body).map_err(malformed)?;
            response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or_else(empty)
        }
        Provider::Gemini => {
            let response: GeminiResponse = serde_json::from_str(body).map_err(malformed)?;
            response
                .candidates
                .into_iter()
                .next()
                .and_then(|candidate| candidate.content)
                .and_then(|content| content.parts.into_iter().next())
                .and_then(|part| part.text)
                .ok_or_else(empty)
        }
    }
}
