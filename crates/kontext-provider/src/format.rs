// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-provider request shaping and response parsing.
//!
//! Everything here is pure: a [`ChatRequest`] goes in, a [`WireRequest`]
//! comes out, and response bodies are decoded into a [`ChatResponse`]. The
//! HTTP client only moves bytes.

use kontext_core::{ChatRequest, ChatResponse, KontextError, Message, Provider, Role};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::redact::redact;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// A fully shaped HTTP request.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub url: String,
    /// Includes the credential header.
    pub headers: Vec<(&'static str, String)>,
    pub body: serde_json::Value,
}

// --- OpenAI ---

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiReply,
}

#[derive(Debug, Deserialize)]
struct OpenAiReply {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    total_tokens: Option<u32>,
}

// --- Anthropic ---

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    system: String,
    messages: Vec<OpenAiMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicBlock>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlock {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

// --- Google ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleRequest<'a> {
    contents: Vec<GoogleContent<'a>>,
    generation_config: GoogleGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GoogleContent<'a> {
    role: &'static str,
    parts: [GooglePart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct GooglePart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleGenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleResponse {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
    usage_metadata: Option<GoogleUsage>,
}

#[derive(Debug, Deserialize)]
struct GoogleCandidate {
    content: Option<GoogleReplyContent>,
}

#[derive(Debug, Deserialize)]
struct GoogleReplyContent {
    #[serde(default)]
    parts: Vec<GoogleReplyPart>,
}

#[derive(Debug, Deserialize)]
struct GoogleReplyPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleUsage {
    total_token_count: Option<u32>,
}

// --- Errors ---

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

fn join_url(base_url: &str, path: &str) -> String {
    format!("{}{path}", base_url.trim_end_matches('/'))
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, KontextError> {
    Ok(serde_json::to_value(value)?)
}

fn plain(messages: &[Message], keep: impl Fn(Role) -> bool) -> Vec<OpenAiMessage<'_>> {
    messages
        .iter()
        .filter(|m| keep(m.role))
        .map(|m| OpenAiMessage {
            role: m.role,
            content: &m.content,
        })
        .collect()
}

/// Shapes `request` for its model's provider, against `base_url`.
pub fn build_request(base_url: &str, request: &ChatRequest) -> Result<WireRequest, KontextError> {
    let model = request.model;
    let key = request.credential.expose_secret().to_string();

    match model.provider {
        Provider::OpenAi => Ok(WireRequest {
            url: join_url(base_url, "/v1/chat/completions"),
            headers: vec![("authorization", format!("Bearer {key}"))],
            body: to_json(&OpenAiRequest {
                model: model.id,
                messages: plain(&request.messages, |_| true),
                temperature: request.temperature,
                max_tokens: request.max_output_tokens,
            })?,
        }),
        Provider::Anthropic => {
            let system: Vec<&str> = request
                .messages
                .iter()
                .filter(|m| m.role == Role::System)
                .map(|m| m.content.as_str())
                .collect();
            let system = if system.is_empty() {
                DEFAULT_SYSTEM_PROMPT.to_string()
            } else {
                system.join("\n\n")
            };
            Ok(WireRequest {
                url: join_url(base_url, "/v1/messages"),
                headers: vec![
                    ("x-api-key", key),
                    ("anthropic-version", ANTHROPIC_VERSION.to_string()),
                ],
                body: to_json(&AnthropicRequest {
                    model: model.id,
                    system,
                    messages: plain(&request.messages, |role| role != Role::System),
                    temperature: request.temperature,
                    max_tokens: request.max_output_tokens,
                })?,
            })
        }
        Provider::Google => {
            let contents = request
                .messages
                .iter()
                .filter(|m| m.role != Role::System)
                .map(|m| GoogleContent {
                    role: if m.role == Role::Assistant { "model" } else { "user" },
                    parts: [GooglePart { text: &m.content }],
                })
                .collect();
            Ok(WireRequest {
                url: join_url(
                    base_url,
                    &format!("/v1beta/models/{}:generateContent", model.id),
                ),
                headers: vec![("x-goog-api-key", key)],
                body: to_json(&GoogleRequest {
                    contents,
                    generation_config: GoogleGenerationConfig {
                        temperature: request.temperature,
                        max_output_tokens: request.max_output_tokens,
                    },
                })?,
            })
        }
    }
}

fn malformed(provider: Provider, detail: impl std::fmt::Display) -> KontextError {
    KontextError::transport(
        format!(
            "unexpected response from {}: {detail}",
            provider.display_name()
        ),
        None,
    )
}

/// Decodes a successful response body.
pub fn parse_response(provider: Provider, body: &[u8]) -> Result<ChatResponse, KontextError> {
    let (content, tokens_used) = match provider {
        Provider::OpenAi => {
            let parsed: OpenAiResponse =
                serde_json::from_slice(body).map_err(|e| malformed(provider, e))?;
            let content = parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content);
            (content, parsed.usage.and_then(|u| u.total_tokens))
        }
        Provider::Anthropic => {
            let parsed: AnthropicResponse =
                serde_json::from_slice(body).map_err(|e| malformed(provider, e))?;
            let content = parsed.content.into_iter().next().and_then(|b| b.text);
            let tokens = parsed
                .usage
                .map(|u| u.input_tokens.saturating_add(u.output_tokens));
            (content, tokens)
        }
        Provider::Google => {
            let parsed: GoogleResponse =
                serde_json::from_slice(body).map_err(|e| malformed(provider, e))?;
            let content = parsed
                .candidates
                .into_iter()
                .next()
                .and_then(|c| c.content)
                .and_then(|c| c.parts.into_iter().next())
                .and_then(|p| p.text);
            (content, parsed.usage_metadata.and_then(|u| u.total_token_count))
        }
    };

    let content = content.ok_or_else(|| malformed(provider, "no message content"))?;
    Ok(ChatResponse {
        content,
        tokens_used,
    })
}

/// Human-readable, redacted message for a non-2xx response.
pub fn error_message(provider: Provider, status: u16, body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .filter(|message| !message.trim().is_empty())
        .map(|message| redact(&message))
        .unwrap_or_else(|| format!("{} API error: {status}", provider.display_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kontext_core::models;
    use secrecy::SecretString;

    fn request(model_key: &str, messages: Vec<Message>) -> ChatRequest {
        ChatRequest {
            model: models::lookup(model_key).unwrap(),
            messages,
            credential: SecretString::from("key-123".to_string()),
            temperature: 0.5,
            max_output_tokens: 256,
        }
    }

    fn history() -> Vec<Message> {
        vec![
            Message::system("be brief"),
            Message::user("hi"),
            Message::assistant("hello"),
            Message::system("use metric units"),
            Message::user("how far?"),
        ]
    }

    #[test]
    fn openai_passes_all_roles() {
        let wire = build_request("https://api.openai.com/", &request("gpt-4-turbo", history())).unwrap();
        assert_eq!(wire.url, "https://api.openai.com/v1/chat/completions");
        assert_eq!(wire.headers, vec![("authorization", "Bearer key-123".to_string())]);
        assert_eq!(wire.body["model"], "gpt-4-turbo-preview");
        assert_eq!(wire.body["messages"].as_array().unwrap().len(), 5);
        assert_eq!(wire.body["messages"][0]["role"], "system");
        assert_eq!(wire.body["max_tokens"], 256);
        assert_eq!(wire.body["temperature"], 0.5);
    }

    #[test]
    fn anthropic_lifts_system_messages() {
        let wire = build_request("https://api.anthropic.com", &request("claude-3-opus", history())).unwrap();
        assert_eq!(wire.url, "https://api.anthropic.com/v1/messages");
        assert!(wire.headers.contains(&("x-api-key", "key-123".to_string())));
        assert!(wire.headers.contains(&("anthropic-version", "2023-06-01".to_string())));
        assert_eq!(wire.body["system"], "be brief\n\nuse metric units");
        let messages = wire.body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert!(messages.iter().all(|m| m["role"] != "system"));
        assert_eq!(wire.body["model"], "claude-3-opus-20240229");
    }

    #[test]
    fn anthropic_defaults_the_system_prompt() {
        let wire = build_request(
            "https://api.anthropic.com",
            &request("claude-3-sonnet", vec![Message::user("hi")]),
        )
        .unwrap();
        assert_eq!(wire.body["system"], DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn google_drops_system_and_renames_assistant() {
        let wire = build_request(
            "https://generativelanguage.googleapis.com",
            &request("gemini-pro", history()),
        )
        .unwrap();
        assert_eq!(
            wire.url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent"
        );
        assert_eq!(wire.headers, vec![("x-goog-api-key", "key-123".to_string())]);
        let contents = wire.body["contents"].as_array().unwrap();
        let roles: Vec<&str> = contents.iter().map(|c| c["role"].as_str().unwrap()).collect();
        assert_eq!(roles, vec!["user", "model", "user"]);
        assert_eq!(contents[1]["parts"][0]["text"], "hello");
        assert_eq!(wire.body["generationConfig"]["maxOutputTokens"], 256);
    }

    #[test]
    fn responses_are_decoded_per_provider() {
        let openai = br#"{"choices":[{"message":{"role":"assistant","content":"A"}}],"usage":{"total_tokens":12}}"#;
        assert_eq!(
            parse_response(Provider::OpenAi, openai).unwrap(),
            ChatResponse { content: "A".into(), tokens_used: Some(12) }
        );

        let anthropic = br#"{"content":[{"type":"text","text":"B"}],"usage":{"input_tokens":5,"output_tokens":7}}"#;
        assert_eq!(
            parse_response(Provider::Anthropic, anthropic).unwrap(),
            ChatResponse { content: "B".into(), tokens_used: Some(12) }
        );

        let google = br#"{"candidates":[{"content":{"parts":[{"text":"C"}],"role":"model"}}],"usageMetadata":{"totalTokenCount":9}}"#;
        assert_eq!(
            parse_response(Provider::Google, google).unwrap(),
            ChatResponse { content: "C".into(), tokens_used: Some(9) }
        );
    }

    #[test]
    fn missing_usage_is_optional_but_missing_content_is_not() {
        let reply = parse_response(Provider::OpenAi, br#"{"choices":[{"message":{"content":"x"}}]}"#).unwrap();
        assert_eq!(reply.tokens_used, None);

        let err = parse_response(Provider::Google, br#"{"candidates":[]}"#).unwrap_err();
        assert!(matches!(err, KontextError::Transport { .. }));
    }

    #[test]
    fn error_messages_come_from_the_body_and_are_redacted() {
        let body = r#"{"error":{"message":"Incorrect API key provided: sk-proj-abcdef123456","type":"invalid_request_error"}}"#;
        assert_eq!(
            error_message(Provider::OpenAi, 401, body),
            "Incorrect API key provided: [REDACTED]"
        );
        assert_eq!(
            error_message(Provider::Anthropic, 502, "<html>bad gateway</html>"),
            "Anthropic API error: 502"
        );
    }
}
