// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HttpTransport against mock provider endpoints.

use std::time::Duration;

use kontext_config::ProvidersConfig;
use kontext_core::{ChatRequest, CompletionTransport, KontextError, Message, models};
use kontext_provider::HttpTransport;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport_for(server: &MockServer) -> HttpTransport {
    let uri = server.uri();
    HttpTransport::new(&ProvidersConfig {
        openai_base_url: uri.clone(),
        anthropic_base_url: uri.clone(),
        google_base_url: uri,
        request_timeout_secs: 1,
    })
    .unwrap()
}

fn request(model_key: &str, key: &str) -> ChatRequest {
    ChatRequest {
        model: models::lookup(model_key).unwrap(),
        messages: vec![
            Message::system("be terse"),
            Message::user("hello"),
            Message::assistant("hi"),
            Message::user("what is rust?"),
        ],
        credential: SecretString::from(key.to_string()),
        temperature: 0.7,
        max_output_tokens: 512,
    }
}

#[tokio::test]
async fn openai_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test-openai"))
        .and(body_partial_json(json!({"model": "gpt-4", "max_tokens": 512})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "A language."}}],
            "usage": {"prompt_tokens": 20, "completion_tokens": 3, "total_tokens": 23}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = transport_for(&server)
        .send_chat(request("gpt-4", "sk-test-openai"))
        .await
        .unwrap();
    assert_eq!(reply.content, "A language.");
    assert_eq!(reply.tokens_used, Some(23));
}

#[tokio::test]
async fn anthropic_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "anthropic-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({"system": "be terse"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_1",
            "type": "message",
            "content": [{"type": "text", "text": "A systems language."}],
            "usage": {"input_tokens": 18, "output_tokens": 4}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = transport_for(&server)
        .send_chat(request("claude-3.5-sonnet", "anthropic-key"))
        .await
        .unwrap();
    assert_eq!(reply.content, "A systems language.");
    assert_eq!(reply.tokens_used, Some(22));

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["messages"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn google_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-pro:generateContent"))
        .and(header("x-goog-api-key", "google-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "Fast and safe."}]}}],
            "usageMetadata": {"totalTokenCount": 15}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = transport_for(&server)
        .send_chat(request("gemini-pro", "google-key"))
        .await
        .unwrap();
    assert_eq!(reply.content, "Fast and safe.");
    assert_eq!(reply.tokens_used, Some(15));

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    let roles: Vec<&str> = body["contents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["user", "model", "user"]);
}

#[tokio::test]
async fn error_body_message_is_redacted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided: sk-live-1234567890abcd", "type": "invalid_request_error"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = transport_for(&server)
        .send_chat(request("gpt-4o", "sk-live-1234567890abcd"))
        .await
        .unwrap_err();
    match err {
        KontextError::Transport {
            message, status, ..
        } => {
            assert_eq!(status, Some(401));
            assert_eq!(message, "Incorrect API key provided: [REDACTED]");
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn unparseable_error_body_falls_back_to_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let err = transport_for(&server)
        .send_chat(request("claude-3-opus", "anthropic-key"))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        KontextError::transport("Anthropic API error: 503", Some(503)).to_string()
    );
}

#[tokio::test]
async fn unexpected_success_shape_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = transport_for(&server)
        .send_chat(request("gpt-3.5-turbo", "sk-test-openai"))
        .await
        .unwrap_err();
    assert!(matches!(err, KontextError::Transport { status: None, .. }));
}

#[tokio::test]
async fn slow_provider_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(3))
                .set_body_json(json!({"choices": []})),
        )
        .mount(&server)
        .await;

    let err = transport_for(&server)
        .send_chat(request("gpt-4", "sk-test-openai"))
        .await
        .unwrap_err();
    assert!(matches!(err, KontextError::Transport { .. }));
    assert!(err.to_string().contains("timed out"));
}

#[tokio::test]
async fn no_retry_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": {"message": "boom"}})))
        .expect(1)
        .mount(&server)
        .await;

    let err = transport_for(&server)
        .send_chat(request("gpt-4", "sk-test-openai"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("boom"));
}
