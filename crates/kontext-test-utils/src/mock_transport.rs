// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted completion transport for deterministic tests.
//!
//! Replies are popped from a FIFO queue; an empty queue yields
//! `"mock response"`. Every request is recorded for later inspection.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tokio::sync::{Mutex, Notify, Semaphore};

use kontext_core::{
    AdapterType, ChatRequest, ChatResponse, CompletionTransport, HealthStatus, KontextError,
    Message, PluginAdapter,
};

/// One scripted transport outcome.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Reply {
        content: String,
        tokens_used: Option<u32>,
    },
    Fail {
        message: String,
        status: Option<u16>,
    },
}

impl ScriptedReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Reply {
            content: content.into(),
            tokens_used: Some(42),
        }
    }

    pub fn failure(message: impl Into<String>, status: u16) -> Self {
        Self::Fail {
            message: message.into(),
            status: Some(status),
        }
    }
}

/// A request as seen by the transport, with the credential exposed.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub model_key: &'static str,
    pub messages: Vec<Message>,
    pub credential: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
}

#[derive(Clone)]
pub struct MockTransport {
    replies: Arc<Mutex<VecDeque<ScriptedReply>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    latency: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
    started: Arc<Notify>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            latency: None,
            gate: None,
            started: Arc::new(Notify::new()),
        }
    }

    /// Pre-loads successful text replies.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let transport = Self::new();
        if let Ok(mut queue) = transport.replies.try_lock() {
            queue.extend(replies.into_iter().map(ScriptedReply::text));
        }
        transport
    }

    /// Sleeps for `latency` before answering each request.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Holds every request until [`release`](Self::release) is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Lets one held request proceed.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    /// Resolves once a request has been received.
    pub async fn wait_for_request(&self) {
        self.started.notified().await;
    }

    pub async fn push(&self, reply: ScriptedReply) {
        self.replies.lock().await.push_back(reply);
    }

    pub async fn push_text(&self, content: impl Into<String>) {
        self.push(ScriptedReply::text(content)).await;
    }

    pub async fn push_failure(&self, message: impl Into<String>, status: u16) {
        self.push(ScriptedReply::failure(message, status)).await;
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, KontextError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), KontextError> {
        Ok(())
    }
}

#[async_trait]
impl CompletionTransport for MockTransport {
    async fn send_chat(&self, request: ChatRequest) -> Result<ChatResponse, KontextError> {
        self.requests.lock().await.push(RecordedRequest {
            model_key: request.model.key,
            messages: request.messages,
            credential: request.credential.expose_secret().to_string(),
            temperature: request.temperature,
            max_output_tokens: request.max_output_tokens,
        });
        self.started.notify_one();

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| KontextError::Internal(e.to_string()))?;
            permit.forget();
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let reply = self
            .replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| ScriptedReply::text("mock response"));

        match reply {
            ScriptedReply::Reply {
                content,
                tokens_used,
            } => Ok(ChatResponse {
                content,
                tokens_used,
            }),
            ScriptedReply::Fail { message, status } => {
                Err(KontextError::transport(message, status))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kontext_core::models;
    use secrecy::SecretString;

    fn request(text: &str) -> ChatRequest {
        ChatRequest {
            model: models::lookup("gpt-4").unwrap(),
            messages: vec![Message::user(text)],
            credential: SecretString::from("sk-test".to_string()),
            temperature: 0.7,
            max_output_tokens: 100,
        }
    }

    #[tokio::test]
    async fn default_reply_when_queue_empty() {
        let transport = MockTransport::new();
        let reply = transport.send_chat(request("hi")).await.unwrap();
        assert_eq!(reply.content, "mock response");
    }

    #[tokio::test]
    async fn replies_in_order_and_failures_are_typed() {
        let transport = MockTransport::with_replies(["first"]);
        transport.push_failure("boom", 500).await;

        assert_eq!(transport.send_chat(request("a")).await.unwrap().content, "first");
        let err = transport.send_chat(request("b")).await.unwrap_err();
        assert!(matches!(err, KontextError::Transport { status: Some(500), .. }));

        let recorded = transport.requests().await;
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].credential, "sk-test");
        assert_eq!(recorded[1].messages[0].content, "b");
    }

    #[tokio::test]
    async fn gated_requests_wait_for_release() {
        let transport = MockTransport::with_replies(["held"]).gated();
        let handle = {
            let transport = transport.clone();
            tokio::spawn(async move { transport.send_chat(request("x")).await })
        };
        transport.wait_for_request().await;
        assert!(!handle.is_finished());
        transport.release();
        assert_eq!(handle.await.unwrap().unwrap().content, "held");
    }
}
