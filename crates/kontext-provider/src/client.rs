// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP completion transport.
//!
//! Provides [`HttpTransport`], one pooled client for all three providers.
//! Requests are sent once; failures surface as [`KontextError::Transport`].

use std::time::Duration;

use async_trait::async_trait;
use kontext_config::ProvidersConfig;
use kontext_core::{
    AdapterType, ChatRequest, ChatResponse, CompletionTransport, HealthStatus, KontextError,
    PluginAdapter, Provider,
};
use secrecy::ExposeSecret;
use tracing::{debug, warn};

use crate::format::{build_request, error_message, parse_response};
use crate::redact::redact;

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: ProvidersConfig,
}

impl HttpTransport {
    pub fn new(config: &ProvidersConfig) -> Result<Self, KontextError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| KontextError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                status: None,
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn base_url(&self, provider: Provider) -> &str {
        match provider {
            Provider::OpenAi => &self.config.openai_base_url,
            Provider::Anthropic => &self.config.anthropic_base_url,
            Provider::Google => &self.config.google_base_url,
        }
    }
}

fn request_failed(e: reqwest::Error) -> KontextError {
    let message = if e.is_timeout() {
        "request timed out".to_string()
    } else {
        format!("HTTP request failed: {}", redact(&e.to_string()))
    };
    KontextError::Transport {
        message,
        status: e.status().map(|s| s.as_u16()),
        source: Some(Box::new(e)),
    }
}

#[async_trait]
impl PluginAdapter for HttpTransport {
    fn name(&self) -> &str {
        "http-transport"
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
impl CompletionTransport for HttpTransport {
    async fn send_chat(&self, request: ChatRequest) -> Result<ChatResponse, KontextError> {
        let provider = request.model.provider;
        if request.credential.expose_secret().trim().is_empty() {
            return Err(KontextError::MissingCredential { provider });
        }

        let wire = build_request(self.base_url(provider), &request)?;
        let mut builder = self.client.post(&wire.url).json(&wire.body);
        for (name, value) in &wire.headers {
            builder = builder.header(*name, value);
        }

        debug!(
            %provider,
            model = request.model.id,
            messages = request.messages.len(),
            "sending chat request"
        );
        let response = builder.send().await.map_err(request_failed)?;
        let status = response.status();
        let body = response.bytes().await.map_err(request_failed)?;

        if !status.is_success() {
            let message = error_message(provider, status.as_u16(), &String::from_utf8_lossy(&body));
            warn!(%provider, status = status.as_u16(), %message, "provider returned an error");
            return Err(KontextError::transport(message, Some(status.as_u16())));
        }

        let reply = parse_response(provider, &body)?;
        debug!(%provider, tokens_used = ?reply.tokens_used, "chat response received");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kontext_core::{Message, models};
    use secrecy::SecretString;

    #[tokio::test]
    async fn empty_credential_fails_before_any_request() {
        // Unroutable base URL: reaching the network would produce a different error.
        let config = ProvidersConfig {
            openai_base_url: "http://127.0.0.1:9".into(),
            ..ProvidersConfig::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        let err = transport
            .send_chat(ChatRequest {
                model: models::lookup("gpt-4").unwrap(),
                messages: vec![Message::user("hi")],
                credential: SecretString::from(String::new()),
                temperature: 0.7,
                max_output_tokens: 100,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            KontextError::MissingCredential {
                provider: Provider::OpenAi
            }
        ));
    }

    #[test]
    fn adapter_identity() {
        let transport = HttpTransport::new(&ProvidersConfig::default()).unwrap();
        assert_eq!(transport.name(), "http-transport");
        assert_eq!(transport.adapter_type(), AdapterType::Transport);
    }
}
