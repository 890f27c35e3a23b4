use anyhow::Context;
use async_trait::async_trait;

use crate::config::RelayConfig;
use crate::errors::{UpstreamFailure, UpstreamKind};
use crate::models::WebhookOutcome;

const LOGGED_BODY_LIMIT: usize = 200;

/// Transport to the calendar webhook. One call is one attempt.
#[async_trait]
pub trait WebhookClient: Send + Sync {
    async fn get(&self, query: &[(&'static str, String)]) -> WebhookOutcome;
    async fn post(&self, body: &serde_json::Value) -> WebhookOutcome;
}

pub struct HttpWebhookClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpWebhookClient {
    pub fn new(config: &RelayConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build webhook HTTP client")?;

        Ok(Self {
            base_url: config.webhook_base_url.clone(),
            client,
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> WebhookOutcome {
        let resp = match request.send().await {
            Ok(r) => r,
            Err(e) => return classify(&e).into(),
        };

        let status = resp.status();
        let body = match resp.text().await {
            Ok(b) => b,
            Err(e) => return classify(&e).into(),
        };

        if status.is_success() {
            tracing::debug!(status = %status, bytes = body.len(), "webhook replied");
            WebhookOutcome::Success { payload: body }
        } else {
            let snippet: String = body.chars().take(LOGGED_BODY_LIMIT).collect();
            tracing::warn!(status = %status, body = %snippet, "webhook returned error status");
            WebhookOutcome::Failure {
                kind: UpstreamKind::Status(status.as_u16()),
                detail: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            }
        }
    }
}

#[async_trait]
impl WebhookClient for HttpWebhookClient {
    async fn get(&self, query: &[(&'static str, String)]) -> WebhookOutcome {
        self.send(self.client.get(&self.base_url).query(query)).await
    }

    async fn post(&self, body: &serde_json::Value) -> WebhookOutcome {
        self.send(self.client.post(&self.base_url).json(body)).await
    }
}

fn classify(err: &reqwest::Error) -> UpstreamFailure {
    let kind = if err.is_timeout() {
        UpstreamKind::Timeout
    } else if err.is_connect() {
        UpstreamKind::Connection
    } else {
        UpstreamKind::Transport
    };
    tracing::warn!(kind = %kind, error = %err, "webhook request failed");
    UpstreamFailure::new(kind, err.to_string())
}
