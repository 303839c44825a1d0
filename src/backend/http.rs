//! HTTP client for the chat backend

use super::types::{Answer, AnswerRequest, TitleRequest, TitleResponse};
use super::BackendError;
use crate::runtime::{AnswerService, TitleService};
use crate::session::Message;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Longest error body carried into an error message
const MAX_ERROR_BODY: usize = 200;

/// Backend reachable over HTTP, serving `/rag` and `/title`
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<Value, BackendError> {
        let url = format!("{}{path}", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::timeout(format!("Request to {path} timed out"))
                } else {
                    BackendError::transport(format!("Request to {path} failed: {e}"))
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::transport(format!("Failed to read response body: {e}")))?;

        if !status.is_success() {
            let snippet: String = text.chars().take(MAX_ERROR_BODY).collect();
            return Err(BackendError::rejected(
                status.as_u16(),
                format!("HTTP {status}: {snippet}"),
            ));
        }

        serde_json::from_str(&text)
            .map_err(|e| BackendError::malformed(format!("Invalid JSON from {path}: {e}")))
    }
}

#[async_trait]
impl AnswerService for HttpBackend {
    async fn ask(&self, query: &str) -> Result<Answer, BackendError> {
        let body = self.post_json("/rag", &AnswerRequest { query }).await?;
        Ok(Answer::from_value(&body))
    }
}

#[async_trait]
impl TitleService for HttpBackend {
    async fn title_for(&self, transcript: &[Message]) -> Result<String, BackendError> {
        let body = self
            .post_json(
                "/title",
                &TitleRequest {
                    messages: transcript,
                },
            )
            .await?;

        let response: TitleResponse = serde_json::from_value(body)
            .map_err(|e| BackendError::malformed(format!("Invalid title payload: {e}")))?;

        response
            .title
            .ok_or_else(|| BackendError::malformed("Title payload has no title"))
    }
}
