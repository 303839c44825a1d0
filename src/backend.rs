//! Chat backend collaborators
//!
//! The RAG answer service and the title service live behind the same HTTP
//! base URL. Everything here is plumbing; the session never depends on
//! the wire format directly.

mod error;
mod http;
mod types;

pub use error::{BackendError, BackendErrorKind};
pub use http::HttpBackend;
pub use types::Answer;

use crate::runtime::{AnswerService, TitleService};
use crate::session::Message;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_BACKEND_URL: &str = "http://localhost:3000";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    /// Transport timeout for every backend request
    pub timeout: Duration,
    pub db_path: PathBuf,
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let timeout_secs = std::env::var("RAG_CHAT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let db_path = std::env::var("RAG_CHAT_DB_PATH").map_or_else(
            |_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".rag-chat").join("rag-chat.db")
            },
            PathBuf::from,
        );

        Self {
            backend_url: std::env::var("RAG_CHAT_BACKEND_URL")
                .unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            db_path,
            log_json: std::env::var_os("RAG_CHAT_LOG_JSON").is_some(),
        }
    }
}

/// Logging wrapper for backend services
pub struct LoggingBackend<B> {
    inner: Arc<B>,
}

impl<B> LoggingBackend<B> {
    pub fn new(inner: Arc<B>) -> Self {
        Self { inner }
    }
}

fn log_outcome<T>(operation: &str, started: Instant, result: &Result<T, BackendError>) {
    let duration = started.elapsed();
    match result {
        Ok(_) => {
            tracing::info!(
                operation,
                duration_ms = %duration.as_millis(),
                "Backend request completed"
            );
        }
        Err(e) => {
            tracing::warn!(
                operation,
                duration_ms = %duration.as_millis(),
                status = ?e.status(),
                unreachable = e.kind.is_unreachable(),
                error = %e.message,
                "Backend request failed"
            );
        }
    }
}

#[async_trait]
impl<B: AnswerService> AnswerService for LoggingBackend<B> {
    async fn ask(&self, query: &str) -> Result<Answer, BackendError> {
        tracing::debug!(query_len = query.len(), "Sending query");
        let started = Instant::now();
        let result = self.inner.ask(query).await;
        log_outcome("ask", started, &result);
        result
    }
}

#[async_trait]
impl<B: TitleService> TitleService for LoggingBackend<B> {
    async fn title_for(&self, transcript: &[Message]) -> Result<String, BackendError> {
        let started = Instant::now();
        let result = self.inner.title_for(transcript).await;
        log_outcome("title", started, &result);
        result
    }
}
