//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::backend::{Answer, BackendError};
use crate::session::Message;
use async_trait::async_trait;
use std::sync::Arc;

/// Retrieval-augmented answer service
#[async_trait]
pub trait AnswerService: Send + Sync {
    /// Answer a raw user query
    async fn ask(&self, query: &str) -> Result<Answer, BackendError>;
}

/// Conversation title service
#[async_trait]
pub trait TitleService: Send + Sync {
    /// Produce a title for the transcript (oldest message first)
    async fn title_for(&self, transcript: &[Message]) -> Result<String, BackendError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: AnswerService + ?Sized> AnswerService for Arc<T> {
    async fn ask(&self, query: &str) -> Result<Answer, BackendError> {
        (**self).ask(query).await
    }
}

#[async_trait]
impl<T: TitleService + ?Sized> TitleService for Arc<T> {
    async fn title_for(&self, transcript: &[Message]) -> Result<String, BackendError> {
        (**self).title_for(transcript).await
    }
}
