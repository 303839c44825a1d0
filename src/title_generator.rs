//! Conversation title derivation
//!
//! Asks the title service for a short title once a conversation has its
//! first answer, and applies it only if nobody titled the conversation in
//! the meantime.

use crate::runtime::TitleService;
use crate::session::{Conversation, Message, UNTITLED};
use std::time::Duration;
use tokio::time::timeout;

const TITLE_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_TITLE_LENGTH: usize = 80;

/// Generate a title for a conversation from its transcript.
///
/// Returns None if title generation fails (timeout, error, empty result).
/// The conversation keeps its placeholder title in that case.
pub async fn generate_title(transcript: &[Message], service: &dyn TitleService) -> Option<String> {
    let result = timeout(TITLE_TIMEOUT, service.title_for(transcript)).await;

    match result {
        Ok(Ok(raw)) => {
            let title = clean_title(&raw);
            if title.is_none() {
                tracing::warn!(raw = %raw, "Title service returned an unusable title");
            }
            title
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e.message, kind = ?e.kind, "Title generation failed");
            None
        }
        Err(_) => {
            tracing::warn!("Title generation timed out");
            None
        }
    }
}

/// Assign `title` only if the conversation is still untitled.
///
/// Returns whether the title was written.
pub fn apply_title(conv: &mut Conversation, title: &str) -> bool {
    if !conv.is_untitled() {
        return false;
    }
    conv.title = title.to_string();
    conv.touch();
    true
}

/// Normalize a service-provided title
fn clean_title(raw: &str) -> Option<String> {
    let first_line = raw.trim().lines().next().unwrap_or_default().trim();
    let unquoted = first_line
        .trim_matches(|c| matches!(c, '"' | '\'' | '`' | '“' | '”'))
        .trim();

    if unquoted.is_empty() || unquoted == UNTITLED {
        return None;
    }

    let title: String = unquoted.chars().take(MAX_TITLE_LENGTH).collect();
    Some(title.trim_end().to_string())
}
