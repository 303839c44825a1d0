//! View-only derivations over the store and selection

use super::conversation::{Citation, Conversation, Message, UNTITLED};
use super::indicator::LoadingState;
use super::selector::Selector;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Most citations shown for the active conversation
pub const MAX_SOURCES: usize = 6;

/// Placeholder shown while a conversation waits for its generated title
pub const GENERATING_TITLE: &str = "Generating title…";

/// One row of the conversation list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationItem {
    pub id: String,
    pub display_title: String,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Everything a front-end needs to render one frame
#[derive(Debug, Clone)]
pub struct Projection {
    pub active: Arc<Conversation>,
    pub loading: LoadingState,
    pub conversations: Vec<ConversationItem>,
    pub sources: Vec<Citation>,
}

impl Projection {
    pub fn build(
        active: Arc<Conversation>,
        conversations: &[Arc<Conversation>],
        loading: LoadingState,
    ) -> Self {
        Self {
            sources: sources(&active),
            conversations: conversation_list(conversations, &active.id),
            active,
            loading,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.active.messages
    }
}

/// The selected conversation, or the first one when the selection is gone
pub fn active_conversation(
    conversations: &[Arc<Conversation>],
    selector: &Selector,
) -> Option<Arc<Conversation>> {
    selector.resolve(conversations)
}

pub fn display_title(conv: &Conversation) -> String {
    if !conv.title.is_empty() && !conv.is_untitled() {
        conv.title.clone()
    } else if conv.has_response() {
        GENERATING_TITLE.to_string()
    } else {
        UNTITLED.to_string()
    }
}

/// Conversations ordered by most recent activity
pub fn conversation_list(conversations: &[Arc<Conversation>], active_id: &str) -> Vec<ConversationItem> {
    let mut sorted: Vec<&Arc<Conversation>> = conversations.iter().collect();
    sorted.sort_by_key(|c| std::cmp::Reverse(c.updated_at));
    sorted
        .into_iter()
        .map(|c| ConversationItem {
            id: c.id.clone(),
            display_title: display_title(c),
            updated_at: c.updated_at,
            is_active: c.id == active_id,
        })
        .collect()
}

/// Citations of the latest answer, capped at [`MAX_SOURCES`]
pub fn sources(conv: &Conversation) -> Vec<Citation> {
    conv.messages
        .iter()
        .rev()
        .find_map(|m| match m {
            Message::Response { citations, .. } => Some(citations),
            _ => None,
        })
        .map(|citations| citations.iter().take(MAX_SOURCES).cloned().collect())
        .unwrap_or_default()
}
