//! Active conversation selection

use super::conversation::Conversation;
use std::sync::Arc;

/// Tracks which conversation is active.
///
/// Selection is not validated against the store; `resolve` falls back to the
/// first conversation when the selected id is gone.
#[derive(Debug, Clone, Default)]
pub struct Selector {
    active: Option<String>,
}

impl Selector {
    pub fn new(active: Option<String>) -> Self {
        Self { active }
    }

    pub fn select(&mut self, id: impl Into<String>) {
        self.active = Some(id.into());
    }

    pub fn resolve(&self, conversations: &[Arc<Conversation>]) -> Option<Arc<Conversation>> {
        self.active
            .as_deref()
            .and_then(|id| conversations.iter().find(|c| c.id == id))
            .or_else(|| conversations.first())
            .cloned()
    }
}
