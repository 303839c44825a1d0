//! Conversation store
//!
//! Owns the collection of conversations. Each conversation is shared as an
//! `Arc` and replaced wholesale on mutation, so readers holding a snapshot
//! never observe a half-applied change.

use super::conversation::Conversation;
use crate::storage::KeyValueStore;
use std::sync::Arc;
use thiserror::Error;

/// Fixed key the collection is persisted under
pub const STORAGE_KEY: &str = "conversations_v1";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Conversation not found: {0}")]
    NotFound(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub struct ConversationStore {
    conversations: Vec<Arc<Conversation>>,
    kv: Arc<dyn KeyValueStore>,
    revision: u64,
}

impl ConversationStore {
    /// Load persisted conversations, falling back to a single bootstrap
    /// conversation when nothing usable is stored.
    pub fn load(kv: Arc<dyn KeyValueStore>) -> Self {
        let conversations = match read_conversations(kv.as_ref()) {
            Some(conversations) if !conversations.is_empty() => conversations,
            _ => vec![Conversation::new()],
        };

        tracing::info!(count = conversations.len(), "Loaded conversations");

        Self {
            conversations: conversations.into_iter().map(Arc::new).collect(),
            kv,
            revision: 0,
        }
    }

    /// Write the whole collection through to storage. Failures are logged only.
    pub fn persist(&self) {
        let plain: Vec<&Conversation> = self.conversations.iter().map(AsRef::as_ref).collect();
        let bytes = match serde_json::to_vec(&plain) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize conversations");
                return;
            }
        };

        if let Err(e) = self.kv.write(STORAGE_KEY, &bytes) {
            tracing::warn!(error = %e, "Failed to persist conversations");
        }
    }

    /// Create an untitled conversation at the front of the collection
    pub fn create(&mut self) -> String {
        let conv = Conversation::new();
        let id = conv.id.clone();
        self.conversations.insert(0, Arc::new(conv));
        self.bump();
        tracing::debug!(conv_id = %id, "Created conversation");
        id
    }

    /// Apply `transform` to a copy of the conversation with `id` and swap it in.
    ///
    /// Other conversations keep their identity. A missing id leaves the store
    /// untouched and is reported to the caller.
    pub fn mutate<F>(&mut self, id: &str, transform: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Conversation),
    {
        let slot = self
            .conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let mut updated = Conversation::clone(slot);
        transform(&mut updated);
        *slot = Arc::new(updated);

        self.bump();
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<Conversation>> {
        self.conversations.iter().find(|c| c.id == id).cloned()
    }

    /// Snapshot of the collection in store order
    pub fn conversations(&self) -> Vec<Arc<Conversation>> {
        self.conversations.clone()
    }

    /// Number of changes since load
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn bump(&mut self) {
        self.revision += 1;
        self.persist();
    }
}

fn read_conversations(kv: &dyn KeyValueStore) -> Option<Vec<Conversation>> {
    let bytes = match kv.read(STORAGE_KEY) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            tracing::info!("No stored conversations, starting fresh");
            return None;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read stored conversations");
            return None;
        }
    };

    match serde_json::from_slice::<Vec<Conversation>>(&bytes) {
        Ok(conversations) => Some(dedupe_ids(conversations)),
        Err(e) => {
            tracing::warn!(error = %e, "Stored conversations are unreadable, starting fresh");
            None
        }
    }
}

/// Keep the first occurrence of each id
fn dedupe_ids(conversations: Vec<Conversation>) -> Vec<Conversation> {
    let mut seen = std::collections::HashSet::new();
    conversations
        .into_iter()
        .filter(|c| seen.insert(c.id.clone()))
        .collect()
}
