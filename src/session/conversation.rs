//! Conversation data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title of a conversation that has not been named yet
pub const UNTITLED: &str = "New chat";

/// A source reference attached to a generated answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Citation {
    #[allow(dead_code)] // Used in tests
    pub fn new(url: impl Into<String>, title: Option<String>) -> Self {
        Self {
            url: url.into(),
            title,
        }
    }

    /// Display label: the title when present, otherwise the url
    pub fn label(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => &self.url,
        }
    }
}

/// One entry in a conversation transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role")]
pub enum Message {
    User {
        text: String,
    },
    #[serde(rename = "RAG")]
    Response {
        text: String,
        #[serde(default)]
        citations: Vec<Citation>,
    },
    /// Error notices shown inline
    System {
        text: String,
    },
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Message::User { text: text.into() }
    }

    pub fn response(text: impl Into<String>, citations: Vec<Citation>) -> Self {
        Message::Response {
            text: text.into(),
            citations,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Message::System { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            Message::User { text } | Message::Response { text, .. } | Message::System { text } => {
                text
            }
        }
    }

    /// Label used when rendering the transcript
    pub fn role_label(&self) -> &'static str {
        match self {
            Message::User { .. } => "User",
            Message::Response { .. } => "RAG",
            Message::System { .. } => "System",
        }
    }

    pub fn is_response(&self) -> bool {
        matches!(self, Message::Response { .. })
    }

    #[allow(dead_code)] // Used in tests
    pub fn is_user(&self) -> bool {
        matches!(self, Message::User { .. })
    }
}

/// A named, ordered thread of messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Create an untitled conversation with a fresh id
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: UNTITLED.to_string(),
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
        }
    }

    pub fn is_untitled(&self) -> bool {
        self.title == UNTITLED
    }

    pub fn has_response(&self) -> bool {
        self.messages.iter().any(Message::is_response)
    }

    /// Refresh `updated_at`, never moving it backwards
    pub fn touch(&mut self) {
        let now = Utc::now();
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.touch();
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
