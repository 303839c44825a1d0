//! Send workflow state types

use crate::session::{Conversation, Message};

/// Where one send-message workflow currently is
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SendState {
    /// Nothing has happened yet
    #[default]
    Idle,

    /// User message is being appended to the target
    UserAppended { query: String },

    /// Answer request in flight
    AwaitingAnswer { query: String },

    /// Answer is being appended to the target
    AnswerAppended {
        user: Message,
        response: Message,
    },

    /// Title request in flight
    TitleAwaited,

    /// Workflow finished (terminal)
    Done { outcome: Outcome },
}

impl SendState {
    #[allow(dead_code)] // Used in tests
    pub fn is_done(&self) -> bool {
        matches!(self, SendState::Done { .. })
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            SendState::Idle => "idle",
            SendState::UserAppended { .. } => "user_appended",
            SendState::AwaitingAnswer { .. } => "awaiting_answer",
            SendState::AnswerAppended { .. } => "answer_appended",
            SendState::TitleAwaited => "title_awaited",
            SendState::Done { .. } => "done",
        }
    }
}

/// How a finished workflow ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The answer was appended (title derivation may or may not have succeeded)
    Answered,
    /// The backend answered with a non-success status
    Rejected { status: u16 },
    /// The backend could not be reached
    Unreachable,
}

/// Snapshot of the target conversation taken before any I/O.
///
/// Every write of the workflow is addressed by `conversation_id`, never by
/// the live selection. `was_untitled` and `transcript` stay frozen even if
/// the stored conversation changes while the workflow runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendContext {
    pub conversation_id: String,
    pub was_untitled: bool,
    pub transcript: Vec<Message>,
}

impl SendContext {
    pub fn snapshot(conv: &Conversation) -> Self {
        Self {
            conversation_id: conv.id.clone(),
            was_untitled: conv.is_untitled(),
            transcript: conv.messages.clone(),
        }
    }
}
