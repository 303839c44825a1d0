//! Effects produced by state transitions

use crate::session::Message;
use std::time::Duration;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append a message to the target conversation
    AppendMessage { message: Message },

    /// Show the loading indicator after `delay` unless finalized first
    ScheduleLoading { delay: Duration },

    /// Ask the answer service
    RequestAnswer { query: String },

    /// Ask the title service
    RequestTitle { transcript: Vec<Message> },

    /// Write a generated title, only if the target is still untitled
    ApplyTitle { title: String },

    /// Cancel the pending indicator and clear it
    Finalize,
}

impl Effect {
    pub fn append(message: Message) -> Self {
        Effect::AppendMessage { message }
    }
}
