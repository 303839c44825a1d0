//! Events that drive a send workflow

use crate::backend::Answer;

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // User events
    Submit { text: String },

    // Store events
    /// The last requested append landed on the target conversation
    MessageAppended,

    // Answer service events
    AnswerReceived { answer: Answer },
    AnswerRejected { status: u16 },
    TransportFailed { message: String },

    // Title service events
    /// `None` when title derivation failed or produced nothing usable
    TitleResolved { title: Option<String> },
}
