//! Pure state transition function

use super::{Effect, Event, Outcome, SendContext, SendState};
use crate::session::indicator::LOADING_DEBOUNCE;
use crate::session::Message;
use thiserror::Error;

/// Notice appended when the backend cannot be reached
pub const UNREACHABLE_NOTICE: &str = "Error contacting backend";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SendState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SendState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

pub fn rejected_notice(status: u16) -> String {
    format!("Backend error: {status}")
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs and performs no
/// I/O. Only the context's identity and untitled flag are consulted; the
/// stored conversation is never read here.
pub fn transition(
    state: &SendState,
    context: &SendContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        (SendState::Idle, Event::Submit { text }) => {
            if text.trim().is_empty() {
                return Err(TransitionError::EmptyMessage);
            }
            Ok(TransitionResult::new(SendState::UserAppended {
                query: text.clone(),
            })
            .with_effect(Effect::append(Message::user(text)))
            .with_effect(Effect::ScheduleLoading {
                delay: LOADING_DEBOUNCE,
            }))
        }

        (SendState::UserAppended { query }, Event::MessageAppended) => Ok(TransitionResult::new(
            SendState::AwaitingAnswer {
                query: query.clone(),
            },
        )
        .with_effect(Effect::RequestAnswer {
            query: query.clone(),
        })),

        // ============================================================
        // Answer handling
        // ============================================================
        (SendState::AwaitingAnswer { query }, Event::AnswerReceived { answer }) => {
            let response = answer.into_message();
            Ok(TransitionResult::new(SendState::AnswerAppended {
                user: Message::user(query.clone()),
                response: response.clone(),
            })
            .with_effect(Effect::append(response)))
        }

        (SendState::AwaitingAnswer { .. }, Event::AnswerRejected { status }) => {
            Ok(TransitionResult::new(SendState::Done {
                outcome: Outcome::Rejected { status },
            })
            .with_effect(Effect::append(Message::system(rejected_notice(status))))
            .with_effect(Effect::Finalize))
        }

        (SendState::AwaitingAnswer { .. }, Event::TransportFailed { .. }) => {
            Ok(TransitionResult::new(SendState::Done {
                outcome: Outcome::Unreachable,
            })
            .with_effect(Effect::append(Message::system(UNREACHABLE_NOTICE)))
            .with_effect(Effect::Finalize))
        }

        // ============================================================
        // Title derivation
        // ============================================================
        (SendState::AnswerAppended { user, response }, Event::MessageAppended) => {
            if context.was_untitled {
                let mut transcript = context.transcript.clone();
                transcript.push(user.clone());
                transcript.push(response.clone());
                Ok(TransitionResult::new(SendState::TitleAwaited)
                    .with_effect(Effect::RequestTitle { transcript }))
            } else {
                Ok(TransitionResult::new(SendState::Done {
                    outcome: Outcome::Answered,
                })
                .with_effect(Effect::Finalize))
            }
        }

        (SendState::TitleAwaited, Event::TitleResolved { title }) => {
            let result = TransitionResult::new(SendState::Done {
                outcome: Outcome::Answered,
            });
            let result = match title {
                Some(title) => result.with_effect(Effect::ApplyTitle { title }),
                None => result,
            };
            Ok(result.with_effect(Effect::Finalize))
        }

        // Acknowledgement of the error notice appended on the way to Done
        (SendState::Done { .. }, Event::MessageAppended) => {
            Ok(TransitionResult::new(state.clone()))
        }

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{event:?} in state {}",
            state.name()
        ))),
    }
}
