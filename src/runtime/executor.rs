//! Send workflow executor

use super::traits::{AnswerService, TitleService};
use crate::backend::{BackendError, BackendErrorKind};
use crate::session::indicator::{random_hint, LoadingGuard};
use crate::session::{SessionState, StoreError};
use crate::state_machine::{transition, Effect, Event, Outcome, SendContext, SendState, TransitionError};
use crate::title_generator::{apply_title, generate_title};
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;

/// Errors that end a send before it reaches a normal outcome
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    /// The target conversation disappeared from the store mid-flight
    #[error("Conversation not found: {0}")]
    ConversationMissing(String),
}

impl From<StoreError> for SendError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => SendError::ConversationMissing(id),
        }
    }
}

/// One run of the send-message workflow against a fixed target conversation
pub struct SendWorkflow<A, T>
where
    A: AnswerService + 'static,
    T: TitleService + 'static,
{
    context: SendContext,
    state: SendState,
    session: Arc<SessionState>,
    answers: Arc<A>,
    titles: Arc<T>,
    /// Dropped on finalize, or with the workflow on any early exit
    loading: Option<LoadingGuard>,
}

impl<A, T> SendWorkflow<A, T>
where
    A: AnswerService + 'static,
    T: TitleService + 'static,
{
    pub fn new(
        context: SendContext,
        session: Arc<SessionState>,
        answers: Arc<A>,
        titles: Arc<T>,
    ) -> Self {
        Self {
            context,
            state: SendState::Idle,
            session,
            answers,
            titles,
            loading: None,
        }
    }

    pub async fn run(mut self, text: &str) -> Result<Outcome, SendError> {
        tracing::info!(conv_id = %self.context.conversation_id, "Sending message");

        // Events are handled in arrival order; effects may queue follow-ups
        let mut events = VecDeque::from([Event::Submit {
            text: text.to_string(),
        }]);

        while let Some(event) = events.pop_front() {
            let result = transition(&self.state, &self.context, event)?;

            tracing::debug!(
                conv_id = %self.context.conversation_id,
                from = self.state.name(),
                to = result.new_state.name(),
                "Send state transition"
            );
            self.state = result.new_state;

            for effect in result.effects {
                if let Some(next) = self.execute_effect(effect).await? {
                    events.push_back(next);
                }
            }
        }

        match self.state {
            SendState::Done { outcome } => {
                tracing::info!(conv_id = %self.context.conversation_id, ?outcome, "Send finished");
                Ok(outcome)
            }
            ref other => Err(TransitionError::InvalidTransition(format!(
                "workflow stalled in state {}",
                other.name()
            ))
            .into()),
        }
    }

    /// Execute an effect and optionally return a generated event
    async fn execute_effect(&mut self, effect: Effect) -> Result<Option<Event>, SendError> {
        match effect {
            Effect::AppendMessage { message } => {
                // Applied to whatever is stored now, not to the snapshot
                self.session
                    .mutate(&self.context.conversation_id, |conv| conv.push(message))?;
                Ok(Some(Event::MessageAppended))
            }

            Effect::ScheduleLoading { delay } => {
                let guard = self.session.indicator().schedule(delay, random_hint());
                self.loading = Some(guard);
                Ok(None)
            }

            Effect::RequestAnswer { query } => {
                let event = match self.answers.ask(&query).await {
                    Ok(answer) => Event::AnswerReceived { answer },
                    Err(e) => self.answer_failure(e),
                };
                Ok(Some(event))
            }

            Effect::RequestTitle { transcript } => {
                let title = generate_title(&transcript, self.titles.as_ref()).await;
                Ok(Some(Event::TitleResolved { title }))
            }

            Effect::ApplyTitle { title } => {
                let mut applied = false;
                let result = self
                    .session
                    .mutate(&self.context.conversation_id, |conv| {
                        applied = apply_title(conv, &title);
                    });

                // Title problems are never surfaced to the user
                match result {
                    Ok(()) if applied => {
                        tracing::info!(conv_id = %self.context.conversation_id, title = %title, "Conversation titled");
                    }
                    Ok(()) => {
                        tracing::info!(
                            conv_id = %self.context.conversation_id,
                            "Conversation already titled, keeping existing title"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Could not apply generated title");
                    }
                }
                Ok(None)
            }

            Effect::Finalize => {
                drop(self.loading.take());
                Ok(None)
            }
        }
    }

    fn answer_failure(&self, error: BackendError) -> Event {
        match error.kind {
            BackendErrorKind::Rejected { status } => {
                tracing::error!(
                    conv_id = %self.context.conversation_id,
                    status,
                    error = %error.message,
                    "Backend rejected query"
                );
                Event::AnswerRejected { status }
            }
            BackendErrorKind::Transport | BackendErrorKind::Timeout | BackendErrorKind::Malformed => {
                tracing::error!(
                    conv_id = %self.context.conversation_id,
                    kind = ?error.kind,
                    error = %error.message,
                    "Error contacting backend"
                );
                Event::TransportFailed {
                    message: error.message,
                }
            }
        }
    }
}
