//! Conversation session
//!
//! Ties the conversation store, the active selection and the loading
//! indicator together and exposes the actions and read-only projections a
//! front-end consumes.

pub mod conversation;
pub mod indicator;
pub mod projection;
pub mod selector;
pub mod store;

pub use conversation::{Citation, Conversation, Message, UNTITLED};
pub use indicator::{LoadingIndicator, LoadingState};
pub use projection::Projection;
pub use selector::Selector;
pub use store::{ConversationStore, StoreError, StoreResult};

use crate::runtime::{AnswerService, SendError, SendWorkflow, TitleService};
use crate::state_machine::{Outcome, SendContext};
use crate::storage::KeyValueStore;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Change notifications for front-ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The store or the selection changed
    ConversationsChanged { revision: u64 },
    LoadingChanged(LoadingState),
}

/// State shared between the session and its in-flight workflows
pub struct SessionState {
    store: Mutex<ConversationStore>,
    selector: Mutex<Selector>,
    indicator: Arc<LoadingIndicator>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionState {
    pub fn new(store: ConversationStore) -> Self {
        let (events, _) = broadcast::channel(128);
        let first = store.conversations().first().map(|c| c.id.clone());
        Self {
            store: Mutex::new(store),
            selector: Mutex::new(Selector::new(first)),
            indicator: Arc::new(LoadingIndicator::new(events.clone())),
            events,
        }
    }

    /// Mutate one conversation by id and notify subscribers
    pub fn mutate<F>(&self, id: &str, transform: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Conversation),
    {
        let revision = {
            let mut store = self.store.lock();
            store.mutate(id, transform)?;
            store.revision()
        };
        self.notify_changed(revision);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<Conversation>> {
        self.store.lock().get(id)
    }

    pub fn indicator(&self) -> &Arc<LoadingIndicator> {
        &self.indicator
    }

    /// The active conversation, falling back to the first one
    pub fn active(&self) -> Option<Arc<Conversation>> {
        let conversations = self.store.lock().conversations();
        projection::active_conversation(&conversations, &self.selector.lock())
    }

    fn notify_changed(&self, revision: u64) {
        let _ = self
            .events
            .send(SessionEvent::ConversationsChanged { revision });
    }
}

/// Presentation-facing session handle
pub struct Session<A, T>
where
    A: AnswerService + 'static,
    T: TitleService + 'static,
{
    state: Arc<SessionState>,
    answers: Arc<A>,
    titles: Arc<T>,
}

impl<A, T> Clone for Session<A, T>
where
    A: AnswerService + 'static,
    T: TitleService + 'static,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            answers: Arc::clone(&self.answers),
            titles: Arc::clone(&self.titles),
        }
    }
}

impl<A, T> Session<A, T>
where
    A: AnswerService + 'static,
    T: TitleService + 'static,
{
    pub fn new(kv: Arc<dyn KeyValueStore>, answers: A, titles: T) -> Self {
        Self::from_parts(ConversationStore::load(kv), Arc::new(answers), Arc::new(titles))
    }

    pub fn from_parts(store: ConversationStore, answers: Arc<A>, titles: Arc<T>) -> Self {
        Self {
            state: Arc::new(SessionState::new(store)),
            answers,
            titles,
        }
    }

    /// Send `text` to the active conversation and run the workflow to completion.
    ///
    /// The target is snapshotted when this is called, before the returned
    /// future is first polled; later selection changes do not redirect any of
    /// its writes.
    pub fn send_message(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<Outcome, SendError>> + Send + 'static {
        let workflow = self.state.active().map(|target| {
            SendWorkflow::new(
                SendContext::snapshot(&target),
                Arc::clone(&self.state),
                Arc::clone(&self.answers),
                Arc::clone(&self.titles),
            )
        });
        let text = text.to_string();

        async move {
            let workflow =
                workflow.ok_or_else(|| SendError::ConversationMissing("<none>".to_string()))?;
            workflow.run(&text).await
        }
    }

    /// Create an untitled conversation and make it active
    pub fn new_conversation(&self) -> String {
        let (id, revision) = {
            let mut store = self.state.store.lock();
            let id = store.create();
            (id, store.revision())
        };
        self.state.selector.lock().select(id.clone());
        self.state.notify_changed(revision);
        id
    }

    pub fn select(&self, id: &str) {
        self.state.selector.lock().select(id);
        let revision = self.state.store.lock().revision();
        self.state.notify_changed(revision);
    }

    pub fn projection(&self) -> Projection {
        let conversations = self.state.store.lock().conversations();
        let active = projection::active_conversation(&conversations, &self.state.selector.lock())
            .unwrap_or_else(|| Arc::new(Conversation::new()));
        Projection::build(active, &conversations, self.state.indicator.state())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.state.events.subscribe()
    }

    #[allow(dead_code)] // Used in tests
    pub fn conversation(&self, id: &str) -> Option<Arc<Conversation>> {
        self.state.get(id)
    }

    #[allow(dead_code)] // Used by tests and front-ends that need raw state
    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }
}
