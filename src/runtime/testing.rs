//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use crate::backend::{Answer, BackendError};
use crate::session::{ConversationStore, Message, Session};
use crate::storage::{KeyValueStore, StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Mock Answer Service
// ============================================================================

/// Answer service that replays queued responses, each after its own delay
pub struct MockAnswerService {
    responses: Mutex<VecDeque<(Duration, Result<Answer, BackendError>)>>,
    queries: Mutex<Vec<String>>,
    /// Signalled whenever a query arrives
    pub request_started: Arc<Notify>,
}

impl MockAnswerService {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            queries: Mutex::new(Vec::new()),
            request_started: Arc::new(Notify::new()),
        }
    }

    /// Queue a successful answer
    pub fn queue_answer(&self, answer: Answer) {
        self.queue_delayed(Duration::ZERO, Ok(answer));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: BackendError) {
        self.queue_delayed(Duration::ZERO, Err(error));
    }

    /// Queue a response that resolves only after `delay`
    pub fn queue_delayed(&self, delay: Duration, response: Result<Answer, BackendError>) {
        self.responses
            .lock()
            .unwrap()
            .push_back((delay, response));
    }

    /// Get recorded queries
    pub fn recorded_queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl Default for MockAnswerService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnswerService for MockAnswerService {
    async fn ask(&self, query: &str) -> Result<Answer, BackendError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.request_started.notify_one();

        let next = self.responses.lock().unwrap().pop_front();
        let Some((delay, response)) = next else {
            return Err(BackendError::transport("No mock answer queued"));
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        response
    }
}

// ============================================================================
// Mock Title Service
// ============================================================================

/// Title service that replays queued titles
pub struct MockTitleService {
    responses: Mutex<VecDeque<(Duration, Result<String, BackendError>)>>,
    transcripts: Mutex<Vec<Vec<Message>>>,
}

impl MockTitleService {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            transcripts: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_title(&self, title: impl Into<String>) {
        self.queue_delayed(Duration::ZERO, Ok(title.into()));
    }

    pub fn queue_error(&self, error: BackendError) {
        self.queue_delayed(Duration::ZERO, Err(error));
    }

    pub fn queue_delayed(&self, delay: Duration, response: Result<String, BackendError>) {
        self.responses
            .lock()
            .unwrap()
            .push_back((delay, response));
    }

    pub fn call_count(&self) -> usize {
        self.transcripts.lock().unwrap().len()
    }

    /// Transcripts received, one per call
    pub fn recorded_transcripts(&self) -> Vec<Vec<Message>> {
        self.transcripts.lock().unwrap().clone()
    }
}

impl Default for MockTitleService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TitleService for MockTitleService {
    async fn title_for(&self, transcript: &[Message]) -> Result<String, BackendError> {
        self.transcripts.lock().unwrap().push(transcript.to_vec());

        let next = self.responses.lock().unwrap().pop_front();
        let Some((delay, response)) = next else {
            return Err(BackendError::transport("No mock title queued"));
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        response
    }
}

// ============================================================================
// In-Memory Key-Value Store
// ============================================================================

/// Key-value store backed by a map, with switchable failures
#[derive(Default)]
pub struct InMemoryKvStore {
    values: Mutex<HashMap<String, Vec<u8>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: &[u8]) -> Self {
        let store = Self::new();
        store
            .values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        store
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl KeyValueStore for InMemoryKvStore {
    fn read(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("reads disabled".into()));
        }
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    fn write(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("writes disabled".into()));
        }
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Test Session
// ============================================================================

/// Session wired to mocks, with handles kept for inspection
pub struct TestSession {
    pub session: Session<MockAnswerService, MockTitleService>,
    pub answers: Arc<MockAnswerService>,
    pub titles: Arc<MockTitleService>,
    pub kv: Arc<InMemoryKvStore>,
}

impl TestSession {
    pub fn new() -> Self {
        Self::with_kv(Arc::new(InMemoryKvStore::new()))
    }

    pub fn with_kv(kv: Arc<InMemoryKvStore>) -> Self {
        let answers = Arc::new(MockAnswerService::new());
        let titles = Arc::new(MockTitleService::new());
        let store = ConversationStore::load(kv.clone());
        Self {
            session: Session::from_parts(store, Arc::clone(&answers), Arc::clone(&titles)),
            answers,
            titles,
            kv,
        }
    }

    pub fn active_id(&self) -> String {
        self.session.projection().active.id.clone()
    }

    pub fn messages(&self, id: &str) -> Vec<Message> {
        self.session
            .conversation(id)
            .map(|c| c.messages.clone())
            .unwrap_or_default()
    }

    pub fn title(&self, id: &str) -> String {
        self.session
            .conversation(id)
            .map(|c| c.title.clone())
            .unwrap_or_default()
    }
}

impl Default for TestSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Answer;
    use crate::runtime::{SendError, SendWorkflow};
    use crate::session::indicator::LOADING_HINTS;
    use crate::session::{Citation, SessionEvent, SessionState, UNTITLED};
    use crate::state_machine::{Outcome, SendContext, TransitionError};

    fn paris() -> Answer {
        Answer::new(
            "Paris is the capital of France.",
            vec![Citation::new("https://en.wikipedia.org/wiki/Paris", Some("Paris".into()))],
        )
    }

    #[tokio::test]
    async fn test_in_memory_kv_store() {
        let kv = InMemoryKvStore::new();
        assert_eq!(kv.read("k").unwrap(), None);
        kv.write("k", b"v").unwrap();
        assert_eq!(kv.read("k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(kv.write_count(), 1);

        kv.fail_writes(true);
        assert!(kv.write("k", b"w").is_err());
        assert_eq!(kv.write_count(), 1);
    }

    #[tokio::test]
    async fn test_answered_untitled_conversation_gets_title() {
        let t = TestSession::new();
        t.answers.queue_answer(paris());
        t.titles.queue_title("Capital of France");
        let id = t.active_id();

        let outcome = t.session.send_message("What is the capital of France?").await;
        assert_eq!(outcome, Ok(Outcome::Answered));

        let messages = t.messages(&id);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], Message::user("What is the capital of France?"));
        assert_eq!(messages[1], paris().into_message());
        assert_eq!(t.title(&id), "Capital of France");
        assert_eq!(
            t.answers.recorded_queries(),
            vec!["What is the capital of France?".to_string()]
        );

        let transcripts = t.titles.recorded_transcripts();
        assert_eq!(transcripts.len(), 1);
        assert_eq!(transcripts[0], messages);
        assert!(!t.session.projection().loading.visible);
    }

    #[tokio::test]
    async fn test_title_requested_once_across_sends() {
        let t = TestSession::new();
        t.answers.queue_answer(paris());
        t.answers.queue_answer(Answer::new("About two million.", vec![]));
        t.titles.queue_title("Capital of France");
        let id = t.active_id();

        t.session.send_message("Capital of France?").await.unwrap();
        t.session.send_message("Population?").await.unwrap();

        assert_eq!(t.titles.call_count(), 1);
        assert_eq!(t.title(&id), "Capital of France");
        let users = t.messages(&id).iter().filter(|m| m.is_user()).count();
        assert_eq!(users, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_switch_mid_flight_lands_on_target() {
        let t = TestSession::new();
        t.answers
            .queue_delayed(Duration::from_secs(1), Ok(paris()));
        t.titles.queue_title("Capital of France");
        let a = t.active_id();

        let session = t.session.clone();
        let handle = tokio::spawn(async move { session.send_message("Capital?").await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        let b = t.session.new_conversation();
        assert_eq!(t.active_id(), b);

        assert_eq!(handle.await.unwrap(), Ok(Outcome::Answered));

        assert_eq!(t.messages(&a).len(), 2);
        assert_eq!(t.title(&a), "Capital of France");
        assert!(t.messages(&b).is_empty());
        assert_eq!(t.title(&b), UNTITLED);
        assert_eq!(t.active_id(), b);
    }

    #[tokio::test]
    async fn test_target_bound_before_first_poll() {
        let t = TestSession::new();
        t.answers.queue_answer(paris());
        t.titles.queue_title("Capital of France");
        let a = t.active_id();

        let send = t.session.send_message("hello");
        let b = t.session.new_conversation();
        assert_eq!(send.await, Ok(Outcome::Answered));

        assert_eq!(t.messages(&a).len(), 2);
        assert_eq!(t.messages(&a)[0], Message::user("hello"));
        assert!(t.messages(&b).is_empty());
    }

    #[tokio::test]
    async fn test_spawned_send_keeps_target_after_selection_change() {
        let t = TestSession::new();
        t.answers.queue_answer(paris());
        t.titles.queue_title("Capital of France");
        let a = t.active_id();

        // current_thread runtime: the task cannot start before new_conversation
        let handle = tokio::spawn(t.session.send_message("hello"));
        let b = t.session.new_conversation();
        assert_eq!(handle.await.unwrap(), Ok(Outcome::Answered));

        assert_eq!(t.messages(&a).len(), 2);
        assert!(t.messages(&b).is_empty());
        assert_eq!(t.title(&b), UNTITLED);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_sends_append_in_completion_order() {
        let t = TestSession::new();
        t.answers.queue_delayed(
            Duration::from_millis(500),
            Ok(Answer::new("first", vec![])),
        );
        t.answers.queue_delayed(
            Duration::from_millis(100),
            Ok(Answer::new("second", vec![])),
        );
        t.titles.queue_title("One");
        t.titles.queue_title("Two");
        let id = t.active_id();

        let (r1, r2) = tokio::join!(
            t.session.send_message("q1"),
            t.session.send_message("q2")
        );
        assert_eq!(r1, Ok(Outcome::Answered));
        assert_eq!(r2, Ok(Outcome::Answered));

        let texts: Vec<String> = t
            .messages(&id)
            .iter()
            .map(|m| m.text().to_string())
            .collect();
        assert_eq!(texts, vec!["q1", "q2", "second", "first"]);
        assert_eq!(t.messages(&id).iter().filter(|m| m.is_user()).count(), 2);

        // Both snapshots were untitled; only the first resolved title sticks
        assert_eq!(t.titles.call_count(), 2);
        assert_eq!(t.title(&id), "One");
        assert!(!t.session.projection().loading.visible);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_title_is_not_overwritten() {
        let t = TestSession::new();
        t.answers.queue_answer(paris());
        t.titles
            .queue_delayed(Duration::from_secs(1), Ok("Foo".into()));
        let id = t.active_id();

        let session = t.session.clone();
        let handle = tokio::spawn(async move { session.send_message("Capital?").await });

        tokio::time::sleep(Duration::from_millis(500)).await;
        t.session
            .state()
            .mutate(&id, |c| c.title = "Bar".into())
            .unwrap();

        assert_eq!(handle.await.unwrap(), Ok(Outcome::Answered));
        assert_eq!(t.title(&id), "Bar");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_answer_never_shows_loading() {
        let t = TestSession::new();
        t.answers
            .queue_delayed(Duration::from_millis(10), Ok(paris()));
        t.titles.queue_title("Paris");
        let mut rx = t.session.subscribe();

        t.session.send_message("Capital?").await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        while let Ok(event) = rx.try_recv() {
            if let SessionEvent::LoadingChanged(state) = event {
                assert!(!state.visible, "indicator shown for a fast answer");
            }
        }
        assert!(!t.session.projection().loading.visible);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_answer_shows_then_clears_loading() {
        let t = TestSession::new();
        t.answers
            .queue_delayed(Duration::from_millis(500), Ok(paris()));
        t.titles.queue_title("Paris");

        let session = t.session.clone();
        let handle = tokio::spawn(async move { session.send_message("Capital?").await });

        tokio::time::sleep(Duration::from_millis(300)).await;
        let loading = t.session.projection().loading;
        assert!(loading.visible);
        assert!(LOADING_HINTS.contains(&loading.hint.as_str()));

        handle.await.unwrap().unwrap();
        assert!(!t.session.projection().loading.visible);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_answer_appends_notice_and_clears_loading() {
        let t = TestSession::new();
        t.answers.queue_delayed(
            Duration::from_millis(500),
            Err(BackendError::rejected(503, "HTTP 503: unavailable")),
        );
        let id = t.active_id();

        let session = t.session.clone();
        let handle = tokio::spawn(async move { session.send_message("Capital?").await });

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(t.session.projection().loading.visible);

        assert_eq!(
            handle.await.unwrap(),
            Ok(Outcome::Rejected { status: 503 })
        );
        assert_eq!(
            t.messages(&id),
            vec![
                Message::user("Capital?"),
                Message::system("Backend error: 503")
            ]
        );
        assert_eq!(t.title(&id), UNTITLED);
        assert_eq!(t.titles.call_count(), 0);
        assert!(!t.session.projection().loading.visible);
    }

    #[tokio::test]
    async fn test_unreachable_backend_appends_generic_notice() {
        let t = TestSession::new();
        t.answers
            .queue_error(BackendError::transport("connection refused"));
        let id = t.active_id();

        let outcome = t.session.send_message("Capital?").await;
        assert_eq!(outcome, Ok(Outcome::Unreachable));
        assert_eq!(
            t.messages(&id)[1],
            Message::system("Error contacting backend")
        );
        assert_eq!(t.titles.call_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_answer_counts_as_unreachable() {
        let t = TestSession::new();
        t.answers
            .queue_error(BackendError::malformed("expected JSON"));

        let outcome = t.session.send_message("Capital?").await;
        assert_eq!(outcome, Ok(Outcome::Unreachable));
    }

    #[tokio::test]
    async fn test_title_failure_is_silent() {
        let t = TestSession::new();
        t.answers.queue_answer(paris());
        t.titles
            .queue_error(BackendError::rejected(500, "HTTP 500"));
        let id = t.active_id();

        assert_eq!(
            t.session.send_message("Capital?").await,
            Ok(Outcome::Answered)
        );
        let messages = t.messages(&id);
        assert_eq!(messages.len(), 2);
        assert!(!messages.iter().any(|m| matches!(m, Message::System { .. })));
        assert_eq!(t.title(&id), UNTITLED);
    }

    #[tokio::test]
    async fn test_sentinel_title_is_ignored() {
        let t = TestSession::new();
        t.answers.queue_answer(paris());
        t.titles.queue_title(UNTITLED);
        let id = t.active_id();

        t.session.send_message("Capital?").await.unwrap();
        assert_eq!(t.title(&id), UNTITLED);
        assert!(t.session.conversation(&id).unwrap().is_untitled());
    }

    #[tokio::test]
    async fn test_blank_message_is_rejected() {
        let t = TestSession::new();
        let id = t.active_id();

        let outcome = t.session.send_message("   ").await;
        assert_eq!(
            outcome,
            Err(SendError::Transition(TransitionError::EmptyMessage))
        );
        assert!(t.messages(&id).is_empty());
        assert!(t.answers.recorded_queries().is_empty());
    }

    #[tokio::test]
    async fn test_missing_conversation_stops_workflow() {
        let kv = Arc::new(InMemoryKvStore::new());
        let state = Arc::new(SessionState::new(ConversationStore::load(kv)));
        let answers = Arc::new(MockAnswerService::new());
        let context = SendContext {
            conversation_id: "ghost".into(),
            was_untitled: true,
            transcript: vec![],
        };

        let workflow = SendWorkflow::new(
            context,
            Arc::clone(&state),
            Arc::clone(&answers),
            Arc::new(MockTitleService::new()),
        );
        let outcome = workflow.run("hello").await;

        assert_eq!(outcome, Err(SendError::ConversationMissing("ghost".into())));
        assert!(answers.recorded_queries().is_empty());
        assert!(!state.indicator().state().visible);
    }

    #[tokio::test]
    async fn test_messages_survive_reload() {
        let t = TestSession::new();
        t.answers.queue_answer(paris());
        t.titles.queue_title("Capital of France");
        let id = t.active_id();

        t.session.send_message("Capital?").await.unwrap();
        assert!(t.kv.write_count() >= 3);

        let reloaded = TestSession::with_kv(Arc::clone(&t.kv));
        assert_eq!(reloaded.active_id(), id);
        assert_eq!(reloaded.messages(&id).len(), 2);
        assert_eq!(reloaded.title(&id), "Capital of France");
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_session_usable() {
        let t = TestSession::new();
        t.kv.fail_writes(true);
        t.answers.queue_answer(paris());
        t.titles.queue_title("Capital of France");
        let id = t.active_id();

        assert_eq!(
            t.session.send_message("Capital?").await,
            Ok(Outcome::Answered)
        );
        assert_eq!(t.messages(&id).len(), 2);
        assert_eq!(t.kv.write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_started_signal() {
        let t = TestSession::new();
        t.answers
            .queue_delayed(Duration::from_secs(1), Ok(paris()));
        t.titles.queue_title("Paris");
        let started = Arc::clone(&t.answers.request_started);

        let session = t.session.clone();
        let handle = tokio::spawn(async move { session.send_message("Capital?").await });

        started.notified().await;
        // User message is visible before the answer arrives
        let id = t.active_id();
        assert_eq!(t.messages(&id), vec![Message::user("Capital?")]);

        handle.await.unwrap().unwrap();
        assert_eq!(t.messages(&id).len(), 2);
    }
}
