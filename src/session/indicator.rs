//! Debounced "working" indicator
//!
//! The indicator is process-wide: whichever workflow showed it last owns the
//! hint text, and any finishing workflow clears it.

use super::SessionEvent;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Delay before the indicator becomes visible
pub const LOADING_DEBOUNCE: Duration = Duration::from_millis(200);

pub const LOADING_HINTS: &[&str] = &[
    "Searching the web…",
    "Verifying facts & sources…",
    "Composing your answer…",
    "Gathering up-to-date info…",
    "Cross-checking results…",
    "Summarizing findings…",
];

pub fn random_hint() -> &'static str {
    LOADING_HINTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(LOADING_HINTS[0])
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadingState {
    pub visible: bool,
    pub hint: String,
}

pub struct LoadingIndicator {
    state: Mutex<LoadingState>,
    events: broadcast::Sender<SessionEvent>,
}

impl LoadingIndicator {
    pub fn new(events: broadcast::Sender<SessionEvent>) -> Self {
        Self {
            state: Mutex::new(LoadingState::default()),
            events,
        }
    }

    pub fn state(&self) -> LoadingState {
        self.state.lock().clone()
    }

    /// Show `hint` after `delay` unless the returned guard is dropped first
    pub fn schedule(self: &Arc<Self>, delay: Duration, hint: &str) -> LoadingGuard {
        let token = CancellationToken::new();
        let indicator = Arc::clone(self);
        let timer_token = token.clone();
        let hint = hint.to_string();

        tokio::spawn(async move {
            tokio::select! {
                biased;

                () = timer_token.cancelled() => {}

                () = tokio::time::sleep(delay) => {
                    indicator.show_unless_cancelled(&timer_token, hint);
                }
            }
        });

        LoadingGuard {
            token,
            indicator: Arc::clone(self),
        }
    }

    fn show_unless_cancelled(&self, token: &CancellationToken, hint: String) {
        let mut state = self.state.lock();
        // Checked under the lock so a concurrent clear always wins
        if token.is_cancelled() {
            return;
        }
        tracing::debug!(hint = %hint, "Showing loading indicator");
        *state = LoadingState {
            visible: true,
            hint,
        };
        let snapshot = state.clone();
        drop(state);
        let _ = self.events.send(SessionEvent::LoadingChanged(snapshot));
    }

    fn clear(&self) {
        let mut state = self.state.lock();
        if *state == LoadingState::default() {
            return;
        }
        *state = LoadingState::default();
        drop(state);
        let _ = self
            .events
            .send(SessionEvent::LoadingChanged(LoadingState::default()));
    }
}

/// Pending or visible indicator owned by one workflow.
///
/// Dropping the guard cancels the timer and clears the indicator.
pub struct LoadingGuard {
    token: CancellationToken,
    indicator: Arc<LoadingIndicator>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.token.cancel();
        self.indicator.clear();
    }
}
