//! rag-chat - terminal client for a retrieval-augmented chat backend
//!
//! Keeps a local history of conversations, sends questions to the RAG
//! service and titles new conversations after their first answer.

mod backend;
mod runtime;
mod session;
mod state_machine;
mod storage;
mod title_generator;

use backend::{Config, HttpBackend, LoggingBackend};
use runtime::ProductionSession;
use session::projection::display_title;
use session::{Projection, Session, SessionEvent};
use std::sync::Arc;
use storage::{KeyValueStore, SqliteKvStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "Commands: /new, /list, /select <n>, /sources, /help, /quit. Anything else is sent as a question.";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();

    // Initialize logging; stdout is reserved for the transcript
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rag_chat=info".into()),
        )
        .with(config.log_json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr)
        }))
        .with((!config.log_json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    tracing::info!(path = %config.db_path.display(), "Opening conversation store");
    let kv: Arc<dyn KeyValueStore> = match SqliteKvStore::open(&config.db_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!(error = %e, "Conversation store unavailable, history will not be kept");
            Arc::new(SqliteKvStore::open_in_memory()?)
        }
    };

    let http = Arc::new(HttpBackend::new(&config.backend_url, config.timeout)?);
    tracing::info!(
        backend = %http.base_url(),
        timeout_secs = config.timeout.as_secs(),
        "Backend configured"
    );

    let session: ProductionSession = Session::new(
        kv,
        LoggingBackend::new(Arc::clone(&http)),
        LoggingBackend::new(http),
    );

    println!("{HELP}");
    let renderer = tokio::spawn(render_loop(session.clone()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line.split_once(' ').map_or((line, ""), |(cmd, rest)| (cmd, rest.trim())) {
            ("", _) => {}
            ("/quit" | "/exit", _) => break,
            ("/help", _) => println!("{HELP}"),
            ("/new", _) => {
                session.new_conversation();
            }
            ("/list", _) => print_list(&session.projection()),
            ("/sources", _) => print_sources(&session.projection()),
            ("/select", arg) => select(&session, arg),
            (cmd, _) if cmd.starts_with('/') => println!("! unknown command {cmd}. {HELP}"),
            _ => {
                // Target is bound here; the send then runs in the background
                let send = session.send_message(line);
                tokio::spawn(async move {
                    if let Err(e) = send.await {
                        eprintln!("! {e}");
                    }
                });
            }
        }
    }

    renderer.abort();
    Ok(())
}

fn select(session: &ProductionSession, arg: &str) {
    let projection = session.projection();
    let item = arg
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| projection.conversations.get(i));
    match item {
        Some(item) => session.select(&item.id),
        None => println!("! no conversation {arg:?}, see /list"),
    }
}

fn print_list(projection: &Projection) {
    for (i, item) in projection.conversations.iter().enumerate() {
        let marker = if item.is_active { '*' } else { ' ' };
        println!(
            "{marker} {:>2}. {}  ({})",
            i + 1,
            item.display_title,
            item.updated_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
        );
    }
}

fn print_sources(projection: &Projection) {
    if projection.sources.is_empty() {
        println!("(no sources)");
    }
    for citation in &projection.sources {
        println!("- {} <{}>", citation.label(), citation.url);
    }
}

/// Prints whatever changed in the active conversation as events arrive
async fn render_loop(session: ProductionSession) {
    let mut rx = session.subscribe();
    let mut view = TranscriptView::default();
    view.render(&session.projection());

    loop {
        match rx.recv().await {
            Ok(SessionEvent::ConversationsChanged { .. } | SessionEvent::LoadingChanged(_))
            | Err(RecvError::Lagged(_)) => view.render(&session.projection()),
            Err(RecvError::Closed) => break,
        }
    }
}

#[derive(Default)]
struct TranscriptView {
    active: Option<String>,
    shown: usize,
    loading: bool,
}

impl TranscriptView {
    fn render(&mut self, projection: &Projection) {
        let active = &projection.active;
        if self.active.as_deref() != Some(active.id.as_str()) {
            println!("== {} ==", display_title(active));
            self.active = Some(active.id.clone());
            self.shown = 0;
        }

        let messages = projection.messages();
        for message in messages.iter().skip(self.shown) {
            println!("{}: {}", message.role_label(), message.text());
        }
        self.shown = messages.len();

        if projection.loading.visible && !self.loading {
            println!("… {}", projection.loading.hint);
        }
        self.loading = projection.loading.visible;
    }
}
