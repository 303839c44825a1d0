//! Wire types for the answer and title services

use crate::session::{Citation, Message};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response fields tried in order for the answer text
pub const ANSWER_FIELDS: &[&str] = &["answer", "message"];

/// Answer text used when the response carries none
pub const NO_ANSWER: &str = "No answer";

/// Body of `POST /rag`
#[derive(Debug, Clone, Serialize)]
pub struct AnswerRequest<'a> {
    pub query: &'a str,
}

/// Body of `POST /title`
#[derive(Debug, Clone, Serialize)]
pub struct TitleRequest<'a> {
    pub messages: &'a [Message],
}

#[derive(Debug, Clone, Deserialize)]
pub struct TitleResponse {
    #[serde(default)]
    pub title: Option<String>,
}

/// A parsed answer from the RAG service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub citations: Vec<Citation>,
}

impl Answer {
    #[allow(dead_code)] // Used in tests
    pub fn new(text: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self {
            text: text.into(),
            citations,
        }
    }

    /// Interpret a success body.
    ///
    /// The text comes from the first non-empty field in [`ANSWER_FIELDS`],
    /// defaulting to [`NO_ANSWER`]. Citation entries that cannot be decoded
    /// are skipped.
    pub fn from_value(body: &Value) -> Self {
        let text = ANSWER_FIELDS
            .iter()
            .filter_map(|field| body.get(*field).and_then(Value::as_str))
            .find(|text| !text.is_empty())
            .unwrap_or(NO_ANSWER)
            .to_string();

        let citations = body
            .get("citations")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| match serde_json::from_value::<Citation>(entry.clone()) {
                        Ok(citation) => Some(citation),
                        Err(e) => {
                            tracing::debug!(error = %e, "Skipping undecodable citation");
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self { text, citations }
    }

    pub fn into_message(self) -> Message {
        Message::response(self.text, self.citations)
    }
}
