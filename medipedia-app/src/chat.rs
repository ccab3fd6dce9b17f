//! Chat transcript controller
//!
//! Drives the question/answer transcript of the user dashboard and the admin
//! chat tab. A turn is split into [`ChatController::begin`] and
//! [`ChatController::finish`] so the loading placeholder is observable while
//! the query is in flight; [`ChatController::send`] runs both around the
//! gateway call.

use chrono::{DateTime, Utc};
use medipedia_core::{Failure, QueryGateway, QueryResponse, RequestOutcome, Session};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::view_state::RequestState;

pub const SEND_FAILED_MESSAGE: &str = "Failed to send query. Please try again.";
pub const ADMIN_APOLOGY_MESSAGE: &str =
    "Sorry, I encountered an error processing your request. Please try again.";
pub const MAX_HISTORY: usize = 10;

const USER_WELCOME: &str = "Welcome to MediPedia! I'm your AI assistant ready to help you explore our medical knowledge base. Ask me anything about the uploaded documents or use the query templates and suggestions below.";
const ADMIN_WELCOME: &str = "Hello Admin! I can help you test queries, analyze system performance, and provide insights about the knowledge base. What would you like to know?";
const WELCOME_SUGGESTIONS: [&str; 3] = [
    "What medical specialties are covered in the knowledge base?",
    "How can I search for specific medical conditions?",
    "What types of documents are available?",
];

/// Which dashboard the transcript belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatAudience {
    /// Formatted answers with references, confidence and follow-ups
    User,
    /// Raw answers with references kept alongside; failures are answered
    /// with an apology in the transcript
    Admin,
}

impl ChatAudience {
    /// Query user id when no session is present
    pub fn fallback_user_id(&self) -> &'static str {
        match self {
            ChatAudience::User => "anonymous",
            ChatAudience::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub speaker: Speaker,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_loading: bool,
    pub related_queries: Vec<String>,
    pub references: Vec<String>,
}

impl ChatMessage {
    fn new(id: u64, speaker: Speaker, content: impl Into<String>) -> Self {
        Self {
            id,
            speaker,
            content: content.into(),
            timestamp: Utc::now(),
            is_loading: false,
            related_queries: Vec::new(),
            references: Vec::new(),
        }
    }
}

/// A query the user asked, for the "recent queries" list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryHistoryEntry {
    pub query: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Query in flight, returned by [`ChatController::begin`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    pub placeholder_id: u64,
    pub user_id: String,
    pub query: String,
}

/// How a call to [`ChatController::send`] ended
#[derive(Debug, Clone, PartialEq)]
pub enum ChatTurn {
    /// Blank input, or a query was already in flight
    Ignored,
    Answered(QueryResponse),
    Failed(Failure),
}

/// Render an answer the way the user transcript shows it
pub fn format_answer(response: &QueryResponse) -> String {
    let references = response
        .references
        .iter()
        .map(|reference| format!("• {}", reference))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{}\n\n**References:**\n{}\n\n*Confidence: {}%*",
        response.response,
        references,
        (response.confidence * 100.0).round() as i64
    )
}

/// Three follow-up questions derived from the wording of `query`
pub fn related_queries(query: &str) -> Vec<String> {
    let words: Vec<&str> = query.split_whitespace().collect();
    let tail = words[words.len().saturating_sub(2)..].join(" ");
    let last = words.last().copied().unwrap_or_default();

    vec![
        format!("Tell me more about {}", tail),
        format!("What are the latest research findings on {}?", last),
        "How is this related to other medical conditions?".to_string(),
    ]
}

pub struct ChatController {
    queries: Arc<dyn QueryGateway>,
    audience: ChatAudience,
    messages: Vec<ChatMessage>,
    history: Vec<QueryHistoryEntry>,
    state: RequestState,
    next_id: u64,
}

impl ChatController {
    /// New transcript seeded with the audience's welcome message
    pub fn new(queries: Arc<dyn QueryGateway>, audience: ChatAudience) -> Self {
        let mut welcome = match audience {
            ChatAudience::User => ChatMessage::new(0, Speaker::Assistant, USER_WELCOME),
            ChatAudience::Admin => ChatMessage::new(0, Speaker::Assistant, ADMIN_WELCOME),
        };
        if audience == ChatAudience::User {
            welcome.related_queries = WELCOME_SUGGESTIONS.iter().map(|s| s.to_string()).collect();
        }

        Self {
            queries,
            audience,
            messages: vec![welcome],
            history: Vec::new(),
            state: RequestState::Idle,
            next_id: 1,
        }
    }

    pub fn audience(&self) -> ChatAudience {
        self.audience
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Recent queries, newest first
    pub fn history(&self) -> &[QueryHistoryEntry] {
        &self.history
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    /// Ask `text` and fold the answer into the transcript
    pub async fn send(&mut self, session: Option<&Session>, text: &str) -> ChatTurn {
        let Some(pending) = self.begin(session, text) else {
            return ChatTurn::Ignored;
        };
        let outcome = self.queries.send(&pending.user_id, &pending.query).await;
        self.finish(pending, outcome)
    }

    /// Append the user's message and a loading placeholder.
    ///
    /// Returns `None` for blank input or while another query is loading.
    pub fn begin(&mut self, session: Option<&Session>, text: &str) -> Option<PendingQuery> {
        let query = text.trim();
        if query.is_empty() || self.is_loading() {
            debug!(loading = self.is_loading(), "Ignoring chat input");
            return None;
        }

        let user_id = session
            .map(|s| s.id.clone())
            .unwrap_or_else(|| self.audience.fallback_user_id().to_string());

        let user_message_id = self.next_id();
        self.messages
            .push(ChatMessage::new(user_message_id, Speaker::User, query));

        let placeholder_id = self.next_id();
        let mut placeholder = ChatMessage::new(placeholder_id, Speaker::Assistant, "");
        placeholder.is_loading = true;
        self.messages.push(placeholder);

        self.record_history(query, &user_id);
        self.state = RequestState::Loading;

        info!(user_id = %user_id, "Sending chat query");

        Some(PendingQuery {
            placeholder_id,
            user_id,
            query: query.to_string(),
        })
    }

    /// Replace the placeholder with the answer, or remove it on failure
    pub fn finish(
        &mut self,
        pending: PendingQuery,
        outcome: RequestOutcome<QueryResponse>,
    ) -> ChatTurn {
        let position = self
            .messages
            .iter()
            .position(|m| m.id == pending.placeholder_id);

        match outcome {
            RequestOutcome::Ok(response) => {
                let answer = self.answer_message(pending.placeholder_id, &pending.query, &response);
                match position {
                    Some(index) => self.messages[index] = answer,
                    None => self.messages.push(answer),
                }
                self.state = RequestState::Succeeded;
                ChatTurn::Answered(response)
            }
            RequestOutcome::Failed(failure) => {
                warn!(reason = %failure.reason, "Chat query failed");
                if let Some(index) = position {
                    self.messages.remove(index);
                }
                if self.audience == ChatAudience::Admin {
                    let id = self.next_id();
                    self.messages
                        .push(ChatMessage::new(id, Speaker::Assistant, ADMIN_APOLOGY_MESSAGE));
                }
                self.state = RequestState::Failed(SEND_FAILED_MESSAGE.to_string());
                ChatTurn::Failed(failure)
            }
        }
    }

    fn answer_message(&self, id: u64, query: &str, response: &QueryResponse) -> ChatMessage {
        match self.audience {
            ChatAudience::User => {
                let mut message = ChatMessage::new(id, Speaker::Assistant, format_answer(response));
                message.related_queries = related_queries(query);
                message
            }
            ChatAudience::Admin => {
                let mut message =
                    ChatMessage::new(id, Speaker::Assistant, response.response.clone());
                message.references = response.references.clone();
                message
            }
        }
    }

    /// Newest first, capped, and only the current user's entries are kept
    fn record_history(&mut self, query: &str, user_id: &str) {
        self.history.retain(|entry| entry.user_id == user_id);
        self.history.insert(
            0,
            QueryHistoryEntry {
                query: query.to_string(),
                user_id: user_id.to_string(),
                timestamp: Utc::now(),
            },
        );
        self.history.truncate(MAX_HISTORY);
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}
