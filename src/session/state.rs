use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agents::Route;
use crate::llm::{Message, MessageRole};
use crate::viz::Visualization;

/// Persisted state of one conversation thread.
///
/// `messages` is append-only across turns; `route` and `visualizations`
/// hold only the most recent turn's values and are overwritten each turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    /// Opaque thread identifier
    pub id: String,

    /// Full conversation history, oldest first
    pub messages: Vec<Message>,

    /// Last routing decision taken
    #[serde(default)]
    pub route: Option<Route>,

    /// Artifacts produced by the most recent turn
    #[serde(default)]
    pub visualizations: Vec<Visualization>,

    /// When the thread was created
    pub created_at: DateTime<Utc>,

    /// When the thread last changed
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    /// Create a fresh thread with a generated id.
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    /// Create a fresh thread with a caller-supplied id.
    pub fn with_id(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            messages: Vec::new(),
            route: None,
            visualizations: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message to the history.
    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }

    /// First user message, for listings.
    pub fn preview(&self) -> String {
        self.messages
            .iter()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.text())
            .unwrap_or_default()
    }

    /// Number of user turns so far.
    pub fn turns(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .count()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of a thread for listing (without full message history)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: String,
    pub turns: i64,
    pub preview: String,
    pub created_at: String,
    pub updated_at: String,
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Use chars() to handle UTF-8 safely
        let preview: String = if self.preview.chars().count() > 50 {
            self.preview.chars().take(47).collect::<String>() + "..."
        } else {
            self.preview.clone()
        };

        let id_short: String = self.id.chars().take(8).collect();

        write!(
            f,
            "{:<10} {:>5} turn(s)  {:<20}  {}",
            id_short, self.turns, self.updated_at, preview
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_is_first_user_message() {
        let mut session = SessionState::new();
        session.push_message(Message::user("what is the average order value"));
        session.push_message(Message::assistant("Routing to General_Agent."));
        session.push_message(Message::user("and by device?"));
        assert_eq!(session.preview(), "what is the average order value");
        assert_eq!(session.turns(), 2);
    }

    #[test]
    fn fresh_sessions_get_distinct_ids() {
        assert_ne!(SessionState::new().id, SessionState::new().id);
    }

    #[test]
    fn state_round_trips_through_json() {
        let mut session = SessionState::with_id("thread-1");
        session.push_message(Message::user("hi"));
        session.route = Some(Route::General);
        session
            .visualizations
            .push(Visualization::Image("plots/plot_1.png".to_string()));

        let json = serde_json::to_string(&session).expect("serialize");
        let back: SessionState = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.id, "thread-1");
        assert_eq!(back.messages.len(), 1);
        assert_eq!(back.route, Some(Route::General));
        assert_eq!(back.visualizations.len(), 1);
    }
}
