use crate::agents::Route;
use crate::llm::{Message, MessageRole};
use crate::session::SessionState;
use crate::viz::Visualization;

/// One node's contribution to the turn state.
///
/// Merge policy, per field:
/// - `messages` APPEND onto the session history, never replace it;
/// - `route` OVERWRITES when present;
/// - `visualizations` OVERWRITES when present.
///
/// The overwrite fields are what keep a turn's artifacts from leaking into
/// the next one.
#[derive(Debug, Default)]
pub struct StateUpdate {
    pub messages: Vec<Message>,
    pub route: Option<Route>,
    pub visualizations: Option<Vec<Visualization>>,
}

impl StateUpdate {
    /// Update that clears the artifact list, applied at every turn start.
    pub fn reset_visualizations() -> Self {
        Self {
            visualizations: Some(Vec::new()),
            ..Self::default()
        }
    }

    /// Update appending a single message.
    pub fn message(message: Message) -> Self {
        Self {
            messages: vec![message],
            ..Self::default()
        }
    }

    /// Apply this update to a session under the merge policy.
    pub fn apply_to(self, session: &mut SessionState) {
        for message in self.messages {
            session.push_message(message);
        }
        if let Some(route) = self.route {
            session.route = Some(route);
        }
        if let Some(visualizations) = self.visualizations {
            session.visualizations = visualizations;
        }
    }
}

/// The output of running the state machine once.
#[derive(Debug, Clone)]
pub struct TurnResult {
    /// Thread the turn ran under
    pub thread_id: String,
    /// Final assistant text for this turn
    pub answer: String,
    /// Artifacts produced by this turn only
    pub visualizations: Vec<Visualization>,
}

/// Last assistant message in the history, the answer a frontend shows.
pub fn last_assistant_text(messages: &[Message]) -> Option<String> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::Assistant)
        .map(|m| m.text())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_append_and_route_overwrites() {
        let mut session = SessionState::with_id("t");
        session.push_message(Message::user("one"));
        session.route = Some(Route::AbTest);

        StateUpdate {
            messages: vec![Message::assistant("two")],
            route: Some(Route::Finish),
            visualizations: None,
        }
        .apply_to(&mut session);

        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.route, Some(Route::Finish));
    }

    #[test]
    fn visualizations_overwrite_not_accumulate() {
        let mut session = SessionState::with_id("t");
        session.visualizations = vec![Visualization::Image("plots/old.png".to_string())];

        StateUpdate {
            visualizations: Some(vec![Visualization::Image("plots/new.png".to_string())]),
            ..StateUpdate::default()
        }
        .apply_to(&mut session);

        assert_eq!(
            session.visualizations,
            vec![Visualization::Image("plots/new.png".to_string())]
        );
    }

    #[test]
    fn absent_fields_leave_state_untouched() {
        let mut session = SessionState::with_id("t");
        session.route = Some(Route::General);
        session.visualizations = vec![Visualization::Image("plots/a.png".to_string())];

        StateUpdate::message(Message::assistant("hi")).apply_to(&mut session);

        assert_eq!(session.route, Some(Route::General));
        assert_eq!(session.visualizations.len(), 1);
    }

    #[test]
    fn reset_clears_artifacts_only() {
        let mut session = SessionState::with_id("t");
        session.push_message(Message::user("q"));
        session.visualizations = vec![Visualization::Image("plots/a.png".to_string())];

        StateUpdate::reset_visualizations().apply_to(&mut session);

        assert!(session.visualizations.is_empty());
        assert_eq!(session.messages.len(), 1);
    }

    #[test]
    fn last_assistant_text_searches_backwards() {
        let messages = vec![
            Message::user("q1"),
            Message::assistant("a1"),
            Message::user("q2"),
            Message::assistant("a2"),
        ];
        assert_eq!(last_assistant_text(&messages), Some("a2".to_string()));
        assert_eq!(last_assistant_text(&[Message::user("q")]), None);
    }
}
