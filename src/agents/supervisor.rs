use std::path::PathBuf;

use tokio::task;
use tracing::{debug, error, info, warn};

use super::decision::{Route, interpret_reply};
use crate::db::{SCHEMA_UNAVAILABLE, schema_string};
use crate::llm::{LlmProvider, Message, RetryPolicy};
use crate::prompts::{self, PromptStore};

/// Routing agent: one model call per turn, no tools.
///
/// Looks at the whole conversation plus the current database schema and
/// picks the worker (if any) for this turn. Never raises past its boundary;
/// every path yields a route and an assistant message.
pub struct Supervisor {
    db_path: PathBuf,
}

impl Supervisor {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// Decide where this turn goes.
    ///
    /// An empty history short-circuits to FINISH without calling the model.
    /// Schema introspection failure degrades to a sentinel so routing can
    /// still be attempted.
    pub async fn decide(
        &self,
        history: &[Message],
        provider: &dyn LlmProvider,
        store: &PromptStore,
        retry: &RetryPolicy,
    ) -> (Route, Message) {
        if history.is_empty() {
            return (Route::Finish, Message::assistant("No query provided."));
        }

        let schema = self.schema_text().await;

        let system = match store.render(prompts::SUPERVISOR, &[("schema", &schema)]) {
            Ok(system) => system,
            Err(e) => {
                error!(error = %e, "supervisor prompt render failed");
                return (
                    Route::Finish,
                    Message::assistant(format!("Supervisor routing error: {e:#}")),
                );
            }
        };

        let response = retry
            .run("supervisor chat", || provider.chat(&system, history, &[]))
            .await;

        let raw = match response {
            Ok(response) => response.message.text(),
            Err(e) => {
                error!(error = %e, "supervisor model call failed");
                return (
                    Route::Finish,
                    Message::assistant(format!("Supervisor routing error: {e:#}")),
                );
            }
        };

        debug!(reply = %raw, "supervisor raw reply");
        let decision = interpret_reply(&raw);
        info!(route = %decision.route, "routing decision");

        (decision.route, Message::assistant(decision.announcement))
    }

    async fn schema_text(&self) -> String {
        let db_path = self.db_path.clone();
        let result = task::spawn_blocking(move || schema_string(&db_path)).await;

        match result {
            Ok(Ok(schema)) => schema,
            Ok(Err(e)) => {
                warn!(error = %e, "schema introspection failed, routing degraded");
                SCHEMA_UNAVAILABLE.to_string()
            }
            Err(e) => {
                warn!(error = %e, "schema introspection task failed, routing degraded");
                SCHEMA_UNAVAILABLE.to_string()
            }
        }
    }
}
