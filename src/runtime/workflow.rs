use std::path::Path;

use anyhow::Result;
use tracing::info;

use super::state::{StateUpdate, TurnResult, last_assistant_text};
use crate::agents::{Route, Supervisor, WorkerAgent};
use crate::llm::{LlmProvider, Message, RetryPolicy};
use crate::prompts::PromptStore;
use crate::session::{SessionState, Storage};
use crate::tools::ToolRegistry;

/// The turn state machine.
///
/// Each user turn runs Supervisor → at most one worker → terminal, then
/// persists the thread. Workers never hand off to each other, and a turn
/// always produces an answer.
pub struct Workflow {
    provider: Box<dyn LlmProvider>,
    tools: ToolRegistry,
    storage: Box<dyn Storage>,
    prompts: PromptStore,
    supervisor: Supervisor,
    workers: [WorkerAgent; 3],
    retry: RetryPolicy,
    max_steps: usize,
}

impl Workflow {
    pub fn new(
        provider: Box<dyn LlmProvider>,
        tools: ToolRegistry,
        storage: Box<dyn Storage>,
        prompts: PromptStore,
        db_path: &Path,
        max_steps: usize,
    ) -> Self {
        Self {
            provider,
            tools,
            storage,
            prompts,
            supervisor: Supervisor::new(db_path),
            workers: [
                WorkerAgent::ab_test(),
                WorkerAgent::segmentation(),
                WorkerAgent::general(),
            ],
            retry: RetryPolicy::default(),
            max_steps,
        }
    }

    /// Run one turn to completion, blocking until the answer is ready.
    ///
    /// A never-seen `thread_id` starts a fresh thread; a known one resumes
    /// exactly where it left off and appends.
    pub async fn run_turn(&self, thread_id: &str, user_text: &str) -> Result<TurnResult> {
        let mut session = self
            .storage
            .load(thread_id)
            .await?
            .unwrap_or_else(|| SessionState::with_id(thread_id));

        info!(
            thread_id,
            prior_messages = session.messages.len(),
            "turn starting"
        );

        // Artifacts are per-turn; clear before anything runs so a
        // supervisor-only turn cannot report a previous turn's charts.
        StateUpdate::reset_visualizations().apply_to(&mut session);
        StateUpdate::message(Message::user(user_text)).apply_to(&mut session);

        let (route, announcement) = self
            .supervisor
            .decide(&session.messages, self.provider.as_ref(), &self.prompts, &self.retry)
            .await;

        StateUpdate {
            messages: vec![announcement],
            route: Some(route),
            visualizations: None,
        }
        .apply_to(&mut session);

        if let Some(worker) = self.worker_for(route) {
            let outcome = worker
                .run(
                    session.messages.clone(),
                    self.provider.as_ref(),
                    &self.tools,
                    &self.prompts,
                    &self.retry,
                    self.max_steps,
                )
                .await;

            StateUpdate {
                messages: vec![outcome.message],
                route: Some(outcome.route),
                visualizations: Some(outcome.visualizations),
            }
            .apply_to(&mut session);
        }

        self.storage.save(&session).await?;

        let answer = last_assistant_text(&session.messages)
            .unwrap_or_else(|| "No response generated.".to_string());

        info!(
            thread_id,
            visualizations = session.visualizations.len(),
            "turn complete"
        );

        Ok(TurnResult {
            thread_id: session.id.clone(),
            answer,
            visualizations: session.visualizations.clone(),
        })
    }

    fn worker_for(&self, route: Route) -> Option<&WorkerAgent> {
        match route {
            Route::Finish => None,
            _ => self.workers.iter().find(|w| w.route() == route),
        }
    }

    /// Storage handle for listings and deletion.
    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }
}
