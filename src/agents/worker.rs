use tracing::{error, info};

use super::decision::Route;
use super::runner::run_loop;
use crate::llm::{LlmProvider, Message, RetryPolicy};
use crate::prompts::{self, PromptStore};
use crate::tools::ToolRegistry;
use crate::viz::{Visualization, extract_visualizations};

/// What a worker hands back to the turn graph.
///
/// Workers always terminate the turn: `route` is always [`Route::Finish`],
/// and there is always an assistant message, error or not.
pub struct WorkerOutcome {
    pub message: Message,
    pub visualizations: Vec<Visualization>,
    pub route: Route,
}

/// A specialized analysis agent.
///
/// The three specializations share one control flow and differ only in
/// prompt template and error tag; all of them drive the shared reasoning
/// loop over the SQL and Python tools.
pub struct WorkerAgent {
    route: Route,
    prompt_name: &'static str,
    error_tag: &'static str,
    log_name: &'static str,
}

impl WorkerAgent {
    /// Campaign comparison and statistical-significance analysis
    pub fn ab_test() -> Self {
        Self {
            route: Route::AbTest,
            prompt_name: prompts::AB_TEST,
            error_tag: "A/B Test analysis",
            log_name: "ab_test",
        }
    }

    /// Customer segmentation and clustering analysis
    pub fn segmentation() -> Self {
        Self {
            route: Route::Segmentation,
            prompt_name: prompts::SEGMENTATION,
            error_tag: "Segmentation analysis",
            log_name: "segmentation",
        }
    }

    /// Ad-hoc aggregations and metrics
    pub fn general() -> Self {
        Self {
            route: Route::General,
            prompt_name: prompts::GENERAL,
            error_tag: "General analytics",
            log_name: "general",
        }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    /// Run the reasoning loop over the full turn history and produce this
    /// turn's answer and artifacts.
    ///
    /// Never fails: loop errors (model unreachable, step cap exceeded)
    /// become a tagged error answer, keeping the session usable for the
    /// next turn. Artifacts collected before a failure are preserved.
    pub async fn run(
        &self,
        history: Vec<Message>,
        provider: &dyn LlmProvider,
        tools: &ToolRegistry,
        store: &PromptStore,
        retry: &RetryPolicy,
        max_steps: usize,
    ) -> WorkerOutcome {
        info!(agent = self.log_name, "worker starting");

        let system_prompt = match store.render(self.prompt_name, &[]) {
            Ok(prompt) => prompt,
            Err(e) => {
                error!(agent = self.log_name, error = %e, "prompt render failed");
                return self.failure(format!("{e:#}"), Vec::new());
            }
        };

        let run = run_loop(
            self.log_name,
            &system_prompt,
            history,
            provider,
            tools,
            retry,
            max_steps,
        )
        .await;

        let answer = run.final_answer();
        let visualizations = extract_visualizations(&run.trace, &answer);

        match run.error {
            Some(e) => {
                error!(agent = self.log_name, error = %e, "worker failed");
                self.failure(format!("{e:#}"), visualizations)
            }
            None => {
                info!(
                    agent = self.log_name,
                    visualizations = visualizations.len(),
                    "worker completed"
                );
                WorkerOutcome {
                    message: Message::assistant(answer),
                    visualizations,
                    route: Route::Finish,
                }
            }
        }
    }

    fn failure(&self, cause: String, visualizations: Vec<Visualization>) -> WorkerOutcome {
        WorkerOutcome {
            message: Message::assistant(format!("{} error: {}", self.error_tag, cause)),
            visualizations,
            route: Route::Finish,
        }
    }
}
