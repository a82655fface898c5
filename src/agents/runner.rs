use anyhow::anyhow;
use tokio::time::{Duration, sleep};
use tracing::{debug, info};

use crate::llm::{LlmProvider, Message, RetryPolicy, ToolCall};
use crate::tools::ToolRegistry;

/// Outcome of one bounded reasoning loop.
///
/// The trace is always populated with whatever messages accumulated before
/// the loop stopped, so callers can salvage tool output (chart markers in
/// particular) even when the loop itself failed.
pub struct LoopRun {
    /// Full message trace: the input history plus everything appended
    pub trace: Vec<Message>,
    /// Present when the loop failed (model error or step cap exceeded)
    pub error: Option<anyhow::Error>,
}

impl LoopRun {
    /// Final answer per the agent contract: the last trace entry rendered
    /// as plain text, or a fixed placeholder for an empty trace.
    pub fn final_answer(&self) -> String {
        match self.trace.last() {
            Some(msg) => msg.text(),
            None => "Analysis complete.".to_string(),
        }
    }
}

/// Model-driven tool loop shared by every worker agent.
///
/// Repeats model call, tool execution, and tool-result append until the
/// model stops requesting tools or `max_steps` round-trips have run. The
/// cap turns pathological model behavior into a local failure instead of a
/// hang.
pub async fn run_loop(
    agent_name: &str,
    system_prompt: &str,
    history: Vec<Message>,
    provider: &dyn LlmProvider,
    tools: &ToolRegistry,
    retry: &RetryPolicy,
    max_steps: usize,
) -> LoopRun {
    let mut messages = history;

    for step in 0..max_steps {
        debug!(agent = agent_name, step, "reasoning step");

        // Rate limiting to avoid hammering the API
        if step > 0 {
            sleep(Duration::from_millis(100)).await;
        }

        let tool_refs: Vec<&dyn crate::tools::Tool> = tools.all();

        let result = retry
            .run("worker chat", || {
                provider.chat(system_prompt, &messages, &tool_refs)
            })
            .await;
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                return LoopRun {
                    trace: messages,
                    error: Some(e),
                };
            }
        };

        let tool_calls = response.tool_calls;

        if tool_calls.is_empty() {
            info!(agent = agent_name, step, "reasoning loop completed");
            messages.push(response.message);
            return LoopRun {
                trace: messages,
                error: None,
            };
        }

        let mut tool_results = Vec::with_capacity(tool_calls.len());
        for tool_call in &tool_calls {
            debug!(agent = agent_name, tool = %tool_call.name, "executing tool");
            let result = execute_tool_call(tools, tool_call).await;
            debug!(agent = agent_name, tool = %tool_call.name, result = %result, "tool result");
            tool_results.push((tool_call.id.clone(), result));
        }

        messages.push(Message::assistant_with_tools(
            response.message.content,
            tool_calls,
        ));
        for (id, result) in tool_results {
            messages.push(Message::tool_result(&id, result));
        }
    }

    LoopRun {
        trace: messages,
        error: Some(anyhow!("exceeded maximum reasoning steps ({max_steps})")),
    }
}

async fn execute_tool_call(tools: &ToolRegistry, tool_call: &ToolCall) -> String {
    if let Some(tool) = tools.get(&tool_call.name) {
        match tool.execute(tool_call.arguments.clone()).await {
            Ok(output) => output,
            Err(e) => format!("Error: {e}"),
        }
    } else {
        format!("Error: unknown tool '{}'", tool_call.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_trace_yields_placeholder_answer() {
        let run = LoopRun {
            trace: Vec::new(),
            error: None,
        };
        assert_eq!(run.final_answer(), "Analysis complete.");
    }

    #[test]
    fn final_answer_is_last_entry_text() {
        let run = LoopRun {
            trace: vec![
                Message::user("question"),
                Message::assistant("The answer is 42."),
            ],
            error: None,
        };
        assert_eq!(run.final_answer(), "The answer is 42.");
    }
}
