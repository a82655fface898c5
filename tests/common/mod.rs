#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use data_analyst::{
    LlmProvider, LlmResponse, Message, PromptStore, PythonTool, SqlTool, SqliteStorage, ToolCall,
    ToolRegistry, Workflow,
};

/// A mock LLM provider that replays scripted responses in order and records
/// the message history it was shown on each call.
#[derive(Clone)]
pub struct MockProvider {
    inner: Arc<MockInner>,
}

struct MockInner {
    responses: Mutex<VecDeque<LlmResponse>>,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl MockProvider {
    pub fn with_responses(responses: Vec<LlmResponse>) -> Self {
        Self {
            inner: Arc::new(MockInner {
                responses: Mutex::new(VecDeque::from(responses)),
                seen: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn empty() -> Self {
        Self::with_responses(Vec::new())
    }

    /// Number of chat calls made so far.
    pub fn calls(&self) -> usize {
        self.inner.seen.lock().unwrap().len()
    }

    /// The message history passed to the most recent chat call.
    pub fn last_seen(&self) -> Option<Vec<Message>> {
        self.inner.seen.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn chat(
        &self,
        _system: &str,
        messages: &[Message],
        _tools: &[&dyn data_analyst::Tool],
    ) -> Result<LlmResponse> {
        self.inner.seen.lock().unwrap().push(messages.to_vec());
        self.inner
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("mock provider: no more scripted responses"))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Scripted supervisor reply routing to `next`.
pub fn route_reply(next: &str, reasoning: &str) -> LlmResponse {
    text_reply(&format!(
        r#"{{"next": "{next}", "reasoning": "{reasoning}"}}"#
    ))
}

/// Scripted supervisor reply finishing with a direct answer.
pub fn finish_reply(message: &str) -> LlmResponse {
    text_reply(&format!(
        r#"{{"next": "FINISH", "reasoning": "no analysis needed", "message": "{message}"}}"#
    ))
}

/// Plain text model reply with no tool calls.
pub fn text_reply(text: &str) -> LlmResponse {
    LlmResponse {
        message: Message::assistant(text),
        tool_calls: vec![],
    }
}

/// Model reply requesting a single tool call.
pub fn tool_call_reply(text: &str, tool: &str, arguments: serde_json::Value) -> LlmResponse {
    LlmResponse {
        message: Message::assistant(text),
        tool_calls: vec![ToolCall {
            id: "call_1".to_string(),
            name: tool.to_string(),
            arguments,
        }],
    }
}

/// Prompt templates shipped with the crate.
pub fn prompt_store() -> PromptStore {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("prompts");
    PromptStore::load(&dir).expect("load shipped prompt templates")
}

/// Build a workflow wired to the mock provider, with a scratch analytics
/// database and thread store under `dir`.
pub fn build_workflow(provider: &MockProvider, dir: &Path) -> Workflow {
    let db_path = dir.join("ecommerce.db");
    let sessions_db = dir.join("sessions.db");

    let mut tools = ToolRegistry::new();
    tools.register(SqlTool::new(&db_path));
    tools.register(PythonTool::default());

    let storage = Box::new(SqliteStorage::new(&sessions_db).expect("open session storage"));

    Workflow::new(
        Box::new(provider.clone()),
        tools,
        storage,
        prompt_store(),
        &db_path,
        100,
    )
}

/// Open the thread store under `dir` for direct assertions.
pub fn open_storage(dir: &Path) -> SqliteStorage {
    SqliteStorage::new(dir.join("sessions.db")).expect("open session storage")
}
