pub mod agents;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod prompts;
pub mod runtime;
pub mod session;
pub mod tools;
pub mod viz;

pub use agents::{Route, RoutingDecision, Supervisor, WorkerAgent, interpret_reply};
pub use config::AnalystConfig;
pub use error::ConfigError;
pub use llm::{
    GeminiProvider, LlmProvider, LlmResponse, Message, MessageContent, MessageRole, RetryPolicy,
    ToolCall, ToolResult,
};
pub use prompts::PromptStore;
pub use runtime::{StateUpdate, TurnResult, Workflow};
pub use session::{SessionState, SessionSummary, SqliteStorage, Storage};
pub use tools::{PythonTool, SqlTool, Tool, ToolRegistry};
pub use viz::Visualization;
