mod state;
mod workflow;

pub use state::{StateUpdate, TurnResult, last_assistant_text};
pub use workflow::Workflow;
