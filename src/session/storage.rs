use anyhow::Result;
use async_trait::async_trait;

use super::{SessionState, SessionSummary};

/// Storage backend for conversation threads
#[async_trait]
pub trait Storage: Send + Sync {
    /// Save a thread's state
    async fn save(&self, session: &SessionState) -> Result<()>;

    /// Load a thread by id; `None` for a never-seen id
    async fn load(&self, id: &str) -> Result<Option<SessionState>>;

    /// List stored threads, most recently updated first
    async fn list(&self) -> Result<Vec<SessionSummary>>;

    /// Delete a thread
    async fn delete(&self, id: &str) -> Result<()>;
}
