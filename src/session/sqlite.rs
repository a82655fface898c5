use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::Connection;
use std::path::PathBuf;
use tokio::task;
use tracing::debug;

use super::{SessionState, SessionSummary, Storage};

/// SQLite-backed thread store.
///
/// The full state is a JSON blob; id, preview, and timestamps are broken
/// out into columns for listing without deserializing histories.
pub struct SqliteStorage {
    db_path: PathBuf,
}

impl SqliteStorage {
    /// Create a new store at the given path, initializing the schema.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create directory: {}", parent.display()))?;
            }
        }

        let storage = Self { db_path };
        storage.init_schema()?;
        Ok(storage)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = Connection::open(&self.db_path)
            .with_context(|| format!("failed to open database: {}", self.db_path.display()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS threads (
                id TEXT PRIMARY KEY,
                turns INTEGER NOT NULL,
                preview TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                data TEXT NOT NULL
            )",
            [],
        )
        .context("failed to create threads table")?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_threads_updated ON threads(updated_at)",
            [],
        )
        .context("failed to create updated_at index")?;

        debug!(path = %self.db_path.display(), "initialized thread storage");
        Ok(())
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn save(&self, session: &SessionState) -> Result<()> {
        let session = session.clone();
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            let data = serde_json::to_string(&session)?;

            conn.execute(
                "INSERT OR REPLACE INTO threads (id, turns, preview, created_at, updated_at, data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    session.id,
                    session.turns() as i64,
                    session.preview(),
                    session.created_at.to_rfc3339(),
                    session.updated_at.to_rfc3339(),
                    data,
                ],
            )?;

            debug!(id = %session.id, "saved thread");
            Ok::<_, anyhow::Error>(())
        })
        .await
        .context("spawn_blocking failed")??;

        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<SessionState>> {
        let id = id.to_string();
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            let mut stmt = conn.prepare("SELECT data FROM threads WHERE id = ?1")?;

            let result = stmt.query_row([&id], |row| row.get::<_, String>(0));

            match result {
                Ok(data) => {
                    let session: SessionState = serde_json::from_str(&data)?;
                    debug!(id = %session.id, "loaded thread");
                    Ok(Some(session))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .context("spawn_blocking failed")?
    }

    async fn list(&self) -> Result<Vec<SessionSummary>> {
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            let mut stmt = conn.prepare(
                "SELECT id, turns, preview, created_at, updated_at
                 FROM threads
                 ORDER BY updated_at DESC",
            )?;

            let summaries = stmt
                .query_map([], |row| {
                    Ok(SessionSummary {
                        id: row.get(0)?,
                        turns: row.get(1)?,
                        preview: row.get(2)?,
                        created_at: row.get(3)?,
                        updated_at: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(summaries)
        })
        .await
        .context("spawn_blocking failed")?
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            conn.execute("DELETE FROM threads WHERE id = ?1", [&id])?;
            debug!(id = %id, "deleted thread");
            Ok::<_, anyhow::Error>(())
        })
        .await
        .context("spawn_blocking failed")??;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Message;

    #[tokio::test]
    async fn save_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = SqliteStorage::new(dir.path().join("threads.db")).expect("storage");

        let mut session = SessionState::with_id("thread-a");
        session.push_message(Message::user("hello"));
        session.push_message(Message::assistant("hi"));
        storage.save(&session).await.expect("save");

        let loaded = storage
            .load("thread-a")
            .await
            .expect("load")
            .expect("exists");
        assert_eq!(loaded.id, "thread-a");
        assert_eq!(loaded.messages.len(), 2);
    }

    #[tokio::test]
    async fn unknown_id_loads_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = SqliteStorage::new(dir.path().join("threads.db")).expect("storage");
        assert!(storage.load("nope").await.expect("load").is_none());
    }

    #[tokio::test]
    async fn list_and_delete() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = SqliteStorage::new(dir.path().join("threads.db")).expect("storage");

        let mut a = SessionState::with_id("a");
        a.push_message(Message::user("first question"));
        let b = SessionState::with_id("b");
        storage.save(&a).await.expect("save a");
        storage.save(&b).await.expect("save b");

        let listed = storage.list().await.expect("list");
        assert_eq!(listed.len(), 2);
        let a_summary = listed.iter().find(|s| s.id == "a").expect("a listed");
        assert_eq!(a_summary.turns, 1);
        assert_eq!(a_summary.preview, "first question");

        storage.delete("a").await.expect("delete");
        assert!(storage.load("a").await.expect("load").is_none());
        assert_eq!(storage.list().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn resave_overwrites_existing_row() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = SqliteStorage::new(dir.path().join("threads.db")).expect("storage");

        let mut session = SessionState::with_id("t");
        session.push_message(Message::user("one"));
        storage.save(&session).await.expect("save");
        session.push_message(Message::assistant("answer"));
        session.push_message(Message::user("two"));
        storage.save(&session).await.expect("resave");

        let loaded = storage.load("t").await.expect("load").expect("exists");
        assert_eq!(loaded.messages.len(), 3);
        assert_eq!(storage.list().await.expect("list").len(), 1);
    }
}
