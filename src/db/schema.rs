use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};

/// Sentinel injected into the routing prompt when introspection fails.
pub const SCHEMA_UNAVAILABLE: &str = "Schema unavailable - database not initialized";

/// Render the database schema as text for prompt injection.
///
/// Tables are listed alphabetically, one block per table:
///
/// ```text
/// Table: orders
///   - order_id (INTEGER)
///   - price_usd (REAL)
/// ```
///
/// Blocks are separated by blank lines. Output is deterministic for a given
/// database.
pub fn schema_string(db_path: &Path) -> Result<String> {
    let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("failed to open database: {}", db_path.display()))?;
    schema_string_from(&conn)
}

/// Introspect an already-open connection.
pub fn schema_string_from(conn: &Connection) -> Result<String> {
    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )
        .context("failed to list tables")?;

    let tables: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .context("failed to query table names")?
        .collect::<Result<_, _>>()
        .context("failed to read table names")?;

    let mut blocks = Vec::with_capacity(tables.len());
    for table in &tables {
        let mut info = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .with_context(|| format!("failed to inspect table: {table}"))?;

        let columns: Vec<(String, String)> = info
            .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?)))
            .with_context(|| format!("failed to read columns of {table}"))?
            .collect::<Result<_, _>>()
            .with_context(|| format!("failed to read columns of {table}"))?;

        let col_defs: Vec<String> = columns
            .iter()
            .map(|(name, ty)| format!("  - {name} ({ty})"))
            .collect();
        blocks.push(format!("Table: {table}\n{}", col_defs.join("\n")));
    }

    Ok(blocks.join("\n\n"))
}
