use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags, types::ValueRef};
use serde_json::{Value, json};
use tokio::task;
use tracing::debug;

use super::Tool;

const MAX_OUTPUT_BYTES: usize = 100_000;

const REJECTED: &str = "Error: Only SELECT queries are allowed for safety.";
const NO_RESULTS: &str = "Query returned no results.";

/// Read-only SQL tool over the analytics database.
///
/// Execution failures are rendered into the returned string rather than
/// raised, so the model can see the error and retry with a corrected query.
pub struct SqlTool {
    db_path: PathBuf,
}

impl SqlTool {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }
}

#[async_trait]
impl Tool for SqlTool {
    fn name(&self) -> &str {
        "sql_tool"
    }

    fn description(&self) -> &str {
        "Execute a SELECT query against the e-commerce SQLite database and return the results as a text table. Use this to extract data before analysis."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "SQL query to execute (SELECT queries only)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let query = params["query"]
            .as_str()
            .context("missing 'query' parameter")?
            .to_string();

        if !is_select(&query) {
            debug!(query = %query, "rejected non-SELECT statement");
            return Ok(REJECTED.to_string());
        }

        let db_path = self.db_path.clone();
        let mut output = task::spawn_blocking(move || run_query(&db_path, &query))
            .await
            .context("spawn_blocking failed")?;

        if output.len() > MAX_OUTPUT_BYTES {
            output.truncate(MAX_OUTPUT_BYTES);
            output.push_str("\n... [output truncated]");
        }

        Ok(output)
    }
}

/// Prefix gate: leading whitespace trimmed, case-insensitive.
fn is_select(query: &str) -> bool {
    let trimmed = query.trim_start();
    trimmed
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("SELECT"))
}

fn run_query(db_path: &Path, query: &str) -> String {
    match try_query(db_path, query) {
        Ok(table) => table,
        Err(e) => format!("SQL Error: {e}"),
    }
}

fn try_query(db_path: &Path, query: &str) -> Result<String> {
    let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let mut stmt = conn.prepare(query)?;

    let headers: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let mut rows_out: Vec<Vec<String>> = Vec::new();

    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(headers.len());
        for i in 0..headers.len() {
            cells.push(render_value(row.get_ref(i)?));
        }
        rows_out.push(cells);
    }

    if rows_out.is_empty() {
        return Ok(NO_RESULTS.to_string());
    }

    Ok(render_table(&headers, &rows_out))
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<blob {} bytes>", b.len()),
    }
}

/// Fixed-width text table: header row followed by data rows, columns padded
/// to the widest cell and separated by two spaces.
fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let format_row = |cells: &[String]| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(format_row(headers));
    for row in rows {
        lines.push(format_row(row));
    }
    lines.join("\n")
}
