use data_analyst::{SqlTool, Tool, db};
use rusqlite::Connection;
use serde_json::json;
use tempfile::TempDir;

#[tokio::test]
async fn count_query_on_seeded_database_returns_one_row_with_the_count() {
    let tmp = TempDir::new().expect("tempdir");
    let db_path = tmp.path().join("ecommerce.db");
    let report = db::seed_database(&db_path).expect("seed");

    let tool = SqlTool::new(&db_path);
    let result = tool
        .execute(json!({"query": "SELECT COUNT(*) FROM orders"}))
        .await
        .expect("execute");

    let lines: Vec<&str> = result.lines().collect();
    assert_eq!(lines.len(), 2, "header plus exactly one row: {result}");
    assert!(lines[1].trim().parse::<i64>().is_ok());
    assert_eq!(lines[1].trim(), report.orders.to_string());
}

#[tokio::test]
async fn plain_select_on_empty_table_returns_the_no_results_string() {
    let tmp = TempDir::new().expect("tempdir");
    let db_path = tmp.path().join("empty.db");
    Connection::open(&db_path)
        .expect("open")
        .execute_batch(
            "CREATE TABLE orders (order_id INTEGER, created_at TEXT, user_id INTEGER,
                                  price_usd REAL, cogs_usd REAL)",
        )
        .expect("create");

    let tool = SqlTool::new(&db_path);
    let result = tool
        .execute(json!({"query": "SELECT * FROM orders"}))
        .await
        .expect("execute");
    assert_eq!(result, "Query returned no results.");
}

#[tokio::test]
async fn seeded_ab_pattern_is_visible_through_the_tool() {
    let tmp = TempDir::new().expect("tempdir");
    let db_path = tmp.path().join("ecommerce.db");
    db::seed_database(&db_path).expect("seed");

    let tool = SqlTool::new(&db_path);
    let result = tool
        .execute(json!({
            "query": "SELECT utm_campaign, COUNT(*) AS sessions FROM website_sessions \
                      GROUP BY utm_campaign ORDER BY utm_campaign"
        }))
        .await
        .expect("execute");

    assert!(result.contains("Ad_V1"));
    assert!(result.contains("Ad_V2"));
    assert!(result.contains("2000"));
}

#[tokio::test]
async fn mutating_statements_are_rejected_against_the_real_dataset() {
    let tmp = TempDir::new().expect("tempdir");
    let db_path = tmp.path().join("ecommerce.db");
    db::seed_database(&db_path).expect("seed");

    let tool = SqlTool::new(&db_path);
    for query in [
        "DROP TABLE orders",
        "DELETE FROM orders",
        "UPDATE orders SET price_usd = 0",
        "INSERT INTO orders (created_at, user_id, price_usd, cogs_usd) VALUES ('x', 1, 1, 1)",
    ] {
        let result = tool
            .execute(json!({"query": query}))
            .await
            .expect("execute");
        assert_eq!(result, "Error: Only SELECT queries are allowed for safety.");
    }

    // Dataset is untouched
    let conn = Connection::open(&db_path).expect("open");
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM orders", [], |r| r.get(0))
        .expect("count");
    assert!(count > 0);
}
