use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rusqlite::{Connection, params};
use tracing::info;

const RNG_SEED: u64 = 42;

const AD_V1_SESSIONS: usize = 2000;
const AD_V2_SESSIONS: usize = 2000;
const AD_V1_CONVERSION_RATE: f64 = 0.04;
const AD_V2_CONVERSION_RATE: f64 = 0.08;

const NUM_WHALE_USERS: i64 = 50;
const NUM_REGULAR_USERS: i64 = 50;
const NUM_CASUAL_USERS: i64 = 200;

const UTM_SOURCES: &[&str] = &["google", "facebook", "twitter", "email", "organic"];
const DEVICES: &[&str] = &["desktop", "mobile", "tablet"];

const PRODUCTS: &[(i64, &str, &str)] = &[
    (1, "Premium Widget", "2023-01-15"),
    (2, "Standard Gadget", "2023-02-01"),
    (3, "Deluxe Bundle", "2023-03-10"),
    (4, "Basic Starter Kit", "2023-04-20"),
];

/// Row counts inserted by a seeding run.
#[derive(Debug, Clone, Copy)]
pub struct SeedReport {
    pub products: usize,
    pub sessions: usize,
    pub orders: usize,
    pub order_items: usize,
}

/// Build and populate the analytics dataset.
///
/// The data carries two detectable patterns for the agents to find: an A/B
/// split (Ad_V1 at ~4% conversion vs Ad_V2 at ~8%) and spend segments
/// (whales with 5-15 orders at $80-150, regulars at 2-4 orders, casuals at
/// 1-2 cheap orders). The RNG seed is fixed, so repeated runs produce the
/// same dataset.
pub fn seed_database(db_path: &Path) -> Result<SeedReport> {
    let mut conn = Connection::open(db_path)
        .with_context(|| format!("failed to open database: {}", db_path.display()))?;

    create_schema(&conn)?;

    let mut rng = StdRng::seed_from_u64(RNG_SEED);
    let tx = conn.transaction().context("failed to begin transaction")?;

    let products = seed_products(&tx)?;
    let sessions = seed_sessions(&tx, &mut rng)?;
    let (orders, order_items) = seed_orders(&tx, &mut rng)?;

    tx.commit().context("failed to commit seed data")?;

    let report = SeedReport {
        products,
        sessions,
        orders,
        order_items,
    };
    info!(
        products = report.products,
        sessions = report.sessions,
        orders = report.orders,
        order_items = report.order_items,
        "seeded database"
    );
    Ok(report)
}

fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS order_items;
         DROP TABLE IF EXISTS orders;
         DROP TABLE IF EXISTS website_sessions;
         DROP TABLE IF EXISTS products;

         CREATE TABLE products (
             product_id INTEGER PRIMARY KEY,
             product_name TEXT NOT NULL,
             created_at TEXT NOT NULL
         );

         CREATE TABLE website_sessions (
             session_id INTEGER PRIMARY KEY AUTOINCREMENT,
             user_id INTEGER NOT NULL,
             utm_source TEXT,
             utm_campaign TEXT,
             utm_content TEXT,
             device_type TEXT,
             created_at TEXT NOT NULL
         );

         CREATE TABLE orders (
             order_id INTEGER PRIMARY KEY AUTOINCREMENT,
             created_at TEXT NOT NULL,
             user_id INTEGER NOT NULL,
             price_usd REAL NOT NULL,
             cogs_usd REAL NOT NULL
         );

         CREATE TABLE order_items (
             order_item_id INTEGER PRIMARY KEY AUTOINCREMENT,
             order_id INTEGER NOT NULL,
             product_id INTEGER NOT NULL,
             price_usd REAL NOT NULL,
             cogs_usd REAL NOT NULL,
             FOREIGN KEY (order_id) REFERENCES orders(order_id),
             FOREIGN KEY (product_id) REFERENCES products(product_id)
         );",
    )
    .context("failed to create schema")
}

fn seed_products(conn: &Connection) -> Result<usize> {
    for (id, name, created_at) in PRODUCTS {
        conn.execute(
            "INSERT INTO products (product_id, product_name, created_at) VALUES (?1, ?2, ?3)",
            params![id, name, created_at],
        )
        .context("failed to insert product")?;
    }
    Ok(PRODUCTS.len())
}

fn random_timestamp(rng: &mut StdRng, with_minutes: bool) -> String {
    let base = NaiveDate::from_ymd_opt(2024, 1, 1)
        .expect("valid base date")
        .and_hms_opt(0, 0, 0)
        .expect("valid base time");
    let mut ts = base
        + Duration::days(rng.gen_range(0..=180))
        + Duration::hours(rng.gen_range(0..=23));
    if with_minutes {
        ts += Duration::minutes(rng.gen_range(0..=59));
    }
    ts.format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn seed_sessions(conn: &Connection, rng: &mut StdRng) -> Result<usize> {
    let mut insert = conn
        .prepare(
            "INSERT INTO website_sessions
             (user_id, utm_source, utm_campaign, utm_content, device_type, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .context("failed to prepare session insert")?;

    let variants = [
        ("Ad_V1", "version_1", 1..=300i64, AD_V1_SESSIONS),
        ("Ad_V2", "version_2", 301..=600i64, AD_V2_SESSIONS),
    ];

    let mut count = 0;
    for (campaign, content, user_range, sessions) in variants {
        for _ in 0..sessions {
            let user_id = rng.gen_range(user_range.clone());
            insert
                .execute(params![
                    user_id,
                    UTM_SOURCES.choose(rng).expect("nonempty"),
                    campaign,
                    content,
                    DEVICES.choose(rng).expect("nonempty"),
                    random_timestamp(rng, true),
                ])
                .context("failed to insert session")?;
            count += 1;
        }
    }
    Ok(count)
}

fn seed_orders(conn: &Connection, rng: &mut StdRng) -> Result<(usize, usize)> {
    let mut insert_order = conn
        .prepare(
            "INSERT INTO orders (created_at, user_id, price_usd, cogs_usd)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .context("failed to prepare order insert")?;
    let mut insert_item = conn
        .prepare(
            "INSERT INTO order_items (order_id, product_id, price_usd, cogs_usd)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .context("failed to prepare order item insert")?;

    let mut orders = 0usize;
    let mut items = 0usize;
    let mut order_id = 0i64;

    let round2 = |v: f64| (v * 100.0).round() / 100.0;

    // Spend segments: (user range, orders per user, price range, max items)
    let segments = [
        (1..=NUM_WHALE_USERS, 5..=15usize, 80.0..150.0, 3usize),
        (51..=50 + NUM_REGULAR_USERS, 2..=4usize, 40.0..80.0, 2),
        (101..=100 + NUM_CASUAL_USERS, 1..=2usize, 15.0..40.0, 1),
    ];

    for (user_range, orders_per_user, price_range, max_items) in segments {
        for user_id in user_range {
            for _ in 0..rng.gen_range(orders_per_user.clone()) {
                let price = round2(rng.gen_range(price_range.clone()));
                let cogs = round2(price * rng.gen_range(0.3..0.5));
                insert_order
                    .execute(params![random_timestamp(rng, false), user_id, price, cogs])
                    .context("failed to insert order")?;
                order_id += 1;
                orders += 1;

                let num_items = rng.gen_range(1..=max_items);
                for _ in 0..num_items {
                    let (product_id, _, _) = PRODUCTS.choose(rng).expect("nonempty");
                    let item_price = round2(price / num_items as f64);
                    let item_cogs = round2(item_price * rng.gen_range(0.3..0.5));
                    insert_item
                        .execute(params![order_id, product_id, item_price, item_cogs])
                        .context("failed to insert order item")?;
                    items += 1;
                }
            }
        }
    }

    // A/B conversions. Casual/regular users already have orders, so Ad_V1
    // converters only add orders for users outside the segment ranges.
    let v1_converters = (AD_V1_SESSIONS as f64 * AD_V1_CONVERSION_RATE) as usize;
    let v2_converters = (AD_V2_SESSIONS as f64 * AD_V2_CONVERSION_RATE) as usize;

    let v1_pool: Vec<i64> = (1..=300).collect();
    let v2_pool: Vec<i64> = (301..=600).collect();

    let conversions = [
        (v1_pool, v1_converters, true),
        (v2_pool, v2_converters, false),
    ];

    for (pool, sample_size, skip_segmented) in conversions {
        for &user_id in pool.choose_multiple(rng, sample_size) {
            if skip_segmented && user_id <= 100 {
                continue;
            }
            let price = round2(rng.gen_range(25.0..60.0));
            let cogs = round2(price * 0.4);
            insert_order
                .execute(params![random_timestamp(rng, false), user_id, price, cogs])
                .context("failed to insert order")?;
            order_id += 1;
            orders += 1;

            let (product_id, _, _) = PRODUCTS.choose(rng).expect("nonempty");
            insert_item
                .execute(params![order_id, product_id, price, cogs])
                .context("failed to insert order item")?;
            items += 1;
        }
    }

    Ok((orders, items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_expected_volumes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = dir.path().join("ecommerce.db");
        let report = seed_database(&db).expect("seed");

        assert_eq!(report.products, 4);
        assert_eq!(report.sessions, AD_V1_SESSIONS + AD_V2_SESSIONS);
        assert!(report.orders > 0);
        assert!(report.order_items >= report.orders);

        let conn = Connection::open(&db).expect("open");
        let sessions: i64 = conn
            .query_row("SELECT COUNT(*) FROM website_sessions", [], |r| r.get(0))
            .expect("count");
        assert_eq!(sessions, 4000);

        let campaigns: i64 = conn
            .query_row(
                "SELECT COUNT(DISTINCT utm_campaign) FROM website_sessions",
                [],
                |r| r.get(0),
            )
            .expect("count");
        assert_eq!(campaigns, 2);
    }

    #[test]
    fn reseeding_is_deterministic() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = seed_database(&dir.path().join("a.db")).expect("seed a");
        let second = seed_database(&dir.path().join("b.db")).expect("seed b");
        assert_eq!(first.orders, second.orders);
        assert_eq!(first.order_items, second.order_items);
    }

    #[test]
    fn whales_outspend_casuals() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = dir.path().join("ecommerce.db");
        seed_database(&db).expect("seed");

        let conn = Connection::open(&db).expect("open");
        let whale_avg: f64 = conn
            .query_row(
                "SELECT AVG(price_usd) FROM orders WHERE user_id BETWEEN 1 AND 50",
                [],
                |r| r.get(0),
            )
            .expect("whale avg");
        let casual_avg: f64 = conn
            .query_row(
                "SELECT AVG(price_usd) FROM orders WHERE user_id BETWEEN 101 AND 300",
                [],
                |r| r.get(0),
            )
            .expect("casual avg");
        assert!(whale_avg > casual_avg);
    }
}
