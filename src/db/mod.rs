mod schema;
mod seed;

pub use schema::{SCHEMA_UNAVAILABLE, schema_string, schema_string_from};
pub use seed::{SeedReport, seed_database};
