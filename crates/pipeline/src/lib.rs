pub mod aggregate;
pub mod config;
pub mod export;
pub mod fanout;
pub mod ingest;
pub mod logging;

use chrono::Utc;

/// current UTC calendar day as `YYYY-MM-DD`
pub fn today() -> String {
    Utc::now().date_naive().format("%Y-%m-%d").to_string()
}
