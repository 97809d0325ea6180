//! Ingest Events - batched submission into the SQLite event store
//!
//! Reads a `{"events": [...]}` body from a file (first argument) or stdin,
//! validates it, and inserts every event in one transaction.
//!
//! Usage:
//!   cargo run --bin ingest_events -- batch.json
//!   echo '{"events":[{"name":"cpu_usage","value":12.5}]}' | cargo run --bin ingest_events
//!
//! Environment variables:
//!   EVENTS_DB_PATH - SQLite database path (default: data/events.db)

use chrono::Utc;
use dotenv::dotenv;
use eventdash::{
    config::DashboardConfig,
    store::{parse_event_batch, SqliteEventStore},
};
use log::{error, info};
use std::io::Read;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = DashboardConfig::from_env();

    let text = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let body: serde_json::Value = serde_json::from_str(&text)?;
    let events = match parse_event_batch(&body, Utc::now()) {
        Ok(events) => events,
        Err(e) => {
            error!("❌ Rejected batch: {}", e);
            return Err(e.into());
        }
    };

    let store = SqliteEventStore::open(&config.db_path)?;
    let inserted = store.insert_events_bulk(&events)?;
    info!("✅ Inserted {} events into {}", inserted, config.db_path);

    for entry in store.event_names_with_counts()? {
        println!("{:<32} {}", entry.name, entry.count);
    }

    Ok(())
}
