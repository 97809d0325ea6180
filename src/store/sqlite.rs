//! SQLite event store
//!
//! Tables written (see `/sql/00_events.sql`):
//! - `Events` - append-only rows of `(name, value, tag, additional_info, timestamp)`
//!
//! Timestamps are stored as UTC text in a fixed-width format, so SQL text
//! comparison and `ORDER BY timestamp` follow time order.

use crate::error::{FetchError, StoreError};
use crate::event::{days_before, Event};
use crate::source::{EventQuery, EventSource};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, params_from_iter, types::Value as SqlValue, Connection, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA_SQL: &str = include_str!("../../sql/00_events.sql");
const STORED_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

fn to_stored(ts: &DateTime<Utc>) -> String {
    ts.format(STORED_TIMESTAMP_FORMAT).to_string()
}

fn from_stored(text: &str) -> Result<DateTime<Utc>, StoreError> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| StoreError::Timestamp(text.to_string()))
}

fn cutoff(now: DateTime<Utc>, days: f64) -> DateTime<Utc> {
    days_before(now, days)
}

/// Event name with its stored row count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventNameCount {
    pub name: String,
    pub count: u64,
}

/// Row as read, timestamp still text
struct RawEvent {
    name: String,
    value: f64,
    tag: Option<String>,
    additional_info: Option<String>,
    timestamp: String,
}

impl RawEvent {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            value: row.get(1)?,
            tag: row.get(2)?,
            additional_info: row.get(3)?,
            timestamp: row.get(4)?,
        })
    }

    fn into_event(self) -> Result<Event, StoreError> {
        Ok(Event {
            name: self.name,
            value: self.value,
            tag: self.tag,
            additional_info: self.additional_info,
            timestamp: from_stored(&self.timestamp)?,
        })
    }
}

/// `AND <column> IN (?, ?, ...)` for a non-empty tag list
fn tag_clause(column: &str, tags: &[String], params: &mut Vec<SqlValue>) -> String {
    if tags.is_empty() {
        return String::new();
    }
    let placeholders = vec!["?"; tags.len()].join(",");
    params.extend(tags.iter().cloned().map(SqlValue::Text));
    format!(" AND {} IN ({})", column, placeholders)
}

pub struct SqliteEventStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEventStore {
    /// Open (creating if needed) the database at `db_path` and apply the schema
    pub fn open(db_path: &str) -> Result<Self, StoreError> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        log::info!("📊 Opened event store {} (journal_mode={})", db_path, mode);

        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert_event(&self, event: &Event) -> Result<(), StoreError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO Events (name, value, tag, additional_info, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.name,
                event.value,
                event.tag,
                event.additional_info,
                to_stored(&event.timestamp),
            ],
        )?;
        Ok(())
    }

    /// Insert all `events` in one transaction; returns the number inserted
    pub fn insert_events_bulk(&self, events: &[Event]) -> Result<usize, StoreError> {
        if events.is_empty() {
            return Ok(0);
        }

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO Events (name, value, tag, additional_info, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for event in events {
                stmt.execute(params![
                    event.name,
                    event.value,
                    event.tag,
                    event.additional_info,
                    to_stored(&event.timestamp),
                ])?;
            }
        }
        tx.commit()?;

        log::debug!("Inserted {} events in bulk", events.len());
        Ok(events.len())
    }

    /// Events of one name, oldest first
    ///
    /// - `max_age_days > 0` keeps events at or after `now - max_age_days`
    /// - non-empty `tags` keeps events whose tag is listed
    /// - `max_results > 0` keeps the newest N (still returned oldest first)
    pub fn get_events(
        &self,
        query: &EventQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<Event>, StoreError> {
        let mut sql = String::from(
            "SELECT name, value, tag, additional_info, timestamp FROM Events WHERE name = ?",
        );
        let mut params: Vec<SqlValue> = vec![SqlValue::Text(query.event_name.clone())];

        if let Some(days) = query.max_age_days.filter(|d| *d > 0.0) {
            sql.push_str(" AND timestamp >= ?");
            params.push(SqlValue::Text(to_stored(&cutoff(now, days))));
        }
        sql.push_str(&tag_clause("tag", &query.tags, &mut params));

        let newest_first = match query.max_results.filter(|n| *n > 0) {
            Some(limit) => {
                sql.push_str(" ORDER BY timestamp DESC, id DESC LIMIT ?");
                params.push(SqlValue::Integer(limit as i64));
                true
            }
            None => {
                sql.push_str(" ORDER BY timestamp ASC, id ASC");
                false
            }
        };

        let mut events = self.query_events(&sql, params)?;
        if newest_first {
            events.reverse();
        }
        Ok(events)
    }

    /// Most recent event per distinct tag, ordered by tag
    pub fn latest_events_by_tag(
        &self,
        name: &str,
        tags: &[String],
    ) -> Result<Vec<Event>, StoreError> {
        let mut params: Vec<SqlValue> = vec![SqlValue::Text(name.to_string())];
        let inner_tags = tag_clause("tag", tags, &mut params);
        params.push(SqlValue::Text(name.to_string()));
        let outer_tags = tag_clause("e1.tag", tags, &mut params);

        let sql = format!(
            r#"
            SELECT e1.name, e1.value, e1.tag, e1.additional_info, e1.timestamp
            FROM Events e1
            INNER JOIN (
                SELECT tag, MAX(timestamp) AS max_timestamp
                FROM Events
                WHERE name = ?{}
                GROUP BY tag
            ) e2 ON e1.tag = e2.tag AND e1.timestamp = e2.max_timestamp
            WHERE e1.name = ?{}
            ORDER BY e1.tag
            "#,
            inner_tags, outer_tags
        );

        self.query_events(&sql, params)
    }

    pub fn event_names_with_counts(&self) -> Result<Vec<EventNameCount>, StoreError> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare("SELECT name, COUNT(*) FROM Events GROUP BY name ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(EventNameCount {
                name: row.get(0)?,
                count: row.get::<_, i64>(1)? as u64,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Delete events of `name` (and `tag`, when given) older than `days`
    pub fn delete_old_events(
        &self,
        name: &str,
        tag: Option<&str>,
        days: f64,
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let cutoff = to_stored(&cutoff(now, days));
        let conn = self.lock();
        let deleted = match tag {
            Some(tag) => conn.execute(
                "DELETE FROM Events WHERE name = ?1 AND tag = ?2 AND timestamp < ?3",
                params![name, tag, cutoff],
            )?,
            None => conn.execute(
                "DELETE FROM Events WHERE name = ?1 AND timestamp < ?2",
                params![name, cutoff],
            )?,
        };
        Ok(deleted)
    }

    fn query_events(&self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<Event>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(sql)?;
        let raw = stmt
            .query_map(params_from_iter(params), RawEvent::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(RawEvent::into_event).collect()
    }
}

#[async_trait]
impl EventSource for SqliteEventStore {
    async fn fetch(&self, query: &EventQuery) -> Result<Vec<Event>, FetchError> {
        let events = if query.last_unique_by_tag {
            self.latest_events_by_tag(&query.event_name, &query.tags)?
        } else {
            self.get_events(query, Utc::now())?
        };
        Ok(events)
    }
}
