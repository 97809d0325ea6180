//! Retention: periodic deletion of old events per rule

use super::sqlite::SqliteEventStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Delete `event_name` events (optionally only those with `tag`) older than `max_age_days`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionRule {
    pub event_name: String,
    #[serde(default)]
    pub tag: Option<String>,
    pub max_age_days: f64,
}

impl RetentionRule {
    fn is_valid(&self) -> bool {
        !self.event_name.is_empty() && self.max_age_days.is_finite() && self.max_age_days > 0.0
    }
}

/// Apply every rule once; returns the total number of deleted events
///
/// Invalid rules are skipped. A store error on one rule does not stop the others.
pub fn apply_retention(store: &SqliteEventStore, rules: &[RetentionRule], now: DateTime<Utc>) -> usize {
    let mut total_deleted = 0;

    for rule in rules {
        if !rule.is_valid() {
            log::error!("Skipping invalid retention rule: {:?}", rule);
            continue;
        }

        match store.delete_old_events(&rule.event_name, rule.tag.as_deref(), rule.max_age_days, now) {
            Ok(deleted) => {
                log::info!(
                    "🧹 Deleted {} old '{}' events (older than {} days)",
                    deleted,
                    rule.event_name,
                    rule.max_age_days
                );
                total_deleted += deleted;
            }
            Err(e) => {
                log::error!("❌ Retention failed for '{}': {}", rule.event_name, e);
            }
        }
    }

    total_deleted
}

/// Retention task - apply rules every `interval_minutes`
///
/// The first pass runs one full interval after start. Runs until cancelled.
pub async fn retention_task(
    store: Arc<SqliteEventStore>,
    rules: Vec<RetentionRule>,
    interval_minutes: u64,
) {
    log::info!(
        "🧹 Starting retention job ({} rules, every {} min)",
        rules.len(),
        interval_minutes
    );

    let period = Duration::from_secs(interval_minutes.max(1) * 60);
    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer.tick().await;

    loop {
        timer.tick().await;
        log::debug!("Start old events cleanup");
        let deleted = apply_retention(&store, &rules, Utc::now());
        log::debug!("Finished old events cleanup ({} deleted)", deleted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::source::EventQuery;
    use chrono::{Duration as ChronoDuration, TimeZone};

    #[test]
    fn test_apply_retention_skips_invalid_rules() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let store = SqliteEventStore::open_in_memory().unwrap();
        store
            .insert_events_bulk(&[
                Event::new("cpu", 1.0, now - ChronoDuration::days(10)),
                Event::new("cpu", 2.0, now - ChronoDuration::days(1)),
                Event::new("logs", 3.0, now - ChronoDuration::days(10)).with_tag("INFO"),
                Event::new("logs", 4.0, now - ChronoDuration::days(10)).with_tag("ERROR"),
            ])
            .unwrap();

        let rules: Vec<RetentionRule> = serde_json::from_str(
            r#"[
                {"event_name": "cpu", "max_age_days": 7},
                {"event_name": "logs", "tag": "INFO", "max_age_days": 7},
                {"event_name": "logs", "max_age_days": 0}
            ]"#,
        )
        .unwrap();

        assert_eq!(apply_retention(&store, &rules, now), 2);

        let logs = store.get_events(&EventQuery::new("logs"), now).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].tag.as_deref(), Some("ERROR"));
    }
}
