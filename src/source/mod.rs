//! Event sources: anything that can answer "fetch(name, filters) -> events"
//!
//! Two transports implement [`EventSource`]: the SQLite store
//! ([`crate::store::SqliteEventStore`]) and the HTTP query endpoint
//! ([`http::HttpEventSource`]). The [`cache::DataSourceCache`] drives either.

pub mod cache;
pub mod http;

use crate::error::FetchError;
use crate::event::Event;
use crate::view::DataSourceSpec;
use async_trait::async_trait;

pub use cache::{CachedSource, DataSourceCache, FetchStats, SourceSnapshot, SourceStatus};
pub use http::HttpEventSource;

/// Filters sent to an event source for one data source
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventQuery {
    pub event_name: String,
    /// Empty means no tag filter
    pub tags: Vec<String>,
    pub max_age_days: Option<f64>,
    pub max_results: Option<u32>,
    pub last_unique_by_tag: bool,
}

impl EventQuery {
    pub fn new(event_name: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            ..Default::default()
        }
    }

    /// Query-string pairs for `GET /api/events`
    ///
    /// Tags repeat the `tag` key once per value.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("name", self.event_name.clone())];
        for tag in &self.tags {
            pairs.push(("tag", tag.clone()));
        }
        if let Some(days) = self.max_age_days {
            pairs.push(("max_age_days", days.to_string()));
        }
        if let Some(limit) = self.max_results {
            pairs.push(("max_results", limit.to_string()));
        }
        if self.last_unique_by_tag {
            pairs.push(("last_unique_by_tag", "true".to_string()));
        }
        pairs
    }
}

impl From<&DataSourceSpec> for EventQuery {
    fn from(spec: &DataSourceSpec) -> Self {
        Self {
            event_name: spec.event_name.clone(),
            tags: spec
                .tags
                .as_ref()
                .map(|tags| tags.iter().cloned().collect())
                .unwrap_or_default(),
            max_age_days: spec.max_age_days,
            max_results: spec.max_results,
            last_unique_by_tag: spec.last_unique_by_tag,
        }
    }
}

/// Transport-independent event fetch
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch(&self, query: &EventQuery) -> Result<Vec<Event>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_query_from_spec() {
        let spec = DataSourceSpec {
            id: "cpu".to_string(),
            event_name: "cpu_usage".to_string(),
            tags: Some(BTreeSet::from(["core1".to_string(), "core0".to_string()])),
            max_age_days: Some(2.0),
            max_results: None,
            last_unique_by_tag: false,
        };
        let query = EventQuery::from(&spec);
        assert_eq!(query.event_name, "cpu_usage");
        assert_eq!(query.tags, vec!["core0", "core1"]);
        assert_eq!(query.max_age_days, Some(2.0));
    }

    #[test]
    fn test_query_pairs_repeat_tags() {
        let mut query = EventQuery::new("logs");
        query.tags = vec!["ERROR".into(), "WARN".into()];
        query.max_results = Some(50);
        query.last_unique_by_tag = true;

        let pairs = query.query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("name", "logs".to_string()),
                ("tag", "ERROR".to_string()),
                ("tag", "WARN".to_string()),
                ("max_results", "50".to_string()),
                ("last_unique_by_tag", "true".to_string()),
            ]
        );
    }
}
