//! HTTP event source
//!
//! Endpoint: `GET {base}/api/events?name&tag*&max_age_days&max_results&last_unique_by_tag`
//! Returns: `{ "data": [Event, ...] }`

use super::{EventQuery, EventSource};
use crate::error::FetchError;
use crate::event::Event;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    data: Vec<Event>,
}

pub struct HttpEventSource {
    client: reqwest::Client,
    events_url: String,
}

impl HttpEventSource {
    /// Build a client for `base_url`
    ///
    /// `timeout` of `None` leaves requests unbounded; a stalled request then
    /// keeps its data source unresolved.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            events_url: format!("{}/api/events", base_url.trim_end_matches('/')),
        })
    }

    pub fn events_url(&self) -> &str {
        &self.events_url
    }
}

#[async_trait]
impl EventSource for HttpEventSource {
    async fn fetch(&self, query: &EventQuery) -> Result<Vec<Event>, FetchError> {
        let response = self
            .client
            .get(&self.events_url)
            .query(&query.query_pairs())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body: EventsResponse = response.json().await?;
        log::debug!(
            "🌐 Fetched {} '{}' events from {}",
            body.data.len(),
            query.event_name,
            self.events_url
        );
        Ok(body.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_url_strips_trailing_slash() {
        let source = HttpEventSource::new("http://localhost:8080/", None).unwrap();
        assert_eq!(source.events_url(), "http://localhost:8080/api/events");
    }

    #[test]
    fn test_response_shape() {
        let body = r#"{"data":[{"name":"cpu","value":12.5,"tag":"core0","timestamp":"2025-01-01T12:00:00Z"}]}"#;
        let parsed: EventsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data[0].tag.as_deref(), Some("core0"));
    }

    #[tokio::test]
    #[ignore] // Needs a running events API on localhost:8080
    async fn test_fetch_live_endpoint() {
        let source = HttpEventSource::new("http://localhost:8080", Some(Duration::from_secs(5))).unwrap();
        let result = source.fetch(&EventQuery::new("cpu_usage")).await;
        assert!(result.is_ok());
    }
}
