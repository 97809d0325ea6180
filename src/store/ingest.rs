//! Validation of batched event submissions
//!
//! Accepted body: `{"events": [{"name": str, "value"?: number, "tag"?: str,
//! "additional_info"?: str, "timestamp"?: ISO-8601}, ...]}`. The first invalid
//! item rejects the whole batch.

use crate::error::IngestError;
use crate::event::{parse_timestamp, Event};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Optional string field: absent or null is `None`, anything else must be a string
fn optional_string(
    item: &serde_json::Map<String, Value>,
    key: &str,
    err: IngestError,
) -> Result<Option<String>, IngestError> {
    match item.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(err),
    }
}

fn parse_item(index: usize, item: &Value, now: DateTime<Utc>) -> Result<Event, IngestError> {
    let item = item.as_object().ok_or(IngestError::EventNotObject(index))?;

    let name = match item.get("name") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => return Err(IngestError::MissingName(index)),
    };

    let value = match item.get("value") {
        None | Some(Value::Null) => 0.0,
        Some(Value::Number(n)) => n.as_f64().ok_or(IngestError::InvalidValue(index))?,
        Some(_) => return Err(IngestError::InvalidValue(index)),
    };

    let tag = optional_string(item, "tag", IngestError::InvalidTag(index))?;
    let additional_info = optional_string(
        item,
        "additional_info",
        IngestError::InvalidAdditionalInfo(index),
    )?;

    let timestamp = match item.get("timestamp") {
        None | Some(Value::Null) => now,
        Some(Value::String(s)) if s.is_empty() => now,
        Some(Value::String(s)) => parse_timestamp(s).ok_or(IngestError::InvalidTimestamp(index))?,
        Some(_) => return Err(IngestError::InvalidTimestamp(index)),
    };

    Ok(Event {
        name,
        value,
        tag,
        additional_info,
        timestamp,
    })
}

/// Validate a submission body into events; items without a timestamp get `now`
pub fn parse_event_batch(body: &Value, now: DateTime<Utc>) -> Result<Vec<Event>, IngestError> {
    let body = body.as_object().ok_or(IngestError::NotAnObject)?;

    let items = match body.get("events") {
        None | Some(Value::Null) => return Err(IngestError::MissingEvents),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(IngestError::EventsNotArray),
    };
    if items.is_empty() {
        return Err(IngestError::EmptyBatch);
    }

    items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_item(index, item, now))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_valid_batch_with_defaults() {
        let body = json!({"events": [
            {"name": "deploys", "tag": "api", "timestamp": "2025-01-01T12:00:00Z"},
            {"name": "errors", "value": 3, "additional_info": "timeout"}
        ]});
        let events = parse_event_batch(&body, now()).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].value, 0.0);
        assert_eq!(events[0].tag.as_deref(), Some("api"));
        assert_eq!(events[0].timestamp, Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap());
        assert_eq!(events[1].value, 3.0);
        assert_eq!(events[1].timestamp, now());
    }

    #[test]
    fn test_envelope_errors() {
        assert_eq!(parse_event_batch(&json!([1]), now()), Err(IngestError::NotAnObject));
        assert_eq!(parse_event_batch(&json!({}), now()), Err(IngestError::MissingEvents));
        assert_eq!(parse_event_batch(&json!({"events": {}}), now()), Err(IngestError::EventsNotArray));
        assert_eq!(parse_event_batch(&json!({"events": []}), now()), Err(IngestError::EmptyBatch));
    }

    #[test]
    fn test_item_errors_name_the_index() {
        let cases = [
            (json!({"events": [{"name": "ok"}, 5]}), IngestError::EventNotObject(1)),
            (json!({"events": [{"value": 1}]}), IngestError::MissingName(0)),
            (json!({"events": [{"name": ""}]}), IngestError::MissingName(0)),
            (json!({"events": [{"name": "a", "value": "1"}]}), IngestError::InvalidValue(0)),
            (json!({"events": [{"name": "a", "tag": 7}]}), IngestError::InvalidTag(0)),
            (json!({"events": [{"name": "a", "additional_info": []}]}), IngestError::InvalidAdditionalInfo(0)),
            (json!({"events": [{"name": "a", "timestamp": "yesterday"}]}), IngestError::InvalidTimestamp(0)),
        ];
        for (body, expected) in cases {
            assert_eq!(parse_event_batch(&body, now()), Err(expected));
        }
    }

    #[test]
    fn test_error_message_matches_api_wording() {
        assert_eq!(
            IngestError::MissingName(2).to_string(),
            "Event at index 2 missing required 'name' field (string)"
        );
    }
}
