//! Scalar reductions of an event sequence to a single value

use crate::error::ConfigError;
use crate::event::Event;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarAggregation {
    Last,
    First,
    /// Mean to 4 decimal places
    Average,
    /// Mean rounded to an integer
    AverageRound,
    Sum,
    Max,
    Min,
    Count,
    FirstDatetime,
    LastDatetime,
    DiffLastFirst,
    DiffMaxMin,
}

impl ScalarAggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarAggregation::Last => "last",
            ScalarAggregation::First => "first",
            ScalarAggregation::Average => "average",
            ScalarAggregation::AverageRound => "average_round",
            ScalarAggregation::Sum => "sum",
            ScalarAggregation::Max => "max",
            ScalarAggregation::Min => "min",
            ScalarAggregation::Count => "count",
            ScalarAggregation::FirstDatetime => "first_datetime",
            ScalarAggregation::LastDatetime => "last_datetime",
            ScalarAggregation::DiffLastFirst => "diff_last_first",
            ScalarAggregation::DiffMaxMin => "diff_max_min",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        Ok(match s {
            "last" => ScalarAggregation::Last,
            "first" => ScalarAggregation::First,
            "average" => ScalarAggregation::Average,
            "average_round" => ScalarAggregation::AverageRound,
            "sum" => ScalarAggregation::Sum,
            "max" => ScalarAggregation::Max,
            "min" => ScalarAggregation::Min,
            "count" => ScalarAggregation::Count,
            "first_datetime" => ScalarAggregation::FirstDatetime,
            "last_datetime" => ScalarAggregation::LastDatetime,
            "diff_last_first" => ScalarAggregation::DiffLastFirst,
            "diff_max_min" => ScalarAggregation::DiffMaxMin,
            other => return Err(ConfigError::UnknownAggregation(other.to_string())),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregateValue {
    Number(f64),
    Timestamp(DateTime<Utc>),
}

impl AggregateValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AggregateValue::Number(n) => Some(*n),
            AggregateValue::Timestamp(_) => None,
        }
    }
}

pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn max_value(events: &[Event]) -> f64 {
    events.iter().map(|e| e.value).fold(f64::NEG_INFINITY, f64::max)
}

fn min_value(events: &[Event]) -> f64 {
    events.iter().map(|e| e.value).fold(f64::INFINITY, f64::min)
}

/// Reduce `events` with `kind`
///
/// Returns `None` for an empty sequence; callers render that as "no data".
pub fn aggregate_value(events: &[Event], kind: ScalarAggregation) -> Option<AggregateValue> {
    let first = events.first()?;
    let last = events.last()?;
    let sum: f64 = events.iter().map(|e| e.value).sum();
    let mean = sum / events.len() as f64;

    let value = match kind {
        ScalarAggregation::Last => AggregateValue::Number(last.value),
        ScalarAggregation::First => AggregateValue::Number(first.value),
        ScalarAggregation::Average => AggregateValue::Number(round4(mean)),
        ScalarAggregation::AverageRound => AggregateValue::Number(mean.round()),
        ScalarAggregation::Sum => AggregateValue::Number(sum),
        ScalarAggregation::Max => AggregateValue::Number(max_value(events)),
        ScalarAggregation::Min => AggregateValue::Number(min_value(events)),
        ScalarAggregation::Count => AggregateValue::Number(events.len() as f64),
        ScalarAggregation::FirstDatetime => AggregateValue::Timestamp(first.timestamp),
        ScalarAggregation::LastDatetime => AggregateValue::Timestamp(last.timestamp),
        ScalarAggregation::DiffLastFirst => AggregateValue::Number(last.value - first.value),
        ScalarAggregation::DiffMaxMin => {
            AggregateValue::Number(max_value(events) - min_value(events))
        }
    };
    Some(value)
}

/// Same as [`aggregate_value`] with the kind given by name
pub fn aggregate_value_by_name(
    events: &[Event],
    kind: &str,
) -> Result<Option<AggregateValue>, ConfigError> {
    let kind = ScalarAggregation::parse(kind)?;
    Ok(aggregate_value(events, kind))
}
