//! Time-axis builder
//!
//! Generates the canonical bucket boundaries for a window and places raw
//! values onto them. Collisions blend by equal-weight running average, which is
//! order dependent. Use [`super::bucketing`] when a combine function is wanted.

use super::interval::TimeInterval;
use crate::event::{days_before, Event};
use chrono::{DateTime, TimeZone, Utc};

/// Upper bound on generated boundaries; longer windows keep the newest buckets
pub const MAX_AXIS_BUCKETS: i32 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeBucket {
    pub boundary: DateTime<Utc>,
    pub value: Option<f64>,
}

/// Bucket boundaries from the window start up to `now`
///
/// The window starts `max_age_days` before `now`, or at the oldest of
/// `fallback_events` when no age is given. The start is floored with the
/// interval's calendar rule, then stepped by its fixed width while the
/// boundary does not exceed `now`. The final bucket may be partial.
///
/// Returns an empty axis when the interval is disabled or no start exists.
/// Windows wider than [`MAX_AXIS_BUCKETS`] steps start that many steps before `now`.
pub fn build_axis<Tz: TimeZone>(
    max_age_days: Option<f64>,
    interval: TimeInterval,
    fallback_events: &[Event],
    now: DateTime<Utc>,
    tz: &Tz,
) -> Vec<DateTime<Utc>> {
    let Some(step) = interval.step() else {
        return Vec::new();
    };

    let start = match max_age_days {
        Some(days) if days.is_finite() && days >= 0.0 => days_before(now, days),
        _ => match fallback_events.iter().map(|e| e.timestamp).min() {
            Some(oldest) => oldest,
            None => return Vec::new(),
        },
    };
    let start = match step
        .checked_mul(MAX_AXIS_BUCKETS - 1)
        .and_then(|widest| now.checked_sub_signed(widest))
    {
        Some(earliest) if start < earliest => earliest,
        _ => start,
    };

    let mut axis = Vec::new();
    let mut boundary = interval.floor(start, tz);
    while boundary <= now {
        axis.push(boundary);
        boundary += step;
    }
    axis
}

/// Place each value in the bucket with `axis[i] <= t < axis[i+1]`
///
/// The last bucket is unbounded above. Values older than the first boundary
/// are dropped. A second value landing in an occupied bucket is blended as
/// `(existing + new) / 2`.
pub fn assign_to_axis(values: &[Event], axis: &[DateTime<Utc>]) -> Vec<TimeBucket> {
    let mut buckets: Vec<TimeBucket> = axis
        .iter()
        .map(|&boundary| TimeBucket { boundary, value: None })
        .collect();

    for event in values {
        let idx = axis.partition_point(|b| *b <= event.timestamp);
        if idx == 0 {
            continue;
        }
        let slot = &mut buckets[idx - 1].value;
        *slot = Some(match *slot {
            Some(existing) => (existing + event.value) / 2.0,
            None => event.value,
        });
    }
    buckets
}
