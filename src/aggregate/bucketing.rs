//! Time-interval bucketing
//!
//! Regularises an irregular event sequence onto calendar-aligned buckets,
//! combining values that share a bucket with a [`BucketFunction`].
//!
//! Raw alignment onto a pre-built axis (equal-weight blending on collision)
//! lives in [`super::axis`].

use super::interval::{BucketFunction, TimeInterval};
use super::scalar::round4;
use crate::event::Event;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy)]
struct BucketAccumulator {
    acc: f64,
    count: usize,
}

impl BucketAccumulator {
    fn new(function: BucketFunction, value: f64) -> Self {
        let acc = match function {
            BucketFunction::Count => 0.0,
            _ => value,
        };
        Self { acc, count: 1 }
    }

    fn push(&mut self, function: BucketFunction, value: f64) {
        self.count += 1;
        match function {
            BucketFunction::Sum | BucketFunction::Average | BucketFunction::AverageRound => {
                self.acc += value
            }
            BucketFunction::Max => self.acc = self.acc.max(value),
            BucketFunction::Min => self.acc = self.acc.min(value),
            BucketFunction::Count => {}
        }
    }

    fn finish(&self, function: BucketFunction) -> f64 {
        match function {
            BucketFunction::Average => round4(self.acc / self.count as f64),
            BucketFunction::AverageRound => (self.acc / self.count as f64).round(),
            BucketFunction::Count => self.count as f64,
            BucketFunction::Sum | BucketFunction::Max | BucketFunction::Min => self.acc,
        }
    }
}

/// Bucket `events` by `interval`, combining with `function`
///
/// - `Disabled` or empty input returns the input unchanged.
/// - Events whose tag is not in a non-empty `tag_filter` are dropped first.
/// - Output is ascending by bucket start; every bucket takes the `name` of the
///   first input event and carries no tag or additional info.
pub fn time_interval_aggregate<Tz: TimeZone>(
    events: &[Event],
    interval: TimeInterval,
    tag_filter: Option<&BTreeSet<String>>,
    function: BucketFunction,
    tz: &Tz,
) -> Vec<Event> {
    let Some(first) = events.first() else {
        return Vec::new();
    };
    if !interval.is_enabled() {
        return events.to_vec();
    }

    let tag_filter = tag_filter.filter(|tags| !tags.is_empty());
    let mut buckets: BTreeMap<DateTime<Utc>, BucketAccumulator> = BTreeMap::new();

    for event in events {
        if let Some(tags) = tag_filter {
            match &event.tag {
                Some(tag) if tags.contains(tag) => {}
                _ => continue,
            }
        }

        let boundary = interval.floor(event.timestamp, tz);
        buckets
            .entry(boundary)
            .and_modify(|bucket| bucket.push(function, event.value))
            .or_insert_with(|| BucketAccumulator::new(function, event.value));
    }

    buckets
        .into_iter()
        .map(|(boundary, bucket)| Event::new(first.name.clone(), bucket.finish(function), boundary))
        .collect()
}
