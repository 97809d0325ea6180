//! Widget update scheduler
//!
//! Owns the registered widgets and their per-widget state. Each tick scans
//! widgets in registration order; only dirty widgets whose dependencies are
//! all loaded in the [`DataSourceCache`] are recomputed:
//!
//! 1. tag filter per dependency
//! 2. time-interval bucketing, when the widget has an enabled time aggregation
//! 3. `additional_info` filter
//! 4. mutator pipeline, over bucket values when bucketing ran
//! 5. `Widget::update`, then `Widget::post_update`
//!
//! A widget becomes dirty on registration, when a dependency receives a new
//! snapshot, or when one of its user-facing controls changes. A widget with a
//! dependency that never loads stays dirty (shown as loading) indefinitely.
//!
//! Bucket events carry no `additional_info`, so combining bucketing with an
//! `additional_info` filter yields an empty series.

use crate::aggregate::bucketing::time_interval_aggregate;
use crate::aggregate::interval::{TimeAggregation, TimeInterval};
use crate::aggregate::mutators::mutate;
use crate::error::ConfigError;
use crate::event::Event;
use crate::source::{DataSourceCache, SourceSnapshot};
use crate::view::DataSourceReference;
use crate::widgets::{DashboardWidget, RenderModel, SeriesData, UpdateContext, Widget, WidgetHandle};
use chrono::{DateTime, Local, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Resolving and updating happen inside one synchronous tick, so only these
/// two states are ever observable between ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetState {
    Clean,
    /// Needs recompute; waiting for every dependency to load
    Dirty,
}

struct WidgetEntry {
    widget: DashboardWidget,
    state: WidgetState,
    /// Cache version of each dependency at the last update
    seen_versions: Vec<Option<u64>>,
}

/// Result of one scheduler tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub updated: Vec<String>,
    /// Dirty widgets still waiting for a dependency
    pub waiting: Vec<String>,
}

/// Everything the rendering layer needs for one widget
#[derive(Debug, Clone)]
pub struct WidgetView {
    pub handle: WidgetHandle,
    pub state: WidgetState,
    pub model: Option<RenderModel>,
}

pub struct WidgetScheduler {
    cache: DataSourceCache,
    widgets: Vec<WidgetEntry>,
    index: HashMap<String, usize>,
    page_interval: TimeInterval,
    now_fn: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl WidgetScheduler {
    pub fn new(cache: DataSourceCache) -> Self {
        Self::with_clock(cache, Box::new(Utc::now))
    }

    /// Construct with an injected clock (tests)
    pub fn with_clock(
        cache: DataSourceCache,
        now_fn: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>,
    ) -> Self {
        Self {
            cache,
            widgets: Vec::new(),
            index: HashMap::new(),
            page_interval: TimeInterval::Disabled,
            now_fn,
        }
    }

    /// Register a widget; it starts dirty
    ///
    /// Every dependency must already be registered in the cache.
    pub fn register(&mut self, widget: DashboardWidget) -> Result<(), ConfigError> {
        let id = widget.id().to_string();
        if self.index.contains_key(&id) {
            return Err(ConfigError::DuplicateWidget(id));
        }
        for dep in widget.dependencies() {
            if !self.cache.contains(&dep.data_source_id) {
                return Err(ConfigError::UnknownDataSource {
                    widget: id,
                    source_id: dep.data_source_id.clone(),
                });
            }
        }

        let seen_versions = vec![None; widget.dependencies().len()];
        self.index.insert(id, self.widgets.len());
        self.widgets.push(WidgetEntry {
            widget,
            state: WidgetState::Dirty,
            seen_versions,
        });
        Ok(())
    }

    fn entry_mut(&mut self, id: &str) -> Result<&mut WidgetEntry, ConfigError> {
        let idx = *self
            .index
            .get(id)
            .ok_or_else(|| ConfigError::UnknownWidget(id.to_string()))?;
        Ok(&mut self.widgets[idx])
    }

    pub fn mark_dirty(&mut self, id: &str) -> Result<(), ConfigError> {
        self.entry_mut(id)?.state = WidgetState::Dirty;
        Ok(())
    }

    pub fn time_aggregation_settings(&self, id: &str) -> Result<Option<TimeAggregation>, ConfigError> {
        let idx = *self
            .index
            .get(id)
            .ok_or_else(|| ConfigError::UnknownWidget(id.to_string()))?;
        Ok(self.widgets[idx].widget.time_aggregation())
    }

    /// Change one widget's time aggregation; marks it dirty
    pub fn set_time_aggregation(&mut self, id: &str, setting: TimeAggregation) -> Result<(), ConfigError> {
        let entry = self.entry_mut(id)?;
        entry.widget.set_time_aggregation(setting);
        entry.state = WidgetState::Dirty;
        Ok(())
    }

    pub fn page_interval(&self) -> TimeInterval {
        self.page_interval
    }

    /// Page-level interval selector
    ///
    /// Applies to every widget that aggregates by time and marks those widgets
    /// dirty. Returns how many widgets were affected.
    pub fn set_interval(&mut self, interval: TimeInterval) -> usize {
        self.page_interval = interval;
        let mut affected = 0;
        for entry in &mut self.widgets {
            if let Some(mut setting) = entry.widget.time_aggregation() {
                setting.interval = interval;
                entry.widget.set_time_aggregation(setting);
                entry.state = WidgetState::Dirty;
                affected += 1;
            }
        }
        log::info!("⏱️  Time interval set to '{}' ({} widgets)", interval.as_str(), affected);
        affected
    }

    pub fn state(&self, id: &str) -> Option<WidgetState> {
        self.index.get(id).map(|&idx| self.widgets[idx].state)
    }

    pub fn widget_ids(&self) -> Vec<String> {
        self.widgets.iter().map(|e| e.widget.id().to_string()).collect()
    }

    /// Render snapshot of every widget, in registration order
    pub fn views(&self) -> Vec<WidgetView> {
        self.widgets
            .iter()
            .map(|entry| WidgetView {
                handle: entry.widget.handle(),
                state: entry.state,
                model: entry.widget.render_instance(),
            })
            .collect()
    }

    /// One scheduling pass over all widgets
    pub fn tick(&mut self) -> TickReport {
        let now = (self.now_fn)();
        let mut report = TickReport::default();

        for entry in &mut self.widgets {
            let versions: Vec<Option<u64>> = entry
                .widget
                .dependencies()
                .iter()
                .map(|dep| self.cache.version(&dep.data_source_id))
                .collect();
            if entry.state == WidgetState::Clean && versions != entry.seen_versions {
                entry.state = WidgetState::Dirty;
            }
            if entry.state == WidgetState::Clean {
                continue;
            }

            let snapshots: Option<Vec<SourceSnapshot>> = entry
                .widget
                .dependencies()
                .iter()
                .map(|dep| self.cache.snapshot(&dep.data_source_id))
                .collect();
            let Some(snapshots) = snapshots else {
                report.waiting.push(entry.widget.id().to_string());
                continue;
            };

            let time_aggregation = entry.widget.time_aggregation();
            let series: Vec<SeriesData> = entry
                .widget
                .dependencies()
                .iter()
                .zip(&snapshots)
                .map(|(dep, snapshot)| prepare_series(dep, snapshot, time_aggregation))
                .collect();

            let ctx = UpdateContext { now, time_aggregation };
            entry.widget.update(&series, &ctx);
            entry.widget.post_update(&series);

            entry.seen_versions = snapshots.iter().map(|s| Some(s.version)).collect();
            report.updated.push(entry.widget.id().to_string());
            entry.state = WidgetState::Clean;
        }

        if !report.updated.is_empty() {
            log::debug!("Scheduler tick updated {} widgets: {:?}", report.updated.len(), report.updated);
        }
        report
    }
}

fn in_set(value: Option<&str>, set: &BTreeSet<String>) -> bool {
    value.map(|v| set.contains(v)).unwrap_or(false)
}

/// Filter, bucket and mutate one dependency's snapshot
fn prepare_series(
    dep: &DataSourceReference,
    snapshot: &SourceSnapshot,
    time_aggregation: Option<TimeAggregation>,
) -> SeriesData {
    let mut events: Vec<Event> = match &dep.tags {
        Some(tags) => snapshot
            .events
            .iter()
            .filter(|e| in_set(e.tag.as_deref(), tags))
            .cloned()
            .collect(),
        None => snapshot.events.as_ref().clone(),
    };

    if let Some(setting) = time_aggregation.filter(|t| t.interval.is_enabled()) {
        events = time_interval_aggregate(&events, setting.interval, None, setting.function, &Local);
    }

    if let Some(filter) = &dep.additional_info_filter {
        events.retain(|e| in_set(e.additional_info.as_deref(), filter));
    }

    if !dep.mutators.is_empty() {
        events = mutate(&events, &dep.mutators);
    }

    SeriesData {
        source_id: dep.data_source_id.clone(),
        label: dep.label(),
        events,
        max_age_days: snapshot.max_age_days,
    }
}

/// Scheduler task - tick every `tick_ms` milliseconds
///
/// Ticks never overlap: each one completes under the lock before the next
/// starts. Runs until cancelled.
pub async fn scheduler_task(scheduler: Arc<Mutex<WidgetScheduler>>, tick_ms: u64) {
    log::info!("⏰ Starting widget scheduler (tick: {}ms)", tick_ms);

    let mut timer = interval(Duration::from_millis(tick_ms.max(1)));
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        timer.tick().await;
        {
            let mut guard = scheduler.lock().unwrap_or_else(|e| e.into_inner());
            guard.tick();
        }
    }
}

/// Refresh task - re-fetch every data source every `refresh_secs` seconds
///
/// Widgets pick up the new snapshots on their next tick. Runs until cancelled.
pub async fn refresh_task(cache: DataSourceCache, refresh_secs: u64) {
    log::info!("🔄 Starting data refresh (interval: {}s)", refresh_secs);

    let mut timer = interval(Duration::from_secs(refresh_secs.max(1)));
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer.tick().await;

    loop {
        timer.tick().await;
        let handles = cache.refresh_all();
        log::debug!("Refreshing {} data sources", handles.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::interval::BucketFunction;
    use crate::aggregate::mutators::Mutator;
    use chrono::TimeZone;

    fn ts(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 1, h, m, 0).unwrap()
    }

    fn snapshot(events: Vec<Event>) -> SourceSnapshot {
        SourceSnapshot {
            events: Arc::new(events),
            version: 1,
            max_age_days: None,
        }
    }

    #[test]
    fn test_prepare_series_filters_then_mutates() {
        let snap = snapshot(vec![
            Event::new("logs", 1.4, ts(1, 0)).with_tag("ERROR").with_additional_info("db"),
            Event::new("logs", 2.6, ts(1, 1)).with_tag("INFO").with_additional_info("db"),
            Event::new("logs", 3.2, ts(1, 2)).with_tag("ERROR").with_additional_info("cache"),
        ]);
        let dep = DataSourceReference {
            data_source_id: "logs".into(),
            tags: Some(BTreeSet::from(["ERROR".to_string()])),
            mutators: vec![Mutator::Multiply(10.0), Mutator::Round],
            additional_info_filter: Some(BTreeSet::from(["db".to_string()])),
        };

        let series = prepare_series(&dep, &snap, None);
        assert_eq!(series.events.len(), 1);
        assert_eq!(series.events[0].value, 14.0);
        assert_eq!(series.label, "logs [ERROR]");
        // Snapshot untouched
        assert_eq!(snap.events[0].value, 1.4);
    }

    #[test]
    fn test_mutators_apply_to_bucketed_values() {
        let snap = snapshot(vec![
            Event::new("req", 1.0, ts(1, 0)),
            Event::new("req", 2.0, ts(1, 1)),
            Event::new("req", 3.0, ts(1, 2)),
        ]);
        let mut dep = DataSourceReference::new("req");
        dep.mutators = vec![Mutator::Add(1.0)];
        let setting = TimeAggregation {
            interval: TimeInterval::Day,
            function: BucketFunction::Count,
        };

        // Bucket count of 3, then add 1 to the bucket value
        let series = prepare_series(&dep, &snap, Some(setting));
        assert_eq!(series.events.len(), 1);
        assert_eq!(series.events[0].value, 4.0);
    }

    #[test]
    fn test_tag_filter_keeps_only_matching_events() {
        let snap = snapshot(vec![
            Event::new("logs", 1.0, ts(1, 0)).with_tag("ERROR"),
            Event::new("logs", 2.0, ts(1, 1)).with_tag("INFO"),
            Event::new("logs", 3.0, ts(1, 2)).with_tag("ERROR"),
        ]);
        let mut dep = DataSourceReference::new("logs");
        dep.tags = Some(BTreeSet::from(["ERROR".to_string()]));

        let series = prepare_series(&dep, &snap, None);
        assert_eq!(series.events.len(), 2);
        assert!(series.events.iter().all(|e| e.tag.as_deref() == Some("ERROR")));
        assert_eq!(series.events[1].value, 3.0);
    }

    #[test]
    fn test_additional_info_filter_after_bucketing_empties_series() {
        let snap = snapshot(vec![Event::new("req", 1.0, ts(1, 0)).with_additional_info("db")]);
        let mut dep = DataSourceReference::new("req");
        dep.additional_info_filter = Some(BTreeSet::from(["db".to_string()]));
        let setting = TimeAggregation {
            interval: TimeInterval::Hour,
            function: BucketFunction::Sum,
        };

        assert!(prepare_series(&dep, &snap, Some(setting)).events.is_empty());
        assert_eq!(prepare_series(&dep, &snap, None).events.len(), 1);
    }
}
