//! DataSourceCache: named snapshots of fetched event sequences
//!
//! Each registered data source owns one slot. A fetch completion replaces the
//! slot's snapshot by assignment of a fresh `Arc<Vec<Event>>`; readers clone
//! the `Arc` once and keep a consistent sequence for the whole tick.
//!
//! Re-registering an id starts a new fetch while the previous snapshot stays
//! readable. Completions write the slot as they resolve, so a slow source still
//! lands every result; a completion older than the last applied one is dropped.
//! Periodic refresh skips ids that still have a fetch in flight.
//!
//! Fetch failures never propagate: they are logged, counted in the slot's
//! [`FetchStats`], and leave the slot without a snapshot if it never had one.

use super::{EventQuery, EventSource};
use crate::event::Event;
use crate::view::DataSourceSpec;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    /// Registered, first fetch not complete
    Pending,
    Loaded,
    /// Last fetch failed
    Failed,
}

/// Request counters and response times for one data source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchStats {
    pub total_requests: u64,
    pub total_errors: u64,
    pub total_successes: u64,
    pub average_response_time_ms: f64,
    pub max_response_time_ms: f64,
}

impl FetchStats {
    fn record_success(&mut self, elapsed_ms: f64) {
        self.total_successes += 1;
        let n = self.total_successes as f64;
        self.average_response_time_ms = (self.average_response_time_ms * (n - 1.0) + elapsed_ms) / n;
        if elapsed_ms > self.max_response_time_ms {
            self.max_response_time_ms = elapsed_ms;
        }
    }
}

#[derive(Debug, Clone)]
pub struct CachedSource {
    pub spec: DataSourceSpec,
    /// `None` until the first successful fetch
    pub events: Option<Arc<Vec<Event>>>,
    /// Bumped on every snapshot assignment
    pub version: u64,
    pub status: SourceStatus,
    pub stats: FetchStats,
    /// Fetches started but not yet completed
    pub in_flight: u32,
    fetch_seq: u64,
    applied_seq: u64,
}

/// What the scheduler reads for one resolved dependency
#[derive(Debug, Clone)]
pub struct SourceSnapshot {
    pub events: Arc<Vec<Event>>,
    pub version: u64,
    pub max_age_days: Option<f64>,
}

#[derive(Clone)]
pub struct DataSourceCache {
    source: Arc<dyn EventSource>,
    entries: Arc<RwLock<HashMap<String, CachedSource>>>,
}

impl DataSourceCache {
    pub fn new(source: Arc<dyn EventSource>) -> Self {
        Self {
            source,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register (or re-register) a data source and start its fetch
    ///
    /// Must be called inside a tokio runtime. The returned handle completes
    /// once the fetch result has been applied or discarded.
    pub fn register(&self, spec: DataSourceSpec) -> JoinHandle<()> {
        let id = spec.id.clone();
        let query = EventQuery::from(&spec);

        let seq = {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            let entry = entries.entry(id.clone()).or_insert_with(|| CachedSource {
                spec: spec.clone(),
                events: None,
                version: 0,
                status: SourceStatus::Pending,
                stats: FetchStats::default(),
                in_flight: 0,
                fetch_seq: 0,
                applied_seq: 0,
            });
            entry.spec = spec;
            entry.in_flight += 1;
            entry.fetch_seq += 1;
            entry.stats.total_requests += 1;
            entry.fetch_seq
        };

        log::debug!("📥 Fetching data source '{}' ({})", id, query.event_name);

        let cache = self.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let result = cache.source.fetch(&query).await;
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

            let mut entries = cache.entries.write().unwrap_or_else(|e| e.into_inner());
            let Some(entry) = entries.get_mut(&id) else {
                return;
            };
            entry.in_flight = entry.in_flight.saturating_sub(1);
            if seq < entry.applied_seq {
                log::debug!("Discarding stale fetch for data source '{}'", id);
                return;
            }
            entry.applied_seq = seq;

            match result {
                Ok(events) => {
                    log::debug!("✅ Data source '{}' loaded {} events", id, events.len());
                    entry.events = Some(Arc::new(events));
                    entry.version += 1;
                    entry.status = SourceStatus::Loaded;
                    entry.stats.record_success(elapsed_ms);
                }
                Err(e) => {
                    log::error!("❌ Failed to fetch data source '{}': {}", id, e);
                    entry.status = SourceStatus::Failed;
                    entry.stats.total_errors += 1;
                }
            }
        })
    }

    /// Re-register every known data source that has no fetch in flight
    pub fn refresh_all(&self) -> Vec<JoinHandle<()>> {
        let specs: Vec<DataSourceSpec> = {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            entries
                .iter()
                .filter(|(id, entry)| {
                    if entry.in_flight > 0 {
                        log::debug!("Skipping refresh of '{}': fetch still in flight", id);
                    }
                    entry.in_flight == 0
                })
                .map(|(_, entry)| entry.spec.clone())
                .collect()
        };
        specs.into_iter().map(|spec| self.register(spec)).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.contains_key(id)
    }

    /// Current loaded snapshot, `None` while unresolved or unknown
    pub fn snapshot(&self, id: &str) -> Option<SourceSnapshot> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(id)?;
        Some(SourceSnapshot {
            events: entry.events.clone()?,
            version: entry.version,
            max_age_days: entry.spec.max_age_days,
        })
    }

    pub fn version(&self, id: &str) -> Option<u64> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(id).map(|entry| entry.version)
    }

    pub fn status(&self, id: &str) -> Option<SourceStatus> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(id).map(|entry| entry.status)
    }

    pub fn stats(&self, id: &str) -> Option<FetchStats> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(id).map(|entry| entry.stats.clone())
    }

    /// Copy of every slot, sorted by id
    pub fn entries(&self) -> Vec<(String, CachedSource)> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut all: Vec<(String, CachedSource)> = entries
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}
