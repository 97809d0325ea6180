//! View configuration
//!
//! A view file holds one or more views plus retention rules:
//!
//! ```json
//! {
//!   "views": [{
//!     "id": "system",
//!     "title": "System",
//!     "time_aggregation": {"interval": "hour", "function": "average"},
//!     "data": [{"id": "cpu", "event": "cpu_usage", "max_age_days": 1}],
//!     "widgets": [{"id": "cpu_chart", "type": "line_chart", "data_sources": ["cpu"]}]
//!   }],
//!   "retention": [{"event_name": "cpu_usage", "max_age_days": 7}]
//! }
//! ```
//!
//! Widget data-source references accept a bare id or an object with filters;
//! both normalise to [`DataSourceReference`].

use crate::aggregate::interval::TimeAggregation;
use crate::aggregate::mutators::{parse_mutators, Mutator, MutatorSpec};
use crate::error::ConfigError;
use crate::store::RetentionRule;
use crate::widgets::table::RowRule;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewFile {
    #[serde(default)]
    pub views: Vec<ViewConfig>,
    #[serde(default)]
    pub retention: Vec<RetentionRule>,
}

impl ViewFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// The view with `id`, or the first view when `id` is `None`
    pub fn view(&self, id: Option<&str>) -> Result<&ViewConfig, ConfigError> {
        match id {
            Some(id) => self
                .views
                .iter()
                .find(|v| v.id == id)
                .ok_or_else(|| ConfigError::UnknownView(id.to_string())),
            None => self
                .views
                .first()
                .ok_or_else(|| ConfigError::UnknownView("<none>".to_string())),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewConfig {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Page-level default applied to widgets that aggregate by time
    #[serde(default)]
    pub time_aggregation: TimeAggregation,
    #[serde(default)]
    pub data: Vec<DataSourceSpec>,
    #[serde(default)]
    pub widgets: Vec<WidgetDecl>,
}

impl ViewConfig {
    /// Check data-source declarations and widget references
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut source_ids = HashSet::new();
        for spec in &self.data {
            spec.validate()?;
            if !source_ids.insert(spec.id.as_str()) {
                return Err(ConfigError::DuplicateDataSource(spec.id.clone()));
            }
        }

        let mut widget_ids = HashSet::new();
        for widget in &self.widgets {
            if !widget_ids.insert(widget.id.as_str()) {
                return Err(ConfigError::DuplicateWidget(widget.id.clone()));
            }
            for decl in &widget.data_sources {
                if !source_ids.contains(decl.id()) {
                    return Err(ConfigError::UnknownDataSource {
                        widget: widget.id.clone(),
                        source_id: decl.id().to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// What subset of the event store a named data source represents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceSpec {
    pub id: String,
    #[serde(rename = "event")]
    pub event_name: String,
    #[serde(default)]
    pub tags: Option<BTreeSet<String>>,
    #[serde(default)]
    pub max_age_days: Option<f64>,
    #[serde(default)]
    pub max_results: Option<u32>,
    #[serde(default)]
    pub last_unique_by_tag: bool,
}

impl DataSourceSpec {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::MalformedDataSource(format!(
                "empty id for event '{}'",
                self.event_name
            )));
        }
        if self.event_name.trim().is_empty() {
            return Err(ConfigError::MalformedDataSource(format!(
                "data source '{}' has no event name",
                self.id
            )));
        }
        if let Some(days) = self.max_age_days {
            if !days.is_finite() || days < 0.0 {
                return Err(ConfigError::MalformedDataSource(format!(
                    "data source '{}' has invalid max_age_days {}",
                    self.id, days
                )));
            }
        }
        Ok(())
    }
}

/// A widget's data-source reference as written: bare id or object with filters
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DataSourceDecl {
    Id(String),
    Filtered {
        id: String,
        #[serde(default)]
        tags: Option<BTreeSet<String>>,
        #[serde(default)]
        mutators: Vec<MutatorSpec>,
        #[serde(default)]
        additional_info_filter: Option<BTreeSet<String>>,
    },
}

impl DataSourceDecl {
    pub fn id(&self) -> &str {
        match self {
            DataSourceDecl::Id(id) => id,
            DataSourceDecl::Filtered { id, .. } => id,
        }
    }

    /// Resolve into the canonical shape, parsing mutators
    pub fn normalize(&self) -> Result<DataSourceReference, ConfigError> {
        match self {
            DataSourceDecl::Id(id) => Ok(DataSourceReference::new(id.clone())),
            DataSourceDecl::Filtered {
                id,
                tags,
                mutators,
                additional_info_filter,
            } => Ok(DataSourceReference {
                data_source_id: id.clone(),
                tags: tags.clone().filter(|t| !t.is_empty()),
                mutators: parse_mutators(mutators)?,
                additional_info_filter: additional_info_filter.clone().filter(|f| !f.is_empty()),
            }),
        }
    }
}

/// Widget-local view of one data source
#[derive(Debug, Clone, PartialEq)]
pub struct DataSourceReference {
    pub data_source_id: String,
    pub tags: Option<BTreeSet<String>>,
    pub mutators: Vec<Mutator>,
    pub additional_info_filter: Option<BTreeSet<String>>,
}

impl DataSourceReference {
    pub fn new(data_source_id: impl Into<String>) -> Self {
        Self {
            data_source_id: data_source_id.into(),
            tags: None,
            mutators: Vec::new(),
            additional_info_filter: None,
        }
    }

    /// Series label: the source id, with the tag filter when present
    pub fn label(&self) -> String {
        match &self.tags {
            Some(tags) => format!(
                "{} [{}]",
                self.data_source_id,
                tags.iter().cloned().collect::<Vec<_>>().join(", ")
            ),
            None => self.data_source_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WidgetDecl {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub data_sources: Vec<DataSourceDecl>,
    /// Present when the widget buckets its data by time
    #[serde(default)]
    pub time_aggregation: Option<TimeAggregation>,
    #[serde(flatten)]
    pub kind: WidgetKindDecl,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WidgetKindDecl {
    LineChart {},
    BarChart {
        #[serde(default)]
        aggregation: Option<String>,
    },
    Table {
        #[serde(default)]
        max_rows: Option<usize>,
        #[serde(default)]
        row_rules: Vec<RowRule>,
    },
    Gauge {
        #[serde(default)]
        aggregation: Option<String>,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    Metric {
        #[serde(default)]
        aggregation: Option<String>,
        #[serde(default)]
        unit: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::interval::{BucketFunction, TimeInterval};

    const VIEW: &str = r#"{
        "views": [{
            "id": "system",
            "title": "System",
            "time_aggregation": {"interval": "hour", "function": "average"},
            "data": [
                {"id": "cpu", "event": "cpu_usage", "max_age_days": 1},
                {"id": "logs", "event": "log_lines", "tags": ["ERROR", "WARN"], "max_results": 100}
            ],
            "widgets": [
                {"id": "cpu_chart", "type": "line_chart", "data_sources": ["cpu"],
                 "time_aggregation": {"interval": "10m", "function": "max"}},
                {"id": "errors", "type": "table", "max_rows": 20,
                 "data_sources": [{"id": "logs", "tags": ["ERROR"], "mutators": [{"op": "round"}]}],
                 "row_rules": [{"field": "tag", "condition": "equals", "value": "ERROR", "color": "red"}]},
                {"id": "cpu_now", "type": "gauge", "data_sources": ["cpu"], "min": 0, "max": 100}
            ]
        }],
        "retention": [{"event_name": "cpu_usage", "max_age_days": 7}]
    }"#;

    #[test]
    fn test_parse_view_file() {
        let file = ViewFile::from_json(VIEW).unwrap();
        let view = file.view(None).unwrap();
        view.validate().unwrap();

        assert_eq!(view.id, "system");
        assert_eq!(view.time_aggregation.interval, TimeInterval::Hour);
        assert_eq!(view.data[1].event_name, "log_lines");
        assert_eq!(view.widgets.len(), 3);
        assert!(matches!(view.widgets[0].kind, WidgetKindDecl::LineChart {}));
        assert_eq!(
            view.widgets[0].time_aggregation.map(|t| t.function),
            Some(BucketFunction::Max)
        );
        assert_eq!(file.retention.len(), 1);
    }

    #[test]
    fn test_both_reference_shapes_normalize() {
        let file = ViewFile::from_json(VIEW).unwrap();
        let view = file.view(Some("system")).unwrap();

        let bare = view.widgets[0].data_sources[0].normalize().unwrap();
        assert_eq!(bare, DataSourceReference::new("cpu"));

        let filtered = view.widgets[1].data_sources[0].normalize().unwrap();
        assert_eq!(filtered.data_source_id, "logs");
        assert_eq!(filtered.tags, Some(BTreeSet::from(["ERROR".to_string()])));
        assert_eq!(filtered.mutators, vec![Mutator::Round]);
        assert_eq!(filtered.label(), "logs [ERROR]");
    }

    #[test]
    fn test_unknown_mutator_fails_normalization() {
        let decl: DataSourceDecl =
            serde_json::from_str(r#"{"id": "cpu", "mutators": [{"op": "log10"}]}"#).unwrap();
        assert!(matches!(decl.normalize(), Err(ConfigError::UnsupportedMutator(_))));
    }

    #[test]
    fn test_validate_rejects_bad_declarations() {
        let dup = r#"{"views": [{"id": "v", "data": [
            {"id": "a", "event": "x"}, {"id": "a", "event": "y"}]}]}"#;
        let file = ViewFile::from_json(dup).unwrap();
        assert!(matches!(
            file.view(None).unwrap().validate(),
            Err(ConfigError::DuplicateDataSource(id)) if id == "a"
        ));

        let unknown = r#"{"views": [{"id": "v", "data": [{"id": "a", "event": "x"}],
            "widgets": [{"id": "w", "type": "metric", "data_sources": ["b"]}]}]}"#;
        let file = ViewFile::from_json(unknown).unwrap();
        assert!(matches!(
            file.view(None).unwrap().validate(),
            Err(ConfigError::UnknownDataSource { source_id, .. }) if source_id == "b"
        ));

        let negative = r#"{"views": [{"id": "v", "data": [{"id": "a", "event": "x", "max_age_days": -1}]}]}"#;
        let file = ViewFile::from_json(negative).unwrap();
        assert!(matches!(
            file.view(None).unwrap().validate(),
            Err(ConfigError::MalformedDataSource(_))
        ));
    }

    #[test]
    fn test_missing_view() {
        let file = ViewFile::from_json(VIEW).unwrap();
        assert!(matches!(file.view(Some("network")), Err(ConfigError::UnknownView(_))));
        assert!(matches!(ViewFile::default().view(None), Err(ConfigError::UnknownView(_))));
    }
}
