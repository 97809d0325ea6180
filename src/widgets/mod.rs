//! Widget contract and the closed set of widget kinds
//!
//! Lifecycle: construct from a [`WidgetDecl`] → the scheduler resolves the
//! declared dependencies → [`Widget::update`] with one [`SeriesData`] per
//! dependency, in declaration order → [`Widget::post_update`] → clean.
//!
//! Widgets never fetch or filter data themselves; they only turn prepared
//! series into a [`RenderModel`] for the rendering layer.

pub mod bar_chart;
pub mod gauge;
pub mod line_chart;
pub mod metric;
pub mod table;

use crate::aggregate::interval::TimeAggregation;
use crate::error::ConfigError;
use crate::event::Event;
use crate::view::{DataSourceReference, WidgetDecl, WidgetKindDecl};
use chrono::{DateTime, Utc};

pub use bar_chart::{BarChartModel, BarChartWidget};
pub use gauge::{GaugeModel, GaugeWidget};
pub use line_chart::{LineChartModel, LineChartWidget, LineSeries};
pub use metric::{MetricModel, MetricWidget};
pub use table::{RowRule, TableModel, TableRow, TableWidget};

/// One dependency's prepared data, after filtering, bucketing and mutation
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesData {
    pub source_id: String,
    pub label: String,
    pub events: Vec<Event>,
    /// Window of the underlying data source, used for axis generation
    pub max_age_days: Option<f64>,
}

/// Per-update inputs that are not series data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateContext {
    pub now: DateTime<Utc>,
    pub time_aggregation: Option<TimeAggregation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    LineChart,
    BarChart,
    Table,
    Gauge,
    Metric,
}

impl WidgetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetKind::LineChart => "line_chart",
            WidgetKind::BarChart => "bar_chart",
            WidgetKind::Table => "table",
            WidgetKind::Gauge => "gauge",
            WidgetKind::Metric => "metric",
        }
    }
}

/// Identity of a widget's on-screen slot
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetHandle {
    pub id: String,
    pub title: String,
    pub kind: WidgetKind,
    pub is_empty: bool,
    /// Bumped after every update; the layout re-measures when it changes
    pub layout_epoch: u64,
}

/// What the rendering layer draws for a widget
#[derive(Debug, Clone, PartialEq)]
pub enum RenderModel {
    Line(LineChartModel),
    Bar(BarChartModel),
    Table(TableModel),
    Gauge(GaugeModel),
    Metric(MetricModel),
}

/// State common to every widget kind
#[derive(Debug, Clone)]
pub struct WidgetBase {
    pub id: String,
    pub title: String,
    pub dependencies: Vec<DataSourceReference>,
    pub time_aggregation: Option<TimeAggregation>,
    pub is_empty: bool,
    pub layout_epoch: u64,
}

impl WidgetBase {
    fn from_decl(decl: &WidgetDecl) -> Result<Self, ConfigError> {
        let dependencies = decl
            .data_sources
            .iter()
            .map(|d| d.normalize())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: decl.id.clone(),
            title: decl.title.clone().unwrap_or_else(|| decl.id.clone()),
            dependencies,
            time_aggregation: decl.time_aggregation,
            is_empty: true,
            layout_epoch: 0,
        })
    }

    /// Single-source kinds must declare exactly one dependency
    fn require_single_source(&self) -> Result<(), ConfigError> {
        if self.dependencies.len() != 1 {
            return Err(ConfigError::DependencyCount {
                widget: self.id.clone(),
                expected: 1,
                actual: self.dependencies.len(),
            });
        }
        Ok(())
    }
}

pub trait Widget {
    fn base(&self) -> &WidgetBase;
    fn base_mut(&mut self) -> &mut WidgetBase;
    fn kind(&self) -> WidgetKind;

    /// Consume prepared series, one per dependency in declaration order
    fn update(&mut self, series: &[SeriesData], ctx: &UpdateContext);

    /// Latest render model; `None` until the first update
    fn render_instance(&self) -> Option<RenderModel>;

    fn id(&self) -> &str {
        &self.base().id
    }

    fn dependencies(&self) -> &[DataSourceReference] {
        &self.base().dependencies
    }

    fn time_aggregation(&self) -> Option<TimeAggregation> {
        self.base().time_aggregation
    }

    fn set_time_aggregation(&mut self, setting: TimeAggregation) {
        self.base_mut().time_aggregation = Some(setting);
    }

    fn handle(&self) -> WidgetHandle {
        let base = self.base();
        WidgetHandle {
            id: base.id.clone(),
            title: base.title.clone(),
            kind: self.kind(),
            is_empty: base.is_empty,
            layout_epoch: base.layout_epoch,
        }
    }

    /// Toggle the empty state and bump the layout epoch
    fn post_update(&mut self, series: &[SeriesData]) {
        let base = self.base_mut();
        base.is_empty = series.iter().all(|s| s.events.is_empty());
        base.layout_epoch += 1;
    }
}

/// Every widget kind the dashboard knows
#[derive(Debug, Clone)]
pub enum DashboardWidget {
    LineChart(LineChartWidget),
    BarChart(BarChartWidget),
    Table(TableWidget),
    Gauge(GaugeWidget),
    Metric(MetricWidget),
}

impl DashboardWidget {
    /// Build a widget from its declaration
    ///
    /// Fails on unsupported mutators, unknown aggregation kinds, and wrong
    /// dependency counts for single-source kinds.
    pub fn from_decl(decl: &WidgetDecl) -> Result<Self, ConfigError> {
        let base = WidgetBase::from_decl(decl)?;
        Ok(match &decl.kind {
            WidgetKindDecl::LineChart {} => DashboardWidget::LineChart(LineChartWidget::new(base)),
            WidgetKindDecl::BarChart { aggregation } => {
                DashboardWidget::BarChart(BarChartWidget::new(base, aggregation.as_deref())?)
            }
            WidgetKindDecl::Table { max_rows, row_rules } => {
                DashboardWidget::Table(TableWidget::new(base, *max_rows, row_rules.clone()))
            }
            WidgetKindDecl::Gauge { aggregation, min, max } => {
                DashboardWidget::Gauge(GaugeWidget::new(base, aggregation.as_deref(), *min, *max)?)
            }
            WidgetKindDecl::Metric { aggregation, unit } => {
                DashboardWidget::Metric(MetricWidget::new(base, aggregation.as_deref(), unit.clone())?)
            }
        })
    }

    fn inner(&self) -> &dyn Widget {
        match self {
            DashboardWidget::LineChart(w) => w,
            DashboardWidget::BarChart(w) => w,
            DashboardWidget::Table(w) => w,
            DashboardWidget::Gauge(w) => w,
            DashboardWidget::Metric(w) => w,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Widget {
        match self {
            DashboardWidget::LineChart(w) => w,
            DashboardWidget::BarChart(w) => w,
            DashboardWidget::Table(w) => w,
            DashboardWidget::Gauge(w) => w,
            DashboardWidget::Metric(w) => w,
        }
    }
}

impl Widget for DashboardWidget {
    fn base(&self) -> &WidgetBase {
        self.inner().base()
    }

    fn base_mut(&mut self) -> &mut WidgetBase {
        self.inner_mut().base_mut()
    }

    fn kind(&self) -> WidgetKind {
        self.inner().kind()
    }

    fn update(&mut self, series: &[SeriesData], ctx: &UpdateContext) {
        self.inner_mut().update(series, ctx)
    }

    fn render_instance(&self) -> Option<RenderModel> {
        self.inner().render_instance()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;

    pub fn decl(json: &str) -> WidgetDecl {
        serde_json::from_str(json).unwrap()
    }

    pub fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, h, m, 0).unwrap()
    }

    pub fn series(id: &str, events: Vec<Event>) -> SeriesData {
        SeriesData {
            source_id: id.to_string(),
            label: id.to_string(),
            events,
            max_age_days: None,
        }
    }

    pub fn ctx() -> UpdateContext {
        UpdateContext {
            now: at(12, 0),
            time_aggregation: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_single_source_kinds_check_dependency_count() {
        let gauge = decl(r#"{"id": "g", "type": "gauge", "data_sources": ["a", "b"]}"#);
        assert!(matches!(
            DashboardWidget::from_decl(&gauge),
            Err(ConfigError::DependencyCount { expected: 1, actual: 2, .. })
        ));

        let metric = decl(r#"{"id": "m", "type": "metric"}"#);
        assert!(matches!(
            DashboardWidget::from_decl(&metric),
            Err(ConfigError::DependencyCount { expected: 1, actual: 0, .. })
        ));
    }

    #[test]
    fn test_unknown_aggregation_is_config_error() {
        let bar = decl(r#"{"id": "b", "type": "bar_chart", "aggregation": "median", "data_sources": ["a"]}"#);
        assert!(matches!(
            DashboardWidget::from_decl(&bar),
            Err(ConfigError::UnknownAggregation(_))
        ));
    }

    #[test]
    fn test_post_update_tracks_empty_state() {
        let mut widget =
            DashboardWidget::from_decl(&decl(r#"{"id": "t", "type": "table", "data_sources": ["a"]}"#)).unwrap();
        assert!(widget.handle().is_empty);
        assert!(widget.render_instance().is_none());

        let data = vec![series("a", vec![Event::new("x", 1.0, at(1, 0))])];
        widget.update(&data, &ctx());
        widget.post_update(&data);
        let handle = widget.handle();
        assert!(!handle.is_empty);
        assert_eq!(handle.layout_epoch, 1);
        assert_eq!(handle.kind, WidgetKind::Table);
        assert_eq!(handle.title, "t");

        let empty = vec![series("a", vec![])];
        widget.update(&empty, &ctx());
        widget.post_update(&empty);
        assert!(widget.handle().is_empty);
        assert_eq!(widget.handle().layout_epoch, 2);
    }
}
