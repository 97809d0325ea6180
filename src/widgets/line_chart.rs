//! Multi-series line chart
//!
//! With time aggregation enabled every series is aligned onto one shared axis,
//! so series stay comparable point by point and gaps show as `None`.
//! Otherwise each series plots its raw points.

use super::{RenderModel, SeriesData, UpdateContext, Widget, WidgetBase, WidgetKind};
use crate::aggregate::axis::{assign_to_axis, build_axis};
use crate::aggregate::interval::TimeInterval;
use crate::event::Event;
use chrono::{DateTime, Local, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct LineSeries {
    pub label: String,
    pub points: Vec<(DateTime<Utc>, Option<f64>)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineChartModel {
    pub series: Vec<LineSeries>,
    /// `Disabled` when points are raw
    pub interval: TimeInterval,
}

#[derive(Debug, Clone)]
pub struct LineChartWidget {
    base: WidgetBase,
    model: Option<LineChartModel>,
}

impl LineChartWidget {
    pub fn new(base: WidgetBase) -> Self {
        Self { base, model: None }
    }
}

impl Widget for LineChartWidget {
    fn base(&self) -> &WidgetBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut WidgetBase {
        &mut self.base
    }

    fn kind(&self) -> WidgetKind {
        WidgetKind::LineChart
    }

    fn update(&mut self, series: &[SeriesData], ctx: &UpdateContext) {
        let interval = ctx
            .time_aggregation
            .map(|t| t.interval)
            .unwrap_or(TimeInterval::Disabled);

        let series = if interval.is_enabled() {
            let max_age_days = series
                .iter()
                .filter_map(|s| s.max_age_days)
                .reduce(f64::max);
            let all_events: Vec<Event> = series.iter().flat_map(|s| s.events.iter().cloned()).collect();
            let axis = build_axis(max_age_days, interval, &all_events, ctx.now, &Local);

            series
                .iter()
                .map(|s| LineSeries {
                    label: s.label.clone(),
                    points: assign_to_axis(&s.events, &axis)
                        .into_iter()
                        .map(|b| (b.boundary, b.value))
                        .collect(),
                })
                .collect()
        } else {
            series
                .iter()
                .map(|s| LineSeries {
                    label: s.label.clone(),
                    points: s.events.iter().map(|e| (e.timestamp, Some(e.value))).collect(),
                })
                .collect()
        };

        self.model = Some(LineChartModel { series, interval });
    }

    fn render_instance(&self) -> Option<RenderModel> {
        self.model.clone().map(RenderModel::Line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::interval::{BucketFunction, TimeAggregation};
    use crate::widgets::test_support::*;
    use crate::widgets::DashboardWidget;

    fn model(widget: &DashboardWidget) -> LineChartModel {
        match widget.render_instance() {
            Some(RenderModel::Line(m)) => m,
            other => panic!("expected line model, got {:?}", other),
        }
    }

    #[test]
    fn test_raw_points_without_aggregation() {
        let mut widget = DashboardWidget::from_decl(&decl(
            r#"{"id": "l", "type": "line_chart", "data_sources": ["a"]}"#,
        ))
        .unwrap();

        let data = vec![series("a", vec![Event::new("a", 1.0, at(1, 0)), Event::new("a", 2.0, at(1, 7))])];
        widget.update(&data, &ctx());

        let m = model(&widget);
        assert_eq!(m.interval, TimeInterval::Disabled);
        assert_eq!(m.series[0].points, vec![(at(1, 0), Some(1.0)), (at(1, 7), Some(2.0))]);
    }

    #[test]
    fn test_series_share_one_axis_when_aggregated() {
        let mut widget = DashboardWidget::from_decl(&decl(
            r#"{"id": "l", "type": "line_chart", "data_sources": ["a", "b"]}"#,
        ))
        .unwrap();

        let mut a = series("a", vec![Event::new("a", 5.0, at(9, 0))]);
        a.max_age_days = Some(0.25);
        let b = series("b", vec![Event::new("b", 7.0, at(11, 0))]);

        let ctx = UpdateContext {
            now: at(12, 0),
            time_aggregation: Some(TimeAggregation {
                interval: TimeInterval::Hour,
                function: BucketFunction::Sum,
            }),
        };
        widget.update(&[a, b], &ctx);

        let m = model(&widget);
        assert_eq!(m.series.len(), 2);
        assert_eq!(m.series[0].label, "a");
        let axis_a: Vec<_> = m.series[0].points.iter().map(|p| p.0).collect();
        let axis_b: Vec<_> = m.series[1].points.iter().map(|p| p.0).collect();
        assert_eq!(axis_a, axis_b);
        assert!(axis_a.len() >= 6);

        let filled_a = m.series[0].points.iter().filter(|p| p.1.is_some()).count();
        assert_eq!(filled_a, 1);
        assert!(m.series[1].points.iter().any(|p| p.1 == Some(7.0)));
    }
}
