//! Bar chart: one bar per (series, tag), valued by a scalar aggregation

use super::{RenderModel, SeriesData, UpdateContext, Widget, WidgetBase, WidgetKind};
use crate::aggregate::scalar::{aggregate_value, ScalarAggregation};
use crate::error::ConfigError;
use crate::event::Event;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarChartModel {
    pub bars: Vec<Bar>,
    pub aggregation: ScalarAggregation,
}

#[derive(Debug, Clone)]
pub struct BarChartWidget {
    base: WidgetBase,
    aggregation: ScalarAggregation,
    model: Option<BarChartModel>,
}

impl BarChartWidget {
    pub fn new(base: WidgetBase, aggregation: Option<&str>) -> Result<Self, ConfigError> {
        let aggregation = match aggregation {
            Some(kind) => ScalarAggregation::parse(kind)?,
            None => ScalarAggregation::Sum,
        };
        Ok(Self {
            base,
            aggregation,
            model: None,
        })
    }
}

impl Widget for BarChartWidget {
    fn base(&self) -> &WidgetBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut WidgetBase {
        &mut self.base
    }

    fn kind(&self) -> WidgetKind {
        WidgetKind::BarChart
    }

    fn update(&mut self, series: &[SeriesData], _ctx: &UpdateContext) {
        let multi = series.len() > 1;
        let mut bars = Vec::new();

        for s in series {
            let mut by_tag: BTreeMap<Option<&str>, Vec<Event>> = BTreeMap::new();
            for event in &s.events {
                by_tag.entry(event.tag.as_deref()).or_default().push(event.clone());
            }

            for (tag, events) in by_tag {
                let Some(value) = aggregate_value(&events, self.aggregation).and_then(|v| v.as_number()) else {
                    continue;
                };
                let label = match (tag, multi) {
                    (Some(tag), true) => format!("{}:{}", s.label, tag),
                    (Some(tag), false) => tag.to_string(),
                    (None, _) => s.label.clone(),
                };
                bars.push(Bar { label, value });
            }
        }

        self.model = Some(BarChartModel {
            bars,
            aggregation: self.aggregation,
        });
    }

    fn render_instance(&self) -> Option<RenderModel> {
        self.model.clone().map(RenderModel::Bar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::test_support::*;
    use crate::widgets::DashboardWidget;

    fn bars(widget: &DashboardWidget) -> Vec<(String, f64)> {
        match widget.render_instance() {
            Some(RenderModel::Bar(m)) => m.bars.into_iter().map(|b| (b.label, b.value)).collect(),
            other => panic!("expected bar model, got {:?}", other),
        }
    }

    #[test]
    fn test_one_bar_per_tag_default_sum() {
        let mut widget = DashboardWidget::from_decl(&decl(
            r#"{"id": "b", "type": "bar_chart", "data_sources": ["logs"]}"#,
        ))
        .unwrap();

        let events = vec![
            Event::new("logs", 1.0, at(1, 0)).with_tag("WARN"),
            Event::new("logs", 2.0, at(1, 1)).with_tag("ERROR"),
            Event::new("logs", 3.0, at(1, 2)).with_tag("WARN"),
        ];
        widget.update(&[series("logs", events)], &ctx());

        assert_eq!(bars(&widget), vec![("ERROR".to_string(), 2.0), ("WARN".to_string(), 4.0)]);
    }

    #[test]
    fn test_multi_series_labels_and_kind() {
        let mut widget = DashboardWidget::from_decl(&decl(
            r#"{"id": "b", "type": "bar_chart", "aggregation": "count", "data_sources": ["a", "b"]}"#,
        ))
        .unwrap();

        let a = series("a", vec![Event::new("a", 9.0, at(2, 0)), Event::new("a", 9.0, at(2, 1))]);
        let b = series("b", vec![Event::new("b", 1.0, at(2, 0)).with_tag("x")]);
        widget.update(&[a, b], &ctx());

        assert_eq!(bars(&widget), vec![("a".to_string(), 2.0), ("b:x".to_string(), 1.0)]);
    }
}
