//! Gauge: one data source reduced to a value within `[min, max]`

use super::{RenderModel, SeriesData, UpdateContext, Widget, WidgetBase, WidgetKind};
use crate::aggregate::scalar::{aggregate_value, ScalarAggregation};
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq)]
pub struct GaugeModel {
    pub label: String,
    /// `None` when the series is empty or the aggregation is not numeric
    pub value: Option<f64>,
    pub min: f64,
    pub max: f64,
}

impl GaugeModel {
    /// Position of `value` in `[min, max]`, clamped to `[0, 1]`
    pub fn ratio(&self) -> f64 {
        let span = self.max - self.min;
        match self.value {
            Some(v) if span > 0.0 => ((v - self.min) / span).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GaugeWidget {
    base: WidgetBase,
    aggregation: ScalarAggregation,
    min: f64,
    max: f64,
    model: Option<GaugeModel>,
}

impl GaugeWidget {
    pub fn new(
        base: WidgetBase,
        aggregation: Option<&str>,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<Self, ConfigError> {
        base.require_single_source()?;
        let aggregation = match aggregation {
            Some(kind) => ScalarAggregation::parse(kind)?,
            None => ScalarAggregation::Last,
        };
        Ok(Self {
            base,
            aggregation,
            min: min.unwrap_or(0.0),
            max: max.unwrap_or(100.0),
            model: None,
        })
    }
}

impl Widget for GaugeWidget {
    fn base(&self) -> &WidgetBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut WidgetBase {
        &mut self.base
    }

    fn kind(&self) -> WidgetKind {
        WidgetKind::Gauge
    }

    fn update(&mut self, series: &[SeriesData], _ctx: &UpdateContext) {
        let Some(s) = series.first() else {
            return;
        };
        self.model = Some(GaugeModel {
            label: s.label.clone(),
            value: aggregate_value(&s.events, self.aggregation).and_then(|v| v.as_number()),
            min: self.min,
            max: self.max,
        });
    }

    fn render_instance(&self) -> Option<RenderModel> {
        self.model.clone().map(RenderModel::Gauge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::widgets::test_support::*;
    use crate::widgets::DashboardWidget;

    #[test]
    fn test_gauge_defaults_to_last_value() {
        let mut widget = DashboardWidget::from_decl(&decl(
            r#"{"id": "g", "type": "gauge", "data_sources": ["cpu"], "max": 200}"#,
        ))
        .unwrap();

        let events = vec![Event::new("cpu", 10.0, at(1, 0)), Event::new("cpu", 50.0, at(1, 1))];
        widget.update(&[series("cpu", events)], &ctx());

        match widget.render_instance() {
            Some(RenderModel::Gauge(m)) => {
                assert_eq!(m.value, Some(50.0));
                assert_eq!(m.ratio(), 0.25);
            }
            other => panic!("expected gauge model, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_series_has_no_value() {
        let mut widget = DashboardWidget::from_decl(&decl(
            r#"{"id": "g", "type": "gauge", "aggregation": "average", "data_sources": ["cpu"]}"#,
        ))
        .unwrap();
        widget.update(&[series("cpu", vec![])], &ctx());

        match widget.render_instance() {
            Some(RenderModel::Gauge(m)) => {
                assert_eq!(m.value, None);
                assert_eq!(m.ratio(), 0.0);
            }
            other => panic!("expected gauge model, got {:?}", other),
        }
    }
}
