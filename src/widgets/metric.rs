//! Single-value metric, numeric or datetime

use super::{RenderModel, SeriesData, UpdateContext, Widget, WidgetBase, WidgetKind};
use crate::aggregate::scalar::{aggregate_value, AggregateValue, ScalarAggregation};
use crate::error::ConfigError;
use crate::event::format_local_text;
use chrono::Local;

#[derive(Debug, Clone, PartialEq)]
pub struct MetricModel {
    pub label: String,
    pub value: Option<AggregateValue>,
    /// Display text; "-" when there is no data
    pub text: String,
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

#[derive(Debug, Clone)]
pub struct MetricWidget {
    base: WidgetBase,
    aggregation: ScalarAggregation,
    unit: Option<String>,
    model: Option<MetricModel>,
}

impl MetricWidget {
    pub fn new(
        base: WidgetBase,
        aggregation: Option<&str>,
        unit: Option<String>,
    ) -> Result<Self, ConfigError> {
        base.require_single_source()?;
        let aggregation = match aggregation {
            Some(kind) => ScalarAggregation::parse(kind)?,
            None => ScalarAggregation::Last,
        };
        Ok(Self {
            base,
            aggregation,
            unit,
            model: None,
        })
    }

    fn text(&self, value: Option<AggregateValue>) -> String {
        match value {
            None => "-".to_string(),
            Some(AggregateValue::Timestamp(ts)) => format_local_text(&ts, &Local),
            Some(AggregateValue::Number(n)) => match &self.unit {
                Some(unit) => format!("{} {}", format_number(n), unit),
                None => format_number(n),
            },
        }
    }
}

impl Widget for MetricWidget {
    fn base(&self) -> &WidgetBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut WidgetBase {
        &mut self.base
    }

    fn kind(&self) -> WidgetKind {
        WidgetKind::Metric
    }

    fn update(&mut self, series: &[SeriesData], _ctx: &UpdateContext) {
        let Some(s) = series.first() else {
            return;
        };
        let value = aggregate_value(&s.events, self.aggregation);
        self.model = Some(MetricModel {
            label: s.label.clone(),
            value,
            text: self.text(value),
        });
    }

    fn render_instance(&self) -> Option<RenderModel> {
        self.model.clone().map(RenderModel::Metric)
    }
}
