//! Event table: rows from every series, newest first, with colouring rules

use super::{RenderModel, SeriesData, UpdateContext, Widget, WidgetBase, WidgetKind};
use crate::aggregate::conditions::evaluate;
use crate::event::{format_local_text, Event};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ROWS: usize = 50;

/// Colour a row when `field <condition> value` holds; the first matching rule wins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRule {
    pub field: String,
    pub condition: String,
    pub value: serde_json::Value,
    pub color: String,
}

impl RowRule {
    fn matches(&self, event: &Event) -> bool {
        evaluate(&event.field_value(&self.field), &self.condition, &self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub series: String,
    pub name: String,
    pub value: f64,
    pub tag: Option<String>,
    pub additional_info: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub time_text: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableModel {
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone)]
pub struct TableWidget {
    base: WidgetBase,
    max_rows: usize,
    row_rules: Vec<RowRule>,
    model: Option<TableModel>,
}

impl TableWidget {
    pub fn new(base: WidgetBase, max_rows: Option<usize>, row_rules: Vec<RowRule>) -> Self {
        Self {
            base,
            max_rows: max_rows.unwrap_or(DEFAULT_MAX_ROWS),
            row_rules,
            model: None,
        }
    }
}

impl Widget for TableWidget {
    fn base(&self) -> &WidgetBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut WidgetBase {
        &mut self.base
    }

    fn kind(&self) -> WidgetKind {
        WidgetKind::Table
    }

    fn update(&mut self, series: &[SeriesData], _ctx: &UpdateContext) {
        let mut rows: Vec<TableRow> = series
            .iter()
            .flat_map(|s| {
                s.events.iter().map(|event| TableRow {
                    series: s.label.clone(),
                    name: event.name.clone(),
                    value: event.value,
                    tag: event.tag.clone(),
                    additional_info: event.additional_info.clone(),
                    timestamp: event.timestamp,
                    time_text: format_local_text(&event.timestamp, &Local),
                    color: self
                        .row_rules
                        .iter()
                        .find(|rule| rule.matches(event))
                        .map(|rule| rule.color.clone()),
                })
            })
            .collect();

        // Stable: equal timestamps keep series order
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        rows.truncate(self.max_rows);

        self.model = Some(TableModel { rows });
    }

    fn render_instance(&self) -> Option<RenderModel> {
        self.model.clone().map(RenderModel::Table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::test_support::*;
    use crate::widgets::DashboardWidget;

    fn rows(widget: &DashboardWidget) -> Vec<TableRow> {
        match widget.render_instance() {
            Some(RenderModel::Table(m)) => m.rows,
            other => panic!("expected table model, got {:?}", other),
        }
    }

    #[test]
    fn test_newest_first_with_row_cap() {
        let mut widget = DashboardWidget::from_decl(&decl(
            r#"{"id": "t", "type": "table", "max_rows": 2, "data_sources": ["a", "b"]}"#,
        ))
        .unwrap();

        let a = series("a", vec![Event::new("a", 1.0, at(1, 0)), Event::new("a", 3.0, at(3, 0))]);
        let b = series("b", vec![Event::new("b", 2.0, at(2, 0))]);
        widget.update(&[a, b], &ctx());

        let values: Vec<f64> = rows(&widget).iter().map(|r| r.value).collect();
        assert_eq!(values, vec![3.0, 2.0]);
    }

    #[test]
    fn test_row_rules_first_match_wins() {
        let mut widget = DashboardWidget::from_decl(&decl(
            r#"{"id": "t", "type": "table", "data_sources": ["logs"], "row_rules": [
                {"field": "tag", "condition": "equals", "value": "ERROR", "color": "red"},
                {"field": "value", "condition": "greater_than", "value": 10, "color": "yellow"},
                {"field": "tag", "condition": "between", "value": "x", "color": "blue"}
            ]}"#,
        ))
        .unwrap();

        let events = vec![
            Event::new("logs", 50.0, at(1, 0)).with_tag("ERROR"),
            Event::new("logs", 20.0, at(1, 1)).with_tag("INFO"),
            Event::new("logs", 1.0, at(1, 2)).with_tag("INFO"),
        ];
        widget.update(&[series("logs", events)], &ctx());

        let colors: Vec<Option<String>> = rows(&widget).into_iter().map(|r| r.color).collect();
        assert_eq!(colors, vec![None, Some("yellow".to_string()), Some("red".to_string())]);
    }
}
