use {
    super::renderer::{color_from_name, format_axis_time, format_value, series_color},
    crate::{
        aggregate::interval::TimeInterval,
        scheduler::{WidgetState, WidgetView},
        source::{FetchStats, SourceStatus},
        widgets::{
            BarChartModel, GaugeModel, LineChartModel, MetricModel, RenderModel, TableModel,
        },
    },
    ratatui::{
        layout::{Alignment, Constraint, Direction, Layout as RatLayout, Rect},
        style::{Color, Modifier, Style},
        symbols,
        text::{Line, Span},
        widgets::{
            Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, Gauge, GraphType,
            Paragraph, Row, Table,
        },
        Frame,
    },
};

const COLUMNS: usize = 2;

/// Everything drawn in one frame, copied out of the scheduler and cache
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub title: String,
    pub interval: TimeInterval,
    pub widgets: Vec<WidgetView>,
    pub sources: Vec<(String, SourceStatus, FetchStats)>,
}

/// Render the main UI layout
pub fn render_layout(f: &mut Frame, area: Rect, snapshot: &DashboardSnapshot) {
    let chunks = RatLayout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Widget grid
            Constraint::Length(3), // Footer/Status
        ])
        .split(area);

    render_header(f, chunks[0], snapshot);
    render_grid(f, chunks[1], &snapshot.widgets);
    render_footer(f, chunks[2], snapshot);
}

fn render_header(f: &mut Frame, area: Rect, snapshot: &DashboardSnapshot) {
    let text = vec![Line::from(vec![
        Span::styled(
            snapshot.title.clone(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  Interval: "),
        Span::styled(snapshot.interval.as_str(), Style::default().fg(Color::Yellow)),
        Span::raw("  |  'i' interval, 'r' refresh, 'q'/Esc quit"),
    ])];

    let header = Block::default().borders(Borders::ALL).title("Event Dashboard");
    f.render_widget(Paragraph::new(text).block(header), area);
}

fn render_grid(f: &mut Frame, area: Rect, widgets: &[WidgetView]) {
    if widgets.is_empty() {
        let empty = Paragraph::new("No widgets configured")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(empty, area);
        return;
    }

    let row_count = widgets.len().div_ceil(COLUMNS);
    let rows = RatLayout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Ratio(1, row_count as u32); row_count])
        .split(area);

    for (row_idx, row_widgets) in widgets.chunks(COLUMNS).enumerate() {
        let cols = RatLayout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, row_widgets.len() as u32); row_widgets.len()])
            .split(rows[row_idx]);

        for (view, slot) in row_widgets.iter().zip(cols.iter()) {
            render_widget_slot(f, *slot, view);
        }
    }
}

fn render_widget_slot(f: &mut Frame, area: Rect, view: &WidgetView) {
    // Stale data stays on screen while a refetch is pending
    let stale = if view.state == WidgetState::Dirty && view.model.is_some() { " …" } else { "" };
    let block = Block::default().borders(Borders::ALL).title(format!(
        "{} [{}]{}",
        view.handle.title,
        view.handle.kind.as_str(),
        stale
    ));

    match &view.model {
        None => render_placeholder(f, area, block, "Loading..."),
        Some(_) if view.handle.is_empty => render_placeholder(f, area, block, "No data"),
        Some(RenderModel::Line(m)) => render_line_chart(f, area, block, m),
        Some(RenderModel::Bar(m)) => render_bar_chart(f, area, block, m),
        Some(RenderModel::Table(m)) => render_table(f, area, block, m),
        Some(RenderModel::Gauge(m)) => render_gauge(f, area, block, m),
        Some(RenderModel::Metric(m)) => render_metric(f, area, block, m),
    }
}

fn render_placeholder(f: &mut Frame, area: Rect, block: Block, text: &str) {
    let p = Paragraph::new(text.to_string())
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center)
        .block(block);
    f.render_widget(p, area);
}

fn render_line_chart(f: &mut Frame, area: Rect, block: Block, model: &LineChartModel) {
    let data: Vec<Vec<(f64, f64)>> = model
        .series
        .iter()
        .map(|s| {
            s.points
                .iter()
                .filter_map(|(ts, v)| v.map(|v| (ts.timestamp() as f64, v)))
                .collect()
        })
        .collect();

    let (mut x_min, mut x_max, mut y_min, mut y_max) = (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
    for (x, y) in data.iter().flatten() {
        x_min = x_min.min(*x);
        x_max = x_max.max(*x);
        y_min = y_min.min(*y);
        y_max = y_max.max(*y);
    }
    if x_min > x_max {
        render_placeholder(f, area, block, "No data");
        return;
    }
    if x_min == x_max {
        x_max += 60.0;
    }
    if y_min == y_max {
        y_min -= 1.0;
        y_max += 1.0;
    }

    let datasets: Vec<Dataset> = model
        .series
        .iter()
        .zip(&data)
        .enumerate()
        .map(|(i, (series, points))| {
            Dataset::default()
                .name(series.label.clone())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(series_color(i)))
                .data(points)
        })
        .collect();

    let x_axis = Axis::default()
        .bounds([x_min, x_max])
        .labels(vec![
            Span::raw(format_axis_time(x_min)),
            Span::raw(format_axis_time(x_max)),
        ]);
    let y_axis = Axis::default()
        .bounds([y_min, y_max])
        .labels(vec![Span::raw(format_value(y_min)), Span::raw(format_value(y_max))]);

    f.render_widget(Chart::new(datasets).block(block).x_axis(x_axis).y_axis(y_axis), area);
}

fn render_bar_chart(f: &mut Frame, area: Rect, block: Block, model: &BarChartModel) {
    let bars: Vec<Bar> = model
        .bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            Bar::default()
                .label(Line::from(bar.label.clone()))
                .value(bar.value.max(0.0).round() as u64)
                .text_value(format_value(bar.value))
                .style(Style::default().fg(series_color(i)))
        })
        .collect();

    let chart = BarChart::default()
        .block(block)
        .bar_width(7)
        .bar_gap(1)
        .data(BarGroup::default().bars(&bars));
    f.render_widget(chart, area);
}

fn render_table(f: &mut Frame, area: Rect, block: Block, model: &TableModel) {
    let header = Row::new(vec!["Time", "Series", "Tag", "Value", "Info"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = model
        .rows
        .iter()
        .map(|row| {
            let style = row
                .color
                .as_deref()
                .map(|c| Style::default().fg(color_from_name(c)))
                .unwrap_or_default();
            Row::new(vec![
                row.time_text.clone(),
                row.series.clone(),
                row.tag.clone().unwrap_or_default(),
                format_value(row.value),
                row.additional_info.clone().unwrap_or_default(),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(19), // Time
        Constraint::Length(14), // Series
        Constraint::Length(10), // Tag
        Constraint::Length(10), // Value
        Constraint::Min(10),    // Info
    ];

    f.render_widget(Table::new(rows, widths).header(header).block(block), area);
}

fn render_gauge(f: &mut Frame, area: Rect, block: Block, model: &GaugeModel) {
    let label = match model.value {
        Some(v) => format!("{} ({}..{})", format_value(v), format_value(model.min), format_value(model.max)),
        None => "-".to_string(),
    };
    let gauge = Gauge::default()
        .block(block)
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(model.ratio())
        .label(label);
    f.render_widget(gauge, area);
}

fn render_metric(f: &mut Frame, area: Rect, block: Block, model: &MetricModel) {
    let text = vec![
        Line::from(Span::styled(
            model.text.clone(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(model.label.clone(), Style::default().fg(Color::DarkGray))),
    ];
    f.render_widget(Paragraph::new(text).alignment(Alignment::Center).block(block), area);
}

fn render_footer(f: &mut Frame, area: Rect, snapshot: &DashboardSnapshot) {
    let loaded = snapshot
        .sources
        .iter()
        .filter(|(_, status, _)| *status == SourceStatus::Loaded)
        .count();
    let failed = snapshot
        .sources
        .iter()
        .filter(|(_, status, _)| *status == SourceStatus::Failed)
        .count();
    let requests: u64 = snapshot.sources.iter().map(|(_, _, s)| s.total_requests).sum();
    let slowest = snapshot
        .sources
        .iter()
        .map(|(_, _, s)| s.max_response_time_ms)
        .fold(0.0, f64::max);

    let text = vec![Line::from(vec![
        Span::styled("Sources: ", Style::default().fg(Color::Cyan)),
        Span::raw(format!("{}/{} loaded", loaded, snapshot.sources.len())),
        Span::raw(" | "),
        Span::styled("Failed: ", Style::default().fg(Color::Red)),
        Span::raw(failed.to_string()),
        Span::raw(" | "),
        Span::styled("Requests: ", Style::default().fg(Color::Cyan)),
        Span::raw(requests.to_string()),
        Span::raw(" | "),
        Span::styled("Slowest: ", Style::default().fg(Color::Cyan)),
        Span::raw(format!("{:.0}ms", slowest)),
    ])];

    let footer = Block::default().borders(Borders::ALL).title("Status");
    f.render_widget(Paragraph::new(text).block(footer), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::{WidgetHandle, WidgetKind};
    use ratatui::{backend::TestBackend, Terminal};

    fn view(id: &str, kind: WidgetKind, is_empty: bool, model: Option<RenderModel>) -> WidgetView {
        WidgetView {
            handle: WidgetHandle {
                id: id.to_string(),
                title: id.to_string(),
                kind,
                is_empty,
                layout_epoch: 0,
            },
            state: if model.is_some() { WidgetState::Clean } else { WidgetState::Dirty },
            model,
        }
    }

    fn draw(snapshot: &DashboardSnapshot) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| render_layout(f, f.area(), snapshot)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_render_loading_empty_and_metric() {
        let snapshot = DashboardSnapshot {
            title: "System".to_string(),
            interval: TimeInterval::Hour,
            widgets: vec![
                view("cpu", WidgetKind::LineChart, true, None),
                view(
                    "errors",
                    WidgetKind::Metric,
                    false,
                    Some(RenderModel::Metric(MetricModel {
                        label: "logs".to_string(),
                        value: None,
                        text: "42 req".to_string(),
                    })),
                ),
                view(
                    "disk",
                    WidgetKind::Gauge,
                    true,
                    Some(RenderModel::Gauge(GaugeModel {
                        label: "disk".to_string(),
                        value: None,
                        min: 0.0,
                        max: 100.0,
                    })),
                ),
            ],
            sources: vec![("logs".to_string(), SourceStatus::Loaded, FetchStats::default())],
        };

        let screen = draw(&snapshot);
        assert!(screen.contains("Loading..."));
        assert!(screen.contains("No data"));
        assert!(screen.contains("42 req"));
        assert!(screen.contains("1/1 loaded"));
        assert!(screen.contains("Interval: hour"));
    }

    #[test]
    fn test_render_without_widgets() {
        let snapshot = DashboardSnapshot {
            title: "Empty".to_string(),
            interval: TimeInterval::Disabled,
            widgets: vec![],
            sources: vec![],
        };
        assert!(draw(&snapshot).contains("No widgets configured"));
    }
}
