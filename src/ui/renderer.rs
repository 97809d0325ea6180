// Renderer module - formatting utilities
// Most rendering logic is in layout.rs

use crate::event::format_local_text;
use chrono::{DateTime, Local, Utc};
use ratatui::style::Color;

/// Map a row-rule colour name to a terminal colour
pub fn color_from_name(name: &str) -> Color {
    match name.trim().to_ascii_lowercase().as_str() {
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" | "orange" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" | "purple" => Color::Magenta,
        "cyan" => Color::Cyan,
        "gray" | "grey" => Color::Gray,
        "white" => Color::White,
        _ => Color::Reset,
    }
}

/// Palette cycled across series of multi-series widgets
pub fn series_color(index: usize) -> Color {
    const PALETTE: [Color; 6] = [
        Color::Cyan,
        Color::Yellow,
        Color::Green,
        Color::Magenta,
        Color::Blue,
        Color::Red,
    ];
    PALETTE[index % PALETTE.len()]
}

/// Compact number: integers without decimals, otherwise 2 places
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

/// Axis label for an epoch-seconds x value
pub fn format_axis_time(secs: f64) -> String {
    match DateTime::<Utc>::from_timestamp(secs as i64, 0) {
        Some(ts) => {
            let text = format_local_text(&ts, &Local);
            // "YYYY-MM-DD HH:MM:SS" → "MM-DD HH:MM"
            text.get(5..16).unwrap_or(&text).to_string()
        }
        None => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_names() {
        assert_eq!(color_from_name("Red"), Color::Red);
        assert_eq!(color_from_name(" grey "), Color::Gray);
        assert_eq!(color_from_name("chartreuse"), Color::Reset);
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(42.0), "42");
        assert_eq!(format_value(3.14159), "3.14");
        assert_eq!(format_value(-7.0), "-7");
    }

    #[test]
    fn test_format_axis_time_is_short() {
        assert_eq!(format_axis_time(1_735_732_800.0).len(), 11);
    }
}
