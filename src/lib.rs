//! Event time-series aggregation and widget orchestration for live dashboards
//!
//! Data sources fetch events into a shared cache, a scheduler recomputes
//! dirty widgets once all their sources have loaded, and the terminal UI draws
//! the resulting render models.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod event;
pub mod scheduler;
pub mod source;
pub mod store;
pub mod ui;
pub mod view;
pub mod widgets;
