//! Dashboard Runtime
//!
//! Loads a view file, registers its data sources and widgets, and runs:
//! - the widget scheduler tick
//! - periodic data source refresh
//! - the retention job (SQLite backend only)
//! - the terminal dashboard (or headless until CTRL+C)
//!
//! Usage:
//!   cargo run --release --bin dashboard_runtime
//!
//! Environment variables: see `DashboardConfig::from_env`.

use dotenv::dotenv;
use eventdash::{
    config::DashboardConfig,
    scheduler::{refresh_task, scheduler_task, WidgetScheduler},
    source::{DataSourceCache, EventSource, HttpEventSource},
    store::{retention_task, SqliteEventStore},
    ui::run_ui,
    view::ViewFile,
    widgets::DashboardWidget,
};
use log::{error, info};
use std::sync::{Arc, Mutex};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("🚀 Dashboard Runtime");

    let config = DashboardConfig::from_env();
    info!("   ├─ View file: {}", config.view_path);
    info!("   ├─ View: {}", config.view_id.as_deref().unwrap_or("(first)"));
    match &config.api_url {
        Some(url) => info!("   ├─ Events API: {}", url),
        None => info!("   ├─ Database: {}", config.db_path),
    }
    info!("   ├─ Scheduler tick: {}ms", config.scheduler_tick_ms);
    info!("   ├─ Refresh interval: {}s", config.refresh_interval_secs);
    info!("   └─ TUI: {}", config.enable_tui);

    let view_file = ViewFile::load(&config.view_path)?;
    let view = view_file.view(config.view_id.as_deref())?.clone();
    view.validate()?;
    info!(
        "✅ View '{}' loaded ({} data sources, {} widgets)",
        view.id,
        view.data.len(),
        view.widgets.len()
    );

    // Event source: HTTP when configured, otherwise the local SQLite store
    let mut store: Option<Arc<SqliteEventStore>> = None;
    let source: Arc<dyn EventSource> = match &config.api_url {
        Some(url) => Arc::new(HttpEventSource::new(url, config.fetch_timeout())?),
        None => {
            let sqlite = Arc::new(SqliteEventStore::open(&config.db_path)?);
            store = Some(sqlite.clone());
            sqlite
        }
    };

    let cache = DataSourceCache::new(source);
    for spec in &view.data {
        cache.register(spec.clone());
    }
    info!("✅ {} data sources registered", view.data.len());

    let mut scheduler = WidgetScheduler::new(cache.clone());
    for decl in &view.widgets {
        scheduler.register(DashboardWidget::from_decl(decl)?)?;
    }
    if view.time_aggregation.interval.is_enabled() {
        scheduler.set_interval(view.time_aggregation.interval);
    }
    let scheduler = Arc::new(Mutex::new(scheduler));
    info!("✅ {} widgets registered", view.widgets.len());

    info!("🚀 Spawning background tasks...");
    tokio::spawn(scheduler_task(scheduler.clone(), config.scheduler_tick_ms));
    tokio::spawn(refresh_task(cache.clone(), config.refresh_interval_secs));
    if let Some(store) = store {
        if !view_file.retention.is_empty() {
            tokio::spawn(retention_task(
                store,
                view_file.retention.clone(),
                config.retention_interval_minutes,
            ));
        }
    }

    if config.enable_tui {
        let title = if view.title.is_empty() { view.id.clone() } else { view.title.clone() };
        if let Err(e) = run_ui(scheduler, cache, title).await {
            error!("❌ UI error: {}", e);
        }
    } else {
        info!("🔄 Running headless. Press CTRL+C to shutdown");
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("⚠️  Received CTRL+C, shutting down..."),
            Err(err) => error!("❌ Failed to listen for CTRL+C: {}", err),
        }
    }

    info!("✅ Dashboard runtime stopped");
    Ok(())
}
