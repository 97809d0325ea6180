use {
    super::layout::{render_layout, DashboardSnapshot},
    crate::{scheduler::WidgetScheduler, source::DataSourceCache},
    crossterm::event::{self, Event as TermEvent, KeyCode},
    ratatui::{backend::CrosstermBackend, Terminal},
    std::{
        sync::{Arc, Mutex},
        time::Duration,
    },
};

const REFRESH_INTERVAL: Duration = Duration::from_millis(250);

fn snapshot(scheduler: &Mutex<WidgetScheduler>, cache: &DataSourceCache, title: &str) -> DashboardSnapshot {
    let (interval, widgets) = {
        let guard = scheduler.lock().unwrap_or_else(|e| e.into_inner());
        (guard.page_interval(), guard.views())
    };
    let sources = cache
        .entries()
        .into_iter()
        .map(|(id, entry)| (id, entry.status, entry.stats))
        .collect();

    DashboardSnapshot {
        title: title.to_string(),
        interval,
        widgets,
        sources,
    }
}

/// Run the TUI event loop
///
/// Keys: `i` cycles the page interval, `r` re-fetches every data source,
/// `q`/Esc quits.
pub async fn run_ui(
    scheduler: Arc<Mutex<WidgetScheduler>>,
    cache: DataSourceCache,
    title: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = std::io::stdout();
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    crossterm::terminal::enable_raw_mode()?;

    // Alternate screen keeps stderr logs off the dashboard buffer
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::cursor::Hide
    )?;
    terminal.clear()?;

    loop {
        // Poll on a blocking thread so the scheduler and fetch tasks keep running
        let key = tokio::task::spawn_blocking(|| -> std::io::Result<Option<KeyCode>> {
            if event::poll(REFRESH_INTERVAL)? {
                if let TermEvent::Key(key) = event::read()? {
                    return Ok(Some(key.code));
                }
            }
            Ok(None)
        })
        .await??;

        match key {
            Some(KeyCode::Char('q')) | Some(KeyCode::Esc) => break,
            Some(KeyCode::Char('i')) => {
                let mut guard = scheduler.lock().unwrap_or_else(|e| e.into_inner());
                let next = guard.page_interval().next_selectable();
                guard.set_interval(next);
            }
            Some(KeyCode::Char('r')) => {
                let handles = cache.refresh_all();
                log::info!("🔄 Manual refresh of {} data sources", handles.len());
            }
            _ => {}
        }

        let frame = snapshot(&scheduler, &cache, &title);
        terminal.draw(|f| render_layout(f, f.area(), &frame))?;
    }

    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::cursor::Show
    )?;
    crossterm::terminal::disable_raw_mode()?;
    Ok(())
}
