//! solardash - terminal dashboard for a SolarEdge solar site
//!
//! Shows production, consumption and grid exchange for one site while keeping
//! API usage inside the provider's daily quota.

use std::io;
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use solardash::api::{CachedApiClient, Endpoint, ReqwestTransport};
use solardash::app::{App, AppState};
use solardash::cache::{FileStore, KeyValueStore, MemoryStore};
use solardash::cli::{Cli, StartupConfig};
use solardash::data::{site::default_params, SolarSite};
use solardash::logging::{self, LogTarget};
use solardash::refresh::{self, RefreshHandle};
use solardash::ui;

/// Sets up a panic hook that restores the terminal before printing the panic message.
/// This ensures the terminal is usable even if the application panics.
fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Attempt to restore the terminal
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        // Call the original panic hook
        original_hook(panic_info);
    }));
}

/// Opens the persistent cache, falling back to memory when there is no cache dir
fn open_store(cache_dir: Option<&Path>) -> (Arc<dyn KeyValueStore>, Option<PathBuf>) {
    let store = match cache_dir {
        Some(dir) => Some(FileStore::with_dir(dir)),
        None => FileStore::new(),
    };
    match store {
        Some(store) => {
            let dir = store.dir().to_path_buf();
            (Arc::new(store), Some(dir))
        }
        None => (Arc::new(MemoryStore::new()), None),
    }
}

/// Renders the UI based on the current application state
fn render_ui(frame: &mut ratatui::Frame, app: &App) {
    match &app.state {
        AppState::Loading => render_loading(frame),
        AppState::Dashboard => ui::render_dashboard(frame, app),
    }
    if app.show_help {
        ui::render_help_overlay(frame);
    }
}

/// Renders a loading message while data is being fetched
fn render_loading(frame: &mut ratatui::Frame) {
    use ratatui::{
        layout::{Alignment, Constraint, Direction, Layout},
        style::{Color, Style},
        widgets::Paragraph,
    };

    let area = frame.area();

    // Center the loading message vertically
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Length(3),
            Constraint::Percentage(45),
        ])
        .split(area);

    let loading_text = Paragraph::new("Loading solar data...")
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center);

    frame.render_widget(loading_text, chunks[1]);
}

/// Fetches one endpoint through the cache and prints its JSON
async fn dump(
    client: &CachedApiClient,
    endpoint: Endpoint,
    config: &StartupConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let params = default_params(endpoint, config.date);
    let fetched = client.fetch(endpoint, &params).await?;
    eprintln!(
        "{} ({:?}, stored {})",
        endpoint,
        fetched.source,
        fetched.stored_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("{}", serde_json::to_string_pretty(&fetched.payload)?);
    Ok(())
}

async fn run_dashboard(
    client: Arc<CachedApiClient>,
    config: StartupConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    // Set up panic hook to restore terminal on crash
    setup_panic_hook();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(SolarSite::new(client)).with_date(config.date);
    let mut refresh_handle = RefreshHandle::spawn(config.refresh.clone());

    // Initial render to show loading state
    terminal.draw(|f| render_ui(f, &app))?;

    // Trigger initial data load
    app.load_all_data().await;

    // Main event loop
    loop {
        terminal.draw(|f| render_ui(f, &app))?;

        // Poll for keyboard events with 100ms timeout
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.should_quit {
            break;
        }

        if refresh::try_recv(&mut refresh_handle).is_some() {
            tracing::info!("scheduled refresh");
            app.refresh_requested = true;
        }
        if app.refresh_requested {
            app.refresh_requested = false;
            app.load_all_data().await;
        }
    }

    refresh_handle.shutdown().await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match StartupConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    let (store, cache_dir) = open_store(config.cache_dir.as_deref());

    // The dashboard owns the terminal, so it only logs when there is a file to log to
    let log_target = match (&config.dump, cache_dir) {
        (Some(_), _) => Some(LogTarget::Stderr),
        (None, Some(dir)) => Some(LogTarget::File(logging::log_path(&dir))),
        (None, None) => None,
    };
    if let Some(target) = log_target {
        if let Err(e) = logging::init(&target) {
            eprintln!("Warning: {}", e);
        }
    }

    let transport = ReqwestTransport::with_timeout(config.timeout)?;
    let client = Arc::new(CachedApiClient::new(
        config.client.clone(),
        store,
        Arc::new(transport),
    ));
    tracing::info!(
        site_id = %client.config().site_id,
        base_url = %client.config().base_url,
        "starting"
    );

    if config.force_refresh {
        client.force_refresh();
    }

    match config.dump {
        Some(endpoint) => dump(&client, endpoint, &config).await,
        None => run_dashboard(client, config).await,
    }
}
