#![allow(clippy::multiple_crate_versions)]

mod app;
mod handlers;
mod logging;
mod navigator;
mod state;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use moodconfig::{FileTokenStore, MoodConfig};
use moodlift::{MoodClient, PlaylistFlow, Session};
use navigator::TuiNavigator;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use url::Url;

#[derive(Parser)]
#[command(name = "moodtui", about = "Terminal dashboard for mood transitions")]
struct Cli {
    /// URL the browser landed on after linking Spotify (with ?auth_status=...)
    #[arg(long)]
    location: Option<String>,
    /// Use this config file instead of the standard location
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => MoodConfig::load_from(path),
        None => MoodConfig::load(),
    }
    .with_context(|| "Failed to load moodlift config")?;
    logging::init_logging(&config.tui.log_dir).with_context(|| "Failed to set up logging")?;

    let location = cli
        .location
        .as_deref()
        .unwrap_or(config.server.return_url.as_str());
    let location = Url::parse(location).with_context(|| format!("Invalid location: {location}"))?;

    let tokens = FileTokenStore::new().with_context(|| "Failed to locate session file")?;
    let api = config
        .api_client(Arc::new(tokens))
        .with_context(|| "Failed to build API client")?;
    let runtime = Runtime::new().with_context(|| "Failed to start async runtime")?;

    let mut app = App::new(
        config,
        Session::new(api.clone()),
        MoodClient::new(api.clone()),
        PlaylistFlow::new(api),
        TuiNavigator::new(location),
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app, &runtime);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &result {
        tracing::error!(error = %err, "moodtui exited with error");
    }
    result
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    runtime: &Runtime,
) -> Result<()> {
    app.start(runtime);

    loop {
        app.clear_expired_status();
        terminal.draw(|f| ui::render_app(f, app))?;

        if event::poll(state::TICK_RATE)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handlers::handle_key(app, key, runtime) {
                    return Ok(());
                }
            }
        }
    }
}
