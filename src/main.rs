use std::{
    io,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{error, info};

use tymbr_tui::{
    HttpBackend, SessionController,
    app::{App, handle_input},
    logging,
    settings::Settings,
    storage::FileStore,
    ui::ui,
};

type Term = Terminal<CrosstermBackend<io::Stdout>>;

fn main() -> Result<()> {
    let settings = Settings::parse();
    let _logging = logging::init(&settings.log_dir(), &settings.log_level)?;
    info!(server = %settings.server, data_dir = %settings.data_dir().display(), "Starting tymbr");

    let backend = HttpBackend::new(settings.server.clone(), settings.request_timeout())
        .context("Failed to build HTTP client")?;
    let store = FileStore::new(settings.data_dir());
    let controller =
        SessionController::new(Arc::new(backend), Arc::new(store), settings.recent_limit);

    let mut app = App::new(controller, settings.server.as_str());
    app.reload();

    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let outcome = run(&mut terminal, &mut app, settings.tick_rate());

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &outcome {
        error!(error = %err, "Terminal loop failed");
    }
    info!("Exiting tymbr");
    outcome
}

fn run(terminal: &mut Term, app: &mut App, tick_rate: Duration) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && handle_input(app, key.code, key.modifiers) {
                    return Ok(());
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }
    }
}
