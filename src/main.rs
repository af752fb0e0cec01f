use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    time::Duration,
};

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::KeyEventKind,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use vocab_duel::{
    app::{App, TerminalBell},
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    runtime::{CrosstermEventSource, FixedTicker, QuizEvent, Runner},
    session::{Session, SessionSettings},
    ui,
    vocabulary::VocabularyStore,
};

const TICK_RATE_MS: u64 = 100;

/// vocabulary matching duels in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Match English words to their definitions against the clock. Play a computer opponent, or host and join rooms against a simulated remote player."
)]
pub struct Cli {
    /// name shown to the other player
    #[clap(short = 'n', long)]
    name: Option<String>,

    /// date-set to quiz on; repeat to combine several
    #[clap(short = 'd', long = "date")]
    dates: Vec<String>,

    /// join a room from a shared link or a bare room code
    #[clap(short = 'l', long)]
    link: Option<String>,

    /// seed for a reproducible game
    #[clap(long)]
    seed: Option<u64>,

    /// start with sound cues off
    #[clap(long)]
    mute: bool,

    /// print the available date-sets and exit
    #[clap(long)]
    list_dates: bool,
}

impl Cli {
    /// Command-line flags win over the saved config.
    fn apply(&self, cfg: &mut Config) {
        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            cfg.player_name = name.to_string();
        }
        if !self.dates.is_empty() {
            cfg.selected_dates = self.dates.clone();
        }
        if self.mute {
            cfg.muted = true;
        }
    }
}

fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(dir) = path.parent() {
        if fs::create_dir_all(dir).is_err() {
            return;
        }
    }
    // stderr would draw over the TUI, so logs only go to the file
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
}

fn build_session(cli: &Cli, cfg: &Config, store: VocabularyStore) -> Session {
    let settings = SessionSettings::from(cfg);
    let mut session = match cli.seed {
        Some(seed) => Session::with_seed(store, settings, seed),
        None => Session::new(store, settings),
    };

    session.set_player_name(&cfg.player_name);
    if session.select_dates(cfg.selected_dates.clone()).is_err() {
        log::warn!("could not restore the saved date selection");
    }
    if let Some(link) = &cli.link {
        if let Err(e) = session.open_link(link) {
            log::warn!("ignoring --link {link:?}: {e}");
        }
    }
    session
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let store = VocabularyStore::builtin()?;

    if cli.list_dates {
        for set in store.date_sets() {
            println!("{}\t{} words", set.label, set.entries.len());
        }
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging();
    log::info!("starting vocab-duel {}", env!("CARGO_PKG_VERSION"));

    let config_store = FileConfigStore::new();
    let mut config = config_store.load();
    cli.apply(&mut config);

    let session = build_session(&cli, &config, store);
    let mut app = App::new(session, config.muted);
    let bell = TerminalBell::new(app.mute_flag());
    app.session.subscribe(Box::new(bell));

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    app.save_into(&mut config);
    if let Err(e) = config_store.save(&config) {
        log::warn!("could not save config to {}: {e}", config_store.path().display());
    }

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let mut runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let size = terminal.size()?;
    app.resize(size.width, size.height);

    loop {
        terminal.draw(|f| ui::draw(app, f))?;

        let event = runner.step();
        app.advance(runner.take_elapsed());

        match event {
            QuizEvent::Key(key) if key.kind == KeyEventKind::Press => app.on_key(key),
            QuizEvent::Key(_) | QuizEvent::Tick => {}
            QuizEvent::Resize => {
                let size = terminal.size()?;
                app.resize(size.width, size.height);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
