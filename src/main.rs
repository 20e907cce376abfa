pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::File,
    io::{self, stdin, Write},
    path::PathBuf,
};
use tracing::{info, warn};
use typespeed::{
    app_dirs::AppDirs,
    clock::{Clock, SystemClock},
    config::{Config, ConfigStore, FileConfigStore},
    controller::Controller,
    logging,
    passage::{Category, Difficulty, EmbeddedCatalog},
    persist::PersistWorker,
    results::{export_csv, ResultsStore, SqliteResultsStore, StoredResult},
    runtime::{AppEvent, CrosstermEventSource, EventSource, FixedTicker, Runner, Ticker},
    session::Phase,
};

/// timed typing test with difficulty levels and local result history
#[derive(Parser, Debug, Clone)]
#[clap(version, about)]
pub struct Cli {
    /// difficulty to pre-select on the menu
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// only draw passages from this category
    #[clap(short = 'c', long, value_enum)]
    category: Option<Category>,

    /// print recent results and exit
    #[clap(long)]
    history: bool,

    /// write every stored result to a CSV file and exit
    #[clap(long, value_name = "PATH")]
    export: Option<PathBuf>,

    /// results database to use instead of the default location
    #[clap(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// do not save results of this run
    #[clap(long)]
    no_save: bool,
}

impl Cli {
    /// Command line flags win over the stored config.
    fn apply(&self, mut config: Config) -> Config {
        if self.difficulty.is_some() {
            config.difficulty = self.difficulty;
        }
        if self.category.is_some() {
            config.category = self.category;
        }
        if self.no_save {
            config.save_results = false;
        }
        config
    }

    fn db_path(&self) -> Option<PathBuf> {
        self.db.clone().or_else(AppDirs::db_path)
    }
}

/// What the terminal currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Menu,
    Countdown,
    Typing,
    Results,
    History,
}

pub struct App<K: Clock = SystemClock> {
    pub controller: Controller<EmbeddedCatalog, K>,
    pub history: Vec<StoredResult>,
    pub best: Vec<StoredResult>,
    pub history_limit: usize,
    history_store: Option<Box<dyn ResultsStore>>,
    show_history: bool,
    /// Highlighted menu row, kept apart from the selection so arrows can move
    /// before anything is chosen.
    pub menu_cursor: usize,
    pub should_quit: bool,
}

impl<K: Clock> App<K> {
    pub fn new(controller: Controller<EmbeddedCatalog, K>, config: &Config) -> Self {
        let menu_cursor = config
            .difficulty
            .and_then(|d| Difficulty::ALL.iter().position(|&x| x == d))
            .unwrap_or(0);
        Self {
            controller,
            history: Vec::new(),
            best: Vec::new(),
            history_limit: config.history_limit,
            history_store: None,
            show_history: false,
            menu_cursor,
            should_quit: false,
        }
    }

    pub fn with_history_store(mut self, store: Box<dyn ResultsStore>) -> Self {
        self.history_store = Some(store);
        self
    }

    pub fn state(&self) -> AppState {
        if self.show_history {
            return AppState::History;
        }
        match self.controller.phase() {
            Phase::Idle => AppState::Menu,
            Phase::Countdown => AppState::Countdown,
            Phase::Running => AppState::Typing,
            Phase::Complete => AppState::Results,
        }
    }

    pub fn has_history_store(&self) -> bool {
        self.history_store.is_some()
    }

    fn open_history(&mut self) {
        if let Some(store) = &self.history_store {
            let loaded = store
                .recent(self.history_limit)
                .and_then(|recent| Ok((recent, store.best(self.history_limit)?)));
            match loaded {
                Ok((recent, best)) => {
                    self.history = recent;
                    self.best = best;
                }
                Err(e) => warn!(error = %e, "could not load history"),
            }
        }
        self.show_history = true;
    }

    /// Returns true when the screen needs redrawing.
    pub fn on_tick(&mut self) -> bool {
        let moved = !self.controller.advance_clock().is_empty();
        let noticed = self.controller.poll_persistence();
        moved || noticed
    }

    pub fn on_paste(&mut self, text: &str) {
        if self.state() == AppState::Typing {
            let buffer = format!("{}{}", self.controller.input_buffer(), text);
            self.controller.handle_input(&buffer);
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match self.state() {
            AppState::Menu => match key.code {
                KeyCode::Char(c @ '1'..='3') => {
                    self.menu_cursor = c as usize - '1' as usize;
                    self.controller
                        .select_difficulty(Difficulty::ALL[self.menu_cursor]);
                }
                KeyCode::Up | KeyCode::Left => {
                    self.menu_cursor = self.menu_cursor.saturating_sub(1);
                    self.controller
                        .select_difficulty(Difficulty::ALL[self.menu_cursor]);
                }
                KeyCode::Down | KeyCode::Right => {
                    self.menu_cursor = (self.menu_cursor + 1).min(Difficulty::ALL.len() - 1);
                    self.controller
                        .select_difficulty(Difficulty::ALL[self.menu_cursor]);
                }
                KeyCode::Enter => {
                    self.controller.start();
                }
                KeyCode::Char('h') => self.open_history(),
                KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
                _ => {}
            },
            AppState::Countdown => {
                if key.code == KeyCode::Esc {
                    self.controller.restart();
                }
            }
            AppState::Typing => match key.code {
                KeyCode::Esc => {
                    self.controller.restart();
                }
                KeyCode::Backspace => {
                    let mut buffer = self.controller.input_buffer().to_string();
                    if buffer.pop().is_some() {
                        self.controller.handle_input(&buffer);
                    }
                }
                KeyCode::Char(c) => {
                    let mut buffer = self.controller.input_buffer().to_string();
                    buffer.push(c);
                    self.controller.handle_input(&buffer);
                }
                _ => {}
            },
            AppState::Results => match key.code {
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('r') => {
                    self.controller.restart();
                }
                KeyCode::Char('h') => {
                    self.controller.restart();
                    self.open_history();
                }
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            },
            AppState::History => match key.code {
                KeyCode::Esc | KeyCode::Char('b') | KeyCode::Char('h') => {
                    self.show_history = false;
                }
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            },
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config_store = FileConfigStore::new();
    let config = cli.apply(config_store.load());

    let _log_guard = AppDirs::log_dir().and_then(|dir| logging::init(&dir));
    info!(version = env!("CARGO_PKG_VERSION"), "typespeed starting");

    let db_path = cli.db_path();

    if cli.history || cli.export.is_some() {
        let path = db_path.ok_or("no location for the results database")?;
        let store = SqliteResultsStore::open(&path)?;
        if let Some(out) = &cli.export {
            let rows = store.all()?;
            export_csv(&rows, File::create(out)?)?;
            println!("exported {} results to {}", rows.len(), out.display());
        }
        if cli.history {
            let mut out = io::stdout().lock();
            writeln!(out, "recent")?;
            print_history(&store.recent(config.history_limit)?, &mut out)?;
            writeln!(out, "\nbest")?;
            print_history(&store.best(config.history_limit)?, &mut out)?;
        }
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let mut controller = Controller::new(
        EmbeddedCatalog::new().with_category(config.category),
        SystemClock,
        config.session(),
    );
    if let Some(difficulty) = config.difficulty {
        controller.select_difficulty(difficulty);
    }

    let mut history_store: Option<Box<dyn ResultsStore>> = None;
    if let Some(path) = &db_path {
        if config.save_results {
            match SqliteResultsStore::open(path) {
                Ok(store) => controller = controller.with_persistence(PersistWorker::spawn(store)),
                Err(e) => warn!(error = %e, path = %path.display(), "results will not be saved"),
            }
        }
        match SqliteResultsStore::open(path) {
            Ok(store) => history_store = Some(Box::new(store)),
            Err(e) => warn!(error = %e, "history unavailable"),
        }
    }

    let mut app = App::new(controller, &config);
    if let Some(store) = history_store {
        app = app.with_history_store(store);
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::default());
    let outcome = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    outcome?;

    let remembered = Config {
        difficulty: app
            .controller
            .selected_difficulty()
            .or(config.difficulty),
        ..config_store.load()
    };
    if let Err(e) = config_store.save(&remembered) {
        warn!(error = %e, "could not save config");
    }

    Ok(())
}

fn start_tui<B: Backend, K: Clock, E: EventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App<K>,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| ui::ui(app, f))?;

    while !app.should_quit {
        let redraw = match runner.step() {
            AppEvent::Tick => app.on_tick() || app.state() == AppState::Typing,
            AppEvent::Resize => true,
            AppEvent::Paste(text) => {
                app.on_paste(&text);
                true
            }
            AppEvent::Key(key) => {
                app.on_key(key);
                true
            }
        };
        if redraw {
            terminal.draw(|f| ui::ui(app, f))?;
        }
    }

    Ok(())
}

fn print_history<W: Write>(rows: &[StoredResult], mut out: W) -> io::Result<()> {
    if rows.is_empty() {
        return writeln!(out, "no results yet");
    }
    writeln!(
        out,
        "{:<19}  {:<6}  {:>4}  {:>4}  {:>7}  rating",
        "when", "level", "wpm", "acc", "words"
    )?;
    for row in rows {
        let r = &row.record;
        writeln!(
            out,
            "{:<19}  {:<6}  {:>4}  {:>3}%  {:>3}/{:<3}  {}",
            r.timestamp.format("%Y-%m-%d %H:%M:%S"),
            r.difficulty,
            r.wpm,
            r.accuracy,
            r.correct_words,
            r.total_typed_words,
            r.rating()
        )?;
    }
    Ok(())
}
