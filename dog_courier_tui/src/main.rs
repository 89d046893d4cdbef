use anyhow::{Context, Result};
use clap::Parser;
use dog_courier_core::{
    Direction as Heading, Move, PlayerId,
    agent::{Agent, Courier, RandomWalker, steer_all},
    config::load_game,
    game::Game,
    map::{Map, MapId},
    session::{Dog, GameSession, SpawnPoint, TickReport},
};
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{self, Stdout},
    path::PathBuf,
    sync::Mutex,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Game config file to load
    #[arg(short, long, value_name = "CONFIG_FILE", default_value = "maps/town.json")]
    config: PathBuf,

    /// Map to join, defaults to the first map in the config
    #[arg(short, long)]
    map: Option<String>,

    /// Name of your dog
    #[arg(short, long, default_value = "Rex")]
    name: String,

    /// Milliseconds between simulation ticks. Without it time only advances
    /// when 't' is pressed.
    #[arg(short, long)]
    tick_period: Option<u64>,

    /// Spawn dogs at random spots instead of the start of the first road
    #[arg(long)]
    randomize_spawn_points: bool,

    /// Seed for every random stream, random if omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Number of bot dogs sharing the map
    #[arg(short, long, default_value_t = 2)]
    bots: usize,

    /// Write logs here. Nothing is logged without it since the terminal is in use.
    #[arg(long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,
}

/// Simulated time added by one manual tick.
const MANUAL_STEP: Duration = Duration::from_millis(100);

/// How often the screen refreshes while waiting for a manual tick.
const IDLE_POLL: Duration = Duration::from_millis(250);

/// How simulated time advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clock {
    /// Tick by the real time elapsed, once per period.
    Periodic(Duration),
    /// Tick only on request, by [`MANUAL_STEP`].
    Manual,
}

impl Clock {
    fn from_period(tick_period: Option<u64>) -> Self {
        match tick_period {
            Some(ms) => Clock::Periodic(Duration::from_millis(ms.max(1))),
            None => Clock::Manual,
        }
    }

    /// How long to wait for input before checking the clock again.
    fn poll_timeout(self, since_tick: Duration) -> Duration {
        match self {
            Clock::Periodic(period) => period.saturating_sub(since_tick),
            Clock::Manual => IDLE_POLL,
        }
    }

    /// The time to advance by now, if a tick is due.
    fn due(self, since_tick: Duration) -> Option<Duration> {
        match self {
            Clock::Periodic(period) if since_tick >= period => Some(since_tick),
            _ => None,
        }
    }

    /// The time a requested tick advances by. Only the manual clock takes requests.
    fn forced(self) -> Option<Duration> {
        match self {
            Clock::Manual => Some(MANUAL_STEP),
            Clock::Periodic(_) => None,
        }
    }
}

struct App {
    /// The core simulation.
    game: Game,
    /// Bots driving the other dogs.
    bots: Vec<Box<dyn Agent>>,
    /// The dog driven from the keyboard.
    player: PlayerId,
    /// Running totals of every tick so far.
    totals: TickReport,
    clock: Clock,
    /// Flag to control the main loop.
    should_quit: bool,
}

impl App {
    fn new(args: &Args) -> Result<Self> {
        let seed = args.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default()
        });
        let mut game = load_game(&args.config, seed)
            .with_context(|| format!("Failed to load config {}", args.config.display()))?;

        let map_id = match &args.map {
            Some(id) => MapId(id.clone()),
            None => game
                .maps()
                .first()
                .map(|m| m.id().clone())
                .context("Config has no maps")?,
        };
        if game.find_map(&map_id).is_none() {
            anyhow::bail!("Map '{map_id}' not found in {}", args.config.display());
        }

        let spawn = if args.randomize_spawn_points {
            SpawnPoint::Random
        } else {
            game.default_spawn(&map_id)
                .map(SpawnPoint::At)
                .unwrap_or(SpawnPoint::Random)
        };
        let player = game.join(&map_id, &args.name, spawn)?.player_id;

        let mut bots: Vec<Box<dyn Agent>> = Vec::with_capacity(args.bots);
        for i in 0..args.bots {
            let joined = game.join(&map_id, &format!("bot{i}"), SpawnPoint::Random)?;
            // Alternate couriers and wanderers.
            if i % 2 == 0 {
                bots.push(Box::new(Courier::new(joined.player_id)));
            } else {
                bots.push(Box::new(RandomWalker::new(
                    joined.player_id,
                    seed.wrapping_add(i as u64),
                )));
            }
        }
        info!(map = %map_id, seed, bots = bots.len(), "game started");

        Ok(App {
            game,
            bots,
            player,
            totals: TickReport::default(),
            clock: Clock::from_period(args.tick_period),
            should_quit: false,
        })
    }

    /// Handles one step of the simulation.
    fn tick(&mut self, delta: Duration) {
        steer_all(&mut self.game, &mut self.bots);
        let report = self.game.tick(delta);
        self.totals.merge(&report);
    }

    fn steer(&mut self, command: Move) {
        self.game.set_direction(self.player, command);
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }

    fn session(&self) -> Option<(&GameSession, &Map)> {
        let session = self.game.session_for(self.player)?;
        let map = self.game.find_map(session.map_id())?;
        Some((session, map))
    }
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    init_logging(args.log_file.as_ref())?;

    // Build the game before touching the terminal so errors print normally
    let mut app = App::new(&args)?;

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut app);
    restore_terminal(&mut terminal)?;
    result
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = app.clock.poll_timeout(last_tick.elapsed());

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                        KeyCode::Left => app.steer(Move::Go(Heading::Left)),
                        KeyCode::Right => app.steer(Move::Go(Heading::Right)),
                        KeyCode::Up => app.steer(Move::Go(Heading::Up)),
                        KeyCode::Down => app.steer(Move::Go(Heading::Down)),
                        KeyCode::Char(' ') => app.steer(Move::Stop),
                        KeyCode::Char('t') => {
                            if let Some(step) = app.clock.forced() {
                                app.tick(step);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        // The simulation advances by the real time that passed
        if let Some(elapsed) = app.clock.due(last_tick.elapsed()) {
            app.tick(elapsed);
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(70), // Map
            Constraint::Percentage(22), // Bags
            Constraint::Min(2),         // Status/help
        ])
        .split(frame.area());

    if let Some((session, map)) = app.session() {
        render_map(frame, main_layout[0], app, session, map);
        render_bags(frame, main_layout[1], app, session, map);
    }

    let tick_help = match app.clock {
        Clock::Manual => ", 't' ticks",
        Clock::Periodic(_) => "",
    };
    let help_text = Paragraph::new(format!(
        "Arrows move, space stops{tick_help}, 'q'/'Esc' quits. Collected: {} Delivered: {}",
        app.totals.collected, app.totals.delivered
    ))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

fn is_player(app: &App, dog: &Dog) -> bool {
    app.game
        .find_player(app.player)
        .is_some_and(|p| p.dog == dog.id())
}

fn loot_name(map: &Map, loot_type: usize) -> &str {
    map.loot_type(loot_type)
        .and_then(|t| t.name())
        .unwrap_or("loot")
}

/// Renders every dog's bag, grouped by loot type.
fn render_bags(frame: &mut Frame, area: Rect, app: &App, session: &GameSession, map: &Map) {
    let items: Vec<ListItem> = session
        .dogs()
        .iter()
        .map(|dog| {
            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            for &loot_type in dog.bag().values() {
                *counts.entry(loot_name(map, loot_type)).or_default() += 1;
            }
            let contents = counts
                .iter()
                .map(|(name, n)| format!("{name} x{n}"))
                .collect::<Vec<_>>()
                .join(", ");

            let style = if is_player(app, dog) {
                Style::default().fg(Color::Red).bold()
            } else {
                Style::default()
            };
            let pos = dog.position();
            ListItem::from(Line::from(vec![
                Span::styled(format!("{:<8}", dog.name()), style),
                Span::raw(format!(
                    " ({:6.2}, {:6.2}) [{}/{}] {}",
                    pos.x,
                    pos.y,
                    dog.bag().len(),
                    map.bag_capacity(),
                    contents
                )),
            ]))
        })
        .collect();

    let bags = List::new(items).block(Block::default().borders(Borders::ALL).title("Bags"));
    frame.render_widget(bags, area);
}

/// Renders the map one character per integer coordinate.
fn render_map(frame: &mut Frame, area: Rect, app: &App, session: &GameSession, map: &Map) {
    let roads = map.roads().all();
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (0i64, 0i64, 0i64, 0i64);
    for road in roads {
        for p in [road.start(), road.end()] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
    }
    let width = (max_x - min_x + 1) as usize;
    let height = (max_y - min_y + 1) as usize;
    let mut grid = vec![vec![(' ', Style::default()); width]; height];

    let mut put = |x: i64, y: i64, cell: (char, Style)| {
        if (min_x..=max_x).contains(&x) && (min_y..=max_y).contains(&y) {
            grid[(y - min_y) as usize][(x - min_x) as usize] = cell;
        }
    };

    for b in map.buildings() {
        for y in b.position.y..b.position.y + b.height {
            for x in b.position.x..b.position.x + b.width {
                put(x, y, ('#', Style::default().fg(Color::DarkGray)));
            }
        }
    }
    for road in roads {
        let (from, to) = road.span();
        for along in from..=to {
            let (x, y) = if road.is_horizontal() {
                (along, road.cross_key())
            } else {
                (road.cross_key(), along)
            };
            put(x, y, ('.', Style::default().fg(Color::Gray)));
        }
    }
    for office in map.offices() {
        put(
            office.position.x,
            office.position.y,
            ('O', Style::default().fg(Color::Green).bold()),
        );
    }
    for loot in session.active_loot() {
        let symbol = loot_name(map, loot.loot_type).chars().next().unwrap_or('*');
        put(
            loot.position.x.round() as i64,
            loot.position.y.round() as i64,
            (symbol, Style::default().fg(Color::Yellow)),
        );
    }
    for dog in session.dogs() {
        let style = if is_player(app, dog) {
            Style::default().fg(Color::Red).bold()
        } else {
            Style::default().fg(Color::Cyan)
        };
        let pos = dog.position();
        put(pos.x.round() as i64, pos.y.round() as i64, ('@', style));
    }

    let lines: Vec<Line> = grid
        .into_iter()
        .map(|row| {
            Line::from(
                row.into_iter()
                    .map(|(c, style)| Span::styled(c.to_string(), style))
                    .collect::<Vec<_>>(),
            )
        })
        .collect();

    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title(map.name().to_string()).borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_period_means_manual_ticks() {
        let clock = Clock::from_period(None);
        assert_eq!(clock, Clock::Manual);
        assert_eq!(clock.due(Duration::from_secs(60)), None);
        assert_eq!(clock.forced(), Some(MANUAL_STEP));
        assert_eq!(clock.poll_timeout(Duration::ZERO), IDLE_POLL);
    }

    #[test]
    fn periodic_clock_ticks_by_elapsed_time() {
        let clock = Clock::from_period(Some(100));
        assert_eq!(clock.due(Duration::from_millis(40)), None);
        assert_eq!(clock.due(Duration::from_millis(130)), Some(Duration::from_millis(130)));
        assert_eq!(clock.poll_timeout(Duration::from_millis(40)), Duration::from_millis(60));
        assert_eq!(clock.poll_timeout(Duration::from_millis(400)), Duration::ZERO);
        assert_eq!(clock.forced(), None);
    }

    #[test]
    fn zero_period_is_clamped() {
        assert_eq!(
            Clock::from_period(Some(0)),
            Clock::Periodic(Duration::from_millis(1))
        );
    }
}
