mod app;
mod braille;
mod color;
mod config;
mod connector;
mod error;
mod export;
mod field;
mod particle;
mod prefs;
mod render;
mod settings;
mod theme;
mod ui;

use anyhow::{bail, Context};
use app::{App, Focus, FrameClock, Section};
use clap::Parser;
use color::Theme;
use config::FieldConfig;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
        MouseButton, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use field::ParticleField;
use particle::Viewport;
use prefs::PreferenceStore;
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use settings::{FieldSettings, LinkStrategy, LinkStyle};
use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "particle-field")]
#[command(about = "Interactive particle field with proximity links, in the terminal")]
struct Args {
    /// Color theme (light, dark); defaults to the saved choice, then the terminal background
    #[arg(short = 't', long)]
    theme: Option<String>,

    /// Upper bound on persistent particles (10-1000)
    #[arg(short = 'p', long = "max-particles")]
    max_particles: Option<usize>,

    /// Field pixels covered by one Braille dot (1-16)
    #[arg(long = "pixels-per-dot")]
    pixels_per_dot: Option<f32>,

    /// Pair search for links (exhaustive, grid)
    #[arg(long)]
    links: Option<String>,

    /// Link coloring (gradient, palette)
    #[arg(long = "link-style")]
    link_style: Option<String>,

    /// Particles per click ripple (1-48)
    #[arg(long)]
    ripple: Option<usize>,

    /// Disable the particle halo
    #[arg(long = "no-glow", default_value = "false")]
    no_glow: bool,

    /// RNG seed for a reproducible field
    #[arg(long)]
    seed: Option<u64>,

    /// Load field settings from a JSON file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Write the effective settings to a JSON file and exit
    #[arg(long = "save-config")]
    save_config: Option<PathBuf>,

    /// Render headless to a .png (last frame) or .gif (all frames) and exit
    #[arg(short = 'e', long)]
    export: Option<PathBuf>,

    /// Frames to simulate for --export
    #[arg(long, default_value = "120")]
    frames: usize,

    /// Export width in field pixels
    #[arg(long, default_value = "800")]
    width: u32,

    /// Export height in field pixels
    #[arg(long, default_value = "600")]
    height: u32,

    /// Log file for the interactive mode
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,
}

fn parse_theme(s: &str) -> anyhow::Result<Theme> {
    match Theme::parse(s) {
        Some(theme) => Ok(theme),
        None => bail!("unknown theme '{}' (expected light or dark)", s),
    }
}

fn parse_link_strategy(s: &str) -> LinkStrategy {
    match s.to_lowercase().as_str() {
        "exhaustive" | "all" | "pairs" => LinkStrategy::Exhaustive,
        _ => LinkStrategy::Grid,
    }
}

fn parse_link_style(s: &str) -> LinkStyle {
    match s.to_lowercase().as_str() {
        "palette" | "flat" | "theme" => LinkStyle::Palette,
        _ => LinkStyle::Gradient,
    }
}

/// Apply CLI overrides on top of file or default settings, then bound the result
fn settings_from_args(args: &Args, base: FieldSettings) -> FieldSettings {
    let mut settings = base;
    if let Some(max) = args.max_particles {
        settings.max_particles = max;
    }
    if let Some(ppd) = args.pixels_per_dot {
        settings.pixels_per_dot = ppd;
    }
    if let Some(links) = &args.links {
        settings.link_strategy = parse_link_strategy(links);
    }
    if let Some(style) = &args.link_style {
        settings.link_style = parse_link_style(style);
    }
    if let Some(ripple) = args.ripple {
        settings.ripple_count = ripple;
    }
    if args.no_glow {
        settings.glow = false;
    }
    settings.clamped()
}

/// Flag, then saved preference, then the terminal's COLORFGBG hint, then dark
fn initial_theme(args: &Args, prefs: &PreferenceStore) -> anyhow::Result<Theme> {
    if let Some(name) = &args.theme {
        return parse_theme(name);
    }
    if let Some(theme) = prefs.theme() {
        return Ok(theme);
    }
    Ok(std::env::var("COLORFGBG")
        .ok()
        .and_then(|v| Theme::from_colorfgbg(&v))
        .unwrap_or_default())
}

fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|p| p.join("particle-field").join("particle-field.log"))
}

/// Interactive mode logs to a file so output never lands on the alternate screen
fn init_tracing(log_file: Option<PathBuf>, interactive: bool) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("particle_field=info"));

    if !interactive {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
        return Ok(());
    }

    let Some(path) = log_file.or_else(default_log_path) else {
        return Ok(());
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating log directory {}", dir.display()))?;
    }
    let file = File::create(&path).with_context(|| format!("opening log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let interactive = args.export.is_none() && args.save_config.is_none();
    init_tracing(args.log_file.clone(), interactive)?;

    let file_config = match &args.config {
        Some(path) => FieldConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => FieldConfig::default(),
    };
    let settings = settings_from_args(&args, file_config.settings);
    let seed = args.seed.or(file_config.seed);

    if let Some(path) = &args.save_config {
        let config = FieldConfig {
            settings,
            seed,
            ..Default::default()
        };
        config
            .save_to_file(path)
            .with_context(|| format!("saving config {}", path.display()))?;
        info!(path = %path.display(), "config saved");
        return Ok(());
    }

    let prefs = PreferenceStore::open_default();
    let theme = initial_theme(&args, &prefs)?;

    if let Some(path) = &args.export {
        let viewport = Viewport::new(args.width.max(1) as f32, args.height.max(1) as f32);
        let mut field = ParticleField::new(viewport, settings, theme, seed);
        export::export(&mut field, path, args.frames)
            .with_context(|| format!("exporting {}", path.display()))?;
        return Ok(());
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let size = terminal.size()?;
    let frame_rect = Rect::new(0, 0, size.width, size.height);
    let mut app = App::new(ui::canvas_area(frame_rect, false), settings, theme, prefs, seed);

    let res = run_app(&mut terminal, &mut app);

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        warn!("terminal loop failed: {}", err);
    }
    res.context("running terminal UI")
}

fn refit_canvas(app: &mut App, width: u16, height: u16) {
    let canvas = ui::canvas_area(Rect::new(0, 0, width, height), app.fullscreen_mode);
    if canvas != app.canvas {
        app.resize(canvas);
    }
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    // Target ~60fps for smooth animation
    const FRAME_DURATION: Duration = Duration::from_millis(16);

    let mut clock = FrameClock::new(FRAME_DURATION, Instant::now());
    app.tick();
    terminal.draw(|frame| ui::render(frame, app))?;

    loop {
        // Drain input until the next frame is due; events never advance the field themselves
        if event::poll(clock.remaining(Instant::now()))?
            && handle_event(terminal, app, event::read()?)?
        {
            return Ok(());
        }

        if clock.tick_due(Instant::now()) {
            app.tick();
            terminal.draw(|frame| ui::render(frame, app))?;
        }
    }
}

/// Dispatch one input event; returns true when the app should quit
fn handle_event<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    event: Event,
) -> io::Result<bool> {
    match event {
        Event::Key(key) => {
            // Only process Press events
            if key.kind != KeyEventKind::Press {
                return Ok(false);
            }

            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                return Ok(true);
            }

            match key.code {
                KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(true),
                KeyCode::Char(' ') => app.toggle_pause(),
                KeyCode::Char('r') | KeyCode::Char('R') => app.reset(),
                KeyCode::Char('t') | KeyCode::Char('T') => app.toggle_theme(),
                KeyCode::Char('c') | KeyCode::Char('C') => app.ripple(),
                KeyCode::Char('p') | KeyCode::Char('P') => app.snapshot(),
                KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Char('?') => app.toggle_help(),
                KeyCode::Char('v') | KeyCode::Char('V') => {
                    app.toggle_fullscreen();
                    let size = terminal.size()?;
                    refit_canvas(app, size.width, size.height);
                }
                KeyCode::Char('l') | KeyCode::Char('L') => {
                    app.cycle_link_strategy();
                    app.focus = Focus::Links;
                }
                KeyCode::Char('s') | KeyCode::Char('S') => {
                    app.cycle_link_style();
                    app.focus = Focus::Style;
                }
                KeyCode::Char('g') | KeyCode::Char('G') => {
                    app.toggle_glow();
                    app.focus = Focus::Glow;
                }
                KeyCode::Char('1') => app.toggle_section(Section::Status),
                KeyCode::Char('2') => app.toggle_section(Section::Field),
                KeyCode::Char('3') => app.toggle_section(Section::Controls),

                // Navigation
                KeyCode::Tab => app.next_focus(),
                KeyCode::BackTab => app.prev_focus(),
                KeyCode::Up => {
                    if !app.show_help {
                        if app.focus.is_param() {
                            app.adjust_focused_up();
                        } else {
                            app.scroll_controls_up();
                        }
                    }
                }
                KeyCode::Down => {
                    if !app.show_help {
                        if app.focus.is_param() {
                            app.adjust_focused_down();
                        } else {
                            let term_size = terminal.size()?;
                            let visible = ui::get_controls_visible_lines(app, term_size.height);
                            app.scroll_controls_down(
                                ui::CONTROLS_CONTENT_LINES.saturating_sub(visible),
                            );
                        }
                    }
                }
                KeyCode::Esc => {
                    if app.show_help {
                        app.toggle_help();
                    } else if app.focus.is_param() {
                        app.focus = Focus::Controls;
                    }
                }
                KeyCode::Char('j') | KeyCode::Char('J') => {
                    if app.show_help {
                        app.scroll_help_down(ui::HELP_CONTENT_LINES);
                    }
                }
                KeyCode::Char('k') | KeyCode::Char('K') => {
                    if app.show_help {
                        app.scroll_help_up();
                    }
                }
                _ => {}
            }
        }
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::Moved | MouseEventKind::Drag(_) => {
                app.pointer_moved(mouse.column, mouse.row)
            }
            MouseEventKind::Down(MouseButton::Left) => app.clicked(mouse.column, mouse.row),
            _ => {}
        },
        Event::Resize(width, height) => refit_canvas(app, width, height),
        _ => {}
    }
    Ok(false)
}
