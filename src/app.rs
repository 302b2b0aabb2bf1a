use crate::braille::{self, BrailleSurface};
use crate::color::Theme;
use crate::export;
use crate::field::ParticleField;
use crate::prefs::PreferenceStore;
use crate::settings::FieldSettings;
use crate::theme::ThemeStore;
use ratatui::layout::Rect;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Focus state for parameter editing in the sidebar
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Focus {
    #[default]
    None,
    Particles,
    Radius,
    Chance,
    Ripple,
    Scale,
    Links,
    Style,
    Glow,
    // Controls box (not a param)
    Controls,
}

impl Focus {
    /// Tab cycles through parameters top to bottom
    pub fn next(&self) -> Focus {
        match self {
            Focus::None | Focus::Controls => Focus::Particles,
            Focus::Particles => Focus::Radius,
            Focus::Radius => Focus::Chance,
            Focus::Chance => Focus::Ripple,
            Focus::Ripple => Focus::Scale,
            Focus::Scale => Focus::Links,
            Focus::Links => Focus::Style,
            Focus::Style => Focus::Glow,
            Focus::Glow => Focus::Particles,
        }
    }

    pub fn prev(&self) -> Focus {
        match self {
            Focus::None | Focus::Controls => Focus::Glow,
            Focus::Particles => Focus::Glow,
            Focus::Radius => Focus::Particles,
            Focus::Chance => Focus::Radius,
            Focus::Ripple => Focus::Chance,
            Focus::Scale => Focus::Ripple,
            Focus::Links => Focus::Scale,
            Focus::Style => Focus::Links,
            Focus::Glow => Focus::Style,
        }
    }

    /// Check if focus is on a parameter (not Controls or None)
    pub fn is_param(&self) -> bool {
        !matches!(self, Focus::None | Focus::Controls)
    }

    /// Line of the parameter in the Field box, for scrolling it into view
    pub fn line_index(&self) -> u16 {
        match self {
            Focus::None | Focus::Controls | Focus::Particles => 0,
            Focus::Radius => 1,
            Focus::Chance => 2,
            Focus::Ripple => 3,
            Focus::Scale => 4,
            Focus::Links => 5,
            Focus::Style => 6,
            Focus::Glow => 7,
        }
    }
}

/// Collapsible sidebar sections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Status,
    Field,
    Controls,
}

impl Section {
    pub fn name(&self) -> &'static str {
        match self {
            Section::Status => "Status",
            Section::Field => "Field",
            Section::Controls => "Controls",
        }
    }
}

/// Paces animation frames to a fixed interval, however many input events arrive in between
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    interval: Duration,
    last: Instant,
}

impl FrameClock {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last: now,
        }
    }

    /// How long input may be waited on before the next frame is due
    pub fn remaining(&self, now: Instant) -> Duration {
        self.interval
            .saturating_sub(now.saturating_duration_since(self.last))
    }

    /// True once per elapsed interval; a late frame does not cause catch-up frames
    pub fn tick_due(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last) < self.interval {
            return false;
        }
        self.last = now;
        true
    }
}

/// Main application state
pub struct App {
    pub field: ParticleField,
    pub theme: ThemeStore,
    pub prefs: PreferenceStore,
    pub surface: BrailleSurface,
    /// Canvas area inside its border, in terminal cells
    pub canvas: Rect,
    pub focus: Focus,
    pub fullscreen_mode: bool,
    pub show_help: bool,
    pub help_scroll: u16,
    pub controls_scroll: u16,
    pub message: Option<String>,
    pub fps: f32,
    last_frame: Instant,
}

impl App {
    pub fn new(
        canvas: Rect,
        settings: FieldSettings,
        theme: Theme,
        prefs: PreferenceStore,
        seed: Option<u64>,
    ) -> Self {
        let viewport = braille::calculate_viewport(canvas.width, canvas.height, settings.pixels_per_dot);
        let surface = BrailleSurface::new(canvas.width, canvas.height, settings.pixels_per_dot);
        let mut theme = ThemeStore::new(theme);
        let mut field = ParticleField::new(viewport, settings, theme.current(), seed);
        field.subscribe(theme.subscribe());
        info!(
            width = viewport.width,
            height = viewport.height,
            particles = field.particles().len(),
            theme = theme.current().name(),
            "field ready"
        );
        Self {
            field,
            theme,
            prefs,
            surface,
            canvas,
            focus: Focus::Controls,
            fullscreen_mode: false,
            show_help: false,
            help_scroll: 0,
            controls_scroll: 0,
            message: None,
            fps: 0.0,
            last_frame: Instant::now(),
        }
    }

    /// Run one animation frame into the Braille buffer
    pub fn tick(&mut self) {
        if self.canvas.area() == 0 {
            // nothing visible; keep the field moving
            self.field.advance();
        } else {
            self.field.frame(&mut self.surface);
        }

        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        if dt > 0.0 {
            // exponential smoothing keeps the readout steady
            self.fps = if self.fps == 0.0 { 1.0 / dt } else { self.fps * 0.9 + 0.1 / dt };
        }
    }

    /// Canvas moved or changed size: rebuild the field for the new viewport
    pub fn resize(&mut self, canvas: Rect) {
        self.canvas = canvas;
        let ppd = self.field.settings().pixels_per_dot;
        self.surface = BrailleSurface::new(canvas.width, canvas.height, ppd);
        let viewport = braille::calculate_viewport(canvas.width, canvas.height, ppd);
        self.field.resize(viewport.width, viewport.height);
    }

    /// Terminal cell to field position, if it lies on the canvas
    fn to_field(&self, column: u16, row: u16) -> Option<(f32, f32)> {
        let c = self.canvas;
        if column < c.x || row < c.y || column >= c.x + c.width || row >= c.y + c.height {
            return None;
        }
        Some(braille::cell_to_field(
            column - c.x,
            row - c.y,
            self.field.settings().pixels_per_dot,
        ))
    }

    pub fn pointer_moved(&mut self, column: u16, row: u16) {
        if let Some((x, y)) = self.to_field(column, row) {
            self.field.pointer_moved(x, y);
        }
    }

    pub fn clicked(&mut self, column: u16, row: u16) {
        if let Some((x, y)) = self.to_field(column, row) {
            self.field.clicked(x, y);
        }
    }

    /// Ripple at the last pointer position, or the canvas center
    pub fn ripple(&mut self) {
        let (x, y) = self
            .field
            .mouse()
            .position
            .unwrap_or_else(|| self.field.viewport().center());
        self.field.clicked(x, y);
    }

    pub fn toggle_theme(&mut self) {
        let theme = self.theme.toggle();
        if let Err(e) = self.prefs.set_theme(theme) {
            warn!("could not persist theme: {}", e);
        }
    }

    pub fn toggle_section(&mut self, section: Section) {
        if let Err(e) = self.prefs.toggle_collapsed(section.name()) {
            warn!(section = section.name(), "could not persist section state: {}", e);
        }
    }

    pub fn is_collapsed(&self, section: Section) -> bool {
        self.prefs.is_collapsed(section.name())
    }

    /// Apply a settings change; the Braille grid follows the pixel scale
    fn update_settings(&mut self, change: impl FnOnce(&mut FieldSettings)) {
        let mut settings = self.field.settings().clone();
        let old_scale = settings.pixels_per_dot;
        change(&mut settings);
        let rescaled = settings.pixels_per_dot != old_scale;
        self.field.set_settings(settings);
        if rescaled {
            self.resize(self.canvas);
        }
    }

    /// Handle adjusting the currently focused parameter
    pub fn adjust_focused_up(&mut self) {
        match self.focus {
            Focus::None | Focus::Controls => {}
            Focus::Particles => self.update_settings(|s| s.adjust_max_particles(10)),
            Focus::Radius => self.update_settings(|s| s.adjust_mouse_radius(10.0)),
            Focus::Chance => self.update_settings(|s| s.adjust_spawn_chance(0.05)),
            Focus::Ripple => self.update_settings(|s| s.adjust_ripple_count(1)),
            Focus::Scale => self.update_settings(|s| s.adjust_pixels_per_dot(0.5)),
            Focus::Links => self.cycle_link_strategy(),
            Focus::Style => self.cycle_link_style(),
            Focus::Glow => self.toggle_glow(),
        }
    }

    /// Handle adjusting the currently focused parameter
    pub fn adjust_focused_down(&mut self) {
        match self.focus {
            Focus::None | Focus::Controls => {}
            Focus::Particles => self.update_settings(|s| s.adjust_max_particles(-10)),
            Focus::Radius => self.update_settings(|s| s.adjust_mouse_radius(-10.0)),
            Focus::Chance => self.update_settings(|s| s.adjust_spawn_chance(-0.05)),
            Focus::Ripple => self.update_settings(|s| s.adjust_ripple_count(-1)),
            Focus::Scale => self.update_settings(|s| s.adjust_pixels_per_dot(-0.5)),
            Focus::Links => self.cycle_link_strategy(),
            Focus::Style => self.cycle_link_style(),
            Focus::Glow => self.toggle_glow(),
        }
    }

    pub fn cycle_link_strategy(&mut self) {
        self.update_settings(|s| s.link_strategy = s.link_strategy.next());
    }

    pub fn cycle_link_style(&mut self) {
        self.update_settings(|s| s.link_style = s.link_style.next());
    }

    pub fn toggle_glow(&mut self) {
        self.update_settings(|s| s.toggle_glow());
    }

    /// Cycle to next focus
    pub fn next_focus(&mut self) {
        self.focus = self.focus.next();
    }

    /// Navigate to previous parameter (Shift+Tab)
    pub fn prev_focus(&mut self) {
        self.focus = self.focus.prev();
    }

    /// Toggle pause state
    pub fn toggle_pause(&mut self) {
        self.field.toggle_pause();
    }

    /// Field reset without a resize
    pub fn reset(&mut self) {
        self.field.reset();
    }

    /// Toggle fullscreen mode
    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen_mode = !self.fullscreen_mode;
    }

    /// Toggle help overlay
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
        if self.show_help {
            self.help_scroll = 0; // Reset scroll when opening
        }
    }

    /// Scroll help content up
    pub fn scroll_help_up(&mut self) {
        self.help_scroll = self.help_scroll.saturating_sub(1);
    }

    /// Scroll help content down
    pub fn scroll_help_down(&mut self, max_scroll: u16) {
        self.help_scroll = (self.help_scroll + 1).min(max_scroll);
    }

    /// Scroll controls content up
    pub fn scroll_controls_up(&mut self) {
        self.controls_scroll = self.controls_scroll.saturating_sub(1);
    }

    /// Scroll controls content down
    pub fn scroll_controls_down(&mut self, max_scroll: u16) {
        self.controls_scroll = (self.controls_scroll + 1).min(max_scroll);
    }

    /// Write the field as it stands to a PNG in the working directory
    pub fn snapshot(&mut self) {
        let path = PathBuf::from(format!("particle-field-{}.png", self.field.frames()));
        self.message = Some(match export::snapshot(&self.field, &path) {
            Ok(()) => format!("saved {}", path.display()),
            Err(e) => {
                warn!("snapshot failed: {}", e);
                format!("snapshot failed: {}", e)
            }
        });
    }
}
