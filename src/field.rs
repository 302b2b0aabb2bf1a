use crate::color::{Palette, Theme};
use crate::connector::{self, Edge};
use crate::particle::{Lifetime, Particle, Status, Viewport};
use crate::render::{Surface, GLOW_BLUR};
use crate::settings::{FieldSettings, LinkStyle};
use crate::theme::ThemeChanged;
use rand::distributions::Open01;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;
use tracing::{debug, info};

/// Half-width of the square around the cursor where trail particles appear
const TRAIL_JITTER: f32 = 10.0;

/// Strength of the push a pointer gives nearby persistent particles
const REPEL_STRENGTH: f32 = 0.2;

/// Ripple lifetimes lie strictly between these, in frames
const RIPPLE_LIFETIME_MIN: f32 = 120.0;
const RIPPLE_LIFETIME_MAX: f32 = 180.0;

/// Lifetime for a ripple particle from a uniform sample `u` in (0, 1).
///
/// Near either end of the open interval the sum rounds onto the bound in `f32`,
/// so the result is pulled in to the nearest representable value inside.
fn ripple_lifetime(u: f64) -> f32 {
    let min = RIPPLE_LIFETIME_MIN as f64;
    let span = (RIPPLE_LIFETIME_MAX - RIPPLE_LIFETIME_MIN) as f64;
    let lifetime = (min + span * u) as f32;
    // positive floats: neighbouring values are one bit pattern apart
    let lowest = f32::from_bits(RIPPLE_LIFETIME_MIN.to_bits() + 1);
    let highest = f32::from_bits(RIPPLE_LIFETIME_MAX.to_bits() - 1);
    lifetime.clamp(lowest, highest)
}

/// Last known pointer state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mouse {
    pub position: Option<(f32, f32)>,
    pub radius: f32,
}

/// Explicit simulation context: everything one animated background needs.
pub struct ParticleField {
    particles: Vec<Particle>,
    viewport: Viewport,
    settings: FieldSettings,
    theme: Theme,
    mouse: Mouse,
    edges: Vec<Edge>,
    theme_events: Option<flume::Receiver<ThemeChanged>>,
    last_theme_seq: u64,
    frames: u64,
    pub paused: bool,
    rng: StdRng,
}

impl ParticleField {
    pub fn new(viewport: Viewport, settings: FieldSettings, theme: Theme, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut field = Self {
            particles: Vec::new(),
            viewport,
            mouse: Mouse {
                position: None,
                radius: settings.mouse_radius,
            },
            settings,
            theme,
            edges: Vec::new(),
            theme_events: None,
            last_theme_seq: 0,
            frames: 0,
            paused: false,
            rng,
        };
        field.reset();
        field
    }

    fn palette(&self) -> &'static Palette {
        self.theme.palette()
    }

    /// Drop every particle and repopulate the persistent set for the current viewport
    pub fn reset(&mut self) {
        self.particles.clear();
        self.edges.clear();
        let count = self.target_count();
        let palette = self.palette();
        for _ in 0..count {
            let p = Particle::spawn(&mut self.rng, &self.viewport, palette, None, false);
            self.particles.push(p);
        }
        debug!(count, "field populated");
    }

    /// Field reset for a new viewport size
    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport = Viewport::new(width, height);
        self.reset();
        info!(
            width,
            height,
            particles = self.particles.len(),
            "field resized"
        );
    }

    /// Apply new settings; repopulates when the persistent count would change
    pub fn set_settings(&mut self, settings: FieldSettings) {
        let before = self.target_count();
        self.settings = settings;
        self.mouse.radius = self.settings.mouse_radius;
        if self.target_count() != before {
            self.reset();
        }
    }

    pub fn settings(&self) -> &FieldSettings {
        &self.settings
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn mouse(&self) -> Mouse {
        self.mouse
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Edges computed by the last drawn frame
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn target_count(&self) -> usize {
        self.settings.target_count(self.viewport.width)
    }

    pub fn link_distance(&self) -> f32 {
        self.settings.link_distance(self.viewport.width)
    }

    pub fn persistent_count(&self) -> usize {
        self.particles.iter().filter(|p| p.is_persistent()).count()
    }

    pub fn transient_count(&self) -> usize {
        self.particles.len() - self.persistent_count()
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    // === Theme ===

    /// Listen to a theme owner; pending events are applied at the start of every frame
    pub fn subscribe(&mut self, events: flume::Receiver<ThemeChanged>) {
        self.theme_events = Some(events);
    }

    /// Apply every pending theme event newer than the last one applied
    pub fn sync_theme(&mut self) {
        let Some(events) = &self.theme_events else {
            return;
        };
        let pending: Vec<ThemeChanged> = events.try_iter().collect();
        for event in pending {
            if event.seq <= self.last_theme_seq {
                debug!(seq = event.seq, last = self.last_theme_seq, "stale theme event ignored");
                continue;
            }
            self.last_theme_seq = event.seq;
            self.apply_theme(event.theme);
        }
    }

    /// Recolor persistent particles from the theme's palette; transient ones keep their color
    pub fn apply_theme(&mut self, theme: Theme) {
        self.theme = theme;
        let palette = self.palette();
        for p in self.particles.iter_mut().filter(|p| p.is_persistent()) {
            p.color = palette.pick(&mut self.rng);
            p.alpha = p.color.a;
        }
    }

    // === Animation ===

    /// Update every particle and drop the expired ones, without drawing
    pub fn advance(&mut self) {
        self.sync_theme();
        self.step();
        self.edges = connector::connect(
            &self.particles,
            self.link_distance(),
            self.settings.link_strategy,
        );
    }

    fn step(&mut self) {
        if self.paused {
            return;
        }
        let viewport = self.viewport;
        self.particles.retain_mut(|p| p.update(&viewport) == Status::Alive);
        self.frames += 1;
    }

    /// One animation frame: clear, update, draw particles, then draw connectors
    pub fn frame<S: Surface + ?Sized>(&mut self, surface: &mut S) {
        self.sync_theme();
        surface.clear(self.palette().background);
        self.step();
        self.draw_particles(surface);

        self.edges = connector::connect(
            &self.particles,
            self.link_distance(),
            self.settings.link_strategy,
        );
        self.draw_edges(surface);
    }

    /// Redraw the current state without advancing it
    pub fn draw<S: Surface + ?Sized>(&self, surface: &mut S) {
        surface.clear(self.palette().background);
        self.draw_particles(surface);
        self.draw_edges(surface);
    }

    fn draw_particles<S: Surface + ?Sized>(&self, surface: &mut S) {
        let glow = if self.settings.glow { GLOW_BLUR } else { 0.0 };
        for p in &self.particles {
            surface.fill_circle(p.x, p.y, p.size, p.render_color(), glow);
        }
    }

    fn draw_edges<S: Surface + ?Sized>(&self, surface: &mut S) {
        let connection = self.palette().connection;
        for edge in &self.edges {
            let a = &self.particles[edge.a];
            let b = &self.particles[edge.b];
            let (start, end) = match self.settings.link_style {
                LinkStyle::Gradient => (
                    a.render_color().with_alpha(edge.stop_alpha()),
                    b.render_color().with_alpha(edge.stop_alpha()),
                ),
                LinkStyle::Palette => {
                    let c = connection.with_alpha(connection.a * edge.opacity);
                    (c, c)
                }
            };
            surface.stroke_line((a.x, a.y), (b.x, b.y), edge.width(), start, end);
        }
    }

    // === Interaction ===

    /// Pointer moved to (x, y). Returns whether a trail particle was spawned.
    pub fn pointer_moved(&mut self, x: f32, y: f32) -> bool {
        self.mouse.position = Some((x, y));

        let spawned = self.rng.gen_bool(self.settings.spawn_chance.clamp(0.0, 1.0));
        if spawned {
            let palette = self.palette();
            let at = (
                x + (self.rng.gen::<f32>() - 0.5) * TRAIL_JITTER * 2.0,
                y + (self.rng.gen::<f32>() - 0.5) * TRAIL_JITTER * 2.0,
            );
            let mut p = Particle::spawn(&mut self.rng, &self.viewport, palette, Some(at), true);
            let angle = self.rng.gen::<f32>() * TAU;
            let speed = self.rng.gen::<f32>() * 2.0 + 1.0;
            p.set_velocity(angle, speed);
            self.particles.push(p);
        }

        self.repel(x, y);
        spawned
    }

    /// Push persistent particles inside the mouse radius away from (x, y)
    fn repel(&mut self, x: f32, y: f32) {
        let radius = self.mouse.radius;
        for p in self.particles.iter_mut().filter(|p| p.is_persistent()) {
            let dx = p.x - x;
            let dy = p.y - y;
            let distance = (dx * dx + dy * dy).sqrt();
            if distance < radius {
                let force = (radius - distance) / radius;
                let (dir_x, dir_y) = if distance > 0.0 {
                    (dx / distance, dy / distance)
                } else {
                    (0.0, 0.0)
                };
                p.speed_x += dir_x * force * REPEL_STRENGTH;
                p.speed_y += dir_y * force * REPEL_STRENGTH;
            }
        }
    }

    /// Click at (x, y): a ring of transient particles radiating outward
    pub fn clicked(&mut self, x: f32, y: f32) {
        self.mouse.position = Some((x, y));
        let count = self.settings.ripple_count;
        let palette = self.palette();
        for i in 0..count {
            let angle = i as f32 / count as f32 * TAU;
            let speed = self.rng.gen::<f32>() * 3.0 + 2.0;
            let mut p = Particle::spawn(&mut self.rng, &self.viewport, palette, Some((x, y)), true);
            p.set_velocity(angle, speed);
            let remaining = ripple_lifetime(self.rng.sample::<f64, _>(Open01));
            p.set_lifetime(Lifetime::Transient { remaining });
            p.set_size(self.rng.gen::<f32>() * 5.0 + 2.0);
            self.particles.push(p);
        }
        debug!(x, y, count, "ripple spawned");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{DARK_PALETTE, LIGHT_PALETTE};
    use crate::render::DrawLog;
    use crate::settings::LinkStrategy;
    use crate::theme::ThemeStore;

    fn field(width: f32, theme: Theme) -> ParticleField {
        ParticleField::new(
            Viewport::new(width, 600.0),
            FieldSettings::default(),
            theme,
            Some(42),
        )
    }

    #[test]
    fn test_initial_population() {
        let f = field(800.0, Theme::Dark);
        assert_eq!(f.particles().len(), 80);
        assert_eq!(f.persistent_count(), 80);
        assert_eq!(f.transient_count(), 0);
    }

    #[test]
    fn test_persistent_count_constant_between_resizes() {
        let mut f = field(900.0, Theme::Light);
        let mut log = DrawLog::default();
        for frame in 0..600 {
            if frame % 7 == 0 {
                f.pointer_moved(450.0, 300.0);
            }
            if frame % 97 == 0 {
                f.clicked(200.0, 100.0);
            }
            f.frame(&mut log);
            assert_eq!(f.persistent_count(), 90);
            assert_eq!(log.circles.len(), f.particles().len());
        }
    }

    #[test]
    fn test_transients_drain_without_interaction() {
        let mut f = field(800.0, Theme::Dark);
        f.clicked(400.0, 300.0);
        assert_eq!(f.transient_count(), 12);
        for _ in 0..180 {
            f.advance();
        }
        assert_eq!(f.transient_count(), 0);
        assert_eq!(f.persistent_count(), 80);
    }

    #[test]
    fn test_resize_rebuilds_deterministic_count() {
        let mut f = field(800.0, Theme::Dark);
        f.clicked(10.0, 10.0);
        f.resize(1234.0, 700.0);
        assert_eq!(f.particles().len(), 123);
        assert_eq!(f.transient_count(), 0);
        f.resize(5000.0, 700.0);
        assert_eq!(f.particles().len(), 150);
        f.resize(55.0, 700.0);
        assert_eq!(f.particles().len(), 5);
        assert!(f.particles().iter().all(|p| p.x <= 55.0));
    }

    #[test]
    fn test_pointer_spawn_rate_in_binomial_band() {
        let mut f = field(800.0, Theme::Dark);
        let n = 10_000;
        let spawned = (0..n)
            .filter(|i| f.pointer_moved((i % 800) as f32, 300.0))
            .count();
        // mean 3000, sd ~45.8; allow five standard deviations
        assert!((2771..=3229).contains(&spawned), "spawned {}", spawned);
        assert_eq!(f.transient_count(), spawned);
    }

    #[test]
    fn test_pointer_trail_particle_shape() {
        let mut settings = FieldSettings::default();
        settings.spawn_chance = 1.0;
        let mut f = ParticleField::new(Viewport::new(800.0, 600.0), settings, Theme::Dark, Some(5));
        assert!(f.pointer_moved(400.0, 300.0));
        let p = f.particles().last().unwrap();
        assert!(p.is_transient());
        assert!((p.x - 400.0).abs() <= 10.0 && (p.y - 300.0).abs() <= 10.0);
        let speed = (p.speed_x * p.speed_x + p.speed_y * p.speed_y).sqrt();
        assert!((1.0..3.0 + 1e-4).contains(&speed));
        assert_eq!(f.mouse().position, Some((400.0, 300.0)));
    }

    #[test]
    fn test_pointer_repels_nearby_persistent_only() {
        let mut settings = FieldSettings::default();
        settings.spawn_chance = 0.0;
        let mut f = ParticleField::new(Viewport::new(800.0, 600.0), settings, Theme::Dark, Some(9));
        let before: Vec<(f32, f32, f32, f32)> = f
            .particles()
            .iter()
            .map(|p| (p.x, p.y, p.speed_x, p.speed_y))
            .collect();
        f.pointer_moved(400.0, 300.0);
        for (p, (x, y, sx, sy)) in f.particles().iter().zip(before) {
            let d = ((x - 400.0).powi(2) + (y - 300.0).powi(2)).sqrt();
            if d >= 100.0 || d == 0.0 {
                assert_eq!((p.speed_x, p.speed_y), (sx, sy));
            } else {
                // nudged away from the cursor
                let dot = (p.speed_x - sx) * (x - 400.0) + (p.speed_y - sy) * (y - 300.0);
                assert!(dot > 0.0);
            }
        }
    }

    #[test]
    fn test_click_ring() {
        let mut f = field(800.0, Theme::Dark);
        let before = f.particles().len();
        f.clicked(300.0, 200.0);
        let ring = &f.particles()[before..];
        assert_eq!(ring.len(), 12);
        for (i, p) in ring.iter().enumerate() {
            assert_eq!((p.x, p.y), (300.0, 200.0));
            let angle = p.speed_y.atan2(p.speed_x).rem_euclid(TAU);
            let expected = (i as f32 * 30.0).to_radians();
            let diff = (angle - expected).abs();
            assert!(diff < 1e-4 || (TAU - diff) < 1e-4, "particle {} at {}", i, angle);
            match p.lifetime {
                Lifetime::Transient { remaining } => {
                    assert!(remaining > 120.0 && remaining < 180.0)
                }
                Lifetime::Persistent => panic!("ring particle must be transient"),
            }
            assert!(p.base_size >= 2.0 && p.base_size < 7.0);
        }
    }

    #[test]
    fn test_theme_change_recolors_persistent_only() {
        let mut store = ThemeStore::new(Theme::Light);
        let mut f = ParticleField::new(
            Viewport::new(500.0, 400.0),
            FieldSettings::default(),
            Theme::Light,
            Some(11),
        );
        f.subscribe(store.subscribe());
        assert_eq!(f.persistent_count(), 50);
        f.clicked(250.0, 200.0);
        let transient_before: Vec<_> = f
            .particles()
            .iter()
            .filter(|p| p.is_transient())
            .map(|p| p.color)
            .collect();

        store.toggle();
        let mut log = DrawLog::default();
        f.frame(&mut log);

        assert_eq!(f.theme(), Theme::Dark);
        let persistent: Vec<_> = f.particles().iter().filter(|p| p.is_persistent()).collect();
        assert_eq!(persistent.len(), 50);
        assert!(persistent.iter().all(|p| DARK_PALETTE.contains(&p.color)));
        let transient_after: Vec<_> = f
            .particles()
            .iter()
            .filter(|p| p.is_transient())
            .map(|p| p.color)
            .collect();
        assert_eq!(transient_before, transient_after);
        assert!(transient_after.iter().all(|c| LIGHT_PALETTE.contains(c)));
    }

    #[test]
    fn test_stale_theme_event_ignored() {
        let (tx, rx) = flume::unbounded();
        let mut f = field(600.0, Theme::Light);
        f.subscribe(rx);
        tx.send(ThemeChanged { theme: Theme::Dark, seq: 2 }).unwrap();
        tx.send(ThemeChanged { theme: Theme::Light, seq: 1 }).unwrap();
        f.sync_theme();
        assert_eq!(f.theme(), Theme::Dark);
    }

    #[test]
    fn test_frame_draws_one_line_per_edge() {
        let mut f = field(1000.0, Theme::Dark);
        let mut log = DrawLog::default();
        f.frame(&mut log);
        assert_eq!(log.clears, 1);
        assert_eq!(log.lines.len(), f.edges().len());
        let max = f.link_distance();
        for e in f.edges() {
            assert!(e.distance < max);
        }
    }

    #[test]
    fn test_paused_field_does_not_move() {
        let mut f = field(800.0, Theme::Dark);
        f.toggle_pause();
        let before: Vec<(f32, f32)> = f.particles().iter().map(|p| (p.x, p.y)).collect();
        let mut log = DrawLog::default();
        f.frame(&mut log);
        let after: Vec<(f32, f32)> = f.particles().iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(before, after);
        assert_eq!(f.frames(), 0);
    }

    #[test]
    fn test_strategies_draw_same_edges() {
        let mut a = field(1200.0, Theme::Dark);
        let mut settings = FieldSettings::default();
        settings.link_strategy = LinkStrategy::Exhaustive;
        let mut b = ParticleField::new(Viewport::new(1200.0, 600.0), settings, Theme::Dark, Some(42));
        for _ in 0..30 {
            a.advance();
            b.advance();
        }
        assert_eq!(a.edges(), b.edges());
    }

    #[test]
    fn test_ripple_lifetime_stays_inside_bounds() {
        use rand::rngs::mock::StepRng;
        // all-ones and all-zeros words give the extreme samples of the open interval
        for mut rng in [StepRng::new(u64::MAX, 0), StepRng::new(0, 0)] {
            let u: f64 = rng.sample(Open01);
            let lifetime = ripple_lifetime(u);
            assert!(lifetime > 120.0 && lifetime < 180.0, "{} -> {}", u, lifetime);
        }
        for u in [0.0, 1.0, f64::EPSILON, 1.0 - f64::EPSILON, 0.5] {
            let lifetime = ripple_lifetime(u);
            assert!(lifetime > 120.0 && lifetime < 180.0, "{} -> {}", u, lifetime);
        }
        assert_eq!(ripple_lifetime(0.5), 150.0);
    }

    #[test]
    fn test_trail_spawned_while_paused_never_brightens() {
        let mut settings = FieldSettings::default();
        settings.spawn_chance = 1.0;
        let mut f = ParticleField::new(Viewport::new(800.0, 600.0), settings, Theme::Dark, Some(13));
        f.paused = true;
        assert!(f.pointer_moved(400.0, 300.0));
        let idx = f.particles().len() - 1;

        let mut log = DrawLog::default();
        let mut last = f32::INFINITY;
        for frame in 0..6 {
            if frame == 2 {
                f.toggle_pause();
            }
            f.frame(&mut log);
            let drawn = log.circles[idx].3.a;
            assert!(drawn <= last, "frame {}: {} after {}", frame, drawn, last);
            last = drawn;
        }
    }

    fn linked_pair(style: LinkStyle) -> (ParticleField, DrawLog) {
        let mut settings = FieldSettings::default();
        settings.link_style = style;
        let mut f = ParticleField::new(Viewport::new(800.0, 600.0), settings, Theme::Dark, Some(21));
        f.paused = true;
        let mut rng = StdRng::seed_from_u64(4);
        let a = Particle::spawn(&mut rng, &f.viewport, &DARK_PALETTE, Some((100.0, 100.0)), false);
        let b = Particle::spawn(&mut rng, &f.viewport, &DARK_PALETTE, Some((160.0, 100.0)), false);
        f.particles = vec![a, b];
        let mut log = DrawLog::default();
        f.frame(&mut log);
        (f, log)
    }

    #[test]
    fn test_gradient_link_runs_between_endpoint_colors() {
        let (f, log) = linked_pair(LinkStyle::Gradient);
        assert_eq!(log.lines.len(), 1);
        let line = log.lines[0];
        let (a, b) = (&f.particles()[0], &f.particles()[1]);
        assert_eq!((line.from, line.to), ((100.0, 100.0), (160.0, 100.0)));
        // distance 60 of 150: opacity 0.6
        assert!(line.start.same_rgb(&a.color));
        assert!(line.end.same_rgb(&b.color));
        assert!((line.start.a - 0.3).abs() < 1e-5);
        assert!((line.end.a - 0.3).abs() < 1e-5);
        assert!((line.width - 0.9).abs() < 1e-5);
    }

    #[test]
    fn test_palette_link_uses_connection_color() {
        let (_, log) = linked_pair(LinkStyle::Palette);
        assert_eq!(log.lines.len(), 1);
        let line = log.lines[0];
        assert_eq!(line.start, line.end);
        assert!(line.start.same_rgb(&DARK_PALETTE.connection));
        assert!((line.start.a - 0.2 * 0.6).abs() < 1e-5);
        assert!((line.width - 0.9).abs() < 1e-5);
    }

    #[test]
    fn test_draw_repeats_last_frame_without_advancing() {
        let mut f = field(800.0, Theme::Dark);
        f.clicked(400.0, 300.0);
        let mut log = DrawLog::default();
        f.frame(&mut log);
        let frames = f.frames();
        let before: Vec<(f32, f32, Lifetime)> =
            f.particles().iter().map(|p| (p.x, p.y, p.lifetime)).collect();

        let mut redraw = DrawLog::default();
        f.draw(&mut redraw);

        assert_eq!(f.frames(), frames);
        let after: Vec<(f32, f32, Lifetime)> =
            f.particles().iter().map(|p| (p.x, p.y, p.lifetime)).collect();
        assert_eq!(before, after);
        assert_eq!(redraw.circles, log.circles);
        assert_eq!(redraw.lines, log.lines);
    }
}
