use crate::color::{Palette, Rgba};
use rand::Rng;
use std::f32::consts::TAU;
use tracing::warn;

/// Default lifetime of a pointer-spawned particle, in frames
pub const TRANSIENT_LIFETIME: f32 = 100.0;

/// Lifetime at which a transient particle starts fading; also the fade denominator
const FADE_SPAN: f32 = 100.0;

/// Alpha of a transient particle at full strength
const TRANSIENT_ALPHA: f32 = 0.7;

/// Velocity kept after bouncing off an edge
const EDGE_DAMPING: f32 = 0.9;

/// Amplitude of the sinusoidal drift of persistent particles
const DRIFT: f32 = 0.2;

/// Drawable area in field pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.width / 2.0, self.height / 2.0)
    }

    /// Uniform random point inside the viewport
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> (f32, f32) {
        (
            rng.gen::<f32>() * self.width,
            rng.gen::<f32>() * self.height,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lifetime {
    /// Lives until the next field reset
    Persistent,
    /// Counts down once per frame; removed at zero
    Transient { remaining: f32 },
}

impl Lifetime {
    /// Alpha a particle with this lifetime is drawn at; persistent ones keep their color's
    pub fn alpha(&self, color_alpha: f32) -> f32 {
        match *self {
            Lifetime::Persistent => color_alpha,
            Lifetime::Transient { remaining } => fade_alpha(remaining),
        }
    }
}

fn fade_alpha(remaining: f32) -> f32 {
    (remaining / FADE_SPAN).min(1.0) * TRANSIENT_ALPHA
}

/// Outcome of a single update step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Alive,
    Expired,
}

#[derive(Debug, Clone)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub speed_x: f32,
    pub speed_y: f32,
    pub base_size: f32,
    pub size: f32,
    /// Color picked from the palette at spawn (or on theme change, persistent only)
    pub color: Rgba,
    /// Alpha actually drawn
    pub alpha: f32,
    pub angle: f32,
    pub angle_speed: f32,
    pub pulse: f32,
    pub pulse_speed: f32,
    pub lifetime: Lifetime,
}

impl Particle {
    /// New particle at `at`, or at a random point of the viewport
    pub fn spawn<R: Rng + ?Sized>(
        rng: &mut R,
        viewport: &Viewport,
        palette: &Palette,
        at: Option<(f32, f32)>,
        transient: bool,
    ) -> Self {
        let (x, y) = at.unwrap_or_else(|| viewport.random_point(rng));
        let size = if transient {
            rng.gen::<f32>() * 4.0 + 1.0
        } else {
            rng.gen::<f32>() * 3.0 + 0.5
        };
        let color = palette.pick(rng);
        let lifetime = if transient {
            Lifetime::Transient {
                remaining: TRANSIENT_LIFETIME,
            }
        } else {
            Lifetime::Persistent
        };
        Self {
            x,
            y,
            speed_x: (rng.gen::<f32>() - 0.5) * 0.8,
            speed_y: (rng.gen::<f32>() - 0.5) * 0.8,
            base_size: size,
            size,
            color,
            alpha: lifetime.alpha(color.a),
            angle: rng.gen::<f32>() * TAU,
            angle_speed: rng.gen::<f32>() * 0.01 - 0.005,
            pulse: 0.0,
            pulse_speed: rng.gen::<f32>() * 0.04 + 0.01,
            lifetime,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self.lifetime, Lifetime::Transient { .. })
    }

    pub fn is_persistent(&self) -> bool {
        !self.is_transient()
    }

    /// Color as drawn this frame
    pub fn render_color(&self) -> Rgba {
        self.color.with_alpha(self.alpha)
    }

    /// Replace the lifetime; alpha follows so the first drawn frame already fades
    pub fn set_lifetime(&mut self, lifetime: Lifetime) {
        self.lifetime = lifetime;
        self.alpha = lifetime.alpha(self.color.a);
    }

    pub fn set_velocity(&mut self, angle: f32, speed: f32) {
        self.speed_x = angle.cos() * speed;
        self.speed_y = angle.sin() * speed;
    }

    pub fn set_size(&mut self, size: f32) {
        self.base_size = size;
        self.size = size;
    }

    pub fn distance_to(&self, x: f32, y: f32) -> f32 {
        let dx = self.x - x;
        let dy = self.y - y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Advance one frame
    pub fn update(&mut self, viewport: &Viewport) -> Status {
        self.x += self.speed_x;
        self.y += self.speed_y;

        if self.is_persistent() {
            self.x += self.angle.sin() * DRIFT;
            self.y += self.angle.cos() * DRIFT;
            self.angle += self.angle_speed;
        }

        self.pulse += self.pulse_speed;
        self.size = self.base_size * (1.0 + 0.5 * self.pulse.sin());

        if let Lifetime::Transient { remaining } = &mut self.lifetime {
            *remaining -= 1.0;
            if *remaining <= 0.0 {
                return Status::Expired;
            }
            self.alpha = fade_alpha(*remaining);
        }

        self.guard_non_finite(viewport);
        self.bounce(viewport);

        Status::Alive
    }

    /// Reflect with damping and clamp on any edge crossing
    fn bounce(&mut self, viewport: &Viewport) {
        if self.x > viewport.width || self.x < 0.0 {
            self.speed_x = -self.speed_x * EDGE_DAMPING;
            self.x = self.x.clamp(0.0, viewport.width);
        }
        if self.y > viewport.height || self.y < 0.0 {
            self.speed_y = -self.speed_y * EDGE_DAMPING;
            self.y = self.y.clamp(0.0, viewport.height);
        }
    }

    fn guard_non_finite(&mut self, viewport: &Viewport) {
        let finite = self.x.is_finite()
            && self.y.is_finite()
            && self.speed_x.is_finite()
            && self.speed_y.is_finite();
        if !finite {
            warn!(x = self.x, y = self.y, "non-finite particle state, re-centering");
            (self.x, self.y) = viewport.center();
            self.speed_x = 0.0;
            self.speed_y = 0.0;
        }
        if !self.size.is_finite() {
            self.pulse = 0.0;
            self.size = self.base_size;
        }
    }
}
