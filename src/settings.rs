use serde::{Deserialize, Serialize};

/// How connector edges are found each frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum LinkStrategy {
    /// Compare every unordered pair (O(n²))
    Exhaustive,
    /// Bucket particles into cells one link distance wide, compare neighbouring cells only
    #[default]
    Grid,
}

impl LinkStrategy {
    pub fn name(&self) -> &str {
        match self {
            LinkStrategy::Exhaustive => "Exhaustive",
            LinkStrategy::Grid => "Grid",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            LinkStrategy::Exhaustive => LinkStrategy::Grid,
            LinkStrategy::Grid => LinkStrategy::Exhaustive,
        }
    }
}

/// How connector edges are colored
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum LinkStyle {
    /// Gradient between the two endpoint colors
    #[default]
    Gradient,
    /// Theme connector color
    Palette,
}

impl LinkStyle {
    pub fn name(&self) -> &str {
        match self {
            LinkStyle::Gradient => "Gradient",
            LinkStyle::Palette => "Palette",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            LinkStyle::Gradient => LinkStyle::Palette,
            LinkStyle::Palette => LinkStyle::Gradient,
        }
    }
}

// Bounds shared by the sidebar adjusters and by settings read from files
const MAX_PARTICLES: (usize, usize) = (10, 1000);
const DENSITY_DIVISOR: (f32, f32) = (1.0, 1000.0);
const LINK_DIVISOR: (f32, f32) = (1.0, 100.0);
const LINK_CAP: (f32, f32) = (0.0, 2000.0);
const MOUSE_RADIUS: (f32, f32) = (20.0, 300.0);
const SPAWN_CHANCE: (f64, f64) = (0.0, 1.0);
const RIPPLE_COUNT: (usize, usize) = (1, 48);
const PIXELS_PER_DOT: (f32, f32) = (1.0, 16.0);

/// Clamp into `bounds`; NaN and infinities fall back to `default`
fn bounded_f32(value: f32, bounds: (f32, f32), default: f32) -> f32 {
    if value.is_finite() {
        value.clamp(bounds.0, bounds.1)
    } else {
        default
    }
}

/// All field settings consolidated into one struct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSettings {
    // === Population ===
    /// Upper bound on persistent particles (10-1000)
    pub max_particles: usize,
    /// Viewport pixels per persistent particle
    pub density_divisor: f32,

    // === Connector ===
    /// Link distance is width / link_divisor ...
    pub link_divisor: f32,
    /// ... capped at link_cap pixels
    pub link_cap: f32,
    pub link_strategy: LinkStrategy,
    pub link_style: LinkStyle,

    // === Interaction ===
    /// Pointer repulsion radius in pixels (20-300)
    pub mouse_radius: f32,
    /// Probability a pointer move spawns a transient particle (0.0-1.0)
    pub spawn_chance: f64,
    /// Transient particles spawned per click (1-48)
    pub ripple_count: usize,

    // === Visual ===
    /// Field pixels covered by one Braille dot (1.0-16.0)
    pub pixels_per_dot: f32,
    /// Draw the soft glow around particles
    pub glow: bool,
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            max_particles: 150,
            density_divisor: 10.0,
            link_divisor: 5.0,
            link_cap: 150.0,
            link_strategy: LinkStrategy::default(),
            link_style: LinkStyle::default(),
            mouse_radius: 100.0,
            spawn_chance: 0.3,
            ripple_count: 12,
            pixels_per_dot: 4.0,
            glow: true,
        }
    }
}

impl FieldSettings {
    /// Persistent particle count for a viewport width
    pub fn target_count(&self, width: f32) -> usize {
        let by_width = (width.max(0.0) / self.density_divisor).floor() as usize;
        by_width.min(self.max_particles)
    }

    /// Maximum connector length for a viewport width
    pub fn link_distance(&self, width: f32) -> f32 {
        (width / self.link_divisor).min(self.link_cap)
    }

    /// Same settings with every numeric field pulled into its supported range
    pub fn clamped(self) -> Self {
        let defaults = Self::default();
        let spawn_chance = if self.spawn_chance.is_finite() {
            self.spawn_chance.clamp(SPAWN_CHANCE.0, SPAWN_CHANCE.1)
        } else {
            defaults.spawn_chance
        };
        Self {
            max_particles: self.max_particles.clamp(MAX_PARTICLES.0, MAX_PARTICLES.1),
            density_divisor: bounded_f32(self.density_divisor, DENSITY_DIVISOR, defaults.density_divisor),
            link_divisor: bounded_f32(self.link_divisor, LINK_DIVISOR, defaults.link_divisor),
            link_cap: bounded_f32(self.link_cap, LINK_CAP, defaults.link_cap),
            mouse_radius: bounded_f32(self.mouse_radius, MOUSE_RADIUS, defaults.mouse_radius),
            spawn_chance,
            ripple_count: self.ripple_count.clamp(RIPPLE_COUNT.0, RIPPLE_COUNT.1),
            pixels_per_dot: bounded_f32(self.pixels_per_dot, PIXELS_PER_DOT, defaults.pixels_per_dot),
            ..self
        }
    }

    pub fn adjust_max_particles(&mut self, delta: i32) {
        let (lo, hi) = MAX_PARTICLES;
        self.max_particles = (self.max_particles as i64 + delta as i64).clamp(lo as i64, hi as i64) as usize;
    }

    pub fn adjust_mouse_radius(&mut self, delta: f32) {
        self.mouse_radius = (self.mouse_radius + delta).clamp(MOUSE_RADIUS.0, MOUSE_RADIUS.1);
    }

    pub fn adjust_spawn_chance(&mut self, delta: f64) {
        self.spawn_chance = (self.spawn_chance + delta).clamp(SPAWN_CHANCE.0, SPAWN_CHANCE.1);
    }

    pub fn adjust_ripple_count(&mut self, delta: i32) {
        let (lo, hi) = RIPPLE_COUNT;
        self.ripple_count = (self.ripple_count as i64 + delta as i64).clamp(lo as i64, hi as i64) as usize;
    }

    pub fn adjust_pixels_per_dot(&mut self, delta: f32) {
        self.pixels_per_dot = (self.pixels_per_dot + delta).clamp(PIXELS_PER_DOT.0, PIXELS_PER_DOT.1);
    }

    pub fn toggle_glow(&mut self) {
        self.glow = !self.glow;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_count_caps_at_max() {
        let s = FieldSettings::default();
        assert_eq!(s.target_count(800.0), 80);
        assert_eq!(s.target_count(809.9), 80);
        assert_eq!(s.target_count(4000.0), 150);
        assert_eq!(s.target_count(0.0), 0);
    }

    #[test]
    fn test_link_distance() {
        let s = FieldSettings::default();
        assert_eq!(s.link_distance(500.0), 100.0);
        assert_eq!(s.link_distance(1920.0), 150.0);
    }

    #[test]
    fn test_adjust_bounds() {
        let mut s = FieldSettings::default();
        s.adjust_spawn_chance(5.0);
        assert_eq!(s.spawn_chance, 1.0);
        s.adjust_ripple_count(-100);
        assert_eq!(s.ripple_count, 1);
        s.adjust_pixels_per_dot(-100.0);
        assert_eq!(s.pixels_per_dot, 1.0);
        s.adjust_max_particles(10_000);
        assert_eq!(s.max_particles, 1000);
    }

    #[test]
    fn test_clamped_pulls_file_values_into_range() {
        let s: FieldSettings = serde_json::from_str(
            r#"{"pixels_per_dot": 0, "ripple_count": 100000, "max_particles": 0,
                "spawn_chance": -2, "mouse_radius": 1e9, "link_divisor": 0}"#,
        )
        .unwrap();
        let s = s.clamped();
        assert_eq!(s.pixels_per_dot, 1.0);
        assert_eq!(s.ripple_count, 48);
        assert_eq!(s.max_particles, 10);
        assert_eq!(s.spawn_chance, 0.0);
        assert_eq!(s.mouse_radius, 300.0);
        assert_eq!(s.link_divisor, 1.0);
    }

    #[test]
    fn test_clamped_replaces_non_finite_values() {
        let s = FieldSettings {
            pixels_per_dot: f32::NAN,
            spawn_chance: f64::INFINITY,
            ..Default::default()
        }
        .clamped();
        assert_eq!(s.pixels_per_dot, 4.0);
        assert_eq!(s.spawn_chance, 0.3);
        assert_eq!(FieldSettings::default().clamped(), FieldSettings::default());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let s: FieldSettings = serde_json::from_str(r#"{"max_particles": 60}"#).unwrap();
        assert_eq!(s.max_particles, 60);
        assert_eq!(s.ripple_count, 12);
    }
}
