use rand::Rng;
use ratatui::style::Color;
use serde::{Deserialize, Serialize};

/// Straight (non-premultiplied) RGBA color with a floating alpha channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Same color with its alpha replaced
    pub fn with_alpha(self, a: f32) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }

    /// Same hue, compared ignoring alpha
    pub fn same_rgb(&self, other: &Rgba) -> bool {
        self.r == other.r && self.g == other.g && self.b == other.b
    }

    /// Linear interpolation of every channel, `t` in 0..=1
    pub fn lerp(self, other: Rgba, t: f32) -> Rgba {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgba {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: self.a + (other.a - self.a) * t,
        }
    }

    /// Source-over blend of `self` on top of `dst`
    pub fn over(self, dst: Rgba) -> Rgba {
        let a = self.a.clamp(0.0, 1.0);
        let out_a = a + dst.a * (1.0 - a);
        if out_a <= f32::EPSILON {
            return Rgba::new(0, 0, 0, 0.0);
        }
        let ch = |s: u8, d: u8| {
            ((s as f32 * a + d as f32 * dst.a * (1.0 - a)) / out_a).round() as u8
        };
        Rgba {
            r: ch(self.r, dst.r),
            g: ch(self.g, dst.g),
            b: ch(self.b, dst.b),
            a: out_a,
        }
    }

    pub fn to_terminal(self) -> Color {
        Color::Rgb(self.r, self.g, self.b)
    }

    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, (self.a.clamp(0.0, 1.0) * 255.0).round() as u8]
    }
}

/// Light or dark presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn name(&self) -> &str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(&self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn parse(s: &str) -> Option<Theme> {
        match s.trim().to_lowercase().as_str() {
            "dark" | "d" => Some(Theme::Dark),
            "light" | "l" => Some(Theme::Light),
            _ => None,
        }
    }

    /// Guess from the `COLORFGBG` convention ("fg;bg", bg 7 or 15 means a light terminal)
    pub fn from_colorfgbg(value: &str) -> Option<Theme> {
        let bg: u8 = value.rsplit(';').next()?.trim().parse().ok()?;
        match bg {
            7 | 15 => Some(Theme::Light),
            0..=6 | 8 => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn palette(&self) -> &'static Palette {
        match self {
            Theme::Light => &LIGHT_PALETTE,
            Theme::Dark => &DARK_PALETTE,
        }
    }
}

/// Colors used to draw the field under one theme
#[derive(Debug, PartialEq)]
pub struct Palette {
    pub particles: [Rgba; 3],
    pub connection: Rgba,
    pub background: Rgba,
}

impl Palette {
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Rgba {
        self.particles[rng.gen_range(0..self.particles.len())]
    }

    pub fn contains(&self, color: &Rgba) -> bool {
        self.particles.iter().any(|c| c.same_rgb(color))
    }
}

pub static LIGHT_PALETTE: Palette = Palette {
    particles: [
        Rgba::new(59, 130, 246, 0.5),  // blue
        Rgba::new(255, 165, 0, 0.5),   // orange
        Rgba::new(99, 102, 241, 0.5),  // indigo
    ],
    connection: Rgba::new(59, 130, 246, 0.2),
    background: Rgba::opaque(248, 250, 252),
};

pub static DARK_PALETTE: Palette = Palette {
    particles: [
        Rgba::new(96, 165, 250, 0.5),  // light blue
        Rgba::new(147, 112, 219, 0.5), // purple
        Rgba::new(138, 43, 226, 0.5),  // violet
    ],
    connection: Rgba::new(147, 112, 219, 0.2),
    background: Rgba::opaque(17, 24, 39),
};

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_over_opaque_background() {
        let bg = Rgba::opaque(0, 0, 0);
        let out = Rgba::new(200, 100, 50, 0.5).over(bg);
        assert_eq!((out.r, out.g, out.b), (100, 50, 25));
        assert!((out.a - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_lerp_endpoints() {
        let a = Rgba::new(0, 0, 0, 0.0);
        let b = Rgba::new(255, 255, 255, 1.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
    }

    #[test]
    fn test_colorfgbg() {
        assert_eq!(Theme::from_colorfgbg("15;0"), Some(Theme::Dark));
        assert_eq!(Theme::from_colorfgbg("0;15"), Some(Theme::Light));
        assert_eq!(Theme::from_colorfgbg("0;default;7"), Some(Theme::Light));
        assert_eq!(Theme::from_colorfgbg("garbage"), None);
    }

    #[test]
    fn test_pick_stays_in_palette() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let c = DARK_PALETTE.pick(&mut rng);
            assert!(DARK_PALETTE.contains(&c));
            assert!(!LIGHT_PALETTE.contains(&c));
        }
    }

    #[test]
    fn test_theme_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Theme::Dark).unwrap(), "\"dark\"");
        assert_eq!(Theme::parse("LIGHT"), Some(Theme::Light));
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
    }
}
