use crate::color::Rgba;
use crate::particle::Viewport;
use crate::render::Surface;
use ratatui::style::Color;

/// Braille character rendering for high-resolution terminal graphics.
/// Each Braille character represents a 2x4 grid of dots (8 dots total).
///
/// Dot positions and their bit values:
/// ```text
/// (0,0)=0x01  (1,0)=0x08
/// (0,1)=0x02  (1,1)=0x10
/// (0,2)=0x04  (1,2)=0x20
/// (0,3)=0x40  (1,3)=0x80
/// ```
///
/// Unicode Braille patterns: U+2800 to U+28FF (256 patterns)
const BRAILLE_BASE: u32 = 0x2800;

/// Dot position to bit mapping for Braille characters
const BRAILLE_DOTS: [[u8; 4]; 2] = [
    [0x01, 0x02, 0x04, 0x40], // Left column (x=0): rows 0,1,2,3
    [0x08, 0x10, 0x20, 0x80], // Right column (x=1): rows 0,1,2,3
];

/// Halo strength relative to the particle color at the disc edge
const HALO_STRENGTH: f32 = 0.35;

/// Halo dots fainter than this are left dark
const HALO_MIN_ALPHA: f32 = 0.1;

/// A single rendered Braille cell with position and color
#[derive(Clone, Copy)]
pub struct BrailleCell {
    pub x: u16,
    pub y: u16,
    pub char: char,
    pub color: Color,
}

/// Dot buffer the field draws into, one color per Braille dot
pub struct BrailleSurface {
    cols: u16,
    rows: u16,
    /// Field pixels per dot
    scale: f32,
    background: Rgba,
    dots: Vec<Rgba>,
    lit: Vec<bool>,
}

impl BrailleSurface {
    pub fn new(cols: u16, rows: u16, pixels_per_dot: f32) -> Self {
        let len = cols as usize * 2 * rows as usize * 4;
        let background = Rgba::opaque(0, 0, 0);
        Self {
            cols,
            rows,
            scale: pixels_per_dot.max(f32::EPSILON),
            background,
            dots: vec![background; len],
            lit: vec![false; len],
        }
    }

    fn dot_width(&self) -> i32 {
        self.cols as i32 * 2
    }

    fn dot_height(&self) -> i32 {
        self.rows as i32 * 4
    }

    pub fn background(&self) -> Rgba {
        self.background
    }

    /// Composite `color` onto one dot; out-of-range dots are ignored
    fn plot(&mut self, dx: i32, dy: i32, color: Rgba) {
        if dx < 0 || dy < 0 || dx >= self.dot_width() || dy >= self.dot_height() {
            return;
        }
        let idx = dy as usize * self.dot_width() as usize + dx as usize;
        self.dots[idx] = color.over(self.dots[idx]);
        self.lit[idx] = true;
    }

    fn is_lit(&self, dx: i32, dy: i32) -> bool {
        dx >= 0
            && dy >= 0
            && dx < self.dot_width()
            && dy < self.dot_height()
            && self.lit[dy as usize * self.dot_width() as usize + dx as usize]
    }

    /// Collapse the dot buffer into Braille characters, one per terminal cell
    pub fn cells(&self) -> Vec<BrailleCell> {
        let mut cells = Vec::with_capacity(self.cols as usize * self.rows as usize);

        for cy in 0..self.rows {
            for cx in 0..self.cols {
                let mut pattern: u8 = 0;
                let (mut r, mut g, mut b) = (0u32, 0u32, 0u32);
                let mut dot_count = 0u32;

                let base_x = cx as i32 * 2;
                let base_y = cy as i32 * 4;

                for dx in 0..2 {
                    for dy in 0..4 {
                        let x = base_x + dx as i32;
                        let y = base_y + dy as i32;
                        if self.is_lit(x, y) {
                            pattern |= BRAILLE_DOTS[dx][dy];
                            let c = self.dots[y as usize * self.dot_width() as usize + x as usize];
                            r += c.r as u32;
                            g += c.g as u32;
                            b += c.b as u32;
                            dot_count += 1;
                        }
                    }
                }

                // Only emit cells that have at least one dot
                if pattern != 0 {
                    let braille_char = char::from_u32(BRAILLE_BASE + pattern as u32).unwrap_or(' ');
                    let color = Color::Rgb(
                        (r / dot_count) as u8,
                        (g / dot_count) as u8,
                        (b / dot_count) as u8,
                    );
                    cells.push(BrailleCell {
                        x: cx,
                        y: cy,
                        char: braille_char,
                        color,
                    });
                }
            }
        }

        cells
    }
}

impl Surface for BrailleSurface {
    fn clear(&mut self, background: Rgba) {
        self.background = background;
        self.dots.fill(background);
        self.lit.fill(false);
    }

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Rgba, glow: f32) {
        if !(x.is_finite() && y.is_finite()) {
            return;
        }
        let s = self.scale;
        let reach = radius.max(0.0) + glow.max(0.0);
        let min_x = ((x - reach) / s).floor() as i32;
        let max_x = ((x + reach) / s).floor() as i32;
        let min_y = ((y - reach) / s).floor() as i32;
        let max_y = ((y + reach) / s).floor() as i32;

        for dy in min_y..=max_y {
            for dx in min_x..=max_x {
                let px = (dx as f32 + 0.5) * s;
                let py = (dy as f32 + 0.5) * s;
                let d = ((px - x).powi(2) + (py - y).powi(2)).sqrt();
                if d <= radius {
                    self.plot(dx, dy, color);
                } else if glow > 0.0 && d <= reach {
                    let alpha = color.a * HALO_STRENGTH * (1.0 - (d - radius) / glow);
                    if alpha >= HALO_MIN_ALPHA {
                        self.plot(dx, dy, color.with_alpha(alpha));
                    }
                }
            }
        }

        // Particles smaller than a dot still show up
        let (cx, cy) = ((x / s).floor() as i32, (y / s).floor() as i32);
        if !self.is_lit(cx, cy) {
            self.plot(cx, cy, color);
        }
    }

    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), _width: f32, start: Rgba, end: Rgba) {
        let s = self.scale;
        let (x0, y0) = (from.0 / s, from.1 / s);
        let (x1, y1) = (to.0 / s, to.1 / s);
        if !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
            return;
        }
        let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0) as i32;
        let mut last = None;
        for k in 0..=steps {
            let t = k as f32 / steps as f32;
            let dx = (x0 + (x1 - x0) * t).floor() as i32;
            let dy = (y0 + (y1 - y0) * t).floor() as i32;
            // one composite per dot even when samples repeat
            if last == Some((dx, dy)) {
                continue;
            }
            last = Some((dx, dy));
            self.plot(dx, dy, start.lerp(end, t));
        }
    }
}

/// Field viewport for a canvas of `canvas_width` x `canvas_height` cells
pub fn calculate_viewport(canvas_width: u16, canvas_height: u16, pixels_per_dot: f32) -> Viewport {
    // Braille gives 2x4 resolution per character
    Viewport::new(
        canvas_width as f32 * 2.0 * pixels_per_dot,
        canvas_height as f32 * 4.0 * pixels_per_dot,
    )
}

/// Field position at the center of canvas cell (col, row)
pub fn cell_to_field(col: u16, row: u16, pixels_per_dot: f32) -> (f32, f32) {
    (
        (col as f32 * 2.0 + 1.0) * pixels_per_dot,
        (row as f32 * 4.0 + 2.0) * pixels_per_dot,
    )
}
