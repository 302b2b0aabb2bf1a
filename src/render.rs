use crate::color::Rgba;

/// Shadow blur radius of the particle glow, in field pixels
pub const GLOW_BLUR: f32 = 10.0;

/// Drawing target for one frame of the field.
///
/// Coordinates are field pixels; implementations map them onto whatever grid
/// they rasterize to.
pub trait Surface {
    /// Fill the whole surface with the theme background
    fn clear(&mut self, background: Rgba);

    /// Filled disc; `glow` is the blur radius of a soft halo in the same color (0 disables it)
    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Rgba, glow: f32);

    /// Line whose color runs from `start` at `from` to `end` at `to`
    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, start: Rgba, end: Rgba);
}

/// Surface that only records what was drawn
#[cfg(test)]
#[derive(Debug, Default)]
pub struct DrawLog {
    pub clears: usize,
    pub circles: Vec<(f32, f32, f32, Rgba)>,
    pub lines: Vec<DrawnLine>,
}

/// One `stroke_line` call as recorded by `DrawLog`
#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawnLine {
    pub from: (f32, f32),
    pub to: (f32, f32),
    pub width: f32,
    pub start: Rgba,
    pub end: Rgba,
}

#[cfg(test)]
impl Surface for DrawLog {
    fn clear(&mut self, _background: Rgba) {
        self.clears += 1;
        self.circles.clear();
        self.lines.clear();
    }

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Rgba, _glow: f32) {
        self.circles.push((x, y, radius, color));
    }

    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, start: Rgba, end: Rgba) {
        self.lines.push(DrawnLine {
            from,
            to,
            width,
            start,
            end,
        });
    }
}
