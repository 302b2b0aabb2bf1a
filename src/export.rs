use crate::color::Rgba;
use crate::error::{FieldError, Result};
use crate::field::ParticleField;
use crate::render::Surface;
use image::{Rgba as Pixel, RgbaImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// Halo strength relative to the particle color at the disc edge
const HALO_STRENGTH: f32 = 0.35;

/// GIF frame delay in hundredths of a second
const GIF_FRAME_DELAY: u16 = 2;

/// Image target for the field, one image pixel per field pixel
pub struct RasterSurface {
    image: RgbaImage,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width.max(1), height.max(1)),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    fn blend(&mut self, x: i64, y: i64, color: Rgba) {
        if x < 0 || y < 0 || x >= self.image.width() as i64 || y >= self.image.height() as i64 {
            return;
        }
        let px = self.image.get_pixel_mut(x as u32, y as u32);
        let [r, g, b, a] = px.0;
        let dst = Rgba::new(r, g, b, a as f32 / 255.0);
        *px = Pixel(color.over(dst).to_bytes());
    }
}

impl Surface for RasterSurface {
    fn clear(&mut self, background: Rgba) {
        let fill = Pixel(background.to_bytes());
        for px in self.image.pixels_mut() {
            *px = fill;
        }
    }

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Rgba, glow: f32) {
        if !(x.is_finite() && y.is_finite()) {
            return;
        }
        let radius = radius.max(0.5);
        let reach = radius + glow.max(0.0);
        for py in (y - reach).floor() as i64..=(y + reach).ceil() as i64 {
            for px in (x - reach).floor() as i64..=(x + reach).ceil() as i64 {
                let d = ((px as f32 + 0.5 - x).powi(2) + (py as f32 + 0.5 - y).powi(2)).sqrt();
                if d <= radius {
                    self.blend(px, py, color);
                } else if glow > 0.0 && d <= reach {
                    let falloff = 1.0 - (d - radius) / glow;
                    self.blend(px, py, color.with_alpha(color.a * HALO_STRENGTH * falloff * falloff));
                }
            }
        }
    }

    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, start: Rgba, end: Rgba) {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let length = (dx * dx + dy * dy).sqrt();
        if !length.is_finite() {
            return;
        }
        let half = (width / 2.0).max(0.5);
        let steps = length.ceil().max(1.0) as i64;
        let mut last = None;
        for k in 0..=steps {
            let t = k as f32 / steps as f32;
            let (cx, cy) = (from.0 + dx * t, from.1 + dy * t);
            let color = start.lerp(end, t);
            for py in (cy - half).floor() as i64..(cy + half).ceil() as i64 {
                for px in (cx - half).floor() as i64..(cx + half).ceil() as i64 {
                    if last.is_some_and(|(lx, ly, lw): (i64, i64, i64)| {
                        (px - lx).abs() < lw && (py - ly).abs() < lw
                    }) {
                        continue;
                    }
                    self.blend(px, py, color);
                }
            }
            last = Some((cx.floor() as i64, cy.floor() as i64, half.ceil() as i64));
        }
    }
}

/// Output kind picked from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Gif,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => Ok(ExportFormat::Png),
            "gif" => Ok(ExportFormat::Gif),
            _ => Err(FieldError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Image size for a viewport
fn image_size(field: &ParticleField) -> (u32, u32) {
    let viewport = field.viewport();
    (viewport.width.round() as u32, viewport.height.round() as u32)
}

/// Write the field as it stands to a PNG without advancing it
pub fn snapshot(field: &ParticleField, path: &Path) -> Result<()> {
    let (width, height) = image_size(field);
    let mut surface = RasterSurface::new(width, height);
    field.draw(&mut surface);
    surface.image().save_with_format(path, image::ImageFormat::Png)?;
    info!(path = %path.display(), "snapshot written");
    Ok(())
}

/// Run `frames` frames headless and write a PNG of the last one, or a GIF of all of them
pub fn export(field: &mut ParticleField, path: &Path, frames: usize) -> Result<()> {
    let format = ExportFormat::from_path(path)?;
    let (width, height) = image_size(field);
    let mut surface = RasterSurface::new(width, height);
    let frames = frames.max(1);

    match format {
        ExportFormat::Png => {
            for _ in 0..frames {
                field.frame(&mut surface);
            }
            surface.image().save(path)?;
        }
        ExportFormat::Gif => {
            let (w, h) = gif_dimensions(surface.image().width(), surface.image().height())?;
            let file = BufWriter::new(File::create(path)?);
            let mut encoder = gif::Encoder::new(file, w, h, &[])?;
            encoder.set_repeat(gif::Repeat::Infinite)?;
            for _ in 0..frames {
                field.frame(&mut surface);
                let mut pixels = surface.image().as_raw().clone();
                let mut frame = gif::Frame::from_rgba_speed(w, h, &mut pixels, 10);
                frame.delay = GIF_FRAME_DELAY;
                encoder.write_frame(&frame)?;
            }
        }
    }

    info!(path = %path.display(), frames, ?format, "export written");
    Ok(())
}

/// GIF stores dimensions as 16-bit values
fn gif_dimensions(width: u32, height: u32) -> Result<(u16, u16)> {
    match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(FieldError::TooLarge { width, height }),
    }
}
