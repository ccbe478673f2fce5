//! The drawing surface: an opaque bitmap plus the in-progress stroke.
//!
//! Ink goes onto a `tiny_skia::Pixmap` through a scale transform, so
//! logical coordinates land on a buffer sized for the device pixel ratio
//! and the exported PNG is crisp on high-density displays.
//! Every operation silently does nothing until `resize` has given the
//! surface a size.

use super::pointer::{self, PointerInput};
use super::{normalize_scale, CanvasError, Point, STROKE_WIDTH};
use crate::encoded::EncodedImage;
use image::{Rgb, RgbImage};
use tiny_skia::{Color, FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

#[derive(Debug, Clone)]
pub struct DrawingSurface {
    pixmap: Option<Pixmap>,
    logical_size: (u32, u32),
    scale: f32,
    origin: Point,
    /// Last point of the active stroke. `None` when not tracing.
    last_point: Option<Point>,
}

impl Default for DrawingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingSurface {
    /// An uninitialised surface. Call `resize` before drawing.
    pub fn new() -> Self {
        Self {
            pixmap: None,
            logical_size: (0, 0),
            scale: 1.0,
            origin: Point::default(),
            last_point: None,
        }
    }

    /// Convenience: a surface already sized and painted white.
    pub fn with_size(width: u32, height: u32, device_pixel_ratio: f32) -> Self {
        let mut surface = Self::new();
        surface.resize(width, height, device_pixel_ratio);
        surface
    }

    /// Reallocate at a new logical size and repaint white.
    ///
    /// Any previous content is discarded, even when the size is unchanged.
    pub fn resize(&mut self, width: u32, height: u32, device_pixel_ratio: f32) {
        let scale = normalize_scale(device_pixel_ratio);
        self.scale = scale;
        self.last_point = None;
        self.logical_size = (0, 0);
        self.pixmap = None;

        if width == 0 || height == 0 {
            log::debug!("[CANVAS] Resized to zero — surface uninitialised");
            return;
        }

        let physical_w = ((width as f32 * scale).round() as u32).max(1);
        let physical_h = ((height as f32 * scale).round() as u32).max(1);
        let Some(mut pixmap) = Pixmap::new(physical_w, physical_h) else {
            log::error!(
                "[CANVAS] Failed to allocate {}x{} pixmap",
                physical_w, physical_h
            );
            return;
        };
        pixmap.fill(Color::WHITE);

        self.logical_size = (width, height);
        self.pixmap = Some(pixmap);
        log::debug!(
            "[CANVAS] Resized to {}x{} logical ({}x{} px @ {:.2}x)",
            width, height, physical_w, physical_h, scale
        );
    }

    pub fn is_ready(&self) -> bool {
        self.pixmap.is_some()
    }

    pub fn is_tracing(&self) -> bool {
        self.last_point.is_some()
    }

    /// Logical (CSS-pixel-like) size.
    pub fn size(&self) -> (u32, u32) {
        self.logical_size
    }

    /// Size of the backing bitmap, if allocated.
    pub fn physical_size(&self) -> Option<(u32, u32)> {
        self.pixmap.as_ref().map(|p| (p.width(), p.height()))
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Pixel of the backing bitmap at physical coordinates.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb<u8>> {
        // Opaque everywhere, so premultiplied equals straight color.
        let c = self.pixmap.as_ref()?.pixel(x, y)?;
        Some(Rgb([c.red(), c.green(), c.blue()]))
    }

    // ── Strokes ─────────────────────────────────────────────────────

    pub fn begin_stroke(&mut self, point: Point) {
        if self.pixmap.is_none() || !point.is_finite() {
            return;
        }
        self.last_point = Some(point);
    }

    /// Ink a segment from the last point to `point`, if a stroke is active.
    pub fn extend_stroke(&mut self, point: Point) {
        let Some(last) = self.last_point else {
            return;
        };
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };
        if !point.is_finite() {
            return;
        }

        draw_segment(pixmap, last, point, self.scale);
        self.last_point = Some(point);
    }

    pub fn end_stroke(&mut self) {
        self.last_point = None;
    }

    /// Repaint white. Size is unchanged.
    pub fn reset(&mut self) {
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.fill(Color::WHITE);
            log::debug!("[CANVAS] Cleared");
        }
    }

    /// Encode the current bitmap as an opaque PNG data URI.
    pub fn export_image(&self) -> Result<EncodedImage, CanvasError> {
        let pixmap = self.pixmap.as_ref().ok_or(CanvasError::NotReady)?;

        let start = std::time::Instant::now();
        let rgb: Vec<u8> = pixmap
            .data()
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        let buffer = RgbImage::from_raw(pixmap.width(), pixmap.height(), rgb)
            .ok_or(CanvasError::NotReady)?;

        let mut png_bytes = Vec::new();
        buffer.write_to(
            &mut std::io::Cursor::new(&mut png_bytes),
            image::ImageFormat::Png,
        )?;
        log::info!(
            "[CANVAS] PNG encode: {}ms ({} bytes)",
            start.elapsed().as_millis(),
            png_bytes.len()
        );

        Ok(EncodedImage::from_png_bytes(&png_bytes))
    }

    // ── Pointer routing ─────────────────────────────────────────────

    /// Record where the surface's top-left corner sits on screen.
    pub fn set_screen_origin(&mut self, left: f32, top: f32) {
        self.origin = Point::new(left, top);
    }

    pub fn map_pointer(&self, input: &PointerInput) -> Option<Point> {
        input
            .client_position()
            .map(|client| pointer::to_local(client, self.origin))
    }

    pub fn pointer_down(&mut self, input: &PointerInput) {
        if let Some(point) = self.map_pointer(input) {
            self.begin_stroke(point);
        }
    }

    pub fn pointer_move(&mut self, input: &PointerInput) {
        if let Some(point) = self.map_pointer(input) {
            self.extend_stroke(point);
        }
    }

    pub fn pointer_up(&mut self) {
        self.end_stroke();
    }

    /// Leaving the surface ends the stroke, same as releasing.
    pub fn pointer_leave(&mut self) {
        self.end_stroke();
    }
}

/// Black, round-capped, anti-aliased segment in logical coordinates.
///
/// A zero-length segment still leaves a round dot, like a tap on a canvas.
fn draw_segment(pixmap: &mut Pixmap, from: Point, to: Point, scale: f32) {
    let mut paint = Paint::default();
    paint.set_color_rgba8(0, 0, 0, 255);
    paint.anti_alias = true;
    let transform = Transform::from_scale(scale, scale);

    if from == to {
        if let Some(dot) = PathBuilder::from_circle(from.x, from.y, STROKE_WIDTH / 2.0) {
            pixmap.fill_path(&dot, &paint, FillRule::Winding, transform, None);
        }
        return;
    }

    let mut pb = PathBuilder::new();
    pb.move_to(from.x, from.y);
    pb.line_to(to.x, to.y);
    let Some(path) = pb.finish() else {
        return;
    };
    let stroke = Stroke {
        width: STROKE_WIDTH,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, &paint, &stroke, transform, None);
}
