//! Drawing domain — public API.
//!
//! This module owns the freehand drawing surface: pointer mapping,
//! stroke rasterization and PNG export.
//! External code should only use the types exported here.

mod pointer;
mod surface;

pub use pointer::{PointerInput, TouchPoint};
pub use surface::DrawingSurface;

/// Largest logical edge of the (square) drawing surface.
pub const MAX_CANVAS_SIZE: u32 = 500;
/// Horizontal space kept free around the surface on narrow viewports.
pub const VIEWPORT_MARGIN: u32 = 32;
/// Stroke width in logical units.
pub const STROKE_WIDTH: f32 = 2.0;

/// A position in surface-local logical units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("drawing surface is not initialised")]
    NotReady,
    #[error("PNG encode failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Device pixel ratio actually used: anything non-positive or non-finite
/// counts as 1.0.
pub fn normalize_scale(device_pixel_ratio: f32) -> f32 {
    if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
        device_pixel_ratio
    } else {
        1.0
    }
}

/// Edge length of the square surface for a viewport of the given width.
pub fn canvas_size_for_viewport(viewport_width: u32) -> u32 {
    viewport_width
        .saturating_sub(VIEWPORT_MARGIN)
        .clamp(1, MAX_CANVAS_SIZE)
}
