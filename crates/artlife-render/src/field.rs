//! The field outline.

use crate::surface::{Color, Surface};

/// The simulation field, fixed for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRect {
    /// Width in simulation units.
    pub width: u32,
    /// Height in simulation units.
    pub height: u32,
}

impl FieldRect {
    /// Outline corners, clockwise from the origin.
    pub fn corners(&self) -> [(f64, f64); 4] {
        let (w, h) = (f64::from(self.width), f64::from(self.height));
        [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)]
    }

    /// Pixel size of a surface showing this field at `scale`. Fractional
    /// pixels are truncated.
    pub fn surface_size(&self, scale: f64) -> (u32, u32) {
        // Epsilon absorbs representation error in scales like 1.2.
        let scaled = |units: u32| (f64::from(units) * scale + 1e-9) as u32;
        (scaled(self.width), scaled(self.height))
    }
}

/// Draws the field outline.
#[derive(Debug, Clone)]
pub struct FieldRenderer {
    color: Color,
}

impl FieldRenderer {
    /// A renderer stroking the outline in `color`.
    pub fn new(color: Color) -> Self {
        Self { color }
    }

    /// Stroke one closed rectangle from `(0, 0)` to `(width, height)`.
    ///
    /// Reads no simulation state and keeps none; drawing twice draws the
    /// same outline twice.
    pub fn draw_field<S: Surface + ?Sized>(&self, surface: &mut S, width: f64, height: f64) {
        surface.begin_path();
        surface.set_stroke_color(self.color);

        surface.move_to(0.0, 0.0);
        surface.line_to(width, 0.0);
        surface.line_to(width, height);
        surface.line_to(0.0, height);
        surface.close_path();

        surface.stroke();
    }

    /// [`draw_field`](Self::draw_field) for a [`FieldRect`].
    pub fn draw<S: Surface + ?Sized>(&self, surface: &mut S, field: FieldRect) {
        self.draw_field(surface, f64::from(field.width), f64::from(field.height));
    }
}

impl Default for FieldRenderer {
    fn default() -> Self {
        Self::new(Color::BLACK)
    }
}
