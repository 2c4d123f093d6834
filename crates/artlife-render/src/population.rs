//! Population rendering.
//!
//! Every live entity becomes a circle of fixed radius. All circles go into a
//! single path that is stroked once, so the surface sees one batch per
//! frame no matter how large the population is. Each arc is preceded by a
//! `move_to` onto its own start point; without it the surface would join
//! consecutive circles with straight lines.

use std::f64::consts::TAU;

use artlife_universe::Universe;

use crate::memory::{acquire_view, EntityView};
use crate::surface::{Color, Surface};
use crate::RenderError;

/// A point ready to draw. Lives only for the draw call that decoded it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawablePoint {
    /// Center x in simulation units.
    pub x: f64,
    /// Center y in simulation units.
    pub y: f64,
    /// Radius in simulation units.
    pub radius: f64,
}

/// Decode the points of every record in `view`, in buffer order.
///
/// Yields exactly [`view.len()`](EntityView::len) items. A record that is
/// not backed by memory yields an error in its slot.
pub fn decode_points<'v>(
    view: &'v EntityView<'_>,
    radius: f64,
) -> impl Iterator<Item = Result<DrawablePoint, RenderError>> + 'v {
    (0..view.len()).map(move |index| {
        let (x, y) = view.position(index)?;
        Ok(DrawablePoint {
            x: f64::from(x),
            y: f64::from(y),
            radius,
        })
    })
}

/// Draws the population as one batched path of circles.
#[derive(Debug, Clone)]
pub struct PopulationRenderer {
    radius: f64,
    color: Color,
}

impl PopulationRenderer {
    /// A renderer drawing circles of `radius` stroked in `color`.
    pub fn new(radius: f64, color: Color) -> Self {
        Self { radius, color }
    }

    /// Radius of every drawn circle.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Draw the universe's current population.
    ///
    /// Acquires a fresh view, adds one circle per reported record to a new
    /// path, and strokes it once. Returns the number of points drawn, which
    /// always equals the universe's reported entity count.
    ///
    /// # Errors
    ///
    /// - [`RenderError::OutOfBoundsRecord`] if a reported record is not
    ///   backed by memory. Nothing is stroked; the partial path is left for
    ///   the next `begin_path` to discard.
    /// - [`RenderError::Universe`] if the universe cannot report its buffer.
    pub fn draw_population<S, U>(&self, surface: &mut S, universe: &mut U) -> Result<usize, RenderError>
    where
        S: Surface + ?Sized,
        U: Universe + ?Sized,
    {
        let view = acquire_view(universe)?;

        surface.begin_path();
        surface.set_stroke_color(self.color);

        let mut drawn = 0;
        for point in decode_points(&view, self.radius) {
            let point = point?;
            surface.move_to(point.x + point.radius, point.y);
            surface.arc(point.x, point.y, point.radius, 0.0, TAU);
            drawn += 1;
        }

        surface.stroke();
        Ok(drawn)
    }
}

impl Default for PopulationRenderer {
    fn default() -> Self {
        Self::new(5.0, Color::BLACK)
    }
}
