//! The drawing surface contract.
//!
//! [`Surface`] is a 2D immediate-mode path API in the style of a canvas
//! context: paths are built with `move_to`/`line_to`/`arc`, and nothing
//! reaches the screen until [`stroke`](Surface::stroke). The stroke color is
//! applied at stroke time.
//!
//! [`RecordingSurface`] records every call and is what the tests draw into.

use serde::{Deserialize, Serialize};

use crate::RenderError;

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// An RGBA color with channels in `0.0..=1.0`.
///
/// Serializes as a CSS hex string (`"#rrggbb"` or `"#rrggbbaa"`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    /// Opaque white.
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    /// An opaque color.
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parse `#rgb`, `#rrggbb`, or `#rrggbbaa`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidColor`] for anything else.
    pub fn parse_hex(value: &str) -> Result<Self, RenderError> {
        let invalid = |reason| RenderError::InvalidColor {
            value: value.to_owned(),
            reason,
        };

        let digits = value
            .strip_prefix('#')
            .ok_or_else(|| invalid("missing leading '#'"))?;
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid("non-hex digit"));
        }

        let channel = |s: &str| u8::from_str_radix(s, 16).map(|v| f32::from(v) / 255.0);
        let parsed = match digits.len() {
            3 => {
                let nibbles: Vec<String> = digits.chars().map(|c| format!("{c}{c}")).collect();
                (
                    channel(&nibbles[0]),
                    channel(&nibbles[1]),
                    channel(&nibbles[2]),
                    Ok(1.0),
                )
            }
            6 | 8 => (
                channel(&digits[0..2]),
                channel(&digits[2..4]),
                channel(&digits[4..6]),
                if digits.len() == 8 {
                    channel(&digits[6..8])
                } else {
                    Ok(1.0)
                },
            ),
            _ => return Err(invalid("expected 3, 6, or 8 hex digits")),
        };

        match parsed {
            (Ok(r), Ok(g), Ok(b), Ok(a)) => Ok(Self { r, g, b, a }),
            _ => Err(invalid("non-hex digit")),
        }
    }

    /// Format as `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        let (r, g, b, a) = (byte(self.r), byte(self.g), byte(self.b), byte(self.a));
        if a == u8::MAX {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }

    /// Channels as an array, for vertex data.
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl TryFrom<String> for Color {
    type Error = RenderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

// ---------------------------------------------------------------------------
// Surface
// ---------------------------------------------------------------------------

/// A 2D immediate-mode drawing surface.
///
/// Coordinates are in surface units with the origin at the top-left corner
/// and y growing downwards.
pub trait Surface {
    /// Resize the drawing area, in pixels.
    fn set_size(&mut self, width: u32, height: u32);

    /// Current drawing area size, in pixels.
    fn size(&self) -> (u32, u32);

    /// Color used by subsequent [`stroke`](Self::stroke) calls.
    fn set_stroke_color(&mut self, color: Color);

    /// Discard the current path and start a new one.
    fn begin_path(&mut self);

    /// Start a new subpath at `(x, y)`.
    fn move_to(&mut self, x: f64, y: f64);

    /// Add a straight segment from the current point to `(x, y)`.
    fn line_to(&mut self, x: f64, y: f64);

    /// Connect the current point back to the start of the subpath.
    fn close_path(&mut self);

    /// Add a clockwise circular arc. If the path has a current point, a
    /// straight segment joins it to the arc's start.
    fn arc(&mut self, x: f64, y: f64, radius: f64, start_angle: f64, end_angle: f64);

    /// Outline the current path with the stroke color.
    fn stroke(&mut self);
}

impl<S: Surface + ?Sized> Surface for &mut S {
    fn set_size(&mut self, width: u32, height: u32) {
        (**self).set_size(width, height);
    }

    fn size(&self) -> (u32, u32) {
        (**self).size()
    }

    fn set_stroke_color(&mut self, color: Color) {
        (**self).set_stroke_color(color);
    }

    fn begin_path(&mut self) {
        (**self).begin_path();
    }

    fn move_to(&mut self, x: f64, y: f64) {
        (**self).move_to(x, y);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        (**self).line_to(x, y);
    }

    fn close_path(&mut self) {
        (**self).close_path();
    }

    fn arc(&mut self, x: f64, y: f64, radius: f64, start_angle: f64, end_angle: f64) {
        (**self).arc(x, y, radius, start_angle, end_angle);
    }

    fn stroke(&mut self) {
        (**self).stroke();
    }
}

// ---------------------------------------------------------------------------
// RecordingSurface
// ---------------------------------------------------------------------------

/// One recorded [`Surface`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    /// [`Surface::set_size`].
    SetSize {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// [`Surface::set_stroke_color`].
    SetStrokeColor(Color),
    /// [`Surface::begin_path`].
    BeginPath,
    /// [`Surface::move_to`].
    MoveTo {
        /// X coordinate.
        x: f64,
        /// Y coordinate.
        y: f64,
    },
    /// [`Surface::line_to`].
    LineTo {
        /// X coordinate.
        x: f64,
        /// Y coordinate.
        y: f64,
    },
    /// [`Surface::close_path`].
    ClosePath,
    /// [`Surface::arc`].
    Arc {
        /// Center x.
        x: f64,
        /// Center y.
        y: f64,
        /// Radius.
        radius: f64,
        /// Start angle in radians.
        start_angle: f64,
        /// End angle in radians.
        end_angle: f64,
    },
    /// [`Surface::stroke`].
    Stroke,
}

/// A surface that draws nothing and remembers every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    calls: Vec<SurfaceCall>,
    width: u32,
    height: u32,
}

impl RecordingSurface {
    /// An empty 0x0 recording surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    /// Forget recorded calls. The size is kept.
    pub fn clear(&mut self) {
        self.calls.clear();
    }

    /// Recorded calls split into paths: each slice starts at a
    /// [`SurfaceCall::BeginPath`]. Calls before the first path are dropped.
    pub fn paths(&self) -> Vec<&[SurfaceCall]> {
        let starts: Vec<usize> = self
            .calls
            .iter()
            .enumerate()
            .filter(|(_, call)| **call == SurfaceCall::BeginPath)
            .map(|(i, _)| i)
            .collect();

        starts
            .iter()
            .enumerate()
            .map(|(n, &start)| {
                let end = starts.get(n + 1).copied().unwrap_or(self.calls.len());
                &self.calls[start..end]
            })
            .collect()
    }

    /// Center and radius of every recorded arc.
    pub fn arcs(&self) -> Vec<(f64, f64, f64)> {
        self.calls
            .iter()
            .filter_map(|call| match *call {
                SurfaceCall::Arc { x, y, radius, .. } => Some((x, y, radius)),
                _ => None,
            })
            .collect()
    }

    /// Number of recorded arcs.
    pub fn arc_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, SurfaceCall::Arc { .. }))
            .count()
    }

    /// Number of recorded strokes.
    pub fn stroke_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| **call == SurfaceCall::Stroke)
            .count()
    }
}

impl Surface for RecordingSurface {
    fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.calls.push(SurfaceCall::SetSize { width, height });
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_stroke_color(&mut self, color: Color) {
        self.calls.push(SurfaceCall::SetStrokeColor(color));
    }

    fn begin_path(&mut self) {
        self.calls.push(SurfaceCall::BeginPath);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.calls.push(SurfaceCall::MoveTo { x, y });
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.calls.push(SurfaceCall::LineTo { x, y });
    }

    fn close_path(&mut self) {
        self.calls.push(SurfaceCall::ClosePath);
    }

    fn arc(&mut self, x: f64, y: f64, radius: f64, start_angle: f64, end_angle: f64) {
        self.calls.push(SurfaceCall::Arc {
            x,
            y,
            radius,
            start_angle,
            end_angle,
        });
    }

    fn stroke(&mut self) {
        self.calls.push(SurfaceCall::Stroke);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_short_hex() {
        assert_eq!(Color::parse_hex("#000").unwrap(), Color::BLACK);
        assert_eq!(Color::parse_hex("#fff").unwrap(), Color::WHITE);
    }

    #[test]
    fn parse_long_hex() {
        let color = Color::parse_hex("#02ab83").unwrap();
        assert!((color.r - 2.0 / 255.0).abs() < 1e-6);
        assert!((color.g - 171.0 / 255.0).abs() < 1e-6);
        assert!((color.b - 131.0 / 255.0).abs() < 1e-6);
        assert!((color.a - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn parse_hex_with_alpha() {
        let color = Color::parse_hex("#ff000080").unwrap();
        assert!((color.a - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(color.to_hex(), "#ff000080");
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in ["000", "#00", "#0000", "#gggggg", "", "#ab+cde"] {
            assert!(
                matches!(Color::parse_hex(bad), Err(RenderError::InvalidColor { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn hex_formatting() {
        assert_eq!(Color::BLACK.to_hex(), "#000000");
        assert_eq!(Color::parse_hex("#eac435").unwrap().to_hex(), "#eac435");
    }

    #[test]
    fn color_serde_as_string() {
        let json = serde_json::to_string(&Color::WHITE).unwrap();
        assert_eq!(json, "\"#ffffff\"");
        let back: Color = serde_json::from_str("\"#fb4d3d\"").unwrap();
        assert_eq!(back.to_hex(), "#fb4d3d");
        assert!(serde_json::from_str::<Color>("\"red\"").is_err());
    }

    #[test]
    fn recording_surface_tracks_size_and_paths() {
        let mut surface = RecordingSurface::new();
        surface.set_size(12, 34);
        surface.begin_path();
        surface.move_to(0.0, 0.0);
        surface.stroke();
        surface.begin_path();
        surface.arc(1.0, 2.0, 3.0, 0.0, 1.0);
        surface.stroke();

        assert_eq!(surface.size(), (12, 34));
        let paths = surface.paths();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].len(), 3);
        assert_eq!(surface.arcs(), vec![(1.0, 2.0, 3.0)]);
        assert_eq!(surface.stroke_count(), 2);
    }
}
