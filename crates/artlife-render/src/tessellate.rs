//! GPU-less surface that turns stroked paths into a line list.
//!
//! [`LineSurface`] follows canvas path semantics: `move_to` starts a
//! subpath, `line_to` and `arc` extend it, `close_path` joins it back to its
//! start, and `stroke` appends the current path to the frame's vertices in
//! the current stroke color. Arcs are split into straight segments.
//!
//! The path and vertex buffers are cleared, never dropped, so a steady
//! stream of same-sized frames stops allocating after the first one. The
//! wgpu surface uploads [`vertices`](LineSurface::vertices) as-is.

use std::f64::consts::TAU;

use crate::surface::{Color, Surface};

/// One end of a line segment, as uploaded to the GPU.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck_derive::Pod, bytemuck_derive::Zeroable)]
pub struct LineVertex {
    /// Position in surface units.
    pub position: [f32; 2],
    /// RGBA color.
    pub color: [f32; 4],
}

/// A [`Surface`] that accumulates stroked geometry as line-list vertices.
#[derive(Debug, Clone)]
pub struct LineSurface {
    width: u32,
    height: u32,
    arc_segments: u32,
    stroke_color: Color,
    /// Segment endpoints of the current path, two per segment.
    path: Vec<[f32; 2]>,
    cursor: Option<[f32; 2]>,
    subpath_start: Option<[f32; 2]>,
    /// Stroked geometry for the current frame, two vertices per segment.
    vertices: Vec<LineVertex>,
}

impl LineSurface {
    /// A 0x0 surface splitting full circles into `arc_segments` segments.
    pub fn new(arc_segments: u32) -> Self {
        Self {
            width: 0,
            height: 0,
            arc_segments: arc_segments.max(3),
            stroke_color: Color::BLACK,
            path: Vec::new(),
            cursor: None,
            subpath_start: None,
            vertices: Vec::new(),
        }
    }

    /// Line-list vertices stroked since the last [`begin_frame`](Self::begin_frame).
    pub fn vertices(&self) -> &[LineVertex] {
        &self.vertices
    }

    /// Segments stroked since the last [`begin_frame`](Self::begin_frame).
    pub fn segment_count(&self) -> usize {
        self.vertices.len() / 2
    }

    /// Segments in the current, not yet stroked, path.
    pub fn pending_segments(&self) -> usize {
        self.path.len() / 2
    }

    /// Capacity of the vertex buffer, for allocation checks.
    pub fn vertex_capacity(&self) -> usize {
        self.vertices.capacity()
    }

    /// Drop last frame's geometry, keeping its allocation.
    pub fn begin_frame(&mut self) {
        self.vertices.clear();
    }

    fn push_segment(&mut self, from: [f32; 2], to: [f32; 2]) {
        self.path.push(from);
        self.path.push(to);
    }
}

fn point(x: f64, y: f64) -> [f32; 2] {
    [x as f32, y as f32]
}

impl Surface for LineSurface {
    fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_stroke_color(&mut self, color: Color) {
        self.stroke_color = color;
    }

    fn begin_path(&mut self) {
        self.path.clear();
        self.cursor = None;
        self.subpath_start = None;
    }

    fn move_to(&mut self, x: f64, y: f64) {
        let p = point(x, y);
        self.cursor = Some(p);
        self.subpath_start = Some(p);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        let p = point(x, y);
        match self.cursor {
            Some(from) => self.push_segment(from, p),
            // Without a current point, line_to behaves like move_to.
            None => self.subpath_start = Some(p),
        }
        self.cursor = Some(p);
    }

    fn close_path(&mut self) {
        if let (Some(from), Some(start)) = (self.cursor, self.subpath_start) {
            if from != start {
                self.push_segment(from, start);
            }
            self.cursor = Some(start);
        }
    }

    fn arc(&mut self, x: f64, y: f64, radius: f64, start_angle: f64, end_angle: f64) {
        let raw = end_angle - start_angle;
        let sweep = if raw >= TAU { TAU } else { raw.rem_euclid(TAU) };
        let segments = ((f64::from(self.arc_segments) * sweep / TAU).ceil() as u32).max(1);

        let at = |k: u32| {
            let angle = start_angle + sweep * f64::from(k) / f64::from(segments);
            point(x + radius * angle.cos(), y + radius * angle.sin())
        };

        let first = at(0);
        match self.cursor {
            Some(from) if from != first => self.push_segment(from, first),
            Some(_) => {}
            None => self.subpath_start = Some(first),
        }

        let mut prev = first;
        for k in 1..=segments {
            let next = at(k);
            self.push_segment(prev, next);
            prev = next;
        }
        self.cursor = Some(prev);
    }

    fn stroke(&mut self) {
        let color = self.stroke_color.to_array();
        self.vertices.extend(
            self.path
                .iter()
                .map(|&position| LineVertex { position, color }),
        );
    }
}
