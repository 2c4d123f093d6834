//! Artlife Render -- frame loop and zero-copy bridge for drawing a universe.
//!
//! Each frame the [`AnimationScheduler`](scheduler::AnimationScheduler)
//! draws the field outline, then the population, then asks the platform for
//! the next frame. The population is never copied out of the universe: the
//! [`memory`] bridge slices the universe's own memory region at the entity
//! buffer's current location and the [`population`] renderer decodes points
//! straight from those bytes.
//!
//! # Quick Start
//!
//! ```
//! use artlife_render::prelude::*;
//! use artlife_universe::prelude::*;
//!
//! let mut universe = NativeUniverse::new(100, 100, 1);
//! universe.birth(Species::Plant, 5).unwrap();
//!
//! let mut surface = RecordingSurface::new();
//! let mut frames = FrameQueue::new();
//! let mut scheduler = AnimationScheduler::new(RenderConfig::default()).unwrap();
//!
//! scheduler.start(&mut surface, &mut universe, &mut frames).unwrap();
//! let ran = scheduler.drive(&mut surface, &mut universe, &mut frames, 10).unwrap();
//!
//! assert_eq!(ran, 10);
//! assert_eq!(surface.arc_count(), 5 * 11);
//! ```
//!
//! # Modules
//!
//! - [`memory`]: frame-scoped [`EntityView`](memory::EntityView) over the
//!   entity buffer.
//! - [`field`]: the field outline.
//! - [`population`]: point decoding and the batched circle path.
//! - [`scheduler`]: the Idle/Running frame loop with a stop signal.
//! - [`surface`]: the drawing surface contract, colors, and a recording
//!   surface for tests.
//! - [`tessellate`]: a GPU-less surface that turns paths into line lists.
//! - `window` (feature `renderer`): winit + wgpu runner.

#![deny(unsafe_code)]

pub mod config;
pub mod field;
pub mod memory;
pub mod population;
pub mod scheduler;
pub mod surface;
pub mod tessellate;

#[cfg(feature = "renderer")]
pub mod window;

use artlife_universe::UniverseError;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by the render core.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A record index lies outside the bytes the current view can address.
    /// Aborts the population draw for the frame.
    #[error("record {index} is outside the entity view ({available} of {count} records addressable)")]
    OutOfBoundsRecord {
        /// The record index that was requested.
        index: usize,
        /// Records the universe reported for this frame.
        count: usize,
        /// Records actually backed by memory.
        available: usize,
    },

    /// The universe failed to answer a query.
    #[error(transparent)]
    Universe(#[from] UniverseError),

    /// A color string could not be parsed.
    #[error("invalid color {value:?}: {reason}")]
    InvalidColor {
        /// The rejected input.
        value: String,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// A configuration value is out of range or malformed.
    #[error("invalid render config: {0}")]
    Config(String),

    /// [`start`](scheduler::AnimationScheduler::start) was called twice.
    #[error("animation scheduler is already running")]
    AlreadyRunning,

    /// A frame callback arrived before
    /// [`start`](scheduler::AnimationScheduler::start).
    #[error("animation scheduler has not been started")]
    NotStarted,
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common render usage.
pub mod prelude {
    pub use crate::config::RenderConfig;
    pub use crate::field::{FieldRect, FieldRenderer};
    pub use crate::memory::{acquire_view, EntityView, ViewSpan};
    pub use crate::population::{DrawablePoint, PopulationRenderer};
    pub use crate::scheduler::{
        AnimationScheduler, FrameDiagnostics, FrameQueue, FrameReport, FrameRequester,
        SchedulerState, StopSignal,
    };
    pub use crate::surface::{Color, RecordingSurface, Surface, SurfaceCall};
    pub use crate::tessellate::{LineSurface, LineVertex};
    pub use crate::RenderError;
}
