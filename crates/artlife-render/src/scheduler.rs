//! The frame loop.
//!
//! [`AnimationScheduler`] is a two-state machine:
//!
//! - **Idle** until [`start`](AnimationScheduler::start), which reads the
//!   field size, sizes the surface, draws one frame synchronously, and asks
//!   for the first callback.
//! - **Running** from then on. Every [`on_frame`](AnimationScheduler::on_frame)
//!   draws the field, draws the population, and asks for the next callback.
//!
//! The scheduler never loops by itself. It asks a [`FrameRequester`] for the
//! next frame and returns; the platform (a window's redraw request, or a
//! [`FrameQueue`] in headless runs) calls back. Before every request the
//! [`StopSignal`] is checked: once raised, the frame in progress completes
//! and no further frame is requested.
//!
//! A failed population draw is logged and reported in the
//! [`FrameReport`]; it never breaks the chain of frames.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use artlife_universe::Universe;

use crate::config::RenderConfig;
use crate::field::{FieldRect, FieldRenderer};
use crate::population::PopulationRenderer;
use crate::surface::Surface;
use crate::RenderError;

// ---------------------------------------------------------------------------
// Frame requests
// ---------------------------------------------------------------------------

/// The platform hook for "call me again on the next display refresh".
pub trait FrameRequester {
    /// Ask for one more frame callback.
    fn request_frame(&mut self);
}

impl<R: FrameRequester + ?Sized> FrameRequester for &mut R {
    fn request_frame(&mut self) {
        (**self).request_frame();
    }
}

/// Headless frame requester: remembers whether a frame is pending.
///
/// Pair with [`AnimationScheduler::drive`] to run a bounded number of frames
/// deterministically.
#[derive(Debug, Clone, Default)]
pub struct FrameQueue {
    pending: bool,
    requests: u64,
}

impl FrameQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a frame has been requested and not yet taken.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Consume the pending request, if any.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    /// Total requests received.
    pub fn requests(&self) -> u64 {
        self.requests
    }
}

impl FrameRequester for FrameQueue {
    fn request_frame(&mut self) {
        self.pending = true;
        self.requests += 1;
    }
}

// ---------------------------------------------------------------------------
// StopSignal
// ---------------------------------------------------------------------------

/// A cloneable flag that ends the frame chain once raised.
///
/// Clones share the flag, so any thread holding one can stop the loop.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    /// A lowered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal. Idempotent.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether the signal has been raised.
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Lifecycle state of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Created, not yet started.
    Idle,
    /// Started; frames are being drawn.
    Running,
}

/// Outcome of one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Frame number, starting at 0 for the synchronous startup frame.
    pub frame: u64,
    /// Points drawn, or `None` if the population draw was aborted.
    pub points_drawn: Option<usize>,
    /// Whether another frame was requested.
    pub rescheduled: bool,
    /// Wall-clock time spent drawing.
    pub elapsed: Duration,
}

/// Running totals across frames.
#[derive(Debug, Clone, Default)]
pub struct FrameDiagnostics {
    /// Frames drawn, including the startup frame.
    pub frames: u64,
    /// Frames whose population draw was aborted.
    pub aborted_frames: u64,
    /// Points drawn in the most recent frame.
    pub last_points: Option<usize>,
    /// Draw time of the most recent frame.
    pub last_frame_time: Duration,
}

// ---------------------------------------------------------------------------
// AnimationScheduler
// ---------------------------------------------------------------------------

/// Drives field and population drawing once per frame callback.
///
/// Holds no reference to the universe or the surface; both are passed into
/// every call.
pub struct AnimationScheduler {
    config: RenderConfig,
    field_renderer: FieldRenderer,
    population_renderer: PopulationRenderer,
    /// Set once by `start`.
    field: Option<FieldRect>,
    state: SchedulerState,
    stop: StopSignal,
    frame_counter: u64,
    diagnostics: FrameDiagnostics,
}

impl AnimationScheduler {
    /// Create an idle scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Config`] if the configuration is invalid.
    pub fn new(config: RenderConfig) -> Result<Self, RenderError> {
        config.validate()?;
        Ok(Self {
            field_renderer: FieldRenderer::new(config.field_color),
            population_renderer: PopulationRenderer::new(
                config.point_radius,
                config.population_color,
            ),
            config,
            field: None,
            state: SchedulerState::Idle,
            stop: StopSignal::new(),
            frame_counter: 0,
            diagnostics: FrameDiagnostics::default(),
        })
    }

    /// A handle that stops the loop when raised.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// The field read at startup, once running.
    pub fn field(&self) -> Option<FieldRect> {
        self.field
    }

    /// The configuration in use.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Totals across all frames so far.
    pub fn diagnostics(&self) -> &FrameDiagnostics {
        &self.diagnostics
    }

    /// Move from Idle to Running.
    ///
    /// Reads the field size, sizes the surface to the field times
    /// [`display_scale`](RenderConfig::display_scale), draws frame 0, and
    /// requests the first callback unless the stop signal is already raised.
    ///
    /// # Errors
    ///
    /// - [`RenderError::AlreadyRunning`] on a second call.
    /// - [`RenderError::Universe`] if the field size cannot be read; the
    ///   scheduler stays Idle.
    pub fn start<S, U, R>(
        &mut self,
        surface: &mut S,
        universe: &mut U,
        requester: &mut R,
    ) -> Result<FrameReport, RenderError>
    where
        S: Surface + ?Sized,
        U: Universe + ?Sized,
        R: FrameRequester + ?Sized,
    {
        if self.state == SchedulerState::Running {
            return Err(RenderError::AlreadyRunning);
        }

        let field = FieldRect {
            width: universe.width()?,
            height: universe.height()?,
        };
        let (surface_width, surface_height) = field.surface_size(self.config.display_scale);
        surface.set_size(surface_width, surface_height);

        tracing::debug!(
            field_width = field.width,
            field_height = field.height,
            surface_width,
            surface_height,
            "animation scheduler starting"
        );

        self.field = Some(field);
        self.state = SchedulerState::Running;
        Ok(self.run_frame(field, surface, universe, requester))
    }

    /// Handle one frame callback.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::NotStarted`] if called before
    /// [`start`](Self::start). Drawing failures do not error; they show up
    /// in the returned report.
    pub fn on_frame<S, U, R>(
        &mut self,
        surface: &mut S,
        universe: &mut U,
        requester: &mut R,
    ) -> Result<FrameReport, RenderError>
    where
        S: Surface + ?Sized,
        U: Universe + ?Sized,
        R: FrameRequester + ?Sized,
    {
        let Some(field) = self.field else {
            return Err(RenderError::NotStarted);
        };
        Ok(self.run_frame(field, surface, universe, requester))
    }

    /// Run queued frames until the queue is empty or `max_frames` have run.
    /// Returns the number of frames run.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::NotStarted`] if a frame is pending but the
    /// scheduler was never started.
    pub fn drive<S, U>(
        &mut self,
        surface: &mut S,
        universe: &mut U,
        queue: &mut FrameQueue,
        max_frames: u64,
    ) -> Result<u64, RenderError>
    where
        S: Surface + ?Sized,
        U: Universe + ?Sized,
    {
        let mut ran = 0;
        while ran < max_frames && queue.take() {
            self.on_frame(surface, universe, queue)?;
            ran += 1;
        }
        Ok(ran)
    }

    fn run_frame<S, U, R>(
        &mut self,
        field: FieldRect,
        surface: &mut S,
        universe: &mut U,
        requester: &mut R,
    ) -> FrameReport
    where
        S: Surface + ?Sized,
        U: Universe + ?Sized,
        R: FrameRequester + ?Sized,
    {
        let started = Instant::now();
        let frame = self.frame_counter;
        self.frame_counter += 1;

        self.field_renderer.draw(surface, field);

        let points_drawn = match self.population_renderer.draw_population(surface, universe) {
            Ok(points) => Some(points),
            Err(e) => {
                tracing::warn!(frame, error = %e, "population draw aborted for this frame");
                None
            }
        };

        let rescheduled = if self.stop.is_raised() {
            tracing::debug!(frame, "stop signal raised -- not requesting another frame");
            false
        } else {
            requester.request_frame();
            true
        };

        let elapsed = started.elapsed();
        self.diagnostics.frames += 1;
        if points_drawn.is_none() {
            self.diagnostics.aborted_frames += 1;
        }
        self.diagnostics.last_points = points_drawn;
        self.diagnostics.last_frame_time = elapsed;

        tracing::trace!(frame, points = ?points_drawn, ?elapsed, "frame drawn");

        FrameReport {
            frame,
            points_drawn,
            rescheduled,
            elapsed,
        }
    }
}

impl std::fmt::Debug for AnimationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationScheduler")
            .field("state", &self.state)
            .field("field", &self.field)
            .field("frames", &self.frame_counter)
            .field("stopped", &self.stop.is_raised())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RecordingSurface;
    use artlife_universe::prelude::*;

    fn running() -> (AnimationScheduler, RecordingSurface, NativeUniverse, FrameQueue) {
        let mut universe = NativeUniverse::new(50, 40, 2);
        universe.birth(Species::Plant, 3).unwrap();
        let mut surface = RecordingSurface::new();
        let mut queue = FrameQueue::new();
        let mut scheduler = AnimationScheduler::new(RenderConfig::default()).unwrap();
        scheduler
            .start(&mut surface, &mut universe, &mut queue)
            .unwrap();
        (scheduler, surface, universe, queue)
    }

    #[test]
    fn new_scheduler_is_idle() {
        let scheduler = AnimationScheduler::new(RenderConfig::default()).unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(scheduler.field().is_none());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = RenderConfig {
            point_radius: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            AnimationScheduler::new(config),
            Err(RenderError::Config(_))
        ));
    }

    #[test]
    fn start_sizes_surface_and_requests_first_frame() {
        let (scheduler, surface, _universe, queue) = running();
        assert_eq!(scheduler.state(), SchedulerState::Running);
        assert_eq!(surface.size(), (60, 48));
        assert!(queue.is_pending());
        assert_eq!(scheduler.diagnostics().frames, 1);
    }

    #[test]
    fn second_start_is_rejected() {
        let (mut scheduler, mut surface, mut universe, mut queue) = running();
        assert!(matches!(
            scheduler.start(&mut surface, &mut universe, &mut queue),
            Err(RenderError::AlreadyRunning)
        ));
    }

    #[test]
    fn frame_before_start_is_rejected() {
        let mut scheduler = AnimationScheduler::new(RenderConfig::default()).unwrap();
        let mut universe = NativeUniverse::new(50, 40, 2);
        let mut surface = RecordingSurface::new();
        let mut queue = FrameQueue::new();
        assert!(matches!(
            scheduler.on_frame(&mut surface, &mut universe, &mut queue),
            Err(RenderError::NotStarted)
        ));
        assert!(!queue.is_pending());
    }

    #[test]
    fn frames_number_sequentially() {
        let (mut scheduler, mut surface, mut universe, mut queue) = running();
        queue.take();
        let a = scheduler
            .on_frame(&mut surface, &mut universe, &mut queue)
            .unwrap();
        let b = scheduler
            .on_frame(&mut surface, &mut universe, &mut queue)
            .unwrap();
        assert_eq!((a.frame, b.frame), (1, 2));
        assert_eq!(a.points_drawn, Some(3));
    }

    #[test]
    fn stop_before_start_draws_once_and_never_reschedules() {
        let mut universe = NativeUniverse::new(50, 40, 2);
        let mut surface = RecordingSurface::new();
        let mut queue = FrameQueue::new();
        let mut scheduler = AnimationScheduler::new(RenderConfig::default()).unwrap();
        scheduler.stop_signal().raise();

        let report = scheduler
            .start(&mut surface, &mut universe, &mut queue)
            .unwrap();
        assert!(!report.rescheduled);
        assert_eq!(queue.requests(), 0);
        assert_eq!(surface.stroke_count(), 2, "field and population still drawn");
    }
}
