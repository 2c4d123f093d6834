//! Windowed application runner.
//!
//! [`run_windowed`] takes ownership of a universe and shows it in a window.
//! The frame requester handed to the scheduler is the window's
//! `request_redraw`, so frames arrive at the display's refresh rate. On each
//! `RedrawRequested` the host advances the universe one step, then lets the
//! scheduler draw; ticking and drawing never overlap.

use std::sync::Arc;

use artlife_universe::{Steppable, Universe};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use super::gpu::GpuSurface;
use crate::config::RenderConfig;
use crate::field::FieldRect;
use crate::scheduler::{AnimationScheduler, FrameRequester, StopSignal};

/// Run `universe` in a window until it is closed.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the field size cannot
/// be read, the event loop cannot be created, or the window or GPU surface
/// fails to initialize.
pub fn run_windowed<U>(
    mut universe: U,
    config: RenderConfig,
    window_title: &str,
) -> Result<(), anyhow::Error>
where
    U: Universe + Steppable,
{
    let field = FieldRect {
        width: universe.width()?,
        height: universe.height()?,
    };
    let (width, height) = field.surface_size(config.display_scale);
    let arc_segments = config.arc_segments;
    let scheduler = AnimationScheduler::new(config)?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App {
        stop: scheduler.stop_signal(),
        scheduler,
        state: AppState::Pending {
            universe,
            title: window_title.to_owned(),
            width,
            height,
            arc_segments,
        },
        init_failed: false,
    };

    event_loop.run_app(&mut app)?;

    if app.init_failed {
        return Err(anyhow::anyhow!(
            "failed to initialize windowed renderer (see logs for details)"
        ));
    }

    Ok(())
}

/// Asks winit for another `RedrawRequested`.
struct RedrawRequester<'w>(&'w Window);

impl FrameRequester for RedrawRequester<'_> {
    fn request_frame(&mut self) {
        self.0.request_redraw();
    }
}

// ---------------------------------------------------------------------------
// Internal state machine
// ---------------------------------------------------------------------------

/// Winit 0.30 only allows window creation inside `resumed`, so the window
/// and surface come into existence one callback after the universe does.
enum AppState<U> {
    /// Waiting for `resumed`.
    Pending {
        universe: U,
        title: String,
        width: u32,
        height: u32,
        arc_segments: u32,
    },
    /// Window and surface exist; the scheduler is running.
    Running { universe: U, surface: GpuSurface },
    /// Placeholder while moving between states.
    Transitioning,
}

struct App<U> {
    scheduler: AnimationScheduler,
    stop: StopSignal,
    state: AppState<U>,
    /// Set if the window or surface failed to come up.
    init_failed: bool,
}

impl<U: Universe + Steppable> App<U> {
    fn fail(&mut self, event_loop: &ActiveEventLoop) {
        self.init_failed = true;
        self.stop.raise();
        event_loop.exit();
    }
}

impl<U: Universe + Steppable> ApplicationHandler for App<U> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let state = std::mem::replace(&mut self.state, AppState::Transitioning);
        let (mut universe, title, width, height, arc_segments) = match state {
            AppState::Pending {
                universe,
                title,
                width,
                height,
                arc_segments,
            } => (universe, title, width, height, arc_segments),
            other => {
                // Already running; put state back.
                self.state = other;
                return;
            }
        };

        let window_attrs = WindowAttributes::default()
            .with_title(title)
            .with_inner_size(winit::dpi::PhysicalSize::new(width, height));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                tracing::error!(error = %e, "failed to create window -- exiting");
                self.fail(event_loop);
                return;
            }
        };

        let mut surface = match pollster::block_on(GpuSurface::new(window.clone(), arc_segments)) {
            Ok(surface) => surface,
            Err(e) => {
                tracing::error!(error = %e, "failed to initialize GPU surface -- exiting");
                self.fail(event_loop);
                return;
            }
        };

        let started = self.scheduler.start(
            &mut surface,
            &mut universe,
            &mut RedrawRequester(&window),
        );
        if let Err(e) = started {
            tracing::error!(error = %e, "animation scheduler failed to start -- exiting");
            self.fail(event_loop);
            return;
        }
        if let Err(e) = surface.present() {
            tracing::warn!(error = %e, "surface error on first frame");
        }

        tracing::info!(width, height, "universe window created");
        self.state = AppState::Running { universe, surface };
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let AppState::Running { universe, surface } = &mut self.state else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                tracing::info!(
                    frames = self.scheduler.diagnostics().frames,
                    aborted = self.scheduler.diagnostics().aborted_frames,
                    "window close requested -- shutting down"
                );
                self.stop.raise();
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                tracing::debug!(
                    width = new_size.width,
                    height = new_size.height,
                    "window resized"
                );
                surface.resize(new_size);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = universe.step() {
                    tracing::warn!(error = %e, "universe step failed -- drawing previous state");
                }

                let window = surface.window_handle();
                if let Err(e) =
                    self.scheduler
                        .on_frame(surface, universe, &mut RedrawRequester(&window))
                {
                    tracing::error!(error = %e, "frame callback rejected");
                }

                match surface.present() {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost) => {
                        let size = surface.window().inner_size();
                        surface.resize(size);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        tracing::error!("GPU out of memory -- exiting");
                        self.stop.raise();
                        event_loop.exit();
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "surface error during present");
                    }
                }
            }
            _ => {}
        }
    }
}
