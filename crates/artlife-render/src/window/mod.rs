//! Windowed runner: winit drives the scheduler, wgpu draws the lines.
//!
//! This module is feature-gated behind `renderer`. Without the feature the
//! crate is fully headless and the scheduler can be driven by a
//! [`FrameQueue`](crate::scheduler::FrameQueue) instead.

pub mod app;
pub mod gpu;

pub use app::run_windowed;
pub use gpu::{CanvasCamera, GpuSurface};
