//! The render core drawing a universe that lives in WASM linear memory.

use artlife_render::prelude::*;
use artlife_universe::Steppable;
use artlife_wasm_host::{WasmConfig, WasmUniverse};
use std::io;
use std::sync::{Arc, Mutex};

/// Shared sink for formatted log lines.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A warn-level subscriber writing into `buffer`.
fn capture_warnings(buffer: &LogBuffer) -> impl tracing::Subscriber + Send + Sync {
    let sink = buffer.clone();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || sink.clone())
        .finish()
}

fn fixture_bytes(name: &str) -> Vec<u8> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read(&path)
        .unwrap_or_else(|e| panic!("failed to read fixture {}: {}", path.display(), e))
}

fn running() -> (WasmUniverse, AnimationScheduler, RecordingSurface, FrameQueue) {
    let mut universe =
        WasmUniverse::from_bytes(&WasmConfig::default(), &fixture_bytes("universe.wat")).unwrap();
    let mut surface = RecordingSurface::new();
    let mut queue = FrameQueue::new();
    let mut scheduler = AnimationScheduler::new(RenderConfig::default()).unwrap();
    scheduler
        .start(&mut surface, &mut universe, &mut queue)
        .unwrap();
    (universe, scheduler, surface, queue)
}

#[test]
fn startup_frame_draws_wasm_lives() {
    let (_universe, scheduler, surface, queue) = running();
    assert_eq!(surface.size(), (600, 480));
    assert_eq!(surface.arcs(), vec![(3.0, 3.0, 5.0), (10.0, 20.0, 5.0)]);
    assert_eq!(scheduler.diagnostics().last_points, Some(2));
    assert!(queue.is_pending());
}

#[test]
fn ticks_between_frames_are_drawn() {
    let (mut universe, mut scheduler, mut surface, mut queue) = running();
    for _ in 0..3 {
        universe.step().unwrap();
    }
    surface.clear();
    scheduler
        .drive(&mut surface, &mut universe, &mut queue, 1)
        .unwrap();
    assert_eq!(surface.arcs(), vec![(6.0, 3.0, 5.0), (13.0, 20.0, 5.0)]);
}

#[test]
fn memory_growth_relocation_is_followed() {
    let (mut universe, mut scheduler, mut surface, mut queue) = running();
    assert_eq!(universe.call_i32_export("relocate").unwrap(), 64 * 1024);

    surface.clear();
    scheduler
        .drive(&mut surface, &mut universe, &mut queue, 1)
        .unwrap();
    assert_eq!(surface.arcs(), vec![(3.0, 3.0, 5.0), (10.0, 20.0, 5.0)]);
}

#[test]
fn overcounted_frame_aborts_and_loop_recovers() {
    let (mut universe, mut scheduler, mut surface, mut queue) = running();

    universe.call_i32_export("overcount").unwrap();
    queue.take();
    let bad = scheduler
        .on_frame(&mut surface, &mut universe, &mut queue)
        .unwrap();
    assert_eq!(bad.points_drawn, None);
    assert!(bad.rescheduled);

    universe.call_i32_export("restore_count").unwrap();
    queue.take();
    let good = scheduler
        .on_frame(&mut surface, &mut universe, &mut queue)
        .unwrap();
    assert_eq!(good.points_drawn, Some(2));
    assert_eq!(scheduler.diagnostics().aborted_frames, 1);
}

#[test]
fn failing_query_aborts_only_the_population() {
    let (mut universe, mut scheduler, mut surface, mut queue) = running();
    universe.call_i32_export("corrupt_pointer").unwrap();

    surface.clear();
    queue.take();
    let report = scheduler
        .on_frame(&mut surface, &mut universe, &mut queue)
        .unwrap();
    assert_eq!(report.points_drawn, None);
    assert_eq!(surface.stroke_count(), 1, "field is still stroked");
}

#[test]
fn aborted_frame_is_logged_as_warning() {
    let (mut universe, mut scheduler, mut surface, mut queue) = running();
    universe.call_i32_export("overcount").unwrap();
    queue.take();

    let logs = LogBuffer::default();
    let report = tracing::subscriber::with_default(capture_warnings(&logs), || {
        scheduler
            .on_frame(&mut surface, &mut universe, &mut queue)
            .unwrap()
    });

    assert_eq!(report.points_drawn, None);
    let output = logs.contents();
    assert!(output.contains("WARN"), "expected a warning, got: {output}");
    assert!(
        output.contains("population draw aborted"),
        "expected the abort message, got: {output}"
    );
}

#[test]
fn clean_frames_log_no_warnings() {
    let (mut universe, mut scheduler, mut surface, mut queue) = running();
    queue.take();

    let logs = LogBuffer::default();
    tracing::subscriber::with_default(capture_warnings(&logs), || {
        scheduler
            .on_frame(&mut surface, &mut universe, &mut queue)
            .unwrap()
    });

    assert!(logs.contents().is_empty(), "unexpected logs: {}", logs.contents());
}
