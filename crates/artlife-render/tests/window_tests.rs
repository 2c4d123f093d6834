//! Tests for the windowed renderer that need no GPU context.

#[cfg(feature = "renderer")]
mod tests {
    use artlife_render::window::CanvasCamera;

    fn project(camera: &CanvasCamera, x: f32, y: f32) -> (f32, f32) {
        let m = camera.projection_matrix();
        // Column-major: clip = M * (x, y, 0, 1).
        (m[0] * x + m[4] * y + m[12], m[1] * x + m[5] * y + m[13])
    }

    fn close(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-5 && (a.1 - b.1).abs() < 1e-5
    }

    #[test]
    fn canvas_corners_map_to_clip_corners() {
        let camera = CanvasCamera {
            width: 600.0,
            height: 480.0,
        };
        assert!(close(project(&camera, 0.0, 0.0), (-1.0, 1.0)));
        assert!(close(project(&camera, 600.0, 0.0), (1.0, 1.0)));
        assert!(close(project(&camera, 600.0, 480.0), (1.0, -1.0)));
        assert!(close(project(&camera, 0.0, 480.0), (-1.0, -1.0)));
    }

    #[test]
    fn canvas_center_maps_to_origin() {
        let camera = CanvasCamera {
            width: 12.0,
            height: 12.0,
        };
        assert!(close(project(&camera, 6.0, 6.0), (0.0, 0.0)));
    }

    #[test]
    fn degenerate_canvas_does_not_divide_by_zero() {
        let camera = CanvasCamera {
            width: 0.0,
            height: 0.0,
        };
        assert!(camera.projection_matrix().iter().all(|v| v.is_finite()));
    }
}
