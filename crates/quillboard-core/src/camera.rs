//! Camera module for pan/zoom transforms.

use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM};

/// Camera manages the view transform for the canvas.
///
/// Screen coordinates relate to canvas coordinates by
/// `screen = (canvas + point) * zoom`, so `point` is a canvas-space
/// translation applied before scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Current translation (pan) in canvas coordinates.
    pub point: Vec2,
    /// Current zoom level (1.0 = 100%).
    pub zoom: f64,
    /// Minimum allowed zoom level.
    #[serde(default = "default_min_zoom")]
    pub min_zoom: f64,
    /// Maximum allowed zoom level.
    #[serde(default = "default_max_zoom")]
    pub max_zoom: f64,
}

fn default_min_zoom() -> f64 {
    DEFAULT_MIN_ZOOM
}

fn default_max_zoom() -> f64 {
    DEFAULT_MAX_ZOOM
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            point: Vec2::ZERO,
            zoom: 1.0,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
        }
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert a screen point to canvas coordinates.
    pub fn screen_to_canvas(&self, screen: Point) -> Point {
        Point::new(
            screen.x / self.zoom - self.point.x,
            screen.y / self.zoom - self.point.y,
        )
    }

    /// Convert a canvas point to screen coordinates.
    pub fn canvas_to_screen(&self, canvas: Point) -> Point {
        Point::new(
            (canvas.x + self.point.x) * self.zoom,
            (canvas.y + self.point.y) * self.zoom,
        )
    }

    /// Pan the camera by a delta in canvas coordinates.
    pub fn pan(&mut self, delta: Vec2) {
        self.point += delta;
    }

    /// Pan by a screen-space delta (e.g. a wheel event).
    pub fn pan_screen(&mut self, delta: Vec2) {
        self.point -= delta / self.zoom;
    }

    /// Zoom to an absolute level, keeping the canvas point under `center`
    /// (a screen point) fixed. The level is clamped to the zoom bounds.
    pub fn zoom_to(&mut self, next: f64, center: Point) {
        let next = next.clamp(self.min_zoom, self.max_zoom);
        if (next - self.zoom).abs() < f64::EPSILON {
            return;
        }

        let c = Vec2::new(center.x, center.y);
        let p0 = c / self.zoom - self.point;
        let p1 = c / next - self.point;
        self.point += p1 - p0;
        self.zoom = next;
    }

    /// Zoom by a multiplicative factor, keeping `center` fixed.
    pub fn zoom_by(&mut self, factor: f64, center: Point) {
        self.zoom_to(self.zoom * factor, center);
    }

    /// Reset camera to origin and 100% zoom.
    pub fn reset(&mut self) {
        self.point = Vec2::ZERO;
        self.zoom = 1.0;
    }

    /// Fit the camera so `bounds` is centered in `viewport` with padding,
    /// clamped to the zoom bounds. Degenerate bounds reset the camera.
    pub fn fit_to_box(&mut self, bounds: Rect, viewport: Size, padding: f64) {
        if bounds.is_zero_area() {
            self.reset();
            return;
        }

        let padded = Size::new(
            (viewport.width - padding * 2.0).max(1.0),
            (viewport.height - padding * 2.0).max(1.0),
        );

        let scale_x = padded.width / bounds.width();
        let scale_y = padded.height / bounds.height();
        self.zoom = scale_x.min(scale_y).clamp(self.min_zoom, self.max_zoom);

        // Place the bounds center at the viewport center.
        let center = bounds.center();
        self.point = Vec2::new(
            viewport.width / 2.0 / self.zoom - center.x,
            viewport.height / 2.0 / self.zoom - center.y,
        );
    }

    /// Center the camera on a canvas point at the current zoom.
    pub fn center_on(&mut self, target: Point, viewport: Size) {
        self.point = Vec2::new(
            viewport.width / 2.0 / self.zoom - target.x,
            viewport.height / 2.0 / self.zoom - target.y,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_camera() {
        let camera = Camera::new();
        assert_eq!(camera.point, Vec2::ZERO);
        assert!((camera.zoom - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_screen_to_canvas_with_point() {
        let mut camera = Camera::new();
        camera.point = Vec2::new(50.0, 100.0);
        let canvas = camera.screen_to_canvas(Point::new(100.0, 200.0));
        assert!((canvas.x - 50.0).abs() < f64::EPSILON);
        assert!((canvas.y - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_roundtrip_conversion() {
        let mut camera = Camera::new();
        camera.point = Vec2::new(30.0, -20.0);
        camera.zoom = 1.5;

        let original = Point::new(123.0, 456.0);
        let canvas = camera.screen_to_canvas(original);
        let back = camera.canvas_to_screen(canvas);

        assert!((back.x - original.x).abs() < 1e-10);
        assert!((back.y - original.y).abs() < 1e-10);
    }

    #[test]
    fn test_zoom_keeps_cursor_point_fixed() {
        let mut camera = Camera::new();
        camera.point = Vec2::new(40.0, -10.0);
        camera.zoom = 0.8;

        let cursor = Point::new(320.0, 240.0);
        let before = camera.screen_to_canvas(cursor);

        camera.zoom_to(2.5, cursor);
        let after = camera.screen_to_canvas(cursor);

        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_clamp() {
        let mut camera = Camera::new();
        camera.zoom_to(0.001, Point::ZERO);
        assert!((camera.zoom - camera.min_zoom).abs() < f64::EPSILON);

        camera.zoom_to(1000.0, Point::ZERO);
        assert!((camera.zoom - camera.max_zoom).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pan_screen_scales_by_zoom() {
        let mut camera = Camera::new();
        camera.zoom = 2.0;
        camera.pan_screen(Vec2::new(10.0, 20.0));
        assert!((camera.point.x + 5.0).abs() < f64::EPSILON);
        assert!((camera.point.y + 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fit_to_box_centers_bounds() {
        let mut camera = Camera::new();
        let bounds = Rect::new(100.0, 100.0, 300.0, 200.0);
        let viewport = Size::new(800.0, 600.0);
        camera.fit_to_box(bounds, viewport, 50.0);

        let screen_center = camera.canvas_to_screen(bounds.center());
        assert!((screen_center.x - 400.0).abs() < 1e-9);
        assert!((screen_center.y - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_to_box_degenerate_resets() {
        let mut camera = Camera::new();
        camera.point = Vec2::new(5.0, 5.0);
        camera.fit_to_box(Rect::ZERO, Size::new(800.0, 600.0), 50.0);
        assert_eq!(camera.point, Vec2::ZERO);
        assert!((camera.zoom - 1.0).abs() < f64::EPSILON);
    }
}
