//! Grid snapping.

use kurbo::{Point, Rect};

/// Round a value to the nearest multiple of the grid unit.
pub fn snap_value(value: f64, unit: f64) -> f64 {
    if unit <= 0.0 {
        return value;
    }
    (value / unit).round() * unit
}

/// Snap a point to the nearest grid intersection.
pub fn snap_point(point: Point, unit: f64) -> Point {
    Point::new(snap_value(point.x, unit), snap_value(point.y, unit))
}

/// Snap a box to the grid.
///
/// Position and extent are snapped independently (x, y, width, height),
/// not the far corner, so a snapped box keeps grid-aligned dimensions.
pub fn snap_rect(rect: Rect, unit: f64) -> Rect {
    let x = snap_value(rect.x0, unit);
    let y = snap_value(rect.y0, unit);
    let width = snap_value(rect.width(), unit);
    let height = snap_value(rect.height(), unit);
    Rect::new(x, y, x + width, y + height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_value_rounds_to_unit() {
        assert_eq!(snap_value(207.0, 10.0), 210.0);
        assert_eq!(snap_value(14.0, 10.0), 10.0);
        assert_eq!(snap_value(15.0, 10.0), 20.0);
        assert_eq!(snap_value(-7.0, 10.0), -10.0);
    }

    #[test]
    fn test_snap_value_exact() {
        assert_eq!(snap_value(40.0, 10.0), 40.0);
    }

    #[test]
    fn test_snap_value_zero_unit_is_noop() {
        assert_eq!(snap_value(207.0, 0.0), 207.0);
    }

    #[test]
    fn test_snap_point() {
        assert_eq!(snap_point(Point::new(23.0, 47.0), 10.0), Point::new(20.0, 50.0));
    }

    #[test]
    fn test_snap_rect_snaps_extent_not_far_corner() {
        let rect = Rect::new(3.0, 3.0, 3.0 + 207.0, 3.0 + 14.0);
        let snapped = snap_rect(rect, 10.0);
        assert_eq!(snapped.x0, 0.0);
        assert_eq!(snapped.y0, 0.0);
        assert_eq!(snapped.width(), 210.0);
        assert_eq!(snapped.height(), 10.0);
    }
}
