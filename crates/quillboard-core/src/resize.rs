//! Resize math for element boxes.
//!
//! A resize gesture drags one handle of a box (or of the aggregate box of a
//! selection). The sides implied by the handle move by the pointer delta and
//! every member box is scaled about the point of the opposite handle, so the
//! anchored side stays put. Dragging a side past its opposite flips the box.
//! Grid snapping is applied after the raw computation.

use kurbo::{Point, Rect, Vec2};

use crate::element::{Corner, Edge, Handle};
use crate::snap::snap_rect;

/// Signed scale factors for a resize gesture, with the point they scale
/// around. `None` when the initial box has zero extent on a dragged axis.
pub fn resize_scale(
    initial: Rect,
    handle: Handle,
    delta: Vec2,
    aspect_lock: bool,
) -> Option<(Point, f64, f64)> {
    let moves_left = matches!(
        handle,
        Handle::Edge(Edge::Left) | Handle::Corner(Corner::TopLeft) | Handle::Corner(Corner::BottomLeft)
    );
    let moves_right = matches!(
        handle,
        Handle::Edge(Edge::Right) | Handle::Corner(Corner::TopRight) | Handle::Corner(Corner::BottomRight)
    );
    let moves_top = matches!(
        handle,
        Handle::Edge(Edge::Top) | Handle::Corner(Corner::TopLeft) | Handle::Corner(Corner::TopRight)
    );
    let moves_bottom = matches!(
        handle,
        Handle::Edge(Edge::Bottom) | Handle::Corner(Corner::BottomLeft) | Handle::Corner(Corner::BottomRight)
    );

    if (moves_left || moves_right) && initial.width() == 0.0 {
        return None;
    }
    if (moves_top || moves_bottom) && initial.height() == 0.0 {
        return None;
    }

    let scale_point = handle.opposite().point_on(initial);

    let mut sx = 1.0;
    if moves_left {
        sx = (scale_point.x - (initial.x0 + delta.x)) / initial.width();
    } else if moves_right {
        sx = ((initial.x1 + delta.x) - scale_point.x) / initial.width();
    }

    let mut sy = 1.0;
    if moves_top {
        sy = (scale_point.y - (initial.y0 + delta.y)) / initial.height();
    } else if moves_bottom {
        sy = ((initial.y1 + delta.y) - scale_point.y) / initial.height();
    }

    if aspect_lock {
        let s = sx.abs().min(sy.abs());
        sx = s.copysign(sx);
        sy = s.copysign(sy);
    }

    Some((scale_point, sx, sy))
}

/// Scale a box about a point with signed factors, normalizing flips.
pub fn scale_rect(rect: Rect, scale_point: Point, sx: f64, sy: f64) -> Rect {
    let x0 = scale_point.x + (rect.x0 - scale_point.x) * sx;
    let x1 = scale_point.x + (rect.x1 - scale_point.x) * sx;
    let y0 = scale_point.y + (rect.y0 - scale_point.y) * sy;
    let y1 = scale_point.y + (rect.y1 - scale_point.y) * sy;
    Rect::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
}

/// Resize a single box by dragging a handle.
///
/// Returns the box unchanged when the initial extent on a dragged axis is
/// zero. When `grid_unit` is set, x, y, width and height are each snapped
/// after the raw resize.
pub fn resize_box(
    initial: Rect,
    handle: Handle,
    delta: Vec2,
    aspect_lock: bool,
    grid_unit: Option<f64>,
) -> Rect {
    let Some((scale_point, sx, sy)) = resize_scale(initial, handle, delta, aspect_lock) else {
        return initial;
    };
    let resized = scale_rect(initial, scale_point, sx, sy);
    match grid_unit {
        Some(unit) => snap_rect(resized, unit),
        None => resized,
    }
}

/// Resize a group of boxes as one: the handle drags the aggregate box and
/// every member is scaled about the opposite handle of that aggregate.
///
/// Returns the new member boxes in input order, or `None` when `boxes` is
/// empty or the aggregate has zero extent on a dragged axis.
pub fn resize_boxes(
    boxes: &[Rect],
    handle: Handle,
    delta: Vec2,
    aspect_lock: bool,
    grid_unit: Option<f64>,
) -> Option<Vec<Rect>> {
    let outer = boxes
        .iter()
        .copied()
        .reduce(|a, b| a.union(b))?;
    let (scale_point, sx, sy) = resize_scale(outer, handle, delta, aspect_lock)?;

    Some(
        boxes
            .iter()
            .map(|&rect| {
                let resized = scale_rect(rect, scale_point, sx, sy);
                match grid_unit {
                    Some(unit) => snap_rect(resized, unit),
                    None => resized,
                }
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // The scale-factor formulation leaves sub-epsilon residue on some
    // drags, so inexact-scale cases compare with a tolerance.
    fn assert_rect_near(actual: Rect, expected: Rect) {
        let near = (actual.x0 - expected.x0).abs() < 1e-9
            && (actual.y0 - expected.y0).abs() < 1e-9
            && (actual.x1 - expected.x1).abs() < 1e-9
            && (actual.y1 - expected.y1).abs() < 1e-9;
        assert!(near, "{actual:?} != {expected:?}");
    }

    #[test]
    fn test_resize_right_edge() {
        let initial = Rect::new(0.0, 0.0, 100.0, 50.0);
        let result = resize_box(initial, Handle::Edge(Edge::Right), Vec2::new(30.0, 99.0), false, None);
        // Vertical delta is ignored for a horizontal edge handle.
        assert_eq!(result, Rect::new(0.0, 0.0, 130.0, 50.0));
    }

    #[test]
    fn test_resize_top_left_corner() {
        let initial = Rect::new(10.0, 10.0, 110.0, 60.0);
        let result = resize_box(
            initial,
            Handle::Corner(Corner::TopLeft),
            Vec2::new(-10.0, -5.0),
            false,
            None,
        );
        assert_rect_near(result, Rect::new(0.0, 5.0, 110.0, 60.0));
    }

    #[test]
    fn test_resize_flip_past_opposite_side() {
        let initial = Rect::new(0.0, 0.0, 100.0, 50.0);
        // Drag the right edge 150 left, past the left edge.
        let result = resize_box(initial, Handle::Edge(Edge::Right), Vec2::new(-150.0, 0.0), false, None);
        assert_eq!(result, Rect::new(-50.0, 0.0, 0.0, 50.0));
    }

    #[test]
    fn test_resize_aspect_lock_uses_min_scale() {
        let initial = Rect::new(0.0, 0.0, 100.0, 100.0);
        // Corner drag doubling width but only 1.5x height: lock picks 1.5x.
        let result = resize_box(
            initial,
            Handle::Corner(Corner::BottomRight),
            Vec2::new(100.0, 50.0),
            true,
            None,
        );
        assert_eq!(result, Rect::new(0.0, 0.0, 150.0, 150.0));
    }

    #[test]
    fn test_resize_snaps_after_raw_computation() {
        let initial = Rect::new(0.0, 0.0, 200.0, 10.0);
        let result = resize_box(
            initial,
            Handle::Corner(Corner::BottomRight),
            Vec2::new(7.0, 4.0),
            false,
            Some(10.0),
        );
        // 207 snaps to 210, 14 snaps to 10.
        assert_eq!(result.width(), 210.0);
        assert_eq!(result.height(), 10.0);
    }

    #[test]
    fn test_resize_degenerate_box_unchanged() {
        let initial = Rect::new(50.0, 50.0, 50.0, 50.0);
        let result = resize_box(initial, Handle::Edge(Edge::Right), Vec2::new(30.0, 0.0), false, None);
        assert_eq!(result, initial);
    }

    #[test]
    fn test_resize_boxes_scales_members_about_opposite_handle() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(100.0, 100.0, 200.0, 200.0);
        // Aggregate is 200x200 at origin. Drag bottom-right +200,+200: 2x scale
        // anchored at the top-left of the aggregate.
        let result = resize_boxes(
            &[a, b],
            Handle::Corner(Corner::BottomRight),
            Vec2::new(200.0, 200.0),
            false,
            None,
        )
        .unwrap();
        assert_eq!(result[0], Rect::new(0.0, 0.0, 200.0, 200.0));
        assert_eq!(result[1], Rect::new(200.0, 200.0, 400.0, 400.0));
    }

    #[test]
    fn test_resize_boxes_empty_is_none() {
        assert!(resize_boxes(&[], Handle::Edge(Edge::Top), Vec2::ZERO, false, None).is_none());
    }
}
