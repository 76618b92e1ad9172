//! Connector links between canvas elements.
//!
//! Links are drawn from an element edge toward a free point. While the
//! pointer is within the bind distance of another element's edge the link
//! binds to it; otherwise the endpoint floats. A finished link that never
//! bound is a dead link: it is kept so a new file can be created at its
//! endpoint, and reaped in bulk before the canvas is reused.

use kurbo::{BezPath, Point, Rect, Vec2};

use crate::canvas::Canvas;
use crate::config::CanvasConfig;
use crate::element::{Edge, Element, ElementId, LinkElement};

/// Arrowhead size in screen pixels (divided by zoom for canvas units).
pub const ARROW_SIZE: f64 = 10.0;
/// Arrowhead wedge half-angle.
const ARROW_ANGLE: f64 = std::f64::consts::PI / 6.0;

/// Start or continue drawing a link from `from`'s `from_edge` toward a free
/// canvas point. Creates the link on first call, updates it afterwards.
/// The endpoint binds to the nearest other element within the bind distance.
/// A no-op when the source is not a positioned element on this canvas, so a
/// drag whose source was removed mid-gesture cannot leave a dangling link.
pub fn draw_link(
    canvas: &mut Canvas,
    id: ElementId,
    from: ElementId,
    from_edge: Edge,
    to_point: Point,
    cfg: &CanvasConfig,
) {
    if canvas.find_element(from).and_then(|e| e.rect()).is_none() {
        return;
    }
    let target = canvas.element_near(to_point, Some(from), cfg);

    if canvas.find_element(id).is_none() {
        canvas.add_element(Element::Link(LinkElement {
            id,
            from,
            from_edge,
            to: None,
            to_edge: None,
            to_x: None,
            to_y: None,
            drawing: true,
            selected: false,
        }));
    }

    let Some(link) = canvas.find_element_mut(id).and_then(|e| e.as_link_mut()) else {
        return;
    };
    link.drawing = true;
    match target {
        Some((to, to_edge)) => {
            link.to = Some(to);
            link.to_edge = Some(to_edge);
            link.to_x = None;
            link.to_y = None;
        }
        None => {
            link.to = None;
            link.to_edge = None;
            link.to_x = Some(to_point.x);
            link.to_y = Some(to_point.y);
        }
    }
}

/// Finish a link drag. Unbound links are kept as dead-link candidates.
pub fn draw_link_end(canvas: &mut Canvas, id: ElementId) {
    if let Some(link) = canvas.find_element_mut(id).and_then(|e| e.as_link_mut()) {
        link.drawing = false;
    }
}

/// Links with no target that are not currently being drawn, in creation order.
pub fn find_dead_links(canvas: &Canvas) -> Vec<ElementId> {
    canvas
        .elements
        .iter()
        .filter_map(|e| e.as_link())
        .filter(|l| l.to.is_none() && !l.drawing)
        .map(|l| l.id)
        .collect()
}

/// Remove all dead links. Idempotent.
pub fn remove_dead_links(canvas: &mut Canvas) {
    let dead = find_dead_links(canvas);
    if !dead.is_empty() {
        canvas.elements.retain(|e| !dead.contains(&e.id()));
    }
}

/// Where a link ends.
#[derive(Debug, Clone, Copy)]
pub enum LinkTarget {
    /// Bound to an element edge.
    Bound { rect: Rect, edge: Edge },
    /// Floating at a canvas point.
    Free(Point),
}

/// Renderable geometry of a link: the connector curve and the arrowhead.
#[derive(Debug, Clone)]
pub struct LinkPath {
    pub curve: BezPath,
    pub arrowhead: BezPath,
}

/// Compute the path for a link. Pure: same inputs, same path.
///
/// The curve is a cubic whose control points extend along the edge normals,
/// offset by half the larger side of the endpoint span. The arrowhead is a
/// wedge at the endpoint sized inversely to zoom so it stays constant on
/// screen.
pub fn link_path(from_rect: Rect, from_edge: Edge, to: LinkTarget, zoom: f64) -> LinkPath {
    let a = from_edge.point_on(from_rect);
    let (b, to_normal) = match to {
        LinkTarget::Bound { rect, edge } => (edge.point_on(rect), edge.normal()),
        LinkTarget::Free(p) => (p, from_edge.opposite().normal()),
    };

    let len = (b.x - a.x).abs().max((b.y - a.y).abs()) / 2.0;
    let c1 = a + from_edge.normal() * len;
    let c2 = b + to_normal * len;

    let mut curve = BezPath::new();
    curve.move_to(a);
    curve.curve_to(c1, c2, b);

    let arrowhead = arrowhead_at(b, c2, zoom);

    LinkPath { curve, arrowhead }
}

/// Resolve a link element against its canvas and compute its path.
/// `None` when the source (or a bound target) no longer exists, or the
/// endpoint is undefined.
pub fn link_path_for(canvas: &Canvas, link: &LinkElement) -> Option<LinkPath> {
    let from_rect = canvas.find_element(link.from)?.rect()?;
    let target = match (link.to, link.to_edge) {
        (Some(to), Some(edge)) => {
            let rect = canvas.find_element(to)?.rect()?;
            LinkTarget::Bound { rect, edge }
        }
        _ => LinkTarget::Free(Point::new(link.to_x?, link.to_y?)),
    };
    Some(link_path(from_rect, link.from_edge, target, canvas.camera.zoom))
}

/// Wedge arrowhead at `tip`, oriented away from the approach control point.
fn arrowhead_at(tip: Point, control: Point, zoom: f64) -> BezPath {
    let size = ARROW_SIZE / zoom.max(f64::EPSILON);
    let dir = tip - control;
    let dir = if dir.hypot() == 0.0 {
        Vec2::new(1.0, 0.0)
    } else {
        dir / dir.hypot()
    };

    let left = rotate(dir, ARROW_ANGLE) * -size;
    let right = rotate(dir, -ARROW_ANGLE) * -size;

    let mut path = BezPath::new();
    path.move_to(tip + left);
    path.line_to(tip);
    path.line_to(tip + right);
    path
}

fn rotate(v: Vec2, angle: f64) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{EditorElement, ElementBox};
    use kurbo::Shape;
    use uuid::Uuid;

    fn editor_at(x: f64, y: f64, w: f64, h: f64) -> Element {
        Element::Editor(EditorElement {
            bounds: ElementBox::new(Uuid::new_v4(), x, y, w, h),
        })
    }

    fn canvas_with_two_boxes() -> (Canvas, ElementId, ElementId) {
        let mut canvas = Canvas::new(Uuid::new_v4());
        let a = editor_at(0.0, 0.0, 100.0, 100.0);
        let b = editor_at(300.0, 0.0, 100.0, 100.0);
        let (a_id, b_id) = (a.id(), b.id());
        canvas.add_element(a);
        canvas.add_element(b);
        (canvas, a_id, b_id)
    }

    #[test]
    fn test_draw_link_binds_near_target() {
        let (mut canvas, a, b) = canvas_with_two_boxes();
        let cfg = CanvasConfig::default();
        let link_id = Uuid::new_v4();

        // Endpoint 10 units left of b's left edge.
        draw_link(&mut canvas, link_id, a, Edge::Right, Point::new(290.0, 50.0), &cfg);

        let link = canvas.find_element(link_id).unwrap().as_link().unwrap();
        assert_eq!(link.to, Some(b));
        assert_eq!(link.to_edge, Some(Edge::Left));
        assert!(link.drawing);
        assert!(link.to_x.is_none());
    }

    #[test]
    fn test_draw_link_floats_when_far() {
        let (mut canvas, a, _) = canvas_with_two_boxes();
        let cfg = CanvasConfig::default();
        let link_id = Uuid::new_v4();

        draw_link(&mut canvas, link_id, a, Edge::Right, Point::new(200.0, 250.0), &cfg);

        let link = canvas.find_element(link_id).unwrap().as_link().unwrap();
        assert!(link.to.is_none());
        assert_eq!(link.to_x, Some(200.0));
        assert_eq!(link.to_y, Some(250.0));
    }

    #[test]
    fn test_draw_link_never_binds_to_source() {
        let (mut canvas, a, _) = canvas_with_two_boxes();
        let cfg = CanvasConfig::default();
        let link_id = Uuid::new_v4();

        // Right next to a's own right edge.
        draw_link(&mut canvas, link_id, a, Edge::Right, Point::new(110.0, 50.0), &cfg);

        let link = canvas.find_element(link_id).unwrap().as_link().unwrap();
        assert!(link.to.is_none());
    }

    #[test]
    fn test_draw_link_from_missing_element_is_noop() {
        let (mut canvas, _, _) = canvas_with_two_boxes();
        let cfg = CanvasConfig::default();
        let link_id = Uuid::new_v4();

        draw_link(
            &mut canvas,
            link_id,
            Uuid::new_v4(),
            Edge::Right,
            Point::new(200.0, 50.0),
            &cfg,
        );

        assert!(canvas.find_element(link_id).is_none());
    }

    #[test]
    fn test_draw_link_stops_after_source_removed() {
        let (mut canvas, a, _) = canvas_with_two_boxes();
        let cfg = CanvasConfig::default();
        let link_id = Uuid::new_v4();

        draw_link(&mut canvas, link_id, a, Edge::Right, Point::new(150.0, 50.0), &cfg);
        // Source vanishes mid-drag, taking the link with it.
        canvas.remove_elements(&[a]);

        draw_link(&mut canvas, link_id, a, Edge::Right, Point::new(200.0, 50.0), &cfg);
        assert!(canvas.find_element(link_id).is_none());
    }

    #[test]
    fn test_dead_link_lifecycle() {
        let (mut canvas, a, _) = canvas_with_two_boxes();
        let cfg = CanvasConfig::default();
        let link_id = Uuid::new_v4();

        draw_link(&mut canvas, link_id, a, Edge::Right, Point::new(200.0, 250.0), &cfg);
        // Still drawing: not yet dead.
        assert!(find_dead_links(&canvas).is_empty());

        draw_link_end(&mut canvas, link_id);
        assert_eq!(find_dead_links(&canvas), vec![link_id]);

        remove_dead_links(&mut canvas);
        assert!(canvas.find_element(link_id).is_none());

        // Idempotent.
        remove_dead_links(&mut canvas);
        assert!(find_dead_links(&canvas).is_empty());
    }

    #[test]
    fn test_bound_link_is_not_dead() {
        let (mut canvas, a, _) = canvas_with_two_boxes();
        let cfg = CanvasConfig::default();
        let link_id = Uuid::new_v4();

        draw_link(&mut canvas, link_id, a, Edge::Right, Point::new(290.0, 50.0), &cfg);
        draw_link_end(&mut canvas, link_id);

        assert!(find_dead_links(&canvas).is_empty());
    }

    #[test]
    fn test_link_path_is_deterministic() {
        let from = Rect::new(0.0, 0.0, 100.0, 100.0);
        let to = LinkTarget::Bound {
            rect: Rect::new(300.0, 0.0, 400.0, 100.0),
            edge: Edge::Left,
        };
        let p1 = link_path(from, Edge::Right, to, 1.0);
        let p2 = link_path(from, Edge::Right, to, 1.0);
        assert_eq!(p1.curve.to_svg(), p2.curve.to_svg());
        assert_eq!(p1.arrowhead.to_svg(), p2.arrowhead.to_svg());
    }

    #[test]
    fn test_link_path_starts_and_ends_on_edge_midpoints() {
        let from = Rect::new(0.0, 0.0, 100.0, 100.0);
        let to_rect = Rect::new(300.0, 0.0, 400.0, 100.0);
        let path = link_path(
            from,
            Edge::Right,
            LinkTarget::Bound { rect: to_rect, edge: Edge::Left },
            1.0,
        );

        // Starts at the right edge midpoint of the source and ends at the
        // left edge midpoint of the target.
        match path.curve.elements() {
            [kurbo::PathEl::MoveTo(start), kurbo::PathEl::CurveTo(_, _, end)] => {
                assert_eq!(*start, Point::new(100.0, 50.0));
                assert_eq!(*end, Point::new(300.0, 50.0));
            }
            other => panic!("unexpected path: {other:?}"),
        }
    }

    #[test]
    fn test_arrowhead_scales_with_zoom() {
        let tip = Point::new(100.0, 0.0);
        let control = Point::new(0.0, 0.0);
        let small = arrowhead_at(tip, control, 2.0);
        let large = arrowhead_at(tip, control, 0.5);

        let span = |p: &BezPath| {
            let b = p.bounding_box();
            b.width().max(b.height())
        };
        assert!(span(&large) > span(&small));
    }

    #[test]
    fn test_link_path_for_unresolved_source() {
        let (canvas, _, _) = canvas_with_two_boxes();
        let link = LinkElement {
            id: Uuid::new_v4(),
            from: Uuid::new_v4(),
            from_edge: Edge::Right,
            to: None,
            to_edge: None,
            to_x: Some(10.0),
            to_y: Some(10.0),
            drawing: false,
            selected: false,
        };
        assert!(link_path_for(&canvas, &link).is_none());
    }
}
