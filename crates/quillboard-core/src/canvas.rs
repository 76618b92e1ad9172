//! Canvas state and element operations.

use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::camera::Camera;
use crate::config::CanvasConfig;
use crate::element::{
    CodeElement, EditorElement, Edge, Element, ElementBox, ElementId, ElementUpdate, Handle,
    ImageElement, VideoElement,
};
use crate::resize::resize_boxes;
use crate::snap::snap_point;

/// A spatial canvas holding positioned elements and links.
///
/// `elements` is kept in z-order: later entries render on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Canvas {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub camera: Camera,
    pub elements: Vec<Element>,
    #[serde(default)]
    pub snap_to_grid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<SystemTime>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
}

/// Where to place a newly added element.
#[derive(Debug, Clone, Copy)]
pub enum Placement {
    /// Top-left corner at this canvas point.
    At(Point),
    /// Attach to the free endpoint of a pending link leaving `from_edge`;
    /// the new element's facing edge midpoint lands on the endpoint.
    LinkEnd { point: Point, from_edge: Edge },
    /// Centered in the current viewport.
    Center(Size),
}

impl Canvas {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            title: None,
            camera: Camera::new(),
            elements: Vec::new(),
            snap_to_grid: false,
            last_modified: None,
            deleted: false,
        }
    }

    fn touch(&mut self) {
        self.last_modified = Some(SystemTime::now());
    }

    pub fn find_element(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id() == id)
    }

    pub fn find_element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id() == id)
    }

    /// Apply a partial update to an element. Unknown ids are a no-op.
    /// Returns true if an element was updated.
    pub fn update_element(&mut self, id: ElementId, update: &ElementUpdate) -> bool {
        let Some(element) = self.elements.iter_mut().find(|e| e.id() == id) else {
            return false;
        };
        update.apply(element);
        self.touch();
        true
    }

    /// Add an element on top of the z-order.
    pub fn add_element(&mut self, element: Element) {
        self.elements.push(element);
        self.touch();
    }

    /// Remove elements by id, cascading to links that reference them.
    pub fn remove_elements(&mut self, ids: &[ElementId]) {
        if ids.is_empty() {
            return;
        }
        self.elements.retain(|e| {
            if ids.contains(&e.id()) {
                return false;
            }
            if let Some(link) = e.as_link() {
                if ids.contains(&link.from) {
                    return false;
                }
                if let Some(to) = link.to {
                    if ids.contains(&to) {
                        return false;
                    }
                }
            }
            true
        });
        self.touch();
    }

    /// Union box of all positioned elements.
    pub fn bounds(&self) -> Option<Rect> {
        self.elements
            .iter()
            .filter_map(|e| e.rect())
            .reduce(|a, b| a.union(b))
    }

    /// Place a new editor or code element.
    ///
    /// Returns the id of the created element.
    pub fn add_file_element(
        &mut self,
        id: ElementId,
        code: bool,
        placement: Placement,
        cfg: &CanvasConfig,
    ) -> ElementId {
        let width = cfg.element_width;
        let height = cfg.element_height;

        let origin = match placement {
            Placement::At(p) => p,
            Placement::Center(viewport) => {
                let center = self
                    .camera
                    .screen_to_canvas(Point::new(viewport.width / 2.0, viewport.height / 2.0));
                Point::new(center.x - width / 2.0, center.y - height / 2.0)
            }
            Placement::LinkEnd { point, from_edge } => {
                // The new element faces the link: its edge opposite the link's
                // departure edge touches the free endpoint.
                match from_edge {
                    Edge::Top => Point::new(point.x - width / 2.0, point.y - height),
                    Edge::Bottom => Point::new(point.x - width / 2.0, point.y),
                    Edge::Left => Point::new(point.x - width, point.y - height / 2.0),
                    Edge::Right => Point::new(point.x, point.y - height / 2.0),
                }
            }
        };

        let bounds = ElementBox::new(id, origin.x, origin.y, width, height);
        let element = if code {
            Element::Code(CodeElement { bounds })
        } else {
            Element::Editor(EditorElement { bounds })
        };
        self.add_element(element);
        id
    }

    /// Place an image, scaled to the default element width with its aspect
    /// ratio preserved. `natural` is the source pixel size.
    pub fn add_image(&mut self, src: String, point: Point, natural: Size, cfg: &CanvasConfig) -> ElementId {
        let id = Uuid::new_v4();
        let width = cfg.element_width;
        let height = if natural.width > 0.0 {
            natural.height * (width / natural.width)
        } else {
            width
        };
        let bounds = ElementBox::new(id, point.x, point.y, width, height);
        self.add_element(Element::Image(ImageElement { bounds, src }));
        id
    }

    /// Place a video, scaled like [`Canvas::add_image`].
    pub fn add_video(
        &mut self,
        src: String,
        mime: String,
        point: Point,
        natural: Size,
        cfg: &CanvasConfig,
    ) -> ElementId {
        let id = Uuid::new_v4();
        let width = cfg.element_width;
        let height = if natural.width > 0.0 {
            natural.height * (width / natural.width)
        } else {
            width
        };
        let bounds = ElementBox::new(id, point.x, point.y, width, height);
        self.add_element(Element::Video(VideoElement { bounds, src, mime }));
        id
    }

    /// Drag an element: screen-space movement from the gesture start, applied
    /// to the position the element had when the gesture began.
    pub fn drag_element(
        &mut self,
        id: ElementId,
        initial: Point,
        movement: Vec2,
        cfg: &CanvasConfig,
    ) {
        let zoom = self.camera.zoom;
        let mut position = Point::new(initial.x + movement.x / zoom, initial.y + movement.y / zoom);
        if self.snap_to_grid {
            position = snap_point(position, cfg.grid_unit);
        }
        self.update_element(id, &ElementUpdate::position(position.x, position.y));
    }

    /// Resize elements as a group by dragging a handle of their aggregate box.
    /// `initial` holds each element's box at gesture start.
    pub fn resize_elements(
        &mut self,
        initial: &[(ElementId, Rect)],
        handle: Handle,
        delta: Vec2,
        aspect_lock: bool,
        cfg: &CanvasConfig,
    ) {
        let boxes: Vec<Rect> = initial.iter().map(|(_, r)| *r).collect();
        let grid = self.snap_to_grid.then_some(cfg.grid_unit);
        let Some(resized) = resize_boxes(&boxes, handle, delta, aspect_lock, grid) else {
            return;
        };
        for ((id, _), rect) in initial.iter().zip(resized) {
            self.update_element(*id, &ElementUpdate::rect(rect));
        }
    }

    /// Find the element whose edge is within `cfg.link_bind_distance` of a
    /// point. Edge segments are shrunk by the bind distance at both ends so
    /// corners stay unambiguous. The first z-order match wins; the nearest
    /// edge of that element is returned.
    pub fn element_near(
        &self,
        point: Point,
        exclude: Option<ElementId>,
        cfg: &CanvasConfig,
    ) -> Option<(ElementId, Edge)> {
        let threshold = cfg.link_bind_distance;
        for element in &self.elements {
            if Some(element.id()) == exclude {
                continue;
            }
            let Some(rect) = element.rect() else {
                continue;
            };

            let mut nearest: Option<(f64, Edge)> = None;
            for edge in [Edge::Top, Edge::Right, Edge::Bottom, Edge::Left] {
                let (a, b) = shrunk_edge_segment(rect, edge, threshold);
                let dist = segment_distance(point, a, b);
                if dist <= threshold && nearest.map(|(d, _)| dist < d).unwrap_or(true) {
                    nearest = Some((dist, edge));
                }
            }
            if let Some((_, edge)) = nearest {
                return Some((element.id(), edge));
            }
        }
        None
    }

    pub fn toggle_snap_to_grid(&mut self) {
        self.snap_to_grid = !self.snap_to_grid;
        self.touch();
    }

    /// Fit the camera to show all content.
    pub fn back_to_content(&mut self, viewport: Size, padding: f64) {
        let Some(bounds) = self.bounds() else {
            self.camera.reset();
            return;
        };
        self.camera.fit_to_box(bounds, viewport, padding);
    }

    /// Center the camera on one element, keeping the current zoom.
    pub fn focus(&mut self, id: ElementId, viewport: Size) {
        let Some(rect) = self.find_element(id).and_then(|e| e.rect()) else {
            return;
        };
        self.camera.center_on(rect.center(), viewport);
    }
}

/// Endpoints of a box edge, pulled in by `inset` at both ends.
fn shrunk_edge_segment(rect: Rect, edge: Edge, inset: f64) -> (Point, Point) {
    let ix = inset.min(rect.width() / 2.0);
    let iy = inset.min(rect.height() / 2.0);
    match edge {
        Edge::Top => (
            Point::new(rect.x0 + ix, rect.y0),
            Point::new(rect.x1 - ix, rect.y0),
        ),
        Edge::Bottom => (
            Point::new(rect.x0 + ix, rect.y1),
            Point::new(rect.x1 - ix, rect.y1),
        ),
        Edge::Left => (
            Point::new(rect.x0, rect.y0 + iy),
            Point::new(rect.x0, rect.y1 - iy),
        ),
        Edge::Right => (
            Point::new(rect.x1, rect.y0 + iy),
            Point::new(rect.x1, rect.y1 - iy),
        ),
    }
}

/// Distance from a point to a line segment.
fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.hypot2();
    if len_sq == 0.0 {
        return (p - a).hypot();
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    let proj = a + ab * t;
    (p - proj).hypot()
}
