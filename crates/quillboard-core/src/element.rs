//! Canvas element model.
//!
//! Every item placed on a canvas is an [`Element`]: a positioned box holding
//! an editor, code block, image or video, or a connector link between boxes.
//! The enum is closed so every consumer matches exhaustively.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a canvas element.
pub type ElementId = Uuid;

/// One of the four sides of an element's box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

impl Edge {
    /// The opposite side.
    pub fn opposite(self) -> Self {
        match self {
            Edge::Top => Edge::Bottom,
            Edge::Right => Edge::Left,
            Edge::Bottom => Edge::Top,
            Edge::Left => Edge::Right,
        }
    }

    /// Outward unit normal of this side.
    pub fn normal(self) -> kurbo::Vec2 {
        match self {
            Edge::Top => kurbo::Vec2::new(0.0, -1.0),
            Edge::Right => kurbo::Vec2::new(1.0, 0.0),
            Edge::Bottom => kurbo::Vec2::new(0.0, 1.0),
            Edge::Left => kurbo::Vec2::new(-1.0, 0.0),
        }
    }

    /// Midpoint of this side on the given box.
    pub fn point_on(self, rect: Rect) -> Point {
        match self {
            Edge::Top => Point::new(rect.x0 + rect.width() / 2.0, rect.y0),
            Edge::Right => Point::new(rect.x1, rect.y0 + rect.height() / 2.0),
            Edge::Bottom => Point::new(rect.x0 + rect.width() / 2.0, rect.y1),
            Edge::Left => Point::new(rect.x0, rect.y0 + rect.height() / 2.0),
        }
    }
}

/// One of the four corners of an element's box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// The diagonally opposite corner.
    pub fn opposite(self) -> Self {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomLeft => Corner::TopRight,
            Corner::BottomRight => Corner::TopLeft,
        }
    }

    /// Position of this corner on the given box.
    pub fn point_on(self, rect: Rect) -> Point {
        match self {
            Corner::TopLeft => Point::new(rect.x0, rect.y0),
            Corner::TopRight => Point::new(rect.x1, rect.y0),
            Corner::BottomLeft => Point::new(rect.x0, rect.y1),
            Corner::BottomRight => Point::new(rect.x1, rect.y1),
        }
    }
}

/// A resize handle: either a side or a corner of the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handle {
    Edge(Edge),
    Corner(Corner),
}

impl Handle {
    /// The handle diagonally or directly opposite this one.
    /// Resizing scales elements around the opposite handle's point.
    pub fn opposite(self) -> Self {
        match self {
            Handle::Edge(e) => Handle::Edge(e.opposite()),
            Handle::Corner(c) => Handle::Corner(c.opposite()),
        }
    }

    /// Position of this handle on the given box.
    pub fn point_on(self, rect: Rect) -> Point {
        match self {
            Handle::Edge(e) => e.point_on(rect),
            Handle::Corner(c) => c.point_on(rect),
        }
    }
}

/// Shared fields of every positioned (box-shaped) element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementBox {
    pub id: ElementId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub active: bool,
}

impl ElementBox {
    pub fn new(id: ElementId, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id,
            x,
            y,
            width,
            height,
            selected: false,
            active: false,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.x = rect.x0;
        self.y = rect.y0;
        self.width = rect.width();
        self.height = rect.height();
    }
}

/// An embedded rich-text editor on the canvas, backed by a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorElement {
    #[serde(flatten)]
    pub bounds: ElementBox,
}

/// An embedded code editor on the canvas, backed by a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeElement {
    #[serde(flatten)]
    pub bounds: ElementBox,
}

/// An image placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageElement {
    #[serde(flatten)]
    pub bounds: ElementBox,
    pub src: String,
}

/// A video placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoElement {
    #[serde(flatten)]
    pub bounds: ElementBox,
    pub src: String,
    pub mime: String,
}

/// A directed connector between elements.
///
/// While being drawn, `drawing` is true and the free endpoint lives in
/// `to_x`/`to_y`. Once bound, `to`/`to_edge` identify the target. A finished
/// link with no target is a dead link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkElement {
    pub id: ElementId,
    pub from: ElementId,
    pub from_edge: Edge,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<ElementId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_edge: Option<Edge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_y: Option<f64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub drawing: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub selected: bool,
}

/// A canvas element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Editor(EditorElement),
    Code(CodeElement),
    Image(ImageElement),
    Video(VideoElement),
    Link(LinkElement),
}

impl Element {
    pub fn id(&self) -> ElementId {
        match self {
            Element::Editor(e) => e.bounds.id,
            Element::Code(e) => e.bounds.id,
            Element::Image(e) => e.bounds.id,
            Element::Video(e) => e.bounds.id,
            Element::Link(e) => e.id,
        }
    }

    /// The box of a positioned element, `None` for links.
    pub fn rect(&self) -> Option<Rect> {
        self.element_box().map(|b| b.rect())
    }

    /// Shared box fields of a positioned element, `None` for links.
    pub fn element_box(&self) -> Option<&ElementBox> {
        match self {
            Element::Editor(e) => Some(&e.bounds),
            Element::Code(e) => Some(&e.bounds),
            Element::Image(e) => Some(&e.bounds),
            Element::Video(e) => Some(&e.bounds),
            Element::Link(_) => None,
        }
    }

    pub fn element_box_mut(&mut self) -> Option<&mut ElementBox> {
        match self {
            Element::Editor(e) => Some(&mut e.bounds),
            Element::Code(e) => Some(&mut e.bounds),
            Element::Image(e) => Some(&mut e.bounds),
            Element::Video(e) => Some(&mut e.bounds),
            Element::Link(_) => None,
        }
    }

    pub fn as_link(&self) -> Option<&LinkElement> {
        match self {
            Element::Link(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_link_mut(&mut self) -> Option<&mut LinkElement> {
        match self {
            Element::Link(l) => Some(l),
            _ => None,
        }
    }

    pub fn is_selected(&self) -> bool {
        match self {
            Element::Link(l) => l.selected,
            other => other.element_box().map(|b| b.selected).unwrap_or(false),
        }
    }

    pub fn set_selected(&mut self, selected: bool) {
        match self {
            Element::Link(l) => l.selected = selected,
            other => {
                if let Some(b) = other.element_box_mut() {
                    b.selected = selected;
                    if !selected {
                        b.active = false;
                    }
                }
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.element_box().map(|b| b.active).unwrap_or(false)
    }
}

/// A partial update applied to an element.
///
/// Only the present fields are written, so concurrent updates to different
/// attributes do not clobber each other. Fields that do not apply to the
/// element's variant are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementUpdate {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub selected: Option<bool>,
    pub active: Option<bool>,
    pub src: Option<String>,
    pub to: Option<Option<ElementId>>,
    pub to_edge: Option<Option<Edge>>,
    pub to_x: Option<Option<f64>>,
    pub to_y: Option<Option<f64>>,
    pub drawing: Option<bool>,
}

impl ElementUpdate {
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn rect(rect: Rect) -> Self {
        Self {
            x: Some(rect.x0),
            y: Some(rect.y0),
            width: Some(rect.width()),
            height: Some(rect.height()),
            ..Default::default()
        }
    }

    /// Apply this update to an element, merging present fields.
    pub fn apply(&self, element: &mut Element) {
        if let Some(b) = element.element_box_mut() {
            if let Some(x) = self.x {
                b.x = x;
            }
            if let Some(y) = self.y {
                b.y = y;
            }
            if let Some(width) = self.width {
                b.width = width;
            }
            if let Some(height) = self.height {
                b.height = height;
            }
            if let Some(selected) = self.selected {
                b.selected = selected;
            }
            if let Some(active) = self.active {
                b.active = active;
            }
        }
        if let Some(src) = &self.src {
            match element {
                Element::Image(img) => img.src = src.clone(),
                Element::Video(vid) => vid.src = src.clone(),
                _ => {}
            }
        }
        if let Some(link) = element.as_link_mut() {
            if let Some(to) = self.to {
                link.to = to;
            }
            if let Some(to_edge) = self.to_edge {
                link.to_edge = to_edge;
            }
            if let Some(to_x) = self.to_x {
                link.to_x = to_x;
            }
            if let Some(to_y) = self.to_y {
                link.to_y = to_y;
            }
            if let Some(drawing) = self.drawing {
                link.drawing = drawing;
            }
            if let Some(selected) = self.selected {
                link.selected = selected;
            }
        }
    }
}
