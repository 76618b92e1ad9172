//! Conversion between canvas elements and Loro values.

use loro::{LoroMap, LoroMapValue, LoroResult, LoroValue};
use uuid::Uuid;

use crate::element::{
    CodeElement, EditorElement, Edge, Element, ElementBox, ImageElement, LinkElement, VideoElement,
};

// Element type identifiers
const TYPE_EDITOR: &str = "editor";
const TYPE_CODE: &str = "code";
const TYPE_IMAGE: &str = "image";
const TYPE_VIDEO: &str = "video";
const TYPE_LINK: &str = "link";

// Common keys
const KEY_TYPE: &str = "type";
const KEY_ID: &str = "id";

// Box keys
const KEY_X: &str = "x";
const KEY_Y: &str = "y";
const KEY_WIDTH: &str = "width";
const KEY_HEIGHT: &str = "height";

// Media keys
const KEY_SRC: &str = "src";
const KEY_MIME: &str = "mime";

// Link keys
const KEY_FROM: &str = "from";
const KEY_FROM_EDGE: &str = "from_edge";
const KEY_TO: &str = "to";
const KEY_TO_EDGE: &str = "to_edge";
const KEY_TO_X: &str = "to_x";
const KEY_TO_Y: &str = "to_y";
const KEY_DRAWING: &str = "drawing";

fn edge_to_str(edge: Edge) -> &'static str {
    match edge {
        Edge::Top => "top",
        Edge::Right => "right",
        Edge::Bottom => "bottom",
        Edge::Left => "left",
    }
}

fn edge_from_str(s: &str) -> Option<Edge> {
    match s {
        "top" => Some(Edge::Top),
        "right" => Some(Edge::Right),
        "bottom" => Some(Edge::Bottom),
        "left" => Some(Edge::Left),
        _ => None,
    }
}

fn get_double(map: &LoroMapValue, key: &str) -> Option<f64> {
    match map.get(key)? {
        LoroValue::Double(d) => Some(*d),
        LoroValue::I64(i) => Some(*i as f64),
        _ => None,
    }
}

fn get_string(map: &LoroMapValue, key: &str) -> Option<String> {
    match map.get(key)? {
        LoroValue::String(s) => Some(s.to_string()),
        _ => None,
    }
}

fn get_bool(map: &LoroMapValue, key: &str) -> Option<bool> {
    match map.get(key)? {
        LoroValue::Bool(b) => Some(*b),
        _ => None,
    }
}

fn get_uuid(map: &LoroMapValue, key: &str) -> Option<Uuid> {
    get_string(map, key).and_then(|s| Uuid::parse_str(&s).ok())
}

fn box_to_loro(bounds: &ElementBox, map: &LoroMap) -> LoroResult<()> {
    map.insert(KEY_ID, bounds.id.to_string())?;
    map.insert(KEY_X, bounds.x)?;
    map.insert(KEY_Y, bounds.y)?;
    map.insert(KEY_WIDTH, bounds.width)?;
    map.insert(KEY_HEIGHT, bounds.height)?;
    Ok(())
}

fn box_from_loro(map: &LoroMapValue) -> Option<ElementBox> {
    Some(ElementBox::new(
        get_uuid(map, KEY_ID)?,
        get_double(map, KEY_X)?,
        get_double(map, KEY_Y)?,
        get_double(map, KEY_WIDTH)?,
        get_double(map, KEY_HEIGHT)?,
    ))
}

/// Write an element into a Loro map.
///
/// The transient `selected`/`active` flags are local interaction state and
/// are not replicated.
pub fn element_to_loro(element: &Element, map: &LoroMap) -> LoroResult<()> {
    match element {
        Element::Editor(e) => {
            map.insert(KEY_TYPE, TYPE_EDITOR)?;
            box_to_loro(&e.bounds, map)?;
        }
        Element::Code(e) => {
            map.insert(KEY_TYPE, TYPE_CODE)?;
            box_to_loro(&e.bounds, map)?;
        }
        Element::Image(e) => {
            map.insert(KEY_TYPE, TYPE_IMAGE)?;
            box_to_loro(&e.bounds, map)?;
            map.insert(KEY_SRC, e.src.as_str())?;
        }
        Element::Video(e) => {
            map.insert(KEY_TYPE, TYPE_VIDEO)?;
            box_to_loro(&e.bounds, map)?;
            map.insert(KEY_SRC, e.src.as_str())?;
            map.insert(KEY_MIME, e.mime.as_str())?;
        }
        Element::Link(l) => {
            map.insert(KEY_TYPE, TYPE_LINK)?;
            map.insert(KEY_ID, l.id.to_string())?;
            map.insert(KEY_FROM, l.from.to_string())?;
            map.insert(KEY_FROM_EDGE, edge_to_str(l.from_edge))?;
            if let Some(to) = l.to {
                map.insert(KEY_TO, to.to_string())?;
            }
            if let Some(to_edge) = l.to_edge {
                map.insert(KEY_TO_EDGE, edge_to_str(to_edge))?;
            }
            if let Some(to_x) = l.to_x {
                map.insert(KEY_TO_X, to_x)?;
            }
            if let Some(to_y) = l.to_y {
                map.insert(KEY_TO_Y, to_y)?;
            }
            map.insert(KEY_DRAWING, l.drawing)?;
        }
    }
    Ok(())
}

/// Read an element back from a Loro map value. `None` for malformed entries.
pub fn element_from_loro(map: &LoroMapValue) -> Option<Element> {
    let kind = get_string(map, KEY_TYPE)?;
    match kind.as_str() {
        TYPE_EDITOR => Some(Element::Editor(EditorElement {
            bounds: box_from_loro(map)?,
        })),
        TYPE_CODE => Some(Element::Code(CodeElement {
            bounds: box_from_loro(map)?,
        })),
        TYPE_IMAGE => Some(Element::Image(ImageElement {
            bounds: box_from_loro(map)?,
            src: get_string(map, KEY_SRC)?,
        })),
        TYPE_VIDEO => Some(Element::Video(VideoElement {
            bounds: box_from_loro(map)?,
            src: get_string(map, KEY_SRC)?,
            mime: get_string(map, KEY_MIME)?,
        })),
        TYPE_LINK => Some(Element::Link(LinkElement {
            id: get_uuid(map, KEY_ID)?,
            from: get_uuid(map, KEY_FROM)?,
            from_edge: get_string(map, KEY_FROM_EDGE).as_deref().and_then(edge_from_str)?,
            to: get_uuid(map, KEY_TO),
            to_edge: get_string(map, KEY_TO_EDGE).as_deref().and_then(edge_from_str),
            to_x: get_double(map, KEY_TO_X),
            to_y: get_double(map, KEY_TO_Y),
            drawing: get_bool(map, KEY_DRAWING).unwrap_or(false),
            selected: false,
        })),
        _ => None,
    }
}
