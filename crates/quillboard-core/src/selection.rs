//! Element selection.
//!
//! Selection state lives on the elements themselves (`selected`/`active`
//! flags). At most one element is active at a time; the aggregate
//! [`Selection`] exists only when two or more positioned elements are
//! selected.

use kurbo::{Point, Rect};

use crate::canvas::Canvas;
use crate::element::{ElementId, ElementUpdate};

/// Aggregate of a multi-element selection: the union box and the member ids
/// in z-order.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub bounds: Rect,
    pub elements: Vec<ElementId>,
}

/// Select one element. Non-additive selection clears every other element
/// first. Activating an element deactivates all others. Unknown ids are a
/// no-op.
pub fn select(canvas: &mut Canvas, id: ElementId, activate: bool, additive: bool) {
    if canvas.find_element(id).is_none() {
        return;
    }

    for element in &mut canvas.elements {
        if element.id() == id {
            continue;
        }
        if !additive {
            element.set_selected(false);
        } else if activate {
            // Only one element may be active.
            if let Some(b) = element.element_box_mut() {
                b.active = false;
            }
        }
    }

    canvas.update_element(
        id,
        &ElementUpdate {
            selected: Some(true),
            active: activate.then_some(true),
            ..Default::default()
        },
    );
}

/// Clear all selection and active flags. No-op when nothing is selected.
pub fn deselect(canvas: &mut Canvas) {
    if !canvas.elements.iter().any(|e| e.is_selected() || e.is_active()) {
        return;
    }
    for element in &mut canvas.elements {
        element.set_selected(false);
    }
}

/// Apply a rubber-band selection box given in screen coordinates.
///
/// The gesture is ignored entirely when its origin lies in a reserved
/// screen region (an active element's box, a toolbar). Returns whether the
/// box was applied. Called every frame of the drag: positioned elements
/// intersecting the box are selected, the rest deselected.
pub fn select_box(canvas: &mut Canvas, origin: Point, screen_box: Rect, reserved: &[Rect]) -> bool {
    if reserved.iter().any(|r| r.contains(origin)) {
        return false;
    }
    let active_boxes: Vec<Rect> = canvas
        .elements
        .iter()
        .filter(|e| e.is_active())
        .filter_map(|e| e.rect())
        .map(|r| {
            let p0 = canvas.camera.canvas_to_screen(Point::new(r.x0, r.y0));
            let p1 = canvas.camera.canvas_to_screen(Point::new(r.x1, r.y1));
            Rect::new(p0.x, p0.y, p1.x, p1.y)
        })
        .collect();
    if active_boxes.iter().any(|r| r.contains(origin)) {
        return false;
    }

    let p0 = canvas.camera.screen_to_canvas(Point::new(screen_box.x0, screen_box.y0));
    let p1 = canvas.camera.screen_to_canvas(Point::new(screen_box.x1, screen_box.y1));
    let canvas_box = Rect::new(p0.x, p0.y, p1.x, p1.y);

    for element in &mut canvas.elements {
        let Some(rect) = element.rect() else {
            continue;
        };
        element.set_selected(!canvas_box.intersect(rect).is_zero_area());
    }
    true
}

/// Finish a rubber-band gesture. A box with zero net movement is a click on
/// empty canvas: without a modifier it deselects everything.
pub fn end_select_box(canvas: &mut Canvas, screen_box: Rect, additive: bool) {
    if screen_box.is_zero_area() && !additive {
        deselect(canvas);
    }
}

/// The aggregate selection, defined only when at least two positioned
/// elements are selected.
pub fn selection(canvas: &Canvas) -> Option<Selection> {
    let mut elements = Vec::new();
    let mut bounds: Option<Rect> = None;
    for element in &canvas.elements {
        let Some(rect) = element.rect() else {
            continue;
        };
        if !element.is_selected() {
            continue;
        }
        elements.push(element.id());
        bounds = Some(match bounds {
            Some(b) => b.union(rect),
            None => rect,
        });
    }
    if elements.len() < 2 {
        return None;
    }
    Some(Selection {
        bounds: bounds?,
        elements,
    })
}
