//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Default grid unit for snapping.
pub const DEFAULT_GRID_UNIT: f64 = 10.0;
/// Default distance within which a link endpoint binds to an element edge.
pub const DEFAULT_LINK_BIND_DISTANCE: f64 = 30.0;
/// Default zoom bounds.
pub const DEFAULT_MIN_ZOOM: f64 = 0.3;
pub const DEFAULT_MAX_ZOOM: f64 = 10.0;
/// Default size of a newly placed file element.
pub const DEFAULT_ELEMENT_WIDTH: f64 = 300.0;
pub const DEFAULT_ELEMENT_HEIGHT: f64 = 350.0;

/// Tunable geometry parameters for a canvas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Grid unit applied to x, y, width and height when snapping is on.
    pub grid_unit: f64,
    /// Max distance from an element edge at which a link endpoint binds.
    pub link_bind_distance: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Box size for newly placed editor/code elements.
    pub element_width: f64,
    pub element_height: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            grid_unit: DEFAULT_GRID_UNIT,
            link_bind_distance: DEFAULT_LINK_BIND_DISTANCE,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            element_width: DEFAULT_ELEMENT_WIDTH,
            element_height: DEFAULT_ELEMENT_HEIGHT,
        }
    }
}
