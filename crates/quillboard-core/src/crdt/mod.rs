//! CRDT integration using Loro for collaborative editing.
//!
//! This module bridges the canvas element model and the replicated Loro
//! document that backs each file.
//!
//! # Schema
//!
//! ```text
//! LoroDoc
//! ├── "content": LoroText (file body)
//! ├── "elements": LoroMap<ElementId, LoroMap> (canvas element data)
//! └── "z_order": LoroList<String> (element IDs in z-order)
//! ```
//!
//! Each entry in "elements" is a LoroMap with:
//! - "type": String ("editor", "code", "image", "video", "link")
//! - "id": String (UUID)
//! - Variant-specific fields (position, dimensions, source, endpoints)

mod convert;
mod schema;

pub use convert::{element_from_loro, element_to_loro};
pub use schema::{CONTENT_KEY, ELEMENTS_KEY, MAX_UNDO_STEPS, ReplicaDoc, Z_ORDER_KEY};

// Re-export Loro types used at the sync boundary
pub use loro::{ExportMode, VersionVector};
