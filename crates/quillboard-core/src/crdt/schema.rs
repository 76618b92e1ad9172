//! Loro document schema and operations.

use loro::{
    ExportMode, LoroDoc, LoroList, LoroMap, LoroResult, LoroValue, UndoManager, ValueOrContainer,
};

use super::convert::{element_from_loro, element_to_loro};
use crate::element::{Element, ElementId};

/// Key for the text body of a file.
pub const CONTENT_KEY: &str = "content";
/// Key for the elements map in the document.
pub const ELEMENTS_KEY: &str = "elements";
/// Key for the z-order list in the document.
pub const Z_ORDER_KEY: &str = "z_order";
/// Undo depth per replica.
pub const MAX_UNDO_STEPS: usize = 100;

/// A replicated document for collaborative editing.
///
/// Wraps a `LoroDoc` holding a text body plus the canvas element mirror,
/// with an `UndoManager` for local undo/redo. Imports merge: they are
/// commutative and idempotent, so replaying history or importing a backup
/// snapshot never duplicates content.
pub struct ReplicaDoc {
    doc: LoroDoc,
    undo_manager: UndoManager,
}

impl ReplicaDoc {
    /// Create a new empty replica.
    pub fn new() -> Self {
        let doc = LoroDoc::new();
        let mut undo_manager = UndoManager::new(&doc);
        undo_manager.set_max_undo_steps(MAX_UNDO_STEPS);
        undo_manager.set_merge_interval(300); // Merge edits within 300ms
        Self { doc, undo_manager }
    }

    /// Create a replica from persisted snapshot bytes.
    pub fn from_snapshot(bytes: &[u8]) -> LoroResult<Self> {
        let doc = LoroDoc::new();
        doc.import(bytes)?;
        let mut undo_manager = UndoManager::new(&doc);
        undo_manager.set_max_undo_steps(MAX_UNDO_STEPS);
        undo_manager.set_merge_interval(300);
        Ok(Self { doc, undo_manager })
    }

    /// Get the underlying LoroDoc.
    pub fn loro_doc(&self) -> &LoroDoc {
        &self.doc
    }

    /// Peer id of this replica.
    pub fn peer_id(&self) -> u64 {
        self.doc.peer_id()
    }

    fn elements_map(&self) -> LoroMap {
        self.doc.get_map(ELEMENTS_KEY)
    }

    fn z_order_list(&self) -> LoroList {
        self.doc.get_list(Z_ORDER_KEY)
    }

    // --- Text body ---

    /// The document's text body.
    pub fn content(&self) -> String {
        self.doc.get_text(CONTENT_KEY).to_string()
    }

    /// Insert text at a unicode position.
    pub fn insert_content(&mut self, pos: usize, text: &str) -> LoroResult<()> {
        self.doc.get_text(CONTENT_KEY).insert(pos, text)?;
        self.doc.commit();
        Ok(())
    }

    /// Delete a unicode range from the body.
    pub fn delete_content(&mut self, pos: usize, len: usize) -> LoroResult<()> {
        self.doc.get_text(CONTENT_KEY).delete(pos, len)?;
        self.doc.commit();
        Ok(())
    }

    /// Replace the whole body.
    pub fn set_content(&mut self, text: &str) -> LoroResult<()> {
        let body = self.doc.get_text(CONTENT_KEY);
        let len = body.len_unicode();
        if len > 0 {
            body.delete(0, len)?;
        }
        body.insert(0, text)?;
        self.doc.commit();
        Ok(())
    }

    // --- Canvas element mirror ---

    /// Number of mirrored elements.
    pub fn element_count(&self) -> usize {
        self.elements_map().len()
    }

    /// The z-order as element id strings.
    pub fn z_order(&self) -> Vec<String> {
        let list = self.z_order_list();
        let mut result = Vec::with_capacity(list.len());
        for i in 0..list.len() {
            if let Some(ValueOrContainer::Value(LoroValue::String(id))) = list.get(i) {
                result.push(id.to_string());
            }
        }
        result
    }

    /// Write an element into the replica, appending to the z-order when new.
    pub fn set_element(&mut self, element: &Element) -> LoroResult<()> {
        let id = element.id().to_string();
        let elements = self.elements_map();
        let z_order = self.z_order_list();

        let existed = element_map_keys(&elements).contains(&id);
        if existed {
            elements.delete(&id)?;
        }
        let element_map = elements.insert_container(&id, LoroMap::new())?;
        element_to_loro(element, &element_map)?;

        if !existed {
            z_order.push(LoroValue::String(id.into()))?;
        }

        self.doc.commit();
        Ok(())
    }

    /// Remove an element from the replica.
    pub fn remove_element(&mut self, id: ElementId) -> LoroResult<()> {
        let id = id.to_string();
        let elements = self.elements_map();
        let z_order = self.z_order_list();

        elements.delete(&id)?;
        for i in 0..z_order.len() {
            if let Some(ValueOrContainer::Value(LoroValue::String(s))) = z_order.get(i) {
                if s.as_ref() == id {
                    z_order.delete(i, 1)?;
                    break;
                }
            }
        }

        self.doc.commit();
        Ok(())
    }

    /// Get an element by id.
    pub fn get_element(&self, id: ElementId) -> Option<Element> {
        let elements = self.elements_map();
        let value = elements.get_deep_value();
        if let LoroValue::Map(map) = value {
            if let Some(LoroValue::Map(element_map)) = map.get(&id.to_string()) {
                return element_from_loro(element_map);
            }
        }
        None
    }

    /// All elements in z-order. Malformed entries are skipped.
    pub fn elements_ordered(&self) -> Vec<Element> {
        let value = self.elements_map().get_deep_value();
        let LoroValue::Map(map) = value else {
            return Vec::new();
        };

        let mut elements = Vec::with_capacity(map.len());
        for id in self.z_order() {
            if let Some(LoroValue::Map(element_map)) = map.get(&id) {
                if let Some(element) = element_from_loro(element_map) {
                    elements.push(element);
                }
            }
        }
        elements
    }

    // --- Sync ---

    /// Export the document as a snapshot (full state).
    pub fn export_snapshot(&self) -> Vec<u8> {
        self.doc.export(ExportMode::Snapshot).unwrap_or_default()
    }

    /// Export incremental updates since a version.
    pub fn export_updates(&self, since: &loro::VersionVector) -> Vec<u8> {
        self.doc.export(ExportMode::updates(since)).unwrap_or_default()
    }

    /// Import updates or a snapshot from another replica.
    pub fn import(&mut self, bytes: &[u8]) -> LoroResult<()> {
        self.doc.import(bytes)?;
        Ok(())
    }

    /// Get the current version vector.
    pub fn version(&self) -> loro::VersionVector {
        self.doc.oplog_vv()
    }

    // --- Undo/Redo ---

    /// Undo the last change made by this peer.
    /// Returns true if undo was performed, false if nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.undo_manager.undo().unwrap_or(false)
    }

    /// Redo the last undone change.
    pub fn redo(&mut self) -> bool {
        self.undo_manager.redo().unwrap_or(false)
    }

    pub fn can_undo(&self) -> bool {
        self.undo_manager.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo_manager.can_redo()
    }

    /// Record a new checkpoint for undo grouping.
    pub fn record_checkpoint(&mut self) {
        let _ = self.undo_manager.record_new_checkpoint();
    }

    /// Clear undo/redo history.
    pub fn clear_undo_history(&mut self) {
        let _ = self.undo_manager.clear();
    }
}

fn element_map_keys(map: &LoroMap) -> Vec<String> {
    let value = map.get_deep_value();
    if let LoroValue::Map(m) = value {
        m.keys().cloned().collect()
    } else {
        Vec::new()
    }
}

impl Default for ReplicaDoc {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ReplicaDoc {
    fn clone(&self) -> Self {
        // Clone creates a new replica with fresh undo history.
        let bytes = self.export_snapshot();
        Self::from_snapshot(&bytes).unwrap_or_else(|_| Self::new())
    }
}
