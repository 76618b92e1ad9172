//! The workspace: every canvas and file the user has, plus which ones are
//! open.
//!
//! Canvases and files are soft-deleted so they can be restored. Files carry
//! a version history of replica snapshots.

use std::time::SystemTime;

use kurbo::Point;
use url::Url;
use uuid::Uuid;

use crate::canvas::{Canvas, Placement};
use crate::collab::DocKind;
use crate::config::CanvasConfig;
use crate::crdt::ReplicaDoc;
use crate::element::Edge;
use crate::link::remove_dead_links;
use crate::storage::{FileRecord, VersionRecord};

/// A note or code file with its replicated body and saved versions.
pub struct WorkspaceFile {
    pub id: Uuid,
    pub replica: ReplicaDoc,
    pub path: Option<String>,
    pub versions: Vec<VersionRecord>,
    pub code: bool,
    pub last_modified: Option<SystemTime>,
    pub deleted: bool,
}

impl WorkspaceFile {
    fn new(id: Uuid, code: bool) -> Self {
        Self {
            id,
            replica: ReplicaDoc::new(),
            path: None,
            versions: Vec::new(),
            code,
            last_modified: None,
            deleted: false,
        }
    }

    /// Snapshot the current replica into the version history.
    pub fn add_version(&mut self) {
        self.versions.push(VersionRecord {
            date: SystemTime::now(),
            bytes: self.replica.export_snapshot(),
        });
    }

    /// Replace the replica with a saved version. Out-of-range indexes are a
    /// no-op; the abandoned state is kept as a version first so the restore
    /// is itself reversible.
    pub fn restore_version(&mut self, index: usize) -> bool {
        let Some(version) = self.versions.get(index) else {
            return false;
        };
        let Ok(replica) = ReplicaDoc::from_snapshot(&version.bytes) else {
            return false;
        };
        self.add_version();
        self.replica = replica;
        self.last_modified = Some(SystemTime::now());
        true
    }

    pub fn to_record(&self) -> FileRecord {
        FileRecord {
            id: self.id,
            replica: self.replica.export_snapshot(),
            path: self.path.clone(),
            versions: self.versions.clone(),
            code: self.code,
            last_modified: self.last_modified,
            deleted: self.deleted,
        }
    }

    pub fn from_record(record: FileRecord) -> Self {
        let replica = ReplicaDoc::from_snapshot(&record.replica).unwrap_or_else(|e| {
            log::warn!("Discarding unreadable replica for {}: {e}", record.id);
            ReplicaDoc::new()
        });
        Self {
            id: record.id,
            replica,
            path: record.path,
            versions: record.versions,
            code: record.code,
            last_modified: record.last_modified,
            deleted: record.deleted,
        }
    }
}

/// A document reference parsed from a shared URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenTarget {
    pub kind: DocKind,
    pub id: Uuid,
    /// Whether the link asks to join the document's collaboration room.
    pub share: bool,
}

impl OpenTarget {
    /// Parse a URL of the form `scheme://host/<namespace>/<id>[?share=true]`.
    pub fn parse(input: &str) -> Option<Self> {
        let url = Url::parse(input).ok()?;
        let mut segments = url.path_segments()?;
        let kind = match segments.next()? {
            "editor" => DocKind::Editor,
            "canvas" => DocKind::Canvas,
            "code" => DocKind::Code,
            _ => return None,
        };
        let id = Uuid::parse_str(segments.next()?).ok()?;
        if segments.next().is_some() {
            return None;
        }
        let share = url
            .query_pairs()
            .any(|(key, value)| key == "share" && value == "true");
        Some(Self { kind, id, share })
    }
}

/// All canvases and files, with the currently open ones.
#[derive(Default)]
pub struct Workspace {
    pub canvases: Vec<Canvas>,
    pub files: Vec<WorkspaceFile>,
    pub current_canvas: Option<Uuid>,
    pub current_file: Option<Uuid>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_canvas(&self, id: Uuid) -> Option<&Canvas> {
        self.canvases.iter().find(|c| c.id == id)
    }

    pub fn find_canvas_mut(&mut self, id: Uuid) -> Option<&mut Canvas> {
        self.canvases.iter_mut().find(|c| c.id == id)
    }

    pub fn current_canvas_mut(&mut self) -> Option<&mut Canvas> {
        let id = self.current_canvas?;
        self.find_canvas_mut(id)
    }

    /// Create and open a fresh canvas. Dead links on the canvas being left
    /// are reaped so they never outlive the session that drew them.
    pub fn new_canvas(&mut self) -> Uuid {
        if let Some(current) = self.current_canvas_mut() {
            remove_dead_links(current);
        }
        let canvas = Canvas::new(Uuid::new_v4());
        let id = canvas.id;
        self.canvases.push(canvas);
        self.current_canvas = Some(id);
        id
    }

    /// Open an existing canvas. Unknown or deleted canvases are refused.
    pub fn open_canvas(&mut self, id: Uuid) -> bool {
        if !self.find_canvas(id).is_some_and(|c| !c.deleted) {
            return false;
        }
        if let Some(current) = self.current_canvas_mut() {
            remove_dead_links(current);
        }
        self.current_canvas = Some(id);
        true
    }

    /// Soft-delete a canvas. Closing it if open.
    pub fn delete_canvas(&mut self, id: Uuid) {
        if let Some(canvas) = self.find_canvas_mut(id) {
            canvas.deleted = true;
            if self.current_canvas == Some(id) {
                self.current_canvas = None;
            }
        }
    }

    /// Bring a soft-deleted canvas back.
    pub fn restore_canvas(&mut self, id: Uuid) -> bool {
        match self.find_canvas_mut(id) {
            Some(canvas) => {
                canvas.deleted = false;
                true
            }
            None => false,
        }
    }

    pub fn find_file(&self, id: Uuid) -> Option<&WorkspaceFile> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn find_file_mut(&mut self, id: Uuid) -> Option<&mut WorkspaceFile> {
        self.files.iter_mut().find(|f| f.id == id)
    }

    /// Create a file with a fixed id. Idempotent: an existing file with the
    /// id wins, its `code` flag unchanged.
    pub fn new_file(&mut self, id: Uuid, code: bool) -> &mut WorkspaceFile {
        if self.find_file(id).is_none() {
            self.files.push(WorkspaceFile::new(id, code));
        }
        self.find_file_mut(id).unwrap()
    }

    /// Create a file and place a matching element on the current canvas.
    pub fn new_file_on_canvas(
        &mut self,
        code: bool,
        placement: Placement,
        cfg: &CanvasConfig,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.new_file(id, code);
        if let Some(canvas) = self.current_canvas_mut() {
            canvas.add_file_element(id, code, placement, cfg);
        }
        id
    }

    /// Create a file at the free endpoint of a link that never bound.
    pub fn new_file_at_link_end(
        &mut self,
        point: Point,
        from_edge: Edge,
        code: bool,
        cfg: &CanvasConfig,
    ) -> Uuid {
        self.new_file_on_canvas(code, Placement::LinkEnd { point, from_edge }, cfg)
    }

    /// Soft-delete a file, closing it if open.
    pub fn delete_file(&mut self, id: Uuid) {
        if let Some(file) = self.find_file_mut(id) {
            file.deleted = true;
            if self.current_file == Some(id) {
                self.current_file = None;
            }
        }
    }

    /// Bring a soft-deleted file back.
    pub fn restore_file(&mut self, id: Uuid) -> bool {
        match self.find_file_mut(id) {
            Some(file) => {
                file.deleted = false;
                true
            }
            None => false,
        }
    }
}
