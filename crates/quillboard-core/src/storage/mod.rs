//! Persistence for canvases and files.
//!
//! Canvases are stored as JSON records with the transient selection state
//! stripped. Files are stored as replica snapshots with their version
//! history. Backends implement [`Storage`] returning boxed futures so
//! callers can await them on whatever executor they run.

mod file;
mod memory;
mod scheduler;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use scheduler::{DEFAULT_SAVE_DELAY, SaveScheduler, SaveTarget};

use std::future::Future;
use std::pin::Pin;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::canvas::Canvas;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Record not found: {0}")]
    NotFound(Uuid),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Persisted form of a canvas. Selection flags are interaction state and
/// never reach disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasRecord {
    #[serde(flatten)]
    canvas: Canvas,
}

impl CanvasRecord {
    pub fn new(canvas: &Canvas) -> Self {
        let mut canvas = canvas.clone();
        for element in &mut canvas.elements {
            element.set_selected(false);
        }
        Self { canvas }
    }

    pub fn id(&self) -> Uuid {
        self.canvas.id
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        self.canvas.last_modified
    }

    pub fn into_canvas(self) -> Canvas {
        self.canvas
    }
}

/// A snapshot of a file's replica at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRecord {
    pub date: SystemTime,
    #[serde(with = "replica_bytes")]
    pub bytes: Vec<u8>,
}

/// Persisted form of a file: the current replica snapshot plus its saved
/// versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: Uuid,
    #[serde(with = "replica_bytes")]
    pub replica: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub versions: Vec<VersionRecord>,
    #[serde(default)]
    pub code: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<SystemTime>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
}

/// Replica snapshots travel as base64 inside JSON records.
mod replica_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64.decode(&encoded).map_err(D::Error::custom)
    }
}

/// A storage backend for canvases and files.
pub trait Storage: Send + Sync {
    fn save_canvas(&self, record: &CanvasRecord) -> BoxFuture<'_, StorageResult<()>>;

    fn load_canvas(&self, id: Uuid) -> BoxFuture<'_, StorageResult<CanvasRecord>>;

    fn delete_canvas(&self, id: Uuid) -> BoxFuture<'_, StorageResult<()>>;

    fn list_canvases(&self) -> BoxFuture<'_, StorageResult<Vec<Uuid>>>;

    /// Ids of canvases whose `last_modified` is at or after `since`.
    fn canvases_modified_since(&self, since: SystemTime)
    -> BoxFuture<'_, StorageResult<Vec<Uuid>>>;

    fn save_file(&self, record: &FileRecord) -> BoxFuture<'_, StorageResult<()>>;

    fn load_file(&self, id: Uuid) -> BoxFuture<'_, StorageResult<FileRecord>>;

    fn delete_file(&self, id: Uuid) -> BoxFuture<'_, StorageResult<()>>;

    fn list_files(&self) -> BoxFuture<'_, StorageResult<Vec<Uuid>>>;
}

#[cfg(test)]
pub(crate) fn block_on<F: Future>(f: F) -> F::Output {
    // Simple blocking executor for tests
    use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

    fn dummy_raw_waker() -> RawWaker {
        fn no_op(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            dummy_raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
        RawWaker::new(std::ptr::null(), &VTABLE)
    }

    let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
    let mut cx = Context::from_waker(&waker);
    let mut f = std::pin::pin!(f);

    loop {
        match f.as_mut().poll(&mut cx) {
            Poll::Ready(result) => return result,
            Poll::Pending => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{EditorElement, Element, ElementBox, ElementUpdate};

    #[test]
    fn test_canvas_record_strips_selection() {
        let mut canvas = Canvas::new(Uuid::new_v4());
        let element = Element::Editor(EditorElement {
            bounds: ElementBox::new(Uuid::new_v4(), 0.0, 0.0, 100.0, 100.0),
        });
        let id = element.id();
        canvas.add_element(element);
        canvas.update_element(
            id,
            &ElementUpdate {
                selected: Some(true),
                active: Some(true),
                ..Default::default()
            },
        );

        let record = CanvasRecord::new(&canvas);
        let restored = record.into_canvas();
        let element = restored.find_element(id).unwrap();
        assert!(!element.is_selected());
        assert!(!element.is_active());

        // The live canvas keeps its selection.
        assert!(canvas.find_element(id).unwrap().is_selected());
    }

    #[test]
    fn test_file_record_bytes_as_base64() {
        let record = FileRecord {
            id: Uuid::new_v4(),
            replica: vec![0, 1, 2, 255],
            path: None,
            versions: vec![VersionRecord {
                date: SystemTime::UNIX_EPOCH,
                bytes: vec![42],
            }],
            code: false,
            last_modified: None,
            deleted: false,
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("AAEC/w=="));

        let parsed: FileRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.replica, record.replica);
        assert_eq!(parsed.versions[0].bytes, vec![42]);
    }
}
