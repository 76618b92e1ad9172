//! Filesystem storage backed by JSON records.

use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

use uuid::Uuid;

use super::{BoxFuture, CanvasRecord, FileRecord, Storage, StorageError, StorageResult};

/// Stores records as JSON files under `canvases/` and `files/`
/// subdirectories of a base path.
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create storage rooted at `base_path`, creating the directory tree if
    /// needed.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        for sub in ["canvases", "files"] {
            let dir = base_path.join(sub);
            if !dir.exists() {
                fs::create_dir_all(&dir).map_err(|e| {
                    StorageError::Io(format!("Failed to create storage directory: {}", e))
                })?;
            }
        }
        Ok(Self { base_path })
    }

    /// Create storage in the platform's data directory, under `quillboard/`.
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Self::new(base.join("quillboard"))
    }

    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    fn canvas_path(&self, id: Uuid) -> PathBuf {
        self.base_path.join("canvases").join(format!("{id}.json"))
    }

    fn file_path(&self, id: Uuid) -> PathBuf {
        self.base_path.join("files").join(format!("{id}.json"))
    }

    fn write_json<T: serde::Serialize>(path: PathBuf, value: &T) -> StorageResult<()> {
        let json =
            serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        fs::write(&path, json)
            .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: PathBuf, id: Uuid) -> StorageResult<T> {
        if !path.exists() {
            return Err(StorageError::NotFound(id));
        }
        let json = fs::read_to_string(&path)
            .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&json).map_err(|e| {
            StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    fn remove(path: PathBuf) -> StorageResult<()> {
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                StorageError::Io(format!("Failed to delete {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }

    fn list_ids(dir: PathBuf) -> StorageResult<Vec<Uuid>> {
        if !dir.exists() {
            return Ok(vec![]);
        }
        let entries = fs::read_dir(&dir)
            .map_err(|e| StorageError::Io(format!("Failed to read directory: {}", e)))?;

        let mut ids = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.extension().map(|e| e == "json").unwrap_or(false) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if let Ok(id) = Uuid::parse_str(stem) {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }
}

impl Storage for FileStorage {
    fn save_canvas(&self, record: &CanvasRecord) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.canvas_path(record.id());
        let record = record.clone();
        Box::pin(async move { Self::write_json(path, &record) })
    }

    fn load_canvas(&self, id: Uuid) -> BoxFuture<'_, StorageResult<CanvasRecord>> {
        let path = self.canvas_path(id);
        Box::pin(async move { Self::read_json(path, id) })
    }

    fn delete_canvas(&self, id: Uuid) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.canvas_path(id);
        Box::pin(async move { Self::remove(path) })
    }

    fn list_canvases(&self) -> BoxFuture<'_, StorageResult<Vec<Uuid>>> {
        let dir = self.base_path.join("canvases");
        Box::pin(async move { Self::list_ids(dir) })
    }

    fn canvases_modified_since(
        &self,
        since: SystemTime,
    ) -> BoxFuture<'_, StorageResult<Vec<Uuid>>> {
        let dir = self.base_path.join("canvases");
        let base = self.base_path.clone();
        Box::pin(async move {
            let mut modified = Vec::new();
            for id in Self::list_ids(dir)? {
                let path = base.join("canvases").join(format!("{id}.json"));
                // An unreadable record loses only itself, not the listing.
                let record: CanvasRecord = match Self::read_json(path, id) {
                    Ok(record) => record,
                    Err(e) => {
                        log::warn!("Skipping unreadable canvas record {id}: {e}");
                        continue;
                    }
                };
                if record.last_modified().is_some_and(|t| t >= since) {
                    modified.push(id);
                }
            }
            Ok(modified)
        })
    }

    fn save_file(&self, record: &FileRecord) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.file_path(record.id);
        let record = record.clone();
        Box::pin(async move { Self::write_json(path, &record) })
    }

    fn load_file(&self, id: Uuid) -> BoxFuture<'_, StorageResult<FileRecord>> {
        let path = self.file_path(id);
        Box::pin(async move { Self::read_json(path, id) })
    }

    fn delete_file(&self, id: Uuid) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.file_path(id);
        Box::pin(async move { Self::remove(path) })
    }

    fn list_files(&self) -> BoxFuture<'_, StorageResult<Vec<Uuid>>> {
        let dir = self.base_path.join("files");
        Box::pin(async move { Self::list_ids(dir) })
    }
}
