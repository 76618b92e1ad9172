//! In-memory storage implementation.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::SystemTime;

use uuid::Uuid;

use super::{BoxFuture, CanvasRecord, FileRecord, Storage, StorageError, StorageResult};

/// In-memory storage for testing and ephemeral use.
#[derive(Default)]
pub struct MemoryStorage {
    canvases: RwLock<HashMap<Uuid, CanvasRecord>>,
    files: RwLock<HashMap<Uuid, FileRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_err<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl Storage for MemoryStorage {
    fn save_canvas(&self, record: &CanvasRecord) -> BoxFuture<'_, StorageResult<()>> {
        let record = record.clone();
        Box::pin(async move {
            let mut canvases = self.canvases.write().map_err(lock_err)?;
            canvases.insert(record.id(), record);
            Ok(())
        })
    }

    fn load_canvas(&self, id: Uuid) -> BoxFuture<'_, StorageResult<CanvasRecord>> {
        Box::pin(async move {
            let canvases = self.canvases.read().map_err(lock_err)?;
            canvases.get(&id).cloned().ok_or(StorageError::NotFound(id))
        })
    }

    fn delete_canvas(&self, id: Uuid) -> BoxFuture<'_, StorageResult<()>> {
        Box::pin(async move {
            let mut canvases = self.canvases.write().map_err(lock_err)?;
            canvases.remove(&id);
            Ok(())
        })
    }

    fn list_canvases(&self) -> BoxFuture<'_, StorageResult<Vec<Uuid>>> {
        Box::pin(async move {
            let canvases = self.canvases.read().map_err(lock_err)?;
            Ok(canvases.keys().copied().collect())
        })
    }

    fn canvases_modified_since(
        &self,
        since: SystemTime,
    ) -> BoxFuture<'_, StorageResult<Vec<Uuid>>> {
        Box::pin(async move {
            let canvases = self.canvases.read().map_err(lock_err)?;
            Ok(canvases
                .values()
                .filter(|r| r.last_modified().is_some_and(|t| t >= since))
                .map(|r| r.id())
                .collect())
        })
    }

    fn save_file(&self, record: &FileRecord) -> BoxFuture<'_, StorageResult<()>> {
        let record = record.clone();
        Box::pin(async move {
            let mut files = self.files.write().map_err(lock_err)?;
            files.insert(record.id, record);
            Ok(())
        })
    }

    fn load_file(&self, id: Uuid) -> BoxFuture<'_, StorageResult<FileRecord>> {
        Box::pin(async move {
            let files = self.files.read().map_err(lock_err)?;
            files.get(&id).cloned().ok_or(StorageError::NotFound(id))
        })
    }

    fn delete_file(&self, id: Uuid) -> BoxFuture<'_, StorageResult<()>> {
        Box::pin(async move {
            let mut files = self.files.write().map_err(lock_err)?;
            files.remove(&id);
            Ok(())
        })
    }

    fn list_files(&self) -> BoxFuture<'_, StorageResult<Vec<Uuid>>> {
        Box::pin(async move {
            let files = self.files.read().map_err(lock_err)?;
            Ok(files.keys().copied().collect())
        })
    }
}
