//! Quillboard Core Library
//!
//! State engine for a collaborative note-taking canvas: positioned
//! elements, connector links, camera math, selection, replicated documents
//! and their persistence.

pub mod camera;
pub mod canvas;
pub mod collab;
pub mod config;
pub mod crdt;
pub mod element;
pub mod link;
pub mod resize;
pub mod selection;
pub mod snap;
pub mod storage;
pub mod sync;
pub mod workspace;

pub use camera::Camera;
pub use canvas::{Canvas, Placement};
pub use collab::{CollabError, DocKind, SessionManager};
pub use config::CanvasConfig;
pub use crdt::ReplicaDoc;
pub use element::{Edge, Element, ElementId, ElementUpdate, Handle};
pub use selection::Selection;
pub use storage::{FileStorage, MemoryStorage, SaveScheduler, Storage};
pub use sync::{ConnectionState, NativeWebSocket, SyncEvent};
pub use workspace::{OpenTarget, Workspace};
