//! Undo/redo history and snapshot stores.
//!
//! The engine pushes one full-canvas snapshot per stroke, never per stamp.
//! Storage is behind the [`SnapshotStore`] trait so the core never touches
//! the filesystem directly: [`MemoryStore`] keeps LZ4-compressed snapshots
//! in memory, [`TempFileStore`] writes them to numbered files under a
//! caller-supplied directory.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use lz4_flex::{compress_prepend_size, decompress_size_prepended};

use crate::canvas::Canvas;
use crate::error::{EngineError, Result};

/// Opaque handle to one stored snapshot.
pub type SnapshotHandle = u64;

/// External storage for full-canvas snapshots.
pub trait SnapshotStore {
    fn save(&mut self, canvas: &Canvas) -> Result<SnapshotHandle>;
    fn load(&self, handle: SnapshotHandle) -> Result<Canvas>;
    /// Release a snapshot that fell off the history. Best-effort.
    fn discard(&mut self, handle: SnapshotHandle);
}

/// In-memory store, LZ4-compressed. Used for tests and embedded callers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    next: SnapshotHandle,
    entries: HashMap<SnapshotHandle, (u32, u32, Vec<u8>)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SnapshotStore for MemoryStore {
    fn save(&mut self, canvas: &Canvas) -> Result<SnapshotHandle> {
        let compressed = compress_prepend_size(canvas.data());
        let handle = self.next;
        self.next += 1;
        self.entries
            .insert(handle, (canvas.width(), canvas.height(), compressed));
        Ok(handle)
    }

    fn load(&self, handle: SnapshotHandle) -> Result<Canvas> {
        let (w, h, compressed) = self
            .entries
            .get(&handle)
            .ok_or_else(|| EngineError::Snapshot(format!("unknown snapshot {handle}")))?;
        let data = decompress_size_prepended(compressed)
            .map_err(|e| EngineError::Snapshot(e.to_string()))?;
        Canvas::from_rgba(*w, *h, data)
    }

    fn discard(&mut self, handle: SnapshotHandle) {
        self.entries.remove(&handle);
    }
}

/// Temp-file store. One file per snapshot:
/// `width(u32 LE) + height(u32 LE) + lz4(data, size-prepended)`.
#[derive(Debug)]
pub struct TempFileStore {
    dir: PathBuf,
    next: SnapshotHandle,
}

impl TempFileStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, next: 0 })
    }

    /// Store under the platform cache directory.
    pub fn in_default_dir() -> Result<Self> {
        let dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tusche")
            .join("history");
        Self::new(dir)
    }

    fn path_for(&self, handle: SnapshotHandle) -> PathBuf {
        self.dir.join(format!("stroke-{handle}.bin"))
    }
}

impl SnapshotStore for TempFileStore {
    fn save(&mut self, canvas: &Canvas) -> Result<SnapshotHandle> {
        let handle = self.next;
        let path = self.path_for(handle);

        let mut file = File::create(&path)?;
        file.write_u32::<LittleEndian>(canvas.width())?;
        file.write_u32::<LittleEndian>(canvas.height())?;
        file.write_all(&compress_prepend_size(canvas.data()))?;

        self.next += 1;
        tracing::debug!("Snapshot {} saved to {:?}", handle, path);
        Ok(handle)
    }

    fn load(&self, handle: SnapshotHandle) -> Result<Canvas> {
        let path = self.path_for(handle);
        let mut file = File::open(&path)?;
        let width = file.read_u32::<LittleEndian>()?;
        let height = file.read_u32::<LittleEndian>()?;
        let mut compressed = Vec::new();
        file.read_to_end(&mut compressed)?;

        let data = decompress_size_prepended(&compressed)
            .map_err(|e| EngineError::Snapshot(e.to_string()))?;
        Canvas::from_rgba(width, height, data)
    }

    fn discard(&mut self, handle: SnapshotHandle) {
        let path = self.path_for(handle);
        if let Err(e) = std::fs::remove_file(&path) {
            tracing::warn!("Failed to remove snapshot {:?}: {}", path, e);
        }
    }
}

/// Bounded LIFO undo/redo stacks of snapshot handles.
///
/// Invariants: pushing to undo clears redo; undo pops push the pre-pop
/// state onto redo and vice versa; exceeding the bound discards the oldest
/// undo entry.
#[derive(Debug)]
pub struct UndoHistory {
    undo: Vec<SnapshotHandle>,
    redo: Vec<SnapshotHandle>,
    capacity: usize,
}

impl UndoHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Record the pre-stroke state. Clears the redo stack.
    pub fn push(&mut self, canvas: &Canvas, store: &mut dyn SnapshotStore) -> Result<()> {
        let handle = store.save(canvas)?;
        for stale in self.redo.drain(..) {
            store.discard(stale);
        }
        self.undo.push(handle);
        if self.undo.len() > self.capacity {
            let oldest = self.undo.remove(0);
            store.discard(oldest);
        }
        Ok(())
    }

    /// Restore the previous snapshot, saving `current` onto the redo stack.
    /// Returns `None` when there is nothing to undo.
    pub fn undo(
        &mut self,
        current: &Canvas,
        store: &mut dyn SnapshotStore,
    ) -> Result<Option<Canvas>> {
        let Some(handle) = self.undo.pop() else {
            return Ok(None);
        };
        let restored = store.load(handle)?;
        let redo_handle = store.save(current)?;
        self.redo.push(redo_handle);
        store.discard(handle);
        Ok(Some(restored))
    }

    /// Re-apply the most recently undone snapshot.
    pub fn redo(
        &mut self,
        current: &Canvas,
        store: &mut dyn SnapshotStore,
    ) -> Result<Option<Canvas>> {
        let Some(handle) = self.redo.pop() else {
            return Ok(None);
        };
        let restored = store.load(handle)?;
        let undo_handle = store.save(current)?;
        self.undo.push(undo_handle);
        store.discard(handle);
        Ok(Some(restored))
    }
}
