//! Layer manager: owns the committed, staged, and merged buffers.
//!
//! Committed is the authoritative canvas; Staged holds the in-progress
//! stroke when blend-mode/opacity compositing requires layer-like math
//! before the final commit; Merged is the presentation composite of Staged
//! over Committed. Staged is fully transparent whenever no stroke needs
//! staging.

use rayon::prelude::*;

use super::blend::{composite_over, BlendMode};
use super::Canvas;
use crate::color::Rgba8;
use crate::compositor::apply_locks;
use crate::error::Result;
use crate::geometry::Rect;
use crate::history::{SnapshotStore, UndoHistory};
use crate::settings::ChannelLocks;

#[derive(Debug)]
pub struct LayerManager {
    committed: Canvas,
    staged: Canvas,
    merged: Canvas,
    merge_regions: Vec<Rect>,
    canvas_changed: bool,
    staging_active: bool,
    history: UndoHistory,
    history_warned: bool,
}

impl LayerManager {
    pub fn new(width: u32, height: u32, history_capacity: usize) -> Self {
        Self::from_source(Canvas::new(width, height), history_capacity)
    }

    /// Adopt an existing image as the committed canvas.
    pub fn from_source(committed: Canvas, history_capacity: usize) -> Self {
        let staged = Canvas::new(committed.width(), committed.height());
        let merged = committed.clone();
        Self {
            committed,
            staged,
            merged,
            merge_regions: Vec::new(),
            canvas_changed: false,
            staging_active: false,
            history: UndoHistory::new(history_capacity),
            history_warned: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.committed.width()
    }

    pub fn height(&self) -> u32 {
        self.committed.height()
    }

    pub fn committed(&self) -> &Canvas {
        &self.committed
    }

    pub fn staged(&self) -> &Canvas {
        &self.staged
    }

    /// The presentation buffer a display layer should show.
    pub fn merged(&self) -> &Canvas {
        if self.staging_active {
            &self.merged
        } else {
            &self.committed
        }
    }

    pub fn committed_mut(&mut self) -> &mut Canvas {
        &mut self.committed
    }

    pub fn staged_mut(&mut self) -> &mut Canvas {
        &mut self.staged
    }

    pub fn staging_active(&self) -> bool {
        self.staging_active
    }

    /// Whether the current stroke has touched the canvas yet.
    pub fn stroke_touched_canvas(&self) -> bool {
        self.canvas_changed
    }

    /// Called before the first stamp of a stroke: snapshot Committed into
    /// the undo history and clear the redo stack.
    ///
    /// A failed snapshot save aborts only the history push; the canvas
    /// stays usable and the failure is reported once per session.
    pub fn begin_stroke_if_needed(&mut self, store: &mut dyn SnapshotStore) {
        if self.canvas_changed {
            return;
        }
        if let Err(e) = self.history.push(&self.committed, store) {
            if !self.history_warned {
                tracing::warn!("Cannot save history snapshot: {}", e);
                self.history_warned = true;
            }
        }
        self.canvas_changed = true;
    }

    /// First time a stamp requires the staged target: seed Merged with the
    /// committed baseline so partial merges have something to composite
    /// onto.
    pub fn require_staging(&mut self) {
        if self.staging_active {
            return;
        }
        self.merged.copy_from(&self.committed);
        self.staged.clear();
        self.staging_active = true;
    }

    /// Record a dirty rectangle produced by a stamp into Staged.
    pub fn push_region(&mut self, rect: Rect) {
        if !rect.is_empty() {
            self.merge_regions.push(rect);
        }
    }

    pub fn has_pending_regions(&self) -> bool {
        !self.merge_regions.is_empty()
    }

    /// Drain the merge-region list, compositing only the touched
    /// rectangles of Staged over Committed into Merged. Never the whole
    /// canvas.
    pub fn merge_dirty_regions(&mut self, mode: BlendMode, opacity: f32, locks: &ChannelLocks) {
        if !self.staging_active {
            self.merge_regions.clear();
            return;
        }
        let regions = std::mem::take(&mut self.merge_regions);
        for rect in regions {
            let rect = rect.clamp_to(self.committed.width(), self.committed.height());
            for y in rect.top..rect.bottom {
                for x in rect.left..rect.right {
                    let base = self.committed.pixel(x, y);
                    let staged = self.staged.pixel(x, y);
                    let out = merge_pixel(base, staged, mode, opacity, locks);
                    self.merged.set_pixel(x, y, out);
                }
            }
        }
    }

    /// Pointer-up: commit Staged fully into Committed, reset Staged to
    /// transparent, and reset both change flags.
    pub fn finalize_stroke(&mut self, mode: BlendMode, opacity: f32, locks: &ChannelLocks) {
        if self.staging_active {
            let width = self.committed.width() as usize;
            let locks = *locks;
            let staged = &self.staged;
            self.committed
                .data_mut()
                .par_chunks_mut(width * 4)
                .enumerate()
                .for_each(|(y, row)| {
                    for x in 0..width {
                        let i = x * 4;
                        let base = Rgba8::new(row[i], row[i + 1], row[i + 2], row[i + 3]);
                        let top = staged.pixel(x as i32, y as i32);
                        let out = merge_pixel(base, top, mode, opacity, &locks);
                        row[i] = out.r;
                        row[i + 1] = out.g;
                        row[i + 2] = out.b;
                        row[i + 3] = out.a;
                    }
                });
            self.staged.clear();
            self.staging_active = false;
        }
        self.merge_regions.clear();
        self.canvas_changed = false;
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self, store: &mut dyn SnapshotStore) -> Result<bool> {
        match self.history.undo(&self.committed, store)? {
            Some(restored) => {
                self.committed = restored;
                self.staged.clear();
                self.staging_active = false;
                self.merge_regions.clear();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn redo(&mut self, store: &mut dyn SnapshotStore) -> Result<bool> {
        match self.history.redo(&self.committed, store)? {
            Some(restored) => {
                self.committed = restored;
                self.staged.clear();
                self.staging_active = false;
                self.merge_regions.clear();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// One merged pixel: staged over committed with the stroke's blend mode
/// and opacity, locked channels of the committed base preserved.
///
/// A fully transparent staged pixel yields the base pixel unchanged, which
/// makes repeated merges of the same region idempotent.
#[inline]
fn merge_pixel(
    base: Rgba8,
    staged: Rgba8,
    mode: BlendMode,
    opacity: f32,
    locks: &ChannelLocks,
) -> Rgba8 {
    if staged.a == 0 {
        return base;
    }
    let out = composite_over(base, staged, mode, opacity);
    apply_locks(out, base, locks)
}
