//! Background brush catalog loading.
//!
//! Tip bitmaps are decoded on a single worker thread while the UI thread
//! keeps stamping. The worker and catalog rebuilds are mutually exclusive:
//! a cooperative cancellation flag is checked between files, and
//! [`BrushLoader::reload`] always cancels and joins the previous worker
//! before the catalog is cleared. The compositing core never runs on this
//! thread.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use image::imageops;
use parking_lot::RwLock;

use super::BrushTip;

/// Shared collection of decoded brush tips, keyed by name.
#[derive(Debug, Default)]
pub struct BrushCatalog {
    tips: RwLock<HashMap<String, Arc<BrushTip>>>,
}

impl BrushCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: String, tip: BrushTip) {
        self.tips.write().insert(name, Arc::new(tip));
    }

    pub fn get(&self, name: &str) -> Option<Arc<BrushTip>> {
        self.tips.read().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.tips.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tips.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tips.read().is_empty()
    }

    pub fn clear(&self) {
        self.tips.write().clear();
    }
}

/// Owns the single decode worker and its cancellation flag.
#[derive(Debug)]
pub struct BrushLoader {
    catalog: Arc<BrushCatalog>,
    cancel: Arc<AtomicBool>,
    worker: Option<JoinHandle<usize>>,
}

impl BrushLoader {
    pub fn new(catalog: Arc<BrushCatalog>) -> Self {
        Self {
            catalog,
            cancel: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Start decoding `paths` in the background. Any previous worker is
    /// cancelled and joined first; two workers never run at once.
    pub fn start(&mut self, paths: Vec<PathBuf>) {
        self.cancel_and_join();

        let cancel = Arc::new(AtomicBool::new(false));
        self.cancel = cancel.clone();
        let catalog = self.catalog.clone();

        self.worker = Some(std::thread::spawn(move || {
            let mut loaded = 0usize;
            for path in paths {
                // Cooperative cancellation, checked between files.
                if cancel.load(Ordering::Relaxed) {
                    tracing::debug!("Brush loading cancelled after {} tips", loaded);
                    break;
                }
                match load_tip(&path) {
                    Ok((name, tip)) => {
                        catalog.insert(name, tip);
                        loaded += 1;
                    }
                    Err(e) => {
                        tracing::warn!("Skipping brush {:?}: {}", path, e);
                    }
                }
            }
            tracing::debug!("Brush loader finished, {} tips loaded", loaded);
            loaded
        }));
    }

    /// Cancel and rebuild: the worker fully stops before the catalog is
    /// cleared, so a rebuild never races an in-flight insert.
    pub fn reload(&mut self, paths: Vec<PathBuf>) {
        self.cancel_and_join();
        self.catalog.clear();
        self.start(paths);
    }

    /// Signal cancellation and wait for the worker to stop. Returns how
    /// many tips the worker managed to load.
    pub fn cancel_and_join(&mut self) -> Option<usize> {
        let worker = self.worker.take()?;
        self.cancel.store(true, Ordering::Relaxed);
        match worker.join() {
            Ok(count) => Some(count),
            Err(_) => {
                tracing::warn!("Brush loader worker panicked");
                None
            }
        }
    }

    /// Wait for the current load to finish without cancelling it.
    pub fn join(&mut self) -> Option<usize> {
        let worker = self.worker.take()?;
        worker.join().ok()
    }
}

impl Drop for BrushLoader {
    fn drop(&mut self) {
        self.cancel_and_join();
    }
}

fn load_tip(path: &std::path::Path) -> crate::error::Result<(String, BrushTip)> {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string());

    let gray = image::open(path)?.to_luma8();
    // Non-square sources are center-cropped to the smaller dimension.
    let side = gray.width().min(gray.height());
    let tip = if gray.width() == gray.height() {
        BrushTip::from_gray(gray)?
    } else {
        let x = (gray.width() - side) / 2;
        let y = (gray.height() - side) / 2;
        BrushTip::from_gray(imageops::crop_imm(&gray, x, y, side, side).to_image())?
    };
    Ok((name, tip))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::GrayImage;

    fn write_tip(dir: &std::path::Path, name: &str, w: u32, h: u32) -> PathBuf {
        let img = GrayImage::from_pixel(w, h, image::Luma([180]));
        let path = dir.join(format!("{name}.png"));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_load_and_join() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![
            write_tip(dir.path(), "a", 16, 16),
            write_tip(dir.path(), "b", 8, 8),
        ];

        let catalog = Arc::new(BrushCatalog::new());
        let mut loader = BrushLoader::new(catalog.clone());
        loader.start(paths);
        assert_eq!(loader.join(), Some(2));
        assert_eq!(catalog.names(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_non_square_sources_are_cropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tip(dir.path(), "wide", 20, 10);

        let (_, tip) = load_tip(&path).unwrap();
        assert_eq!(tip.size(), 10);
    }

    #[test]
    fn test_reload_replaces_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let first = vec![write_tip(dir.path(), "old", 8, 8)];
        let second = vec![write_tip(dir.path(), "new", 8, 8)];

        let catalog = Arc::new(BrushCatalog::new());
        let mut loader = BrushLoader::new(catalog.clone());
        loader.start(first);
        loader.join();

        loader.reload(second);
        loader.join();
        assert_eq!(catalog.names(), vec!["new".to_string()]);
    }

    #[test]
    fn test_unreadable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.png");
        std::fs::write(&bogus, b"not an image").unwrap();
        let good = write_tip(dir.path(), "good", 8, 8);

        let catalog = Arc::new(BrushCatalog::new());
        let mut loader = BrushLoader::new(catalog.clone());
        loader.start(vec![bogus, good]);
        assert_eq!(loader.join(), Some(1));
        assert_eq!(catalog.len(), 1);
    }
}
