//! Tusche - stroke compositing engine for pressure-driven raster painting.
//!
//! The engine turns pointer events into stamped brush marks on an RGBA
//! canvas: pressure constraints and jitter resolve each stamp's parameters,
//! symmetry fans stamps out across the canvas, and a three-buffer layer
//! model (committed, staged, merged) keeps blend-mode strokes correct while
//! they are still in progress. Undo snapshots go through a pluggable
//! [`history::SnapshotStore`].

pub mod brush;
pub mod canvas;
pub mod color;
pub mod compositor;
pub mod error;
pub mod geometry;
pub mod history;
pub mod settings;
pub mod stroke;
pub mod symmetry;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging for binaries and tools embedding the engine.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tusche=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Tusche engine logging initialized");
}
