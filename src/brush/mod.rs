//! Brush tip resources: the prepared-mask pipeline and the background
//! catalog loader.

mod loader;
mod mask;

pub use loader::{BrushCatalog, BrushLoader};
pub use mask::{BrushTip, MaskPipeline, PreparedMask};
