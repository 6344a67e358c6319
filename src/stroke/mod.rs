//! Stroke orchestration: jitter, tool strategies, and the session engine.

mod jitter;
mod session;
mod strategy;

pub use jitter::JitterEngine;
pub use session::StrokeEngine;
pub use strategy::{DrawStrategy, EffectRenderer};
