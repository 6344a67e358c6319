//! Draw strategies: the closed set of tool behaviors selected once per
//! stroke. The hot stamping loop never branches on a tool enum beyond the
//! strategy's own target/source resolution.

use crate::canvas::Canvas;
use crate::settings::BrushSettings;

/// How a stroke deposits paint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawStrategy {
    /// Blend the colored brush mask.
    #[default]
    NormalBrush,
    /// Masked overwrite from the original unedited source surface.
    Eraser,
    /// Masked overwrite from the committed canvas at a spatial offset from
    /// a user-set clone origin.
    CloneStamp,
    /// Normal compositing, but stamps are emitted along a straight segment
    /// on confirm instead of following the pointer.
    LineTool,
    /// Masked overwrite revealing an externally rendered effect surface.
    EffectBrush,
}

/// An externally supplied image-processing effect. Its render step takes
/// the current committed surface and produces the full-canvas result an
/// effect brush reveals.
pub trait EffectRenderer {
    fn render(&mut self, committed: &Canvas) -> Canvas;
}

impl DrawStrategy {
    /// Whether stamps copy source pixels through the mask instead of
    /// blending the brush color.
    pub fn is_masked_overwrite(&self) -> bool {
        matches!(
            self,
            DrawStrategy::Eraser | DrawStrategy::CloneStamp | DrawStrategy::EffectBrush
        )
    }

    /// Whether this stroke composites through the staged buffer.
    ///
    /// `opacity` is the stroke's pressure-resolved opacity, not the raw
    /// slider value. Masked-overwrite tools always operate on Committed
    /// directly; normal painting stages whenever a blend operator or a
    /// sub-max stroke opacity needs layer-like math, or once staging is
    /// already active this stroke.
    pub fn uses_staging(&self, settings: &BrushSettings, opacity: f32, staging_active: bool) -> bool {
        match self {
            DrawStrategy::NormalBrush | DrawStrategy::LineTool => {
                staging_active || settings.blend_mode.operator().is_some() || opacity < 1.0
            }
            DrawStrategy::Eraser | DrawStrategy::CloneStamp | DrawStrategy::EffectBrush => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::BlendMode;

    #[test]
    fn test_normal_brush_direct_at_full_opacity() {
        let settings = BrushSettings::default();
        assert!(!DrawStrategy::NormalBrush.uses_staging(&settings, 1.0, false));
    }

    #[test]
    fn test_blend_operator_forces_staging() {
        let settings = BrushSettings {
            blend_mode: BlendMode::Multiply,
            ..Default::default()
        };
        assert!(DrawStrategy::NormalBrush.uses_staging(&settings, 1.0, false));
        assert!(DrawStrategy::LineTool.uses_staging(&settings, 1.0, false));
    }

    #[test]
    fn test_sub_max_opacity_forces_staging() {
        // The resolved opacity decides, regardless of the slider value.
        let settings = BrushSettings::default();
        assert!(DrawStrategy::NormalBrush.uses_staging(&settings, 0.5, false));
        assert!(!DrawStrategy::NormalBrush.uses_staging(&settings, 1.0, false));
    }

    #[test]
    fn test_staging_is_sticky_within_stroke() {
        let settings = BrushSettings::default();
        assert!(DrawStrategy::NormalBrush.uses_staging(&settings, 1.0, true));
    }

    #[test]
    fn test_masked_overwrite_tools_never_stage() {
        let settings = BrushSettings {
            blend_mode: BlendMode::Multiply,
            ..Default::default()
        };
        for strategy in [
            DrawStrategy::Eraser,
            DrawStrategy::CloneStamp,
            DrawStrategy::EffectBrush,
        ] {
            assert!(strategy.is_masked_overwrite());
            assert!(!strategy.uses_staging(&settings, 0.3, true));
        }
    }
}
