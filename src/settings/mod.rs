//! Brush settings snapshot.
//!
//! [`BrushSettings`] is the value object a GUI (or a preset file) produces
//! and the engine consumes per stamp. Apart from the auto-shift sliders,
//! which [`crate::stroke::StrokeEngine`] advances after each stamp, the
//! snapshot is read-only while a stroke is in flight.

mod constraint;

pub use constraint::{ConstraintHandling, ConstraintTarget, PressureConstraint};

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::canvas::BlendMode;
use crate::color::Rgba8;
use crate::error::{EngineError, Result};
use crate::symmetry::SymmetryMode;

/// Valid brush size range in pixels (diameter).
pub const SIZE_RANGE: (f32, f32) = (1.0, 500.0);
/// Valid opacity/flow range.
pub const ALPHA_RANGE: (f32, f32) = (0.0, 1.0);
/// Valid rotation range in degrees; the per-stamp auto-shift wraps here.
pub const ROTATION_RANGE: (f32, f32) = (-360.0, 360.0);
/// Valid minimum-draw-distance range in canvas units.
pub const MIN_DISTANCE_RANGE: (f32, f32) = (0.0, 1000.0);

/// Mask sampling mode for rotation and scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SmoothingMode {
    /// Bilinear sampling, anti-aliased edges.
    #[default]
    Smooth,
    /// Nearest sampling that preserves hard-aliased edges.
    Jagged,
}

/// Per-stamp randomization ranges. All ranges are one-sided magnitudes;
/// zero disables that jitter.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JitterSettings {
    /// Random shrink of the stamp radius, in pixels.
    pub size_min: f32,
    /// Random growth of the stamp radius, in pixels.
    pub size_max: f32,
    /// Random counter-clockwise rotation, in degrees.
    pub rotation_left: f32,
    /// Random clockwise rotation, in degrees.
    pub rotation_right: f32,
    /// Random flow reduction, in flow units [0, 1].
    pub flow_loss: f32,
    /// Horizontal spray as a percentage of canvas width [0, 100].
    pub spray_horizontal: f32,
    /// Vertical spray as a percentage of canvas height [0, 100].
    pub spray_vertical: f32,
    /// Per-channel RGB jitter in percent [0, 100].
    pub rgb: [f32; 3],
    /// H/S/V jitter in percent [0, 100]; hue is scaled to degrees (x3.6).
    pub hsv: [f32; 3],
}

impl JitterSettings {
    /// Either color jitter mode being non-zero activates per-stamp recoloring.
    pub fn recolors(&self) -> bool {
        self.rgb.iter().any(|v| *v > 0.0) || self.hsv.iter().any(|v| *v > 0.0)
    }
}

/// Per-stamp auto-shift amounts applied after each stamp. Size and flow
/// ping-pong at their range ends; rotation wraps.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftSettings {
    pub size: f32,
    pub flow: f32,
    pub rotation: f32,
}

/// Channel locks: a locked channel of the destination is preserved
/// verbatim through any stamp or merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelLocks {
    pub alpha: bool,
    pub red: bool,
    pub green: bool,
    pub blue: bool,
    pub hue: bool,
    pub saturation: bool,
    pub value: bool,
}

impl ChannelLocks {
    pub fn any(&self) -> bool {
        self.alpha
            || self.red
            || self.green
            || self.blue
            || self.hue
            || self.saturation
            || self.value
    }

    pub fn any_hsv(&self) -> bool {
        self.hue || self.saturation || self.value
    }
}

/// Pulls the destination color under the stamp into the brush color, per
/// enabled HSV channel, by `amount` percent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorInfluence {
    /// Mix amount in percent [0, 100]; zero disables the influence.
    pub amount: f32,
    pub hue: bool,
    pub saturation: bool,
    pub value: bool,
}

impl ColorInfluence {
    pub fn is_active(&self) -> bool {
        self.amount > 0.0 && (self.hue || self.saturation || self.value)
    }
}

/// Immutable-per-stroke brush configuration snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrushSettings {
    /// Brush diameter in pixels.
    pub size: f32,
    /// Stroke opacity ceiling [0, 1].
    pub opacity: f32,
    /// Per-stamp flow [0, 1].
    pub flow: f32,
    /// Base stamp rotation in degrees.
    pub rotation: f32,
    /// Stamps per brush-size unit of travel; 0 stamps once per move event.
    pub density: f32,
    /// Minimum travel before the next stamp, in canvas units.
    pub min_draw_distance: f32,
    pub color: Rgba8,
    pub blend_mode: BlendMode,
    pub smoothing: SmoothingMode,
    pub symmetry: SymmetryMode,
    pub jitter: JitterSettings,
    pub shift: ShiftSettings,
    pub locks: ChannelLocks,
    pub color_influence: ColorInfluence,
    /// Wrap strokes around canvas edges for seamless tiling.
    pub seamless: bool,
    /// Ordered dithering of fractional stamp alpha.
    pub dither: bool,
    /// Replace the tip's gray values with the brush color.
    pub colorize: bool,
    /// Rotate stamps to follow the stroke direction.
    pub orient_to_stroke: bool,
    /// Pressure constraints per parameter; absent entries mean DoNothing.
    pub constraints: HashMap<ConstraintTarget, PressureConstraint>,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            size: 20.0,
            opacity: 1.0,
            flow: 1.0,
            rotation: 0.0,
            density: 4.0,
            min_draw_distance: 0.0,
            color: Rgba8::opaque(0, 0, 0),
            blend_mode: BlendMode::Overwrite,
            smoothing: SmoothingMode::Smooth,
            symmetry: SymmetryMode::None,
            jitter: JitterSettings::default(),
            shift: ShiftSettings::default(),
            locks: ChannelLocks::default(),
            color_influence: ColorInfluence::default(),
            seamless: false,
            dither: false,
            colorize: true,
            orient_to_stroke: false,
            constraints: HashMap::new(),
        }
    }
}

impl BrushSettings {
    /// Resolve one parameter through its pressure constraint, falling back
    /// to the unmodified base value when no constraint is configured.
    pub fn resolved(
        &self,
        target: ConstraintTarget,
        base: f32,
        pressure: f32,
        min: f32,
        max: f32,
    ) -> f32 {
        self.constraints
            .get(&target)
            .unwrap_or(&PressureConstraint::NONE)
            .resolve(base, pressure, min, max)
    }

    pub fn resolved_size(&self, pressure: f32) -> f32 {
        self.resolved(
            ConstraintTarget::Size,
            self.size,
            pressure,
            SIZE_RANGE.0,
            SIZE_RANGE.1,
        )
    }

    pub fn resolved_flow(&self, pressure: f32) -> f32 {
        self.resolved(
            ConstraintTarget::Flow,
            self.flow,
            pressure,
            ALPHA_RANGE.0,
            ALPHA_RANGE.1,
        )
    }

    pub fn resolved_opacity(&self, pressure: f32) -> f32 {
        self.resolved(
            ConstraintTarget::Opacity,
            self.opacity,
            pressure,
            ALPHA_RANGE.0,
            ALPHA_RANGE.1,
        )
    }

    pub fn resolved_rotation(&self, pressure: f32) -> f32 {
        self.resolved(
            ConstraintTarget::Rotation,
            self.rotation,
            pressure,
            ROTATION_RANGE.0,
            ROTATION_RANGE.1,
        )
    }

    /// Jitter magnitudes with their pressure constraints applied. Spray
    /// values are percentages, rotation jitter is one-sided degrees.
    pub fn resolved_jitter(&self, pressure: f32) -> JitterSettings {
        let j = &self.jitter;
        JitterSettings {
            size_min: self.resolved(
                ConstraintTarget::SizeJitterMin,
                j.size_min,
                pressure,
                0.0,
                SIZE_RANGE.1,
            ),
            size_max: self.resolved(
                ConstraintTarget::SizeJitterMax,
                j.size_max,
                pressure,
                0.0,
                SIZE_RANGE.1,
            ),
            rotation_left: self.resolved(
                ConstraintTarget::RotationJitterLeft,
                j.rotation_left,
                pressure,
                0.0,
                360.0,
            ),
            rotation_right: self.resolved(
                ConstraintTarget::RotationJitterRight,
                j.rotation_right,
                pressure,
                0.0,
                360.0,
            ),
            flow_loss: self.resolved(
                ConstraintTarget::FlowLossJitter,
                j.flow_loss,
                pressure,
                ALPHA_RANGE.0,
                ALPHA_RANGE.1,
            ),
            spray_horizontal: self.resolved(
                ConstraintTarget::SprayHorizontal,
                j.spray_horizontal,
                pressure,
                0.0,
                100.0,
            ),
            spray_vertical: self.resolved(
                ConstraintTarget::SprayVertical,
                j.spray_vertical,
                pressure,
                0.0,
                100.0,
            ),
            rgb: j.rgb,
            hsv: j.hsv,
        }
    }

    pub fn resolved_min_distance(&self, pressure: f32) -> f32 {
        self.resolved(
            ConstraintTarget::MinDrawDistance,
            self.min_draw_distance,
            pressure,
            MIN_DISTANCE_RANGE.0,
            MIN_DISTANCE_RANGE.1,
        )
    }

    /// The largest stamp diameter this configuration can produce over a
    /// whole session, used to size the session-long downsized tip once.
    /// Must stay stable while a stroke mutates the sliders. Constraint
    /// resolution is linear in pressure, so the extremes at pressure 0
    /// and 1 bound it; a size auto-shift can ping-pong all the way to the
    /// top of the range.
    pub fn max_stamp_size(&self) -> f32 {
        let base = if self.shift.size > 0.0 {
            SIZE_RANGE.1
        } else {
            self.resolved_size(0.0)
                .max(self.resolved_size(1.0))
                .max(self.size)
        };
        let grow = self
            .resolved_jitter(0.0)
            .size_max
            .max(self.resolved_jitter(1.0).size_max);
        (base + 2.0 * grow).clamp(SIZE_RANGE.0, SIZE_RANGE.1)
    }

    /// Load a settings preset from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| EngineError::Preset(e.to_string()))
    }

    /// Save this snapshot as a JSON preset.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).map_err(|e| EngineError::Preset(e.to_string()))?;
        std::fs::write(path, json)?;
        tracing::debug!("Saved brush preset to {:?}", path);
        Ok(())
    }
}
