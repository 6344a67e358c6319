//! Pressure constraint resolution.
//!
//! A [`PressureConstraint`] describes how stylus pressure modifies one
//! numeric brush parameter. Resolution never fails: out-of-range results
//! are clamped to the parameter's valid range, and a missing or misconfigured
//! constraint degrades to the base value.

use serde::{Deserialize, Serialize};

/// How pressure is applied to a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConstraintHandling {
    /// Ignore pressure, keep the base value.
    #[default]
    DoNothing,
    /// Add `value * pressure` to the base value.
    Add,
    /// Add `value`% of the parameter's maximum, scaled by pressure.
    AddPercent,
    /// Scale the base value by `value`% of itself, scaled by pressure.
    AddPercentOfCurrent,
    /// Interpolate from the base value toward `value` as pressure rises.
    MatchValue,
    /// Interpolate from the base value toward `value`% of the maximum.
    MatchPercent,
}

/// A (handling, value) pair attached to one brush parameter.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PressureConstraint {
    pub handling: ConstraintHandling,
    pub value: f32,
}

impl PressureConstraint {
    pub const NONE: Self = Self {
        handling: ConstraintHandling::DoNothing,
        value: 0.0,
    };

    pub fn new(handling: ConstraintHandling, value: f32) -> Self {
        Self { handling, value }
    }

    /// Resolve the final parameter value for a pressure ratio in [0, 1].
    ///
    /// The result is always clamped to `[min, max]`.
    pub fn resolve(&self, base: f32, pressure: f32, min: f32, max: f32) -> f32 {
        let p = pressure.clamp(0.0, 1.0);

        let raw = match self.handling {
            ConstraintHandling::DoNothing => base,
            ConstraintHandling::Add => base + self.value * p,
            ConstraintHandling::AddPercent => base + (self.value / 100.0) * max * p,
            ConstraintHandling::AddPercentOfCurrent => base * (1.0 + self.value / 100.0 * p),
            ConstraintHandling::MatchValue => base + (self.value - base) * p,
            ConstraintHandling::MatchPercent => {
                let target = (self.value / 100.0) * max;
                base + (target - base) * p
            }
        };

        raw.clamp(min, max)
    }
}

/// Parameters that can carry a pressure constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConstraintTarget {
    Size,
    Flow,
    Opacity,
    Rotation,
    SizeJitterMin,
    SizeJitterMax,
    RotationJitterLeft,
    RotationJitterRight,
    FlowLossJitter,
    SprayHorizontal,
    SprayVertical,
    MinDrawDistance,
}
