//! Blend modes and per-pixel compositing operators.
//!
//! `Overwrite` is plain source-over painting and composites directly into
//! the committed buffer; every other mode carries a separable channel
//! operator and forces the stroke through the staged buffer so the
//! operator applies once per stroke, not once per stamp.

use serde::{Deserialize, Serialize};

use crate::color::Rgba8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    #[default]
    Overwrite,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    Difference,
    Exclusion,
}

impl BlendMode {
    /// The separable channel operator, or `None` for plain source-over.
    pub fn operator(self) -> Option<fn(f32, f32) -> f32> {
        match self {
            BlendMode::Overwrite => None,
            BlendMode::Multiply => Some(|d, s| d * s),
            BlendMode::Screen => Some(|d, s| 1.0 - (1.0 - d) * (1.0 - s)),
            BlendMode::Overlay => Some(|d, s| hard_light_channel(s, d)),
            BlendMode::Darken => Some(f32::min),
            BlendMode::Lighten => Some(f32::max),
            BlendMode::ColorDodge => Some(|d, s| {
                if s >= 1.0 {
                    1.0
                } else {
                    (d / (1.0 - s)).min(1.0)
                }
            }),
            BlendMode::ColorBurn => Some(|d, s| {
                if s <= 0.0 {
                    0.0
                } else {
                    1.0 - ((1.0 - d) / s).min(1.0)
                }
            }),
            BlendMode::HardLight => Some(hard_light_channel),
            BlendMode::Difference => Some(|d, s| (d - s).abs()),
            BlendMode::Exclusion => Some(|d, s| d + s - 2.0 * d * s),
        }
    }
}

fn hard_light_channel(d: f32, s: f32) -> f32 {
    if s <= 0.5 {
        2.0 * d * s
    } else {
        1.0 - 2.0 * (1.0 - d) * (1.0 - s)
    }
}

/// Composite `src` over `dst` with the given blend mode, scaling source
/// coverage by `opacity` in [0, 1].
///
/// A fully transparent source leaves `dst` untouched, which is what makes
/// repeated staged merges idempotent.
pub fn composite_over(dst: Rgba8, src: Rgba8, mode: BlendMode, opacity: f32) -> Rgba8 {
    let sa = (src.a as f32 / 255.0) * opacity.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return dst;
    }
    let da = dst.a as f32 / 255.0;

    let blend = |dc: u8, sc: u8| -> f32 {
        let d = dc as f32 / 255.0;
        let s = sc as f32 / 255.0;
        match mode.operator() {
            // W3C compositing: the operator only applies where the
            // destination has coverage.
            Some(op) => (1.0 - da) * s + da * op(d, s),
            None => s,
        }
    };

    let cs_r = blend(dst.r, src.r);
    let cs_g = blend(dst.g, src.g);
    let cs_b = blend(dst.b, src.b);

    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Rgba8::TRANSPARENT;
    }

    let over = |d: u8, cs: f32| -> u8 {
        let d = d as f32 / 255.0;
        let c = (cs * sa + d * da * (1.0 - sa)) / out_a;
        (c * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba8 {
        r: over(dst.r, cs_r),
        g: over(dst.g, cs_g),
        b: over(dst.b, cs_b),
        a: (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    }
}
