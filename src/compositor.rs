//! Stamp compositor: rasterizes one transformed brush mask into a target
//! buffer.
//!
//! There is exactly one geometry pipeline. Placement math (scale, rotation,
//! mirroring) lives in [`MaskTransform`]; the fast rasterizer and the
//! general rasterizer are different inner loops over the same transform, so
//! they cannot disagree on pixel placement. The fast loop is taken when no
//! locks, dithering, seamless wrap, or surface source are involved.

use crate::brush::PreparedMask;
use crate::canvas::{composite_over, BlendMode, Canvas};
use crate::color::{hsv_to_rgb, rgb_to_hsv, Rgba8};
use crate::geometry::{CanvasPoint, Rect};
use crate::settings::{ChannelLocks, SmoothingMode};

/// Fully-resolved parameters for exactly one stamp. Created and discarded
/// per stamp, never persisted.
#[derive(Debug, Clone)]
pub struct StampParams {
    pub center: CanvasPoint,
    /// Half the stamp diameter in pixels.
    pub radius: f32,
    pub rotation_deg: f32,
    pub mirror_x: bool,
    pub mirror_y: bool,
    /// Per-stamp coverage multiplier in [0, 1]. Stroke-level opacity is
    /// applied at merge time, not here.
    pub alpha: f32,
    pub smoothing: SmoothingMode,
    pub seamless: bool,
    pub dither: bool,
    pub locks: ChannelLocks,
}

/// What the stamp deposits.
pub enum StampSource<'a> {
    /// Blend the prepared color mask (normal painting).
    Mask,
    /// Masked overwrite: copy pixels from `surface`, offset by `(dx, dy)`,
    /// through the mask as an alpha stencil. Used by the eraser, the clone
    /// stamp, and effect brushes.
    Surface {
        surface: &'a Canvas,
        offset: (i32, i32),
    },
}

/// Shared placement math: maps a destination pixel center back into mask
/// coordinates.
struct MaskTransform {
    cx: f32,
    cy: f32,
    inv_scale: f32,
    sin: f32,
    cos: f32,
    mirror_x: bool,
    mirror_y: bool,
    half_mask: f32,
}

impl MaskTransform {
    fn new(params: &StampParams, mask_size: u32) -> Option<Self> {
        let scale = (2.0 * params.radius) / mask_size as f32;
        if !(scale > 0.0) {
            return None;
        }
        let theta = -params.rotation_deg.to_radians();
        Some(Self {
            cx: params.center.x,
            cy: params.center.y,
            inv_scale: 1.0 / scale,
            sin: theta.sin(),
            cos: theta.cos(),
            mirror_x: params.mirror_x,
            mirror_y: params.mirror_y,
            half_mask: mask_size as f32 / 2.0,
        })
    }

    #[inline]
    fn mask_coords(&self, px: i32, py: i32) -> (f32, f32) {
        let dx = px as f32 + 0.5 - self.cx;
        let dy = py as f32 + 0.5 - self.cy;
        // Inverse rotation, then mirror, then inverse scale.
        let mut rx = dx * self.cos - dy * self.sin;
        let mut ry = dx * self.sin + dy * self.cos;
        if self.mirror_x {
            rx = -rx;
        }
        if self.mirror_y {
            ry = -ry;
        }
        (
            rx * self.inv_scale + self.half_mask,
            ry * self.inv_scale + self.half_mask,
        )
    }
}

/// 4x4 ordered dither thresholds.
const BAYER_4X4: [[u8; 4]; 4] = [
    [0, 8, 2, 10],
    [12, 4, 14, 6],
    [3, 11, 1, 9],
    [15, 7, 13, 5],
];

#[inline]
fn dithered_alpha(alpha: u8, px: i32, py: i32) -> u8 {
    if alpha == 0 || alpha == 255 {
        return alpha;
    }
    let threshold =
        (BAYER_4X4[py.rem_euclid(4) as usize][px.rem_euclid(4) as usize] as u16 * 16 + 8) as u8;
    if alpha >= threshold {
        255
    } else {
        0
    }
}

#[inline]
pub(crate) fn apply_locks(out: Rgba8, dst: Rgba8, locks: &ChannelLocks) -> Rgba8 {
    let mut out = out;
    if locks.any_hsv() {
        let (oh, os, ov) = rgb_to_hsv(out.r, out.g, out.b);
        let (dh, ds, dv) = rgb_to_hsv(dst.r, dst.g, dst.b);
        let h = if locks.hue { dh } else { oh };
        let s = if locks.saturation { ds } else { os };
        let v = if locks.value { dv } else { ov };
        let (r, g, b) = hsv_to_rgb(h, s, v);
        out.r = r;
        out.g = g;
        out.b = b;
    }
    if locks.red {
        out.r = dst.r;
    }
    if locks.green {
        out.g = dst.g;
    }
    if locks.blue {
        out.b = dst.b;
    }
    if locks.alpha {
        out.a = dst.a;
    }
    out
}

/// Stencil copy: moves `dst` toward the source surface pixel by the mask
/// coverage. At full coverage the destination becomes exactly the source
/// pixel, which is what erasing back to the original surface requires.
#[inline]
fn stencil_copy(dst: Rgba8, src: Rgba8, coverage: u8) -> Rgba8 {
    if coverage == 255 {
        return src;
    }
    let t = coverage as f32 / 255.0;
    let mix = |d: u8, s: u8| (d as f32 + (s as f32 - d as f32) * t).round() as u8;
    Rgba8 {
        r: mix(dst.r, src.r),
        g: mix(dst.g, src.g),
        b: mix(dst.b, src.b),
        a: mix(dst.a, src.a),
    }
}

/// Draw one stamp into `target`. Returns the touched rectangle, or `None`
/// for a degenerate (zero-scale or fully clipped) stamp, which is a silent
/// no-op rather than an error.
pub fn stamp(
    target: &mut Canvas,
    mask: &PreparedMask,
    source: StampSource,
    params: &StampParams,
) -> Option<Rect> {
    let Some(transform) = MaskTransform::new(params, mask.size()) else {
        return None;
    };
    if params.alpha <= 0.0 {
        return None;
    }

    // Rotation can push mask corners out to radius * sqrt(2).
    let reach = params.radius * std::f32::consts::SQRT_2;
    let bounds = Rect::around(params.center, reach);
    let clipped = bounds.clamp_to(target.width(), target.height());
    let rect = if params.seamless { bounds } else { clipped };
    if rect.is_empty() {
        return None;
    }

    let fast = !params.seamless
        && !params.dither
        && !params.locks.any()
        && matches!(source, StampSource::Mask);

    if fast {
        rasterize_fast(target, mask, params, &transform, &clipped);
        return Some(clipped);
    }

    rasterize_general(target, mask, &source, params, &transform, &rect);
    if params.seamless {
        // Wrapped writes may land on the opposite edge.
        Some(Rect::new(0, 0, target.width() as i32, target.height() as i32))
    } else {
        Some(clipped)
    }
}

fn rasterize_fast(
    target: &mut Canvas,
    mask: &PreparedMask,
    params: &StampParams,
    transform: &MaskTransform,
    rect: &Rect,
) {
    for py in rect.top..rect.bottom {
        for px in rect.left..rect.right {
            let (u, v) = transform.mask_coords(px, py);
            let sampled = mask.sample(u, v, params.smoothing);
            let alpha = (sampled.a as f32 * params.alpha).round() as u8;
            if alpha == 0 {
                continue;
            }
            let src = Rgba8::new(sampled.r, sampled.g, sampled.b, alpha);
            let dst = target.pixel(px, py);
            target.set_pixel(px, py, composite_over(dst, src, BlendMode::Overwrite, 1.0));
        }
    }
}

fn rasterize_general(
    target: &mut Canvas,
    mask: &PreparedMask,
    source: &StampSource,
    params: &StampParams,
    transform: &MaskTransform,
    rect: &Rect,
) {
    for py in rect.top..rect.bottom {
        for px in rect.left..rect.right {
            let (u, v) = transform.mask_coords(px, py);
            let sampled = mask.sample(u, v, params.smoothing);
            let mut alpha = (sampled.a as f32 * params.alpha).round() as u8;
            if params.dither {
                alpha = dithered_alpha(alpha, px, py);
            }
            if alpha == 0 {
                continue;
            }

            let dst = if params.seamless {
                target.pixel_wrapped(px, py)
            } else {
                target.pixel(px, py)
            };

            let out = match source {
                StampSource::Mask => {
                    let src = Rgba8::new(sampled.r, sampled.g, sampled.b, alpha);
                    composite_over(dst, src, BlendMode::Overwrite, 1.0)
                }
                StampSource::Surface { surface, offset } => {
                    let sx = px + offset.0;
                    let sy = py + offset.1;
                    let src = if params.seamless {
                        surface.pixel_wrapped(sx, sy)
                    } else {
                        surface.pixel(sx, sy)
                    };
                    stencil_copy(dst, src, alpha)
                }
            };

            let out = apply_locks(out, dst, &params.locks);
            if params.seamless {
                target.set_pixel_wrapped(px, py, out);
            } else {
                target.set_pixel(px, py, out);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::brush::{BrushTip, MaskPipeline};

    fn solid_mask(size: u32, color: Rgba8) -> PreparedMask {
        let mut pipeline = MaskPipeline::new(BrushTip::round(size));
        pipeline.prepare(size as f32, true, color, 1.0).clone()
    }

    fn params(radius: f32) -> StampParams {
        StampParams {
            center: CanvasPoint::new(16.0, 16.0),
            radius,
            rotation_deg: 0.0,
            mirror_x: false,
            mirror_y: false,
            alpha: 1.0,
            smoothing: SmoothingMode::Smooth,
            seamless: false,
            dither: false,
            locks: ChannelLocks::default(),
        }
    }

    #[test]
    fn test_zero_scale_stamp_is_noop() {
        let mask = solid_mask(16, Rgba8::opaque(255, 0, 0));
        let mut canvas = Canvas::new(32, 32);
        let before = canvas.clone();

        let touched = stamp(&mut canvas, &mask, StampSource::Mask, &params(0.0));
        assert!(touched.is_none());
        assert_eq!(canvas, before);
    }

    #[test]
    fn test_basic_stamp_paints_center() {
        let mask = solid_mask(16, Rgba8::opaque(255, 0, 0));
        let mut canvas = Canvas::new(32, 32);

        let touched = stamp(&mut canvas, &mask, StampSource::Mask, &params(8.0));
        assert!(touched.is_some());
        let center = canvas.pixel(16, 16);
        assert_eq!((center.r, center.g, center.b), (255, 0, 0));
        assert_eq!(center.a, 255);
        // Corners stay untouched.
        assert_eq!(canvas.pixel(0, 0), Rgba8::TRANSPARENT);
    }

    #[test]
    fn test_fully_clipped_stamp_is_noop() {
        let mask = solid_mask(16, Rgba8::opaque(255, 0, 0));
        let mut canvas = Canvas::new(32, 32);
        let mut p = params(4.0);
        p.center = CanvasPoint::new(-100.0, -100.0);
        assert!(stamp(&mut canvas, &mask, StampSource::Mask, &p).is_none());
    }

    #[test]
    fn test_alpha_lock_preserves_destination_alpha() {
        let mask = solid_mask(16, Rgba8::opaque(255, 0, 0));
        let mut canvas = Canvas::new(32, 32);
        canvas.fill(Rgba8::new(0, 0, 255, 100));

        let mut p = params(8.0);
        p.locks.alpha = true;
        stamp(&mut canvas, &mask, StampSource::Mask, &p).unwrap();

        let center = canvas.pixel(16, 16);
        assert_eq!(center.a, 100);
        assert!(center.r > 200);
    }

    #[test]
    fn test_rgb_locks_preserve_channels() {
        let mask = solid_mask(16, Rgba8::opaque(255, 255, 255));
        let mut canvas = Canvas::new(32, 32);
        canvas.fill(Rgba8::opaque(10, 20, 30));

        let mut p = params(8.0);
        p.locks.green = true;
        p.locks.blue = true;
        stamp(&mut canvas, &mask, StampSource::Mask, &p).unwrap();

        let center = canvas.pixel(16, 16);
        assert_eq!(center.g, 20);
        assert_eq!(center.b, 30);
        assert!(center.r > 200);
    }

    #[test]
    fn test_surface_source_restores_exact_pixels() {
        // Eraser semantics: full-coverage stamp copies the source surface
        // verbatim.
        let mut original = Canvas::new(32, 32);
        original.fill(Rgba8::opaque(11, 22, 33));

        let mut canvas = Canvas::new(32, 32);
        canvas.fill(Rgba8::opaque(200, 200, 200));

        let mask = solid_mask(16, Rgba8::opaque(0, 0, 0));
        stamp(
            &mut canvas,
            &mask,
            StampSource::Surface {
                surface: &original,
                offset: (0, 0),
            },
            &params(8.0),
        )
        .unwrap();

        assert_eq!(canvas.pixel(16, 16), Rgba8::opaque(11, 22, 33));
        // Outside the stamp the working pixels stay.
        assert_eq!(canvas.pixel(1, 1), Rgba8::opaque(200, 200, 200));
    }

    #[test]
    fn test_clone_offset_shifts_source() {
        let mut original = Canvas::new(32, 32);
        original.set_pixel(6, 16, Rgba8::opaque(250, 0, 0));

        let mut canvas = Canvas::new(32, 32);
        let mask = solid_mask(16, Rgba8::opaque(0, 0, 0));
        stamp(
            &mut canvas,
            &mask,
            StampSource::Surface {
                surface: &original,
                offset: (-10, 0),
            },
            &params(8.0),
        )
        .unwrap();

        assert_eq!(canvas.pixel(16, 16), Rgba8::opaque(250, 0, 0));
    }

    #[test]
    fn test_seamless_wraps_to_opposite_edge() {
        let mask = solid_mask(16, Rgba8::opaque(255, 0, 0));
        let mut canvas = Canvas::new(32, 32);

        let mut p = params(8.0);
        p.center = CanvasPoint::new(0.0, 16.0);
        p.seamless = true;
        stamp(&mut canvas, &mask, StampSource::Mask, &p).unwrap();

        // Left half of the stamp wrapped to the right edge.
        assert!(canvas.pixel(30, 16).a > 0);
        assert!(canvas.pixel(1, 16).a > 0);
    }

    #[test]
    fn test_dither_produces_binary_alpha() {
        let size = 16;
        let mut pipeline = MaskPipeline::new(BrushTip::round(size));
        let mask = pipeline
            .prepare(size as f32, true, Rgba8::opaque(0, 0, 0), 0.5)
            .clone();
        let mut canvas = Canvas::new(32, 32);

        let mut p = params(8.0);
        p.dither = true;
        stamp(&mut canvas, &mask, StampSource::Mask, &p).unwrap();

        let mut saw_on = false;
        let mut saw_off = false;
        for y in 10..22 {
            for x in 10..22 {
                let a = canvas.pixel(x, y).a;
                assert!(a == 0 || a == 255, "fractional alpha {a} survived dither");
                saw_on |= a == 255;
                saw_off |= a == 0;
            }
        }
        assert!(saw_on && saw_off);
    }

    #[test]
    fn test_fast_and_general_paths_agree_on_placement() {
        let mask = solid_mask(16, Rgba8::opaque(255, 0, 0));

        let mut fast = Canvas::new(32, 32);
        let mut p = params(7.0);
        p.rotation_deg = 30.0;
        stamp(&mut fast, &mask, StampSource::Mask, &p).unwrap();

        // Forcing the general rasterizer via a no-op lock config change:
        // dithering off, seamless on with a stamp far from edges behaves
        // identically to direct writes.
        let mut general = Canvas::new(32, 32);
        let mut p2 = p.clone();
        p2.seamless = true;
        stamp(&mut general, &mask, StampSource::Mask, &p2).unwrap();

        assert_eq!(fast, general);
    }

    #[test]
    fn test_mirrored_stamp_flips_mask() {
        // Asymmetric mask: left half opaque only.
        let mut img = image::GrayImage::new(16, 16);
        for y in 0..16 {
            for x in 0..8 {
                img.put_pixel(x, y, image::Luma([255]));
            }
        }
        let mut pipeline = MaskPipeline::new(BrushTip::from_gray(img).unwrap());
        let mask = pipeline
            .prepare(16.0, true, Rgba8::opaque(255, 0, 0), 1.0)
            .clone();

        let mut plain = Canvas::new(32, 32);
        let mut p = params(8.0);
        p.smoothing = SmoothingMode::Jagged;
        stamp(&mut plain, &mask, StampSource::Mask, &p).unwrap();

        let mut mirrored = Canvas::new(32, 32);
        p.mirror_x = true;
        stamp(&mut mirrored, &mask, StampSource::Mask, &p).unwrap();

        // Paint lands left of center unmirrored, right of center mirrored.
        assert!(plain.pixel(12, 16).a > 0);
        assert_eq!(plain.pixel(20, 16).a, 0);
        assert!(mirrored.pixel(20, 16).a > 0);
        assert_eq!(mirrored.pixel(12, 16).a, 0);
    }
}
