//! Brush image pipeline.
//!
//! Turns the decoded square grayscale tip into a pre-colored, pre-scaled,
//! rotation-ready RGBA mask. The expensive steps run once per settings
//! change, not once per stamp:
//!
//! 1. The tip is downsized once to the largest stamp size the current
//!    settings can produce and cached for the session.
//! 2. Coloring and flow pre-multiplication produce a [`PreparedMask`],
//!    re-run only when color, flow, or colorize change (color jitter
//!    re-runs it per stamp by changing the key).
//!
//! Rotation is never cached; stamps sample the mask through an inverse
//! transform at rasterization time.

use image::imageops::{self, FilterType};
use image::GrayImage;

use crate::color::Rgba8;
use crate::error::{EngineError, Result};
use crate::settings::SmoothingMode;

/// A decoded square grayscale brush tip. Gray value is coverage:
/// 255 is fully opaque.
#[derive(Debug, Clone)]
pub struct BrushTip {
    image: GrayImage,
}

impl BrushTip {
    pub fn from_gray(image: GrayImage) -> Result<Self> {
        if image.width() == 0 || image.width() != image.height() {
            return Err(EngineError::InvalidInput(format!(
                "brush tip must be square and non-empty, got {}x{}",
                image.width(),
                image.height()
            )));
        }
        Ok(Self { image })
    }

    /// Synthesize a hard round tip, used as the default brush.
    pub fn round(diameter: u32) -> Self {
        let d = diameter.max(1);
        let mut image = GrayImage::new(d, d);
        let center = d as f32 / 2.0;
        let radius = d as f32 / 2.0;
        for y in 0..d {
            for x in 0..d {
                let dx = x as f32 + 0.5 - center;
                let dy = y as f32 + 0.5 - center;
                let dist = (dx * dx + dy * dy).sqrt();
                // One-pixel soft rim, hard interior.
                let coverage = (radius - dist).clamp(0.0, 1.0);
                image.put_pixel(x, y, image::Luma([(coverage * 255.0) as u8]));
            }
        }
        Self { image }
    }

    pub fn size(&self) -> u32 {
        self.image.width()
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }
}

/// The pre-colored, flow-premultiplied RGBA mask one session of stamps
/// samples from.
#[derive(Debug, Clone)]
pub struct PreparedMask {
    size: u32,
    data: Vec<Rgba8>,
}

impl PreparedMask {
    pub fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    fn texel(&self, x: i32, y: i32) -> Rgba8 {
        if x < 0 || y < 0 || x >= self.size as i32 || y >= self.size as i32 {
            return Rgba8::TRANSPARENT;
        }
        self.data[(y as u32 * self.size + x as u32) as usize]
    }

    /// Sample at fractional mask coordinates. `Smooth` uses bilinear
    /// filtering; `Jagged` uses nearest-neighbour so hard-aliased tips do
    /// not grow partial-alpha edge pixels.
    pub fn sample(&self, u: f32, v: f32, smoothing: SmoothingMode) -> Rgba8 {
        match smoothing {
            SmoothingMode::Jagged => self.texel(u.floor() as i32, v.floor() as i32),
            SmoothingMode::Smooth => {
                let x = u - 0.5;
                let y = v - 0.5;
                let x0 = x.floor() as i32;
                let y0 = y.floor() as i32;
                let fx = x - x0 as f32;
                let fy = y - y0 as f32;

                let p00 = self.texel(x0, y0);
                let p10 = self.texel(x0 + 1, y0);
                let p01 = self.texel(x0, y0 + 1);
                let p11 = self.texel(x0 + 1, y0 + 1);

                let lerp2 = |a: u8, b: u8, c: u8, d: u8| -> u8 {
                    let top = a as f32 + (b as f32 - a as f32) * fx;
                    let bottom = c as f32 + (d as f32 - c as f32) * fx;
                    (top + (bottom - top) * fy).round() as u8
                };

                Rgba8 {
                    r: lerp2(p00.r, p10.r, p01.r, p11.r),
                    g: lerp2(p00.g, p10.g, p01.g, p11.g),
                    b: lerp2(p00.b, p10.b, p01.b, p11.b),
                    a: lerp2(p00.a, p10.a, p01.a, p11.a),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PrepareKey {
    colorize: bool,
    color: Rgba8,
    flow_bits: u16,
}

/// Owns the tip and both cache levels. Single-threaded by design; the
/// stroke engine is the only caller.
#[derive(Debug)]
pub struct MaskPipeline {
    tip: BrushTip,
    downsized: Option<GrayImage>,
    downsized_size: u32,
    prepared: Option<PreparedMask>,
    key: Option<PrepareKey>,
}

impl MaskPipeline {
    pub fn new(tip: BrushTip) -> Self {
        Self {
            tip,
            downsized: None,
            downsized_size: 0,
            prepared: None,
            key: None,
        }
    }

    /// Swap the active tip, dropping both caches.
    pub fn set_tip(&mut self, tip: BrushTip) {
        self.tip = tip;
        self.invalidate();
    }

    /// Drop the cached masks; the next stamp re-runs the full pipeline.
    pub fn invalidate(&mut self) {
        self.downsized = None;
        self.downsized_size = 0;
        self.prepared = None;
        self.key = None;
    }

    fn ensure_downsized(&mut self, max_stamp_size: f32) {
        let target = (max_stamp_size.ceil() as u32).max(1).min(self.tip.size());
        if self.downsized.is_some() && self.downsized_size == target {
            return;
        }
        let resized = if target == self.tip.size() {
            self.tip.image().clone()
        } else {
            imageops::resize(self.tip.image(), target, target, FilterType::Triangle)
        };
        tracing::debug!(
            "Downsized brush tip {}px -> {}px for this session",
            self.tip.size(),
            target
        );
        self.downsized = Some(resized);
        self.downsized_size = target;
        self.prepared = None;
        self.key = None;
    }

    /// Produce the mask for the given color and flow alpha, reusing the
    /// cached one when nothing relevant changed.
    pub fn prepare(
        &mut self,
        max_stamp_size: f32,
        colorize: bool,
        color: Rgba8,
        flow_alpha: f32,
    ) -> &PreparedMask {
        self.ensure_downsized(max_stamp_size);

        let key = PrepareKey {
            colorize,
            color,
            flow_bits: (flow_alpha.clamp(0.0, 1.0) * u16::MAX as f32) as u16,
        };
        if self.key != Some(key) || self.prepared.is_none() {
            let gray = self
                .downsized
                .as_ref()
                .unwrap_or_else(|| self.tip.image());
            let flow = flow_alpha.clamp(0.0, 1.0);
            let data = gray
                .pixels()
                .map(|p| {
                    let coverage = p.0[0];
                    let a = (coverage as f32 * flow).round() as u8;
                    if colorize {
                        Rgba8::new(color.r, color.g, color.b, a)
                    } else {
                        Rgba8::new(coverage, coverage, coverage, a)
                    }
                })
                .collect();
            self.prepared = Some(PreparedMask {
                size: self.downsized_size,
                data,
            });
            self.key = Some(key);
        }

        self.prepared.as_ref().unwrap_or_else(|| unreachable!())
    }
}
