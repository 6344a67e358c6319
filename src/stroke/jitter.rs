//! Per-stamp randomization of size, rotation, flow, position, and color.
//!
//! One engine (and one PRNG) is shared by the whole session; sequences are
//! not reproducible across runs unless a seed is supplied, which tests do.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::color::{hsv_to_rgb, rgb_to_hsv, Rgba8};
use crate::geometry::CanvasPoint;
use crate::settings::JitterSettings;

#[derive(Debug)]
pub struct JitterEngine {
    rng: SmallRng,
}

impl JitterEngine {
    pub fn from_entropy() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    /// Deterministic engine for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Uniform sample in `[0, magnitude]`; zero magnitude samples nothing.
    #[inline]
    fn rand(&mut self, magnitude: f32) -> f32 {
        if magnitude <= 0.0 {
            0.0
        } else {
            self.rng.gen_range(0.0..=magnitude)
        }
    }

    /// Zero-centered sample in `[-magnitude, magnitude]`.
    #[inline]
    fn centered(&mut self, magnitude: f32) -> f32 {
        if magnitude <= 0.0 {
            0.0
        } else {
            self.rng.gen_range(-magnitude..=magnitude)
        }
    }

    /// Jittered stamp radius, floored at zero (a zero radius later becomes
    /// a silent no-op stamp).
    pub fn radius(&mut self, radius: f32, jitter: &JitterSettings) -> f32 {
        (radius - self.rand(jitter.size_min) + self.rand(jitter.size_max)).max(0.0)
    }

    /// Jittered rotation in degrees.
    pub fn rotation(&mut self, rotation: f32, jitter: &JitterSettings) -> f32 {
        rotation - self.rand(jitter.rotation_left) + self.rand(jitter.rotation_right)
    }

    /// Jittered flow alpha, clamped to [0, 1].
    pub fn flow(&mut self, flow: f32, jitter: &JitterSettings) -> f32 {
        (flow - self.rand(jitter.flow_loss)).clamp(0.0, 1.0)
    }

    /// Spray: shift the stamp by a zero-centered random fraction of the
    /// configured percentages, scaled to canvas size.
    pub fn position(
        &mut self,
        position: CanvasPoint,
        jitter: &JitterSettings,
        canvas_width: u32,
        canvas_height: u32,
    ) -> CanvasPoint {
        let dx = self.centered(jitter.spray_horizontal / 2.0) / 100.0 * canvas_width as f32;
        let dy = self.centered(jitter.spray_vertical / 2.0) / 100.0 * canvas_height as f32;
        CanvasPoint::new(position.x + dx, position.y + dy)
    }

    /// Color jitter: RGB first in percent space, then HSV on the result.
    /// Hue input is a 0-100 range scaled to degrees (x3.6).
    pub fn color(&mut self, color: Rgba8, jitter: &JitterSettings) -> Rgba8 {
        if !jitter.recolors() {
            return color;
        }

        let mut out = color;
        if jitter.rgb.iter().any(|v| *v > 0.0) {
            let perturb = |c: u8, delta: f32| -> u8 {
                (c as f32 + delta / 100.0 * 255.0).round().clamp(0.0, 255.0) as u8
            };
            out.r = perturb(out.r, self.centered(jitter.rgb[0]));
            out.g = perturb(out.g, self.centered(jitter.rgb[1]));
            out.b = perturb(out.b, self.centered(jitter.rgb[2]));
        }

        if jitter.hsv.iter().any(|v| *v > 0.0) {
            let (h, s, v) = rgb_to_hsv(out.r, out.g, out.b);
            let h = h + self.centered(jitter.hsv[0]) * 3.6;
            let s = s + self.centered(jitter.hsv[1]) / 100.0;
            let v = v + self.centered(jitter.hsv[2]) / 100.0;
            let (r, g, b) = hsv_to_rgb(h, s, v);
            out.r = r;
            out.g = g;
            out.b = b;
        }

        out
    }
}
