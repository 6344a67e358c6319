//! RGBA pixel type and RGB/HSV conversions used by color jitter and the
//! HSV channel locks.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Straight-alpha RGBA pixel, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const TRANSPARENT: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse a `#rrggbb` or `#rrggbbaa` hex color string.
    pub fn from_hex(hex: &str) -> Result<Self, EngineError> {
        let s = hex.trim().trim_start_matches('#');
        // Checked slicing: multi-byte characters must fail, not panic.
        let parse = |i: usize| {
            s.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| EngineError::InvalidInput(format!("bad hex color: {hex}")))
        };
        match s.len() {
            6 => Ok(Self::opaque(parse(0)?, parse(2)?, parse(4)?)),
            8 => Ok(Self::new(parse(0)?, parse(2)?, parse(4)?, parse(6)?)),
            _ => Err(EngineError::InvalidInput(format!("bad hex color: {hex}"))),
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Convert RGB (0-255 each) to HSV: hue in degrees [0, 360), saturation and
/// value in [0, 1].
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta < f32::EPSILON {
        0.0
    } else if (max - r).abs() < f32::EPSILON {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if (max - g).abs() < f32::EPSILON {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let s = if max < f32::EPSILON { 0.0 } else { delta / max };

    (h, s, max)
}

/// Convert HSV back to RGB. Hue is taken modulo 360 so jittered hues wrap;
/// saturation and value are clamped to [0, 1].
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    let h = h.rem_euclid(360.0);
    let s = s.clamp(0.0, 1.0);
    let v = v.clamp(0.0, 1.0);

    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match (h / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    (
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        let c = Rgba8::from_hex("#3fa0c8").unwrap();
        assert_eq!((c.r, c.g, c.b, c.a), (0x3f, 0xa0, 0xc8, 255));
        assert_eq!(c.to_hex(), "#3fa0c8");

        assert!(Rgba8::from_hex("#12").is_err());
        assert!(Rgba8::from_hex("not a color").is_err());
    }

    #[test]
    fn test_hex_rejects_non_ascii() {
        // Multi-byte characters can make the byte length look valid.
        assert!(Rgba8::from_hex("a\u{20ac}bc").is_err());
        assert!(Rgba8::from_hex("#\u{20ac}\u{20ac}ab").is_err());
    }

    #[test]
    fn test_hsv_primaries() {
        let (h, s, v) = rgb_to_hsv(255, 0, 0);
        assert!(h.abs() < 0.01 && (s - 1.0).abs() < 0.01 && (v - 1.0).abs() < 0.01);

        let (h, _, _) = rgb_to_hsv(0, 255, 0);
        assert!((h - 120.0).abs() < 0.01);

        let (h, _, _) = rgb_to_hsv(0, 0, 255);
        assert!((h - 240.0).abs() < 0.01);
    }

    #[test]
    fn test_rgb_hsv_round_trip() {
        for &(r, g, b) in &[(12u8, 200u8, 77u8), (255, 255, 255), (0, 0, 0), (90, 90, 90)] {
            let (h, s, v) = rgb_to_hsv(r, g, b);
            let (r2, g2, b2) = hsv_to_rgb(h, s, v);
            assert!((r as i16 - r2 as i16).abs() <= 1);
            assert!((g as i16 - g2 as i16).abs() <= 1);
            assert!((b as i16 - b2 as i16).abs() <= 1);
        }
    }

    #[test]
    fn test_hue_wraps() {
        let (r, g, b) = hsv_to_rgb(360.0 + 120.0, 1.0, 1.0);
        assert_eq!((r, g, b), (0, 255, 0));
    }
}
